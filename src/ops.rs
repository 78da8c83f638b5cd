//! Cart operations
//!
//! Pure functions over [`Cart`] and [`ItemInstance`]. None of them touch their
//! arguments; every mutation returns a new value that shares untouched
//! subtrees with the input.
//!
//! # Families
//!
//! - **Search**: lazy iterators in cart order. Each call re-scans, so calling
//!   twice yields the same items in the same order.
//! - **Compatibility**: parents that accept a child under the
//!   [`ChildValidityTensor`].
//! - **Mutation**: append, remove and replace by uid.
//! - **Derivation**: mint items from catalog data, or re-derive them after an
//!   attribute or entity change (always with a fresh uid).

use crate::builder::MatrixEntityBuilder;
use crate::cart::{Cart, CartError, ItemInstance};
use crate::dimensional::Aid;
use crate::matrix::{decode_key, AttributeInfo, Key, KeyMode, Pid};
use crate::tensor::ChildValidityTensor;
use crate::uid::Uid;
use regex::Regex;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, trace, warn};

// ============================================================================
// Search
// ============================================================================

/// Items of `items` satisfying `predicate`, in array order
pub fn find_in_item_array<'a, P>(
    items: &'a [Arc<ItemInstance>],
    mut predicate: P,
) -> impl Iterator<Item = &'a ItemInstance> + 'a
where
    P: FnMut(&ItemInstance) -> bool + 'a,
{
    items
        .iter()
        .map(|item| item.as_ref())
        .filter(move |item| predicate(*item))
}

/// Top-level items satisfying `predicate`, in cart order
pub fn find_in_cart<'a, P>(cart: &'a Cart, predicate: P) -> impl Iterator<Item = &'a ItemInstance> + 'a
where
    P: FnMut(&ItemInstance) -> bool + 'a,
{
    find_in_item_array(cart.items(), predicate)
}

pub fn find_by_key<'a>(cart: &'a Cart, key: &'a Key) -> impl Iterator<Item = &'a ItemInstance> + 'a {
    find_in_cart(cart, move |item| &item.key == key)
}

/// Items whose stored key matches `pattern`, a key with `*` segments.
///
/// # Examples
///
/// ```
/// use ordermatrix::{ops, Cart, ItemInstance, Key, Uid};
///
/// let cart = Cart::from_items(vec![
///     ItemInstance::try_new(Uid(1), Key::new("1:0:1"), 1).unwrap(),
///     ItemInstance::try_new(Uid(2), Key::new("1:2:0"), 1).unwrap(),
/// ]);
/// let hits: Vec<_> = ops::find_by_key_regex(&cart, &Key::new("1:*:1"))
///     .unwrap()
///     .map(|item| item.uid)
///     .collect();
/// assert_eq!(hits, vec![Uid(1)]);
/// ```
pub fn find_by_key_regex<'a>(
    cart: &'a Cart,
    pattern: &Key,
) -> Result<impl Iterator<Item = &'a ItemInstance> + 'a, CartError> {
    let re = pattern.to_regex()?;
    Ok(find_by_regex(cart, re))
}

/// Items whose stored key matches a caller-compiled regex
pub fn find_by_regex(cart: &Cart, re: Regex) -> impl Iterator<Item = &ItemInstance> + '_ {
    find_in_cart(cart, move |item| re.is_match(item.key.as_str()))
}

pub fn find_by_pid(cart: &Cart, pid: Pid) -> impl Iterator<Item = &ItemInstance> + '_ {
    find_in_cart(cart, move |item| item.pid() == Some(pid))
}

/// Top-level items with at least one direct child keyed `key`
pub fn find_by_child_key<'a>(cart: &'a Cart, key: &'a Key) -> impl Iterator<Item = &'a ItemInstance> + 'a {
    find_in_cart(cart, move |item| item.children.iter().any(|c| &c.key == key))
}

/// Top-level items with at least one direct child of entity `pid`
pub fn find_by_child_pid(cart: &Cart, pid: Pid) -> impl Iterator<Item = &ItemInstance> + '_ {
    find_in_cart(cart, move |item| item.children.iter().any(|c| c.pid() == Some(pid)))
}

/// Top-level items that may take a child keyed `child_key`
pub fn find_compatible_parent<'a>(
    cart: &'a Cart,
    tensor: &'a ChildValidityTensor,
    child_key: &'a Key,
) -> impl Iterator<Item = &'a ItemInstance> + 'a {
    find_in_cart(cart, move |item| tensor.accepts(&item.key, child_key))
}

// ============================================================================
// Mutation
// ============================================================================

fn without(items: &[Arc<ItemInstance>], uid: Uid) -> Option<Vec<Arc<ItemInstance>>> {
    let index = items.iter().position(|item| item.uid == uid)?;
    let mut next = Vec::with_capacity(items.len() - 1);
    next.extend_from_slice(&items[..index]);
    next.extend_from_slice(&items[index + 1..]);
    Some(next)
}

fn replaced(items: &[Arc<ItemInstance>], item: ItemInstance) -> Option<Vec<Arc<ItemInstance>>> {
    let index = items.iter().position(|existing| existing.uid == item.uid)?;
    let mut next = items.to_vec();
    next[index] = Arc::new(item);
    Some(next)
}

/// New cart with `item` appended
pub fn add_to_cart(cart: &Cart, item: ItemInstance) -> Cart {
    let mut items = cart.items().to_vec();
    items.push(Arc::new(item));
    Cart::from_shared(items)
}

/// Copy of `parent` (same uid) with `child` appended to its options
pub fn add_to_item(parent: &ItemInstance, child: ItemInstance) -> ItemInstance {
    let mut next = parent.clone();
    next.children.push(Arc::new(child));
    next
}

/// New cart without the top-level item `uid`
pub fn remove_from_cart(cart: &Cart, uid: Uid) -> Result<Cart, CartError> {
    match without(cart.items(), uid) {
        Some(items) => Ok(Cart::from_shared(items)),
        None => {
            warn!(%uid, "remove_from_cart: uid not in cart");
            Err(CartError::NotFound(uid))
        }
    }
}

/// New cart with the top-level item sharing `item.uid` swapped for `item`.
///
/// Position is preserved.
pub fn replace_in_cart(cart: &Cart, item: ItemInstance) -> Result<Cart, CartError> {
    let uid = item.uid;
    match replaced(cart.items(), item) {
        Some(items) => Ok(Cart::from_shared(items)),
        None => {
            warn!(%uid, "replace_in_cart: uid not in cart");
            Err(CartError::NotFound(uid))
        }
    }
}

/// Copy of `parent` without its direct child `uid`
pub fn remove_from_item(parent: &ItemInstance, uid: Uid) -> Result<ItemInstance, CartError> {
    let children = without(&parent.children, uid).ok_or_else(|| {
        warn!(%uid, parent = %parent.uid, "remove_from_item: uid not among children");
        CartError::NotFound(uid)
    })?;
    Ok(ItemInstance {
        children,
        ..parent.clone()
    })
}

/// Copy of `parent` with the direct child sharing `child.uid` swapped
pub fn replace_in_item(parent: &ItemInstance, child: ItemInstance) -> Result<ItemInstance, CartError> {
    let uid = child.uid;
    let children = replaced(&parent.children, child).ok_or_else(|| {
        warn!(%uid, parent = %parent.uid, "replace_in_item: uid not among children");
        CartError::NotFound(uid)
    })?;
    Ok(ItemInstance {
        children,
        ..parent.clone()
    })
}

// ============================================================================
// Derivation
// ============================================================================

fn mode_for(generate_regex_key: bool) -> KeyMode {
    if generate_regex_key {
        KeyMode::Pattern
    } else {
        KeyMode::Exact
    }
}

fn build_key(
    builder: &MatrixEntityBuilder<'_>,
    mode: KeyMode,
) -> Result<Key, CartError> {
    let key = builder.get_key(mode)?;
    for aid in builder.get_unused_attributes() {
        debug!(%aid, %key, "attribute not used by entity");
    }
    Ok(key)
}

/// Mint a new item with a fresh uid.
///
/// With `generate_regex_key` set, dimensions no attribute fills become `*`
/// instead of failing the build.
///
/// # Examples
///
/// ```
/// use ordermatrix::{ops, Aid, Catalog, Pid};
///
/// let catalog = Catalog::from_json_str(r#"{
///     "dimensions": [{"id": 0, "name": "size", "attributes": [
///         {"aid": 10, "name": "small"}, {"aid": 11, "name": "large"}]}],
///     "entities": [{"pid": 1, "name": "cone", "dimensions": [0]}]
/// }"#).unwrap();
///
/// let item = ops::create_item(&catalog, 2, Pid(1), [Aid(11)], Vec::new(), false).unwrap();
/// assert_eq!(item.key.as_str(), "1:1");
/// assert_eq!(item.quantity.get(), 2);
/// ```
pub fn create_item<A>(
    info: &dyn AttributeInfo,
    quantity: u32,
    pid: Pid,
    aids: A,
    children: Vec<ItemInstance>,
    generate_regex_key: bool,
) -> Result<ItemInstance, CartError>
where
    A: IntoIterator<Item = Aid>,
{
    let quantity = NonZeroU32::new(quantity).ok_or(CartError::InvalidQuantity)?;

    let mut builder = MatrixEntityBuilder::with_pid(info, pid);
    for aid in aids {
        if !builder.add_attribute(aid)? {
            trace!(%aid, %pid, "dimension already chosen, attribute skipped");
        }
    }
    let key = build_key(&builder, mode_for(generate_regex_key))?;

    Ok(ItemInstance::new(Uid::fresh()?, key, quantity).with_children(children))
}

/// Re-derive `item` with new attribute choices.
///
/// New attributes win over the item's current ones in the same dimension;
/// dimensions the new list leaves alone keep their current choice. The result
/// has a fresh uid, the same quantity and the same children. Pattern keys stay
/// pattern keys.
pub fn change_item_attributes<A>(
    info: &dyn AttributeInfo,
    item: &ItemInstance,
    aids: A,
) -> Result<ItemInstance, CartError>
where
    A: IntoIterator<Item = Aid>,
{
    let current = decode_key(&item.key, info)?;
    let mut builder = MatrixEntityBuilder::with_pid(info, current.pid);
    for aid in aids.into_iter().chain(current.assigned()) {
        builder.add_attribute(aid)?;
    }
    let key = build_key(&builder, mode_for(item.key.is_pattern()))?;

    Ok(ItemInstance {
        uid: Uid::fresh()?,
        key,
        quantity: item.quantity,
        children: item.children.clone(),
    })
}

/// Re-derive `item` as a different entity.
///
/// Current attributes carry over where the new entity has the same
/// dimension; the rest are dropped. The result has a fresh uid, the same
/// quantity and the same children.
pub fn change_item_pid(
    info: &dyn AttributeInfo,
    item: &ItemInstance,
    pid: Pid,
    generate_regex_key: bool,
) -> Result<ItemInstance, CartError> {
    let current = decode_key(&item.key, info)?;
    let mut builder = MatrixEntityBuilder::with_pid(info, pid);
    for aid in current.assigned() {
        builder.add_attribute(aid)?;
    }
    let key = build_key(&builder, mode_for(generate_regex_key))?;
    debug!(from = %current.pid, to = %pid, %key, "item entity changed");

    Ok(ItemInstance {
        uid: Uid::fresh()?,
        key,
        quantity: item.quantity,
        children: item.children.clone(),
    })
}

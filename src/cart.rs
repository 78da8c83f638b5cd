//! Cart - copy-on-write tree of item instances
//!
//! A cart is an ordered list of top-level items; each item owns an ordered
//! list of children (its options). Nodes are held behind `Arc`, so a derived
//! cart shares every untouched subtree with the cart it came from. Nothing in
//! this crate mutates a cart in place: operations in [`crate::ops`] return new
//! values.

use crate::builder::BuilderError;
use crate::matrix::{Key, MatrixError, Pid};
use crate::uid::{Uid, UidExhausted};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors from cart operations and snapshot loading.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("no item with uid {0}")]
    NotFound(Uid),

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("uid {0} appears more than once in the snapshot")]
    DuplicateUid(Uid),

    #[error("uid {0} is outside the assignable range")]
    ReservedUid(Uid),

    #[error(transparent)]
    UidExhausted(#[from] UidExhausted),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("invalid key pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to read cart: {0}")]
    Io(#[from] io::Error),

    #[error("invalid cart JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One cart line, possibly with nested option items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub uid: Uid,
    pub key: Key,
    pub quantity: NonZeroU32,
    /// Option order is insertion order
    #[serde(default)]
    pub children: Vec<Arc<ItemInstance>>,
}

impl ItemInstance {
    /// Assemble an item around an existing uid.
    ///
    /// Use [`crate::ops::create_item`] to mint a new item from catalog data.
    pub fn new(uid: Uid, key: Key, quantity: NonZeroU32) -> Self {
        ItemInstance {
            uid,
            key,
            quantity,
            children: Vec::new(),
        }
    }

    /// Like [`ItemInstance::new`], rejecting a zero quantity
    pub fn try_new(uid: Uid, key: Key, quantity: u32) -> Result<Self, CartError> {
        let quantity = NonZeroU32::new(quantity).ok_or(CartError::InvalidQuantity)?;
        Ok(ItemInstance::new(uid, key, quantity))
    }

    pub fn with_children(mut self, children: Vec<ItemInstance>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    /// Entity named by the key
    pub fn pid(&self) -> Option<Pid> {
        self.key.pid()
    }

    pub fn children(&self) -> &[Arc<ItemInstance>] {
        &self.children
    }

    /// Largest uid in this subtree
    pub fn max_uid(&self) -> Uid {
        self.children
            .iter()
            .map(|c| c.max_uid())
            .fold(self.uid, Uid::max)
    }
}

/// Ordered sequence of top-level items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    items: Vec<Arc<ItemInstance>>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    pub fn from_items(items: Vec<ItemInstance>) -> Self {
        Cart {
            items: items.into_iter().map(Arc::new).collect(),
        }
    }

    pub(crate) fn from_shared(items: Vec<Arc<ItemInstance>>) -> Self {
        Cart { items }
    }

    pub fn items(&self) -> &[Arc<ItemInstance>] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemInstance> + '_ {
        self.items.iter().map(|item| item.as_ref())
    }

    /// Top-level uids in cart order
    pub fn uids(&self) -> Vec<Uid> {
        self.items.iter().map(|item| item.uid).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parse a cart snapshot.
    ///
    /// Every uid in the tree must be unique and below [`Uid::MAX`]; zero
    /// quantities fail to parse. The uid source is advanced past every uid in
    /// the snapshot so items created afterwards cannot collide with it.
    pub fn from_json_str(json: &str) -> Result<Self, CartError> {
        Self::adopt(serde_json::from_str(json)?)
    }

    /// Load cart snapshot from JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CartError> {
        let file = File::open(path)?;
        Self::adopt(serde_json::from_reader(BufReader::new(file))?)
    }

    fn adopt(cart: Cart) -> Result<Cart, CartError> {
        let mut seen = HashSet::new();
        for item in &cart.items {
            check_subtree(item, &mut seen)?;
        }
        if let Some(&max) = seen.iter().max() {
            Uid::reserve_through(max).map_err(|_| CartError::ReservedUid(max))?;
        }
        Ok(cart)
    }
}

fn check_subtree(item: &ItemInstance, seen: &mut HashSet<Uid>) -> Result<(), CartError> {
    if item.uid == Uid::MAX {
        return Err(CartError::ReservedUid(item.uid));
    }
    if !seen.insert(item.uid) {
        return Err(CartError::DuplicateUid(item.uid));
    }
    for child in &item.children {
        check_subtree(child, seen)?;
    }
    Ok(())
}

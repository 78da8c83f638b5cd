//! Property tests for key encoding and copy-on-write cart operations.

use ordermatrix::ops;
use ordermatrix::{
    Aid, AttributeInfo, Cart, Catalog, DimensionId, ItemInstance, Key, KeyMode, MatrixEntityBuilder,
    Pid, Uid,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

/// Dimension d has `SIZES[d]` attributes with aids `d * 100 + position`.
const SIZES: [u32; 4] = [3, 2, 5, 1];

fn catalog() -> Catalog {
    let dimensions: Vec<String> = SIZES
        .iter()
        .enumerate()
        .map(|(d, &n)| {
            let attrs: Vec<String> = (0..n)
                .map(|p| format!(r#"{{"aid": {}, "name": "d{d}p{p}"}}"#, d as u32 * 100 + p))
                .collect();
            format!(r#"{{"id": {d}, "name": "dim{d}", "attributes": [{}]}}"#, attrs.join(","))
        })
        .collect();
    let json = format!(
        r#"{{"dimensions": [{}], "entities": [
            {{"pid": 1, "name": "all", "dimensions": [0, 1, 2, 3]}},
            {{"pid": 2, "name": "reversed", "dimensions": [3, 2, 1, 0]}},
            {{"pid": 3, "name": "plain"}}
        ]}}"#,
        dimensions.join(",")
    );
    Catalog::from_json_str(&json).unwrap()
}

fn full_choice() -> impl Strategy<Value = Vec<Aid>> {
    (0..SIZES[0], 0..SIZES[1], 0..SIZES[2], 0..SIZES[3])
        .prop_map(|(a, b, c, d)| vec![Aid(a), Aid(100 + b), Aid(200 + c), Aid(300 + d)])
}

fn any_aid() -> impl Strategy<Value = Aid> {
    (0..SIZES.len()).prop_flat_map(|d| (0..SIZES[d]).prop_map(move |p| Aid(d as u32 * 100 + p)))
}

fn key_for(catalog: &Catalog, pid: Pid, aids: &[Aid]) -> Key {
    let mut builder = MatrixEntityBuilder::with_pid(catalog, pid);
    for &aid in aids {
        builder.add_attribute(aid).unwrap();
    }
    builder.get_key(KeyMode::Exact).unwrap()
}

fn line(uid: Uid, key: &str, quantity: u32) -> ItemInstance {
    ItemInstance::try_new(uid, Key::new(key), quantity).unwrap()
}

fn arb_cart() -> impl Strategy<Value = Cart> {
    prop::collection::vec((1u32..5, 1u32..4, 0usize..3), 0..8).prop_map(|rows| {
        let items = rows
            .into_iter()
            .enumerate()
            .map(|(i, (pid, qty, kids))| {
                let children = (0..kids)
                    .map(|k| line(Uid(1_000 + (i * 10 + k) as u64), "3", 1))
                    .collect();
                line(Uid(i as u64 + 1), &format!("{pid}:0"), qty)
                    .with_children(children)
            })
            .collect();
        Cart::from_items(items)
    })
}

proptest! {
    #[test]
    fn key_ignores_assignment_order(choice in full_choice().prop_shuffle(), pid in 1u32..3) {
        let catalog = catalog();
        let mut sorted = choice.clone();
        sorted.sort();
        prop_assert_eq!(key_for(&catalog, Pid(pid), &choice), key_for(&catalog, Pid(pid), &sorted));
    }

    #[test]
    fn matrix_key_ignores_map_construction_order(choice in full_choice().prop_shuffle()) {
        let catalog = catalog();
        let matrix = catalog.matrix_for_entity(Pid(2)).unwrap();
        let forward: HashMap<DimensionId, Aid> = choice
            .iter()
            .map(|&aid| (catalog.coordinates(aid).unwrap().dimension, aid))
            .collect();
        let backward: HashMap<DimensionId, Aid> = choice
            .iter()
            .rev()
            .map(|&aid| (catalog.coordinates(aid).unwrap().dimension, aid))
            .collect();
        prop_assert_eq!(
            matrix.get_key(Pid(2), &forward, &catalog, KeyMode::Exact).unwrap(),
            matrix.get_key(Pid(2), &backward, &catalog, KeyMode::Exact).unwrap()
        );
    }

    #[test]
    fn first_writer_wins(sequence in prop::collection::vec(any_aid(), 0..12)) {
        let catalog = catalog();
        let mut builder = MatrixEntityBuilder::new(&catalog);
        let mut seen = HashSet::new();
        let mut expected = Vec::new();
        for &aid in &sequence {
            let dim = catalog.coordinates(aid).unwrap().dimension;
            let fresh = seen.insert(dim);
            prop_assert_eq!(builder.add_attribute(aid).unwrap(), fresh);
            if fresh {
                expected.push(aid);
            }
        }
        // no PID: everything collected is unused, in collection order
        prop_assert_eq!(builder.get_unused_attributes().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn zero_dimension_entity_key_is_pid(sequence in prop::collection::vec(any_aid(), 0..6)) {
        let catalog = catalog();
        let item = ops::create_item(&catalog, 1, Pid(3), sequence, Vec::new(), false).unwrap();
        prop_assert_eq!(item.key.as_str(), "3");
    }

    #[test]
    fn mutations_leave_input_untouched(cart in arb_cart(), pick in 0usize..8) {
        let snapshot = cart.clone();
        let uids = cart.uids();

        let _ = ops::add_to_cart(&cart, line(Uid(999), "4", 1));
        if let Some(&uid) = uids.get(pick) {
            let removed = ops::remove_from_cart(&cart, uid).unwrap();
            prop_assert!(!removed.uids().contains(&uid));
            prop_assert_eq!(removed.len(), cart.len() - 1);

            let replaced = ops::replace_in_cart(&cart, line(uid, "4:1", 2)).unwrap();
            prop_assert_eq!(replaced.uids(), uids.clone());

            let parent = cart.items()[pick].as_ref();
            let grown = ops::add_to_item(parent, line(Uid(998), "3", 1));
            prop_assert_eq!(grown.children.len(), parent.children.len() + 1);
        } else {
            prop_assert!(ops::remove_from_cart(&cart, Uid(12_345)).is_err());
        }
        prop_assert_eq!(cart, snapshot);
    }

    #[test]
    fn searches_are_repeatable(cart in arb_cart(), pid in 1u32..5) {
        let first: Vec<Uid> = ops::find_by_pid(&cart, Pid(pid)).map(|i| i.uid).collect();
        let second: Vec<Uid> = ops::find_by_pid(&cart, Pid(pid)).map(|i| i.uid).collect();
        prop_assert_eq!(&first, &second);

        let pattern = Key::new(format!("{pid}:*"));
        let by_regex: Vec<Uid> = ops::find_by_key_regex(&cart, &pattern).unwrap().map(|i| i.uid).collect();
        prop_assert_eq!(by_regex, first);
    }
}

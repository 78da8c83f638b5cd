//! Uid counter at the top of its range.
//!
//! Runs in its own test binary: it drives the process-global counter to the
//! end, which would break every other test sharing the process.

use ordermatrix::ops;
use ordermatrix::{Aid, Cart, CartError, Catalog, Pid, Uid, UidExhausted};

#[test]
fn counter_never_reissues_or_wraps() {
    // the largest uid cannot be adopted: nothing could be issued after it
    let top = Cart::from_json_str(r#"{"items": [{"uid": 18446744073709551615, "key": "1", "quantity": 1}]}"#);
    assert!(matches!(top, Err(CartError::ReservedUid(Uid::MAX))));

    let nested = Cart::from_json_str(
        r#"{"items": [{"uid": 3, "key": "1", "quantity": 1,
            "children": [{"uid": 18446744073709551615, "key": "9", "quantity": 1}]}]}"#,
    );
    assert!(matches!(nested, Err(CartError::ReservedUid(Uid::MAX))));

    // one below is accepted and leaves no ids to hand out
    let snapshot = Cart::from_json_str(r#"{"items": [{"uid": 18446744073709551614, "key": "1", "quantity": 1}]}"#)
        .unwrap();
    let adopted = snapshot.uids()[0];
    assert_eq!(adopted, Uid(u64::MAX - 1));

    for _ in 0..3 {
        assert_eq!(Uid::fresh(), Err(UidExhausted));
    }

    let catalog = Catalog::from_json_str(r#"{"entities": [{"pid": 1, "name": "napkin"}]}"#).unwrap();
    let err = ops::create_item(&catalog, 1, Pid(1), Vec::<Aid>::new(), Vec::new(), false).unwrap_err();
    assert!(matches!(err, CartError::UidExhausted(UidExhausted)));
}

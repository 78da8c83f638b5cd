//! Ordermatrix - Configurable Menu Item Keys and Cart Trees
//!
//! Copyright (c) 2025 Ordermatrix Contributors
//! Licensed under MIT License
//!
//! Validates and manipulates restaurant orders expressed as hierarchical carts
//! of configurable menu items.
//!
//! # Overview
//!
//! A menu item is a *generic entity* (a "cone") configurable along independent
//! *dimensions* (flavor, size). Picking one attribute per dimension yields a
//! *specific entity* identified by a canonical key such as `1:0:1`.
//!
//! Data flows leaf-first:
//! - [`dimensional`]: attribute -> coordinate tables
//! - [`matrix`]: per-entity key codec and the [`AttributeInfo`] seam
//! - [`builder`]: per-item accumulator producing a key
//! - [`tensor`]: child-validity predicates built from a rule set
//! - [`cart`] and [`ops`]: copy-on-write cart tree and its operations
//! - [`catalog`]: JSON catalog implementing [`AttributeInfo`]
//!
//! # Quick Start
//!
//! ```
//! use ordermatrix::{ops, Cart, Catalog, Pid};
//!
//! let catalog = Catalog::from_json_str(r#"{
//!     "dimensions": [
//!         {"id": 0, "name": "size", "attributes": [
//!             {"aid": 10, "name": "small"}, {"aid": 11, "name": "medium"}, {"aid": 12, "name": "large"}]},
//!         {"id": 1, "name": "flavor", "attributes": [
//!             {"aid": 20, "name": "vanilla"}, {"aid": 21, "name": "chocolate"}]}
//!     ],
//!     "entities": [{"pid": 1, "name": "cone", "dimensions": [0, 1]}]
//! }"#)?;
//!
//! let small = catalog.aid_by_name("small").unwrap();
//! let chocolate = catalog.aid_by_name("chocolate").unwrap();
//! let cone = ops::create_item(&catalog, 1, Pid(1), [small, chocolate], Vec::new(), false)?;
//! assert_eq!(cone.key.as_str(), "1:0:1");
//!
//! let cart = ops::add_to_cart(&Cart::new(), cone.clone());
//! let found: Vec<_> = ops::find_by_key(&cart, &cone.key).collect();
//! assert_eq!(found[0].uid, cone.uid);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod cart;
pub mod catalog;
pub mod cli;
pub mod dimensional;
pub mod matrix;
pub mod ops;
pub mod tensor;
pub mod uid;

// Re-export main types for convenience
pub use builder::{BuilderError, BuilderState, MatrixEntityBuilder};
pub use cart::{Cart, CartError, ItemInstance};
pub use catalog::{Catalog, CatalogError};
pub use dimensional::{Aid, Coordinate, Dimension, DimensionError, DimensionId, DimensionTable};
pub use matrix::{AttributeInfo, DecodedKey, Key, KeyMode, Matrix, MatrixError, Pid};
pub use tensor::{ChildPredicate, ChildValidityTensor, Rule, RuleConfig, TensorError};
pub use uid::{Uid, UidExhausted};

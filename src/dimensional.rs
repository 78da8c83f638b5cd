//! Dimensional Configuration - Attribute Coordinate Tables
//!
//! A menu item varies along independent *dimensions* (size, flavor, ...). Each
//! dimension is an ordered set of mutually exclusive attributes, and every
//! attribute lives at exactly one *coordinate*: its dimension plus its position
//! inside that dimension.
//!
//! # Layout
//!
//! - **Dimension**: stable numeric id, display name, ordered attribute ids
//! - **Coordinate**: `(dimension, position)` for one attribute
//! - **DimensionTable**: bidirectional lookup, attribute -> coordinate and
//!   coordinate -> attribute
//!
//! Tables are built once from catalog data and are read-only afterward.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Attribute id: one selectable option such as "small" or "chocolate".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aid(pub u32);

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable numeric id of a dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionId(pub u32);

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an attribute sits: which dimension, and at which position in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub dimension: DimensionId,
    pub position: usize,
}

impl Coordinate {
    pub fn new(dimension: DimensionId, position: usize) -> Self {
        Coordinate { dimension, position }
    }
}

/// An ordered set of mutually exclusive attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: DimensionId,
    pub name: String,
    /// Attribute ids in position order
    pub attributes: Vec<Aid>,
}

impl Dimension {
    pub fn new(id: DimensionId, name: impl Into<String>, attributes: Vec<Aid>) -> Self {
        Dimension {
            id,
            name: name.into(),
            attributes,
        }
    }

    /// Number of attributes in this dimension
    pub fn cardinality(&self) -> usize {
        self.attributes.len()
    }
}

/// Errors raised while assembling a [`DimensionTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionError {
    #[error("dimension {0} declared twice")]
    DuplicateDimension(DimensionId),

    #[error("attribute {aid} appears in dimension {first} and again in dimension {second}")]
    DuplicateAttribute {
        aid: Aid,
        first: DimensionId,
        second: DimensionId,
    },
}

/// Static lookup between attributes and their coordinates.
#[derive(Clone, Debug, Default)]
pub struct DimensionTable {
    dimensions: Vec<Dimension>,
    by_id: HashMap<DimensionId, usize>,
    coordinates: HashMap<Aid, Coordinate>,
}

impl DimensionTable {
    /// Build a table from dimension definitions.
    ///
    /// Every attribute must belong to exactly one dimension, and dimension ids
    /// must be unique.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordermatrix::dimensional::{Aid, Coordinate, Dimension, DimensionId, DimensionTable};
    ///
    /// let size = Dimension::new(DimensionId(0), "size", vec![Aid(10), Aid(11), Aid(12)]);
    /// let table = DimensionTable::new(vec![size]).unwrap();
    /// assert_eq!(table.coordinates(Aid(11)), Some(Coordinate::new(DimensionId(0), 1)));
    /// ```
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, DimensionError> {
        let mut by_id = HashMap::with_capacity(dimensions.len());
        let mut coordinates = HashMap::new();

        for (index, dim) in dimensions.iter().enumerate() {
            if by_id.insert(dim.id, index).is_some() {
                return Err(DimensionError::DuplicateDimension(dim.id));
            }
            for (position, &aid) in dim.attributes.iter().enumerate() {
                let coord = Coordinate::new(dim.id, position);
                if let Some(prev) = coordinates.insert(aid, coord) {
                    return Err(DimensionError::DuplicateAttribute {
                        aid,
                        first: prev.dimension,
                        second: dim.id,
                    });
                }
            }
        }

        Ok(DimensionTable {
            dimensions,
            by_id,
            coordinates,
        })
    }

    /// Coordinate of an attribute, if it is registered
    pub fn coordinates(&self, aid: Aid) -> Option<Coordinate> {
        self.coordinates.get(&aid).copied()
    }

    /// Attribute sitting at a coordinate, if any
    pub fn attribute_at(&self, coord: Coordinate) -> Option<Aid> {
        self.dimension(coord.dimension)
            .and_then(|dim| dim.attributes.get(coord.position))
            .copied()
    }

    pub fn dimension(&self, id: DimensionId) -> Option<&Dimension> {
        self.by_id.get(&id).map(|&index| &self.dimensions[index])
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Total number of declared dimensions
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DimensionTable {
        DimensionTable::new(vec![
            Dimension::new(DimensionId(0), "size", vec![Aid(10), Aid(11), Aid(12)]),
            Dimension::new(DimensionId(1), "flavor", vec![Aid(20), Aid(21)]),
        ])
        .unwrap()
    }

    #[test]
    fn coordinates_follow_position_order() {
        let table = sample();
        assert_eq!(table.coordinates(Aid(10)), Some(Coordinate::new(DimensionId(0), 0)));
        assert_eq!(table.coordinates(Aid(12)), Some(Coordinate::new(DimensionId(0), 2)));
        assert_eq!(table.coordinates(Aid(21)), Some(Coordinate::new(DimensionId(1), 1)));
        assert_eq!(table.coordinates(Aid(99)), None);
    }

    #[test]
    fn attribute_at_inverts_coordinates() {
        let table = sample();
        for aid in [10, 11, 12, 20, 21].map(Aid) {
            let coord = table.coordinates(aid).unwrap();
            assert_eq!(table.attribute_at(coord), Some(aid));
        }
        assert_eq!(table.attribute_at(Coordinate::new(DimensionId(1), 5)), None);
        assert_eq!(table.attribute_at(Coordinate::new(DimensionId(7), 0)), None);
    }

    #[test]
    fn rejects_attribute_in_two_dimensions() {
        let err = DimensionTable::new(vec![
            Dimension::new(DimensionId(0), "size", vec![Aid(1)]),
            Dimension::new(DimensionId(1), "flavor", vec![Aid(1)]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            DimensionError::DuplicateAttribute {
                aid: Aid(1),
                first: DimensionId(0),
                second: DimensionId(1),
            }
        );
    }

    #[test]
    fn rejects_duplicate_dimension_id() {
        let err = DimensionTable::new(vec![
            Dimension::new(DimensionId(3), "a", vec![]),
            Dimension::new(DimensionId(3), "b", vec![]),
        ])
        .unwrap_err();
        assert_eq!(err, DimensionError::DuplicateDimension(DimensionId(3)));
    }

    #[test]
    fn cardinality_counts_attributes() {
        let table = sample();
        assert_eq!(table.dimension(DimensionId(0)).unwrap().cardinality(), 3);
        assert_eq!(table.len(), 2);
    }
}

//! Matrix - Attribute Assignment <-> Key Codec
//!
//! Every generic entity (a "cone") owns one [`Matrix`] listing the dimensions it
//! varies over. Choosing one attribute per dimension yields a specific entity,
//! serialized as a [`Key`]:
//!
//! ```text
//! <pid>:<position>:<position>...      e.g. 1:0:1
//! ```
//!
//! Segments follow the Matrix's dimension order, never the caller's. In
//! pattern form an unspecified dimension is written as `*`, and the key can be
//! compiled to an anchored regex for cart searches.

use crate::dimensional::{Aid, Coordinate, DimensionId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Segment separator inside a key
pub const SEPARATOR: char = ':';

/// Wildcard segment for an unspecified dimension
pub const WILDCARD: &str = "*";

/// Product id of a generic entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical or pattern-form string identifying a specific entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(raw: impl Into<String>) -> Self {
        Key(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.split(SEPARATOR)
    }

    /// Leading PID segment, if it parses
    pub fn pid(&self) -> Option<Pid> {
        self.segments().next()?.parse().ok().map(Pid)
    }

    /// True when at least one segment is a wildcard
    pub fn is_pattern(&self) -> bool {
        self.segments().any(|s| s == WILDCARD)
    }

    /// Compile this key to an anchored regex.
    ///
    /// Literal segments are escaped; each wildcard matches exactly one
    /// segment. A key without wildcards compiles to an exact-match regex.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordermatrix::Key;
    ///
    /// let re = Key::new("1:*:1").to_regex().unwrap();
    /// assert!(re.is_match("1:2:1"));
    /// assert!(!re.is_match("1:2:0"));
    /// assert!(!re.is_match("11:2:1"));
    /// ```
    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        let body: Vec<String> = self
            .segments()
            .map(|s| {
                if s == WILDCARD {
                    format!("[^{SEPARATOR}]+")
                } else {
                    regex::escape(s)
                }
            })
            .collect();
        Regex::new(&format!("^{}$", body.join(&SEPARATOR.to_string())))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Key::new(raw)
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Key(raw)
    }
}

/// Whether an unassigned dimension is an error or a wildcard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// Every declared dimension must be assigned
    #[default]
    Exact,
    /// Unassigned dimensions become `*`
    Pattern,
}

/// Errors from key encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("no attribute supplied for dimension {0}")]
    MissingDimension(DimensionId),

    #[error("unknown attribute {0}")]
    UnknownAttribute(Aid),

    #[error("attribute {aid} belongs to dimension {actual}, not {expected}")]
    DimensionMismatch {
        aid: Aid,
        expected: DimensionId,
        actual: DimensionId,
    },

    #[error("dimension {0} listed twice in one matrix")]
    DuplicateDimension(DimensionId),

    #[error("dimension {dimension} outside catalog range (count {count})")]
    DimensionOutOfRange { dimension: DimensionId, count: usize },

    #[error("malformed key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },
}

/// Source of truth for dimension membership.
///
/// Catalogs implement this; the matrix and builder never look anywhere else.
pub trait AttributeInfo {
    fn coordinates(&self, aid: Aid) -> Option<Coordinate>;

    fn matrix_for_entity(&self, pid: Pid) -> Option<&Matrix>;

    /// Inverse of [`AttributeInfo::coordinates`]
    fn attribute_at(&self, coord: Coordinate) -> Option<Aid>;
}

/// A key split back into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedKey {
    pub pid: Pid,
    /// One entry per matrix dimension, in matrix order; `None` for a wildcard
    pub attributes: Vec<(DimensionId, Option<Aid>)>,
}

impl DecodedKey {
    /// Attributes that are actually set, in matrix order
    pub fn assigned(&self) -> impl Iterator<Item = Aid> + '_ {
        self.attributes.iter().filter_map(|(_, aid)| *aid)
    }
}

/// Per-entity encoder: dimension assignments -> canonical key.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Matrix {
    dimension_count: usize,
    dimensions: Vec<DimensionId>,
}

impl Matrix {
    /// Create a matrix over `dimensions`, in serialization order.
    ///
    /// `dimension_count` is the size of the catalog's dimension id space;
    /// every listed id must fall below it, and none may repeat.
    pub fn new(dimension_count: usize, dimensions: Vec<DimensionId>) -> Result<Self, MatrixError> {
        let mut seen = HashSet::with_capacity(dimensions.len());
        for &dim in &dimensions {
            if dim.0 as usize >= dimension_count {
                return Err(MatrixError::DimensionOutOfRange {
                    dimension: dim,
                    count: dimension_count,
                });
            }
            if !seen.insert(dim) {
                return Err(MatrixError::DuplicateDimension(dim));
            }
        }
        Ok(Matrix {
            dimension_count,
            dimensions,
        })
    }

    /// A matrix for an entity with no configurable attributes
    pub fn empty() -> Self {
        Matrix::default()
    }

    pub fn dimensions(&self) -> &[DimensionId] {
        &self.dimensions
    }

    pub fn dimension_count(&self) -> usize {
        self.dimension_count
    }

    pub fn has_dimension(&self, dimension: DimensionId) -> bool {
        self.dimensions.contains(&dimension)
    }

    /// Encode `pid` plus per-dimension choices into a key.
    ///
    /// Entries in `assignment` for dimensions this matrix does not declare are
    /// ignored. The result depends only on which attribute sits in which
    /// dimension, never on map iteration order.
    pub fn get_key<I: AttributeInfo + ?Sized>(
        &self,
        pid: Pid,
        assignment: &HashMap<DimensionId, Aid>,
        info: &I,
        mode: KeyMode,
    ) -> Result<Key, MatrixError> {
        let mut key = pid.to_string();

        for &dim in &self.dimensions {
            key.push(SEPARATOR);
            match assignment.get(&dim) {
                Some(&aid) => {
                    let coord = info
                        .coordinates(aid)
                        .ok_or(MatrixError::UnknownAttribute(aid))?;
                    if coord.dimension != dim {
                        return Err(MatrixError::DimensionMismatch {
                            aid,
                            expected: dim,
                            actual: coord.dimension,
                        });
                    }
                    key.push_str(&coord.position.to_string());
                }
                None => match mode {
                    KeyMode::Exact => return Err(MatrixError::MissingDimension(dim)),
                    KeyMode::Pattern => key.push_str(WILDCARD),
                },
            }
        }

        Ok(Key(key))
    }

    /// Split a key produced by this matrix back into attributes.
    pub fn decode<I: AttributeInfo + ?Sized>(
        &self,
        key: &Key,
        info: &I,
    ) -> Result<DecodedKey, MatrixError> {
        let malformed = |reason: String| MatrixError::MalformedKey {
            key: key.to_string(),
            reason,
        };

        let mut segments = key.segments();
        let pid = segments
            .next()
            .and_then(|s| s.parse().ok())
            .map(Pid)
            .ok_or_else(|| malformed("missing or non-numeric pid".to_string()))?;

        let tokens: Vec<&str> = segments.collect();
        if tokens.len() != self.dimensions.len() {
            return Err(malformed(format!(
                "expected {} dimension segments, found {}",
                self.dimensions.len(),
                tokens.len()
            )));
        }

        let mut attributes = Vec::with_capacity(tokens.len());
        for (&dim, token) in self.dimensions.iter().zip(tokens) {
            if token == WILDCARD {
                attributes.push((dim, None));
                continue;
            }
            let position: usize = token
                .parse()
                .map_err(|_| malformed(format!("segment '{token}' is not a position")))?;
            let aid = info
                .attribute_at(Coordinate::new(dim, position))
                .ok_or_else(|| malformed(format!("position {position} outside dimension {dim}")))?;
            attributes.push((dim, Some(aid)));
        }

        Ok(DecodedKey { pid, attributes })
    }
}

/// Decode a key using the matrix of the entity it names.
///
/// Entities without a registered matrix decode as zero-dimension entities.
pub fn decode_key<I: AttributeInfo + ?Sized>(key: &Key, info: &I) -> Result<DecodedKey, MatrixError> {
    let pid = key.pid().ok_or_else(|| MatrixError::MalformedKey {
        key: key.to_string(),
        reason: "missing or non-numeric pid".to_string(),
    })?;
    match info.matrix_for_entity(pid) {
        Some(matrix) => matrix.decode(key, info),
        None => Matrix::empty().decode(key, info),
    }
}

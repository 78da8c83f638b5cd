//! MatrixEntityBuilder - per-item attribute accumulator
//!
//! Collects an entity id and attribute choices for one item under
//! construction, then resolves the entity's [`Matrix`] to produce its key.
//!
//! The builder is a two-state machine:
//! - `Unresolved`: attributes may be collected, no key can be produced yet
//! - `Resolved`: the PID is fixed for the builder's lifetime
//!
//! Attributes are first-writer-wins per dimension. The PID is strict: a second
//! `set_pid` fails even when it repeats the same PID.

use crate::dimensional::{Aid, DimensionId};
use crate::matrix::{AttributeInfo, Key, KeyMode, Matrix, MatrixError, Pid};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from [`MatrixEntityBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("builder already identifies entity {existing}; refusing to overwrite with {incoming}")]
    Overwrite { existing: Pid, incoming: Pid },

    #[error("attribute {0} is not registered in the catalog")]
    UnknownAttribute(Aid),

    #[error("key requested before an entity id was set")]
    NoPidSet,

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// Attributes gathered so far, in collection order and by dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collected {
    order: Vec<(Aid, DimensionId)>,
    by_dimension: HashMap<DimensionId, Aid>,
}

impl Collected {
    pub fn aids(&self) -> impl Iterator<Item = Aid> + '_ {
        self.order.iter().map(|(aid, _)| *aid)
    }

    pub fn assignment(&self) -> &HashMap<DimensionId, Aid> {
        &self.by_dimension
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Builder state: with or without an entity id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuilderState {
    Unresolved { collected: Collected },
    Resolved { pid: Pid, collected: Collected },
}

impl Default for BuilderState {
    fn default() -> Self {
        BuilderState::Unresolved {
            collected: Collected::default(),
        }
    }
}

/// Accumulates one item's entity id and attributes.
///
/// # Examples
///
/// ```
/// use ordermatrix::{Catalog, MatrixEntityBuilder, KeyMode, Pid};
///
/// let catalog = Catalog::from_json_str(r#"{
///     "dimensions": [
///         {"id": 0, "name": "size", "attributes": [
///             {"aid": 10, "name": "small"}, {"aid": 11, "name": "medium"}]},
///         {"id": 1, "name": "flavor", "attributes": [
///             {"aid": 20, "name": "vanilla"}, {"aid": 21, "name": "chocolate"}]}
///     ],
///     "entities": [{"pid": 1, "name": "cone", "dimensions": [0, 1]}]
/// }"#).unwrap();
///
/// let mut builder = MatrixEntityBuilder::new(&catalog);
/// builder.set_pid(Pid(1)).unwrap();
/// builder.add_attribute(catalog.aid_by_name("small").unwrap()).unwrap();
/// builder.add_attribute(catalog.aid_by_name("chocolate").unwrap()).unwrap();
/// assert_eq!(builder.get_key(KeyMode::Exact).unwrap().as_str(), "1:0:1");
/// ```
pub struct MatrixEntityBuilder<'a> {
    info: &'a dyn AttributeInfo,
    state: BuilderState,
}

impl<'a> MatrixEntityBuilder<'a> {
    pub fn new(info: &'a dyn AttributeInfo) -> Self {
        MatrixEntityBuilder {
            info,
            state: BuilderState::default(),
        }
    }

    /// Start already resolved to `pid`
    pub fn with_pid(info: &'a dyn AttributeInfo, pid: Pid) -> Self {
        MatrixEntityBuilder {
            info,
            state: BuilderState::Resolved {
                pid,
                collected: Collected::default(),
            },
        }
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn pid(&self) -> Option<Pid> {
        match &self.state {
            BuilderState::Unresolved { .. } => None,
            BuilderState::Resolved { pid, .. } => Some(*pid),
        }
    }

    pub fn collected(&self) -> &Collected {
        match &self.state {
            BuilderState::Unresolved { collected } | BuilderState::Resolved { collected, .. } => {
                collected
            }
        }
    }

    fn collected_mut(&mut self) -> &mut Collected {
        match &mut self.state {
            BuilderState::Unresolved { collected } | BuilderState::Resolved { collected, .. } => {
                collected
            }
        }
    }

    /// Fix the entity id. Legal exactly once.
    pub fn set_pid(&mut self, pid: Pid) -> Result<(), BuilderError> {
        match &mut self.state {
            BuilderState::Resolved { pid: existing, .. } => Err(BuilderError::Overwrite {
                existing: *existing,
                incoming: pid,
            }),
            BuilderState::Unresolved { collected } => {
                let collected = std::mem::take(collected);
                debug!(%pid, attributes = collected.len(), "builder resolved");
                self.state = BuilderState::Resolved { pid, collected };
                Ok(())
            }
        }
    }

    /// Record an attribute choice.
    ///
    /// Returns `Ok(false)` without touching state when the attribute's
    /// dimension is already filled.
    pub fn add_attribute(&mut self, aid: Aid) -> Result<bool, BuilderError> {
        let coord = self
            .info
            .coordinates(aid)
            .ok_or(BuilderError::UnknownAttribute(aid))?;

        let collected = self.collected_mut();
        if let Some(existing) = collected.by_dimension.get(&coord.dimension) {
            trace!(%aid, %existing, dimension = %coord.dimension, "dimension already filled");
            return Ok(false);
        }
        collected.by_dimension.insert(coord.dimension, aid);
        collected.order.push((aid, coord.dimension));
        Ok(true)
    }

    /// Matrix of the resolved entity, if the catalog declares one
    pub fn matrix(&self) -> Option<&'a Matrix> {
        let info = self.info;
        self.pid().and_then(|pid| info.matrix_for_entity(pid))
    }

    /// Produce the entity's key.
    ///
    /// An entity the catalog declares no matrix for is treated as having zero
    /// dimensions and yields its bare PID.
    pub fn get_key(&self, mode: KeyMode) -> Result<Key, BuilderError> {
        let BuilderState::Resolved { pid, collected } = &self.state else {
            return Err(BuilderError::NoPidSet);
        };
        let key = match self.matrix() {
            Some(matrix) => matrix.get_key(*pid, &collected.by_dimension, self.info, mode)?,
            None => Matrix::empty().get_key(*pid, &collected.by_dimension, self.info, mode)?,
        };
        Ok(key)
    }

    /// Collected attributes whose dimension the resolved entity does not use.
    ///
    /// Without a PID every collected attribute is unused. Each call starts a
    /// fresh pass in collection order.
    pub fn get_unused_attributes<'s>(&'s self) -> impl Iterator<Item = Aid> + 's {
        let matrix: Option<&'s Matrix> = self.matrix();
        self.collected()
            .order
            .iter()
            .filter(move |(_, dim)| !matrix.is_some_and(|m| m.has_dimension(*dim)))
            .map(|(aid, _)| *aid)
    }
}

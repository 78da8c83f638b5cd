//! Catalog - JSON menu data implementing [`AttributeInfo`]
//!
//! The catalog is the static side of the system: dimensions with their
//! attributes, and entities with the dimensions they vary over. It is loaded
//! once and read-only afterward.
//!
//! ```json
//! {
//!   "dimensions": [
//!     { "id": 0, "name": "size", "attributes": [ { "aid": 10, "name": "small" } ] }
//!   ],
//!   "entities": [ { "pid": 1, "name": "cone", "dimensions": [0] } ]
//! }
//! ```

use crate::dimensional::{Aid, Coordinate, Dimension, DimensionError, DimensionId, DimensionTable};
use crate::matrix::{AttributeInfo, Matrix, MatrixError, Pid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors from catalog loading and validation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] io::Error),

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Dimension(#[from] DimensionError),

    #[error("entity {pid}: {source}")]
    Matrix { pid: Pid, source: MatrixError },

    #[error("entity {pid} uses undeclared dimension {dimension}")]
    UnknownDimension { pid: Pid, dimension: DimensionId },

    #[error("entity {0} declared twice")]
    DuplicateEntity(Pid),

    #[error("name '{0}' is used more than once")]
    DuplicateName(String),
}

/// One selectable attribute as written in catalog files
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub aid: Aid,
    pub name: String,
}

/// One dimension as written in catalog files
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub id: DimensionId,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
}

/// One generic entity as written in catalog files
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntitySpec {
    pub pid: Pid,
    pub name: String,
    /// Dimensions in key order
    #[serde(default)]
    pub dimensions: Vec<DimensionId>,
}

/// Serialized catalog document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogSpec {
    #[serde(default)]
    pub dimensions: Vec<DimensionSpec>,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
}

/// In-memory catalog: dimension table, per-entity matrices and display names.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    table: DimensionTable,
    matrices: HashMap<Pid, Matrix>,
    entity_names: HashMap<Pid, String>,
    attribute_names: HashMap<Aid, String>,
    pids_by_name: HashMap<String, Pid>,
    aids_by_name: HashMap<String, Aid>,
}

impl Catalog {
    /// Validate a catalog document and build its lookup tables
    pub fn from_spec(spec: CatalogSpec) -> Result<Self, CatalogError> {
        let mut attribute_names = HashMap::new();
        let mut aids_by_name = HashMap::new();
        let mut dimensions = Vec::with_capacity(spec.dimensions.len());

        for dim in spec.dimensions {
            let mut aids = Vec::with_capacity(dim.attributes.len());
            for attr in dim.attributes {
                if aids_by_name.insert(attr.name.clone(), attr.aid).is_some() {
                    return Err(CatalogError::DuplicateName(attr.name));
                }
                attribute_names.insert(attr.aid, attr.name);
                aids.push(attr.aid);
            }
            dimensions.push(Dimension::new(dim.id, dim.name, aids));
        }

        let table = DimensionTable::new(dimensions)?;
        let dimension_count = table
            .dimensions()
            .iter()
            .map(|d| d.id.0 as usize + 1)
            .max()
            .unwrap_or(0);

        let mut matrices = HashMap::with_capacity(spec.entities.len());
        let mut entity_names = HashMap::with_capacity(spec.entities.len());
        let mut pids_by_name = HashMap::with_capacity(spec.entities.len());

        for entity in spec.entities {
            if matrices.contains_key(&entity.pid) {
                return Err(CatalogError::DuplicateEntity(entity.pid));
            }
            if let Some(&dimension) = entity
                .dimensions
                .iter()
                .find(|d| table.dimension(**d).is_none())
            {
                return Err(CatalogError::UnknownDimension {
                    pid: entity.pid,
                    dimension,
                });
            }
            let matrix = Matrix::new(dimension_count, entity.dimensions).map_err(|source| {
                CatalogError::Matrix {
                    pid: entity.pid,
                    source,
                }
            })?;
            if pids_by_name.insert(entity.name.clone(), entity.pid).is_some() {
                return Err(CatalogError::DuplicateName(entity.name));
            }
            matrices.insert(entity.pid, matrix);
            entity_names.insert(entity.pid, entity.name);
        }

        debug!(
            dimensions = table.len(),
            entities = matrices.len(),
            attributes = attribute_names.len(),
            "catalog loaded"
        );

        Ok(Catalog {
            table,
            matrices,
            entity_names,
            attribute_names,
            pids_by_name,
            aids_by_name,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Self::from_spec(serde_json::from_str(json)?)
    }

    /// Load catalog from JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        let spec: CatalogSpec = serde_json::from_reader(BufReader::new(file))?;
        Self::from_spec(spec)
    }

    pub fn table(&self) -> &DimensionTable {
        &self.table
    }

    pub fn pid_by_name(&self, name: &str) -> Option<Pid> {
        self.pids_by_name.get(name).copied()
    }

    pub fn aid_by_name(&self, name: &str) -> Option<Aid> {
        self.aids_by_name.get(name).copied()
    }

    pub fn entity_name(&self, pid: Pid) -> Option<&str> {
        self.entity_names.get(&pid).map(String::as_str)
    }

    pub fn attribute_name(&self, aid: Aid) -> Option<&str> {
        self.attribute_names.get(&aid).map(String::as_str)
    }

    pub fn dimension_name(&self, id: DimensionId) -> Option<&str> {
        self.table.dimension(id).map(|d| d.name.as_str())
    }
}

impl AttributeInfo for Catalog {
    fn coordinates(&self, aid: Aid) -> Option<Coordinate> {
        self.table.coordinates(aid)
    }

    fn matrix_for_entity(&self, pid: Pid) -> Option<&Matrix> {
        self.matrices.get(&pid)
    }

    fn attribute_at(&self, coord: Coordinate) -> Option<Aid> {
        self.table.attribute_at(coord)
    }
}

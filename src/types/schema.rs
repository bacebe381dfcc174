//! Table schema: an ordered list of (name, logical-type) pairs.

use crate::common::error::{EngineError, EngineResult};
use crate::types::logical_type::LogicalType;

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub logical_type: LogicalType,
}

impl Field {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolve a column name, surfacing `EngineError::MissingColumn` per
    /// spec §7 when the name is absent.
    pub fn require_index(&self, name: &str) -> EngineResult<usize> {
        self.index_of(name)
            .ok_or_else(|| EngineError::MissingColumn(name.to_string()))
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }
}

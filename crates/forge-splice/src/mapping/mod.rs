//! Closed type table from canonical C types to Go representations
//!
//! Lookup tries the fully qualified key first (`const char*`), then the base
//! key (`char*`). There is no fallback: a type with no entry is a
//! [`SpliceError::TypeMapping`] attributed to the declaration that uses it.

use crate::error::{SpliceError, SpliceResult};
use crate::ir::{CType, TargetType};
use std::collections::BTreeMap;

/// Built-in table entries
const DEFAULT_ENTRIES: &[(&str, TargetType)] = &[
    ("int8_t", TargetType::Int8),
    ("int16_t", TargetType::Int16),
    ("int32_t", TargetType::Int32),
    ("int64_t", TargetType::Int64),
    ("uint8_t", TargetType::Uint8),
    ("uint16_t", TargetType::Uint16),
    ("uint32_t", TargetType::Uint32),
    ("uint64_t", TargetType::Uint64),
    ("bool", TargetType::Bool),
    ("void*", TargetType::Opaque),
    ("char*", TargetType::Text),
    ("const char*", TargetType::Text),
    ("char**", TargetType::OptionalText),
    ("uint8_t*", TargetType::Bytes),
];

/// Type table used by the binding emitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    entries: BTreeMap<String, TargetType>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES
                .iter()
                .map(|(key, target)| (key.to_string(), *target))
                .collect(),
        }
    }
}

impl TypeTable {
    /// Create a table with only the built-in entries
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with no entries at all
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace an entry; keys use the canonical spelling (`const char*`)
    pub fn with_entry(mut self, key: &str, target: TargetType) -> Self {
        self.entries.insert(CType::parse(key).qualified_key(), target);
        self
    }

    /// Add or replace several entries
    pub fn with_entries<'a>(
        mut self,
        entries: impl IntoIterator<Item = (&'a String, &'a TargetType)>,
    ) -> Self {
        for (key, target) in entries {
            self = self.with_entry(key, *target);
        }
        self
    }

    /// Look up a type without attributing failures
    pub fn lookup(&self, ty: &CType) -> Option<TargetType> {
        self.entries
            .get(&ty.qualified_key())
            .or_else(|| self.entries.get(&ty.base_key()))
            .copied()
    }

    /// Map a type used by `declaration`
    pub fn map(&self, declaration: &str, ty: &CType) -> SpliceResult<TargetType> {
        self.lookup(ty)
            .ok_or_else(|| SpliceError::type_mapping(declaration, ty))
    }

    /// Map a type that must be an integer (statuses, handles, lengths)
    pub fn map_integer(&self, declaration: &str, ty: &CType) -> SpliceResult<TargetType> {
        let target = self.map(declaration, ty)?;
        if target.is_integer() {
            Ok(target)
        } else {
            Err(SpliceError::type_mapping(declaration, ty))
        }
    }
}

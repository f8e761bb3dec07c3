//! Typedef alias table and resolution
//!
//! Resolution is single pass and single level by default: an alias whose
//! underlying type is itself an alias stays partially resolved. Transitive
//! resolution can be switched on with [`AliasTable::transitive`].

use crate::ir::{CType, Declaration, Parameter};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

lazy_static! {
    /// `typedef <underlying> <alias>;`, the underlying type optionally const
    static ref TYPEDEF_REGEX: Regex = Regex::new(
        r"typedef\s+(?P<underlying>(?:const\s+)?\w+(?:\s+const\b)?(?:\s*\*+)?)\s*(?P<alias>\w+)\s*;"
    ).unwrap();
}

/// Mapping from alias name to its underlying canonical type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<String, CType>,
    transitive: bool,
}

impl AliasTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a types source, then seed the error-code alias
    ///
    /// The seed is applied last, so it wins over a definition in the source.
    pub fn from_source(source: Option<&str>, error_alias: &str, error_type: &str) -> Self {
        let mut table = Self::new();
        if let Some(source) = source {
            for captures in TYPEDEF_REGEX.captures_iter(source) {
                table.insert(&captures["alias"], CType::parse(&captures["underlying"]));
            }
        }
        table.insert(error_alias, CType::parse(error_type));

        tracing::debug!("Alias table holds {} entries", table.len());
        table
    }

    /// Enable or disable transitive resolution
    pub fn transitive(mut self, enabled: bool) -> Self {
        self.transitive = enabled;
        self
    }

    /// Add or replace an alias
    pub fn insert(&mut self, alias: impl Into<String>, underlying: CType) {
        self.aliases.insert(alias.into(), underlying);
    }

    /// Look up an alias
    pub fn get(&self, alias: &str) -> Option<&CType> {
        self.aliases.get(alias)
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Resolve one type
    ///
    /// A non-pointer type whose base is an alias is replaced wholesale. A
    /// pointer type has its markers stripped, the bare base looked up, and
    /// the markers reattached to the substitute; an unknown base passes
    /// through unchanged.
    pub fn resolve(&self, ty: &CType) -> CType {
        if !self.transitive {
            return self.resolve_once(ty).unwrap_or_else(|| ty.clone());
        }

        let mut current = ty.clone();
        let mut seen = HashSet::new();
        while seen.insert(current.base.clone()) {
            match self.resolve_once(&current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    fn resolve_once(&self, ty: &CType) -> Option<CType> {
        let underlying = self.aliases.get(&ty.base)?;
        if ty.is_pointer() {
            Some(ty.substitute(underlying))
        } else {
            Some(underlying.clone())
        }
    }

    /// Apply the table to a declaration's return type and every parameter,
    /// recursing into parameter-position callbacks and the trailing callback
    pub fn apply(&self, declaration: &mut Declaration) {
        declaration.return_type = self.resolve(&declaration.return_type);
        for param in &mut declaration.params {
            match param {
                Parameter::Scalar(scalar) => scalar.ty = self.resolve(&scalar.ty),
                Parameter::Callback(inner) => self.apply(inner),
            }
        }
        if let Some(callback) = declaration.callback.as_mut() {
            self.apply(callback);
        }
    }
}

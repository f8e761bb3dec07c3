//! Declaration metadata
//!
//! This module provides the structural model of one parsed C function
//! signature and the naming helpers used to derive Go identifiers from it.

use crate::ir::CType;
use serde::{Deserialize, Serialize};

/// Go keywords that cannot be used as identifiers
const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// A plain (non-callback) parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScalarParameter {
    /// Parameter name, with reserved names already rewritten
    pub name: String,
    /// Canonical type after alias resolution
    pub ty: CType,
    /// Type as written in the header
    pub original_ty: CType,
}

impl ScalarParameter {
    /// Create a new parameter; the type is also recorded as the original type
    pub fn new(name: impl Into<String>, ty: CType) -> Self {
        Self {
            name: escape_reserved(&name.into()),
            original_ty: ty.clone(),
            ty,
        }
    }

    /// C declaration text using the type as written in the header
    pub fn to_original_c(&self) -> String {
        format!("{} {}", self.original_ty, self.name)
    }
}

/// A formal parameter: either a plain value or a function pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parameter {
    /// Plain value parameter
    Scalar(ScalarParameter),
    /// Function-pointer parameter with its own signature
    Callback(Declaration),
}

impl Parameter {
    /// Parameter name
    pub fn name(&self) -> &str {
        match self {
            Parameter::Scalar(p) => &p.name,
            Parameter::Callback(d) => &d.name,
        }
    }

    /// The scalar parameter, if this is one
    pub fn as_scalar(&self) -> Option<&ScalarParameter> {
        match self {
            Parameter::Scalar(p) => Some(p),
            Parameter::Callback(_) => None,
        }
    }
}

/// Shape of the value a callback delivers, derived from its arity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultShape {
    /// Callback takes (handle, status): only the status is delivered
    Scalar,
    /// Callback takes (handle, status, payload...): a result struct is delivered
    Aggregate,
}

impl ResultShape {
    /// Derive the shape from the callback's parameter count
    ///
    /// Returns `None` for fewer than two parameters, which cannot carry
    /// both a handle and a status.
    pub fn from_arity(count: usize) -> Option<Self> {
        match count {
            0 | 1 => None,
            2 => Some(ResultShape::Scalar),
            _ => Some(ResultShape::Aggregate),
        }
    }
}

/// One parsed C function signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// C function name (for a callback, the function-pointer name)
    pub name: String,
    /// Return type
    pub return_type: CType,
    /// Leading parameters (excluding the trailing callback)
    pub params: Vec<Parameter>,
    /// Trailing completion callback
    pub callback: Option<Box<Declaration>>,
}

impl Declaration {
    /// Create a new declaration without parameters
    pub fn new(name: impl Into<String>, return_type: CType) -> Self {
        Self {
            name: name.into(),
            return_type,
            params: Vec::new(),
            callback: None,
        }
    }

    /// Add a scalar parameter
    pub fn param(mut self, name: impl Into<String>, ty: CType) -> Self {
        self.params.push(Parameter::Scalar(ScalarParameter::new(name, ty)));
        self
    }

    /// Set parameters
    pub fn with_params(mut self, params: Vec<Parameter>) -> Self {
        self.params = params;
        self
    }

    /// Set the completion callback
    pub fn with_callback(mut self, callback: Declaration) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Result shape of the completion callback, if there is a valid one
    pub fn result_shape(&self) -> Option<ResultShape> {
        self.callback
            .as_ref()
            .and_then(|cb| ResultShape::from_arity(cb.params.len()))
    }

    /// Scalar parameters only
    pub fn scalar_params(&self) -> impl Iterator<Item = &ScalarParameter> {
        self.params.iter().filter_map(Parameter::as_scalar)
    }

    /// C signature text using the types as written in the header
    pub fn to_original_c(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match p {
                Parameter::Scalar(s) => s.to_original_c(),
                Parameter::Callback(d) => d.to_original_c(),
            })
            .collect();
        if self.callback.is_none() && self.return_type.is_void() {
            // function-pointer form
            format!("void (*{})({})", self.name, params.join(", "))
        } else {
            format!("{}({})", self.name, params.join(", "))
        }
    }
}

// Helper functions

/// Convert snake_case to camelCase
pub fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = !result.is_empty();
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Convert a C function name to its Go wrapper name (`indy_open_wallet` -> `openWallet`)
pub fn wrapper_name(c_name: &str, strip_prefix: Option<&str>) -> String {
    let name = strip_prefix
        .and_then(|prefix| c_name.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(c_name);
    escape_reserved(&to_camel_case(name))
}

/// Rewrite identifiers that collide with Go keywords by appending `_`
///
/// Idempotent: a rewritten name is never a keyword.
pub fn escape_reserved(name: &str) -> String {
    if GO_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

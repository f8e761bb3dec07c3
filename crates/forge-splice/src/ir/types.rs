//! Type system for forge-splice
//!
//! This module provides the two type representations the generator works
//! with: [`CType`], the canonical native type read from a header, and
//! [`TargetType`], the Go representation it maps to.
//!
//! # Type Mapping Overview
//!
//! | C Type | Target | Go Type | Notes |
//! |--------|--------|---------|-------|
//! | `int8_t` … `int64_t` | `int8` … `int64` | `int8` … `int64` | Fixed width |
//! | `uint8_t` … `uint64_t` | `uint8` … `uint64` | `uint8` … `uint64` | Fixed width |
//! | `bool` | `bool` | `bool` | Needs `<stdbool.h>` |
//! | `void*` | `opaque` | `unsafe.Pointer` | Passed through untouched |
//! | `char*`, `const char*` | `text` | `string` | Copied with `C.CString` / `C.GoString` |
//! | `char**` | `optional_text` | `*string` | `nil` when the native pointer is NULL |
//! | `uint8_t*` + length | `bytes` | `[]byte` | Buffer and length collapse into one value |
//!
//! The table itself lives in [`crate::mapping::TypeTable`]; these types only
//! know how to render themselves.
//!
//! # Canonical Form
//!
//! A [`CType`] is a base identifier plus a pointer depth. `const` is only
//! kept when it qualifies a pointer, so `const int32_t` and `int32_t` are the
//! same canonical type while `const char*` and `char*` are not:
//!
//! ```rust
//! use forge_splice::CType;
//!
//! let ty = CType::parse("const char *");
//! assert_eq!(ty.qualified_key(), "const char*");
//! assert_eq!(ty.base_key(), "char*");
//! assert_eq!(CType::parse("const int32_t").qualified_key(), "int32_t");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical native type: base identifier, pointer depth and pointer const-ness
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CType {
    /// Base identifier (e.g. `char`, `int32_t`, `indy_handle_t`)
    pub base: String,
    /// Number of pointer markers
    pub pointer_depth: u8,
    /// Whether the pointed-to data is const (never set on non-pointers)
    pub is_const: bool,
}

impl CType {
    /// Create a non-pointer type
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            pointer_depth: 0,
            is_const: false,
        }
    }

    /// Create a pointer type with the given depth
    pub fn pointer(base: impl Into<String>, depth: u8) -> Self {
        Self {
            base: base.into(),
            pointer_depth: depth,
            is_const: false,
        }
    }

    /// Mark the type const; a no-op on non-pointer types
    pub fn with_const(mut self) -> Self {
        self.is_const = self.pointer_depth > 0;
        self
    }

    /// Parse a type string such as `int32_t`, `char *`, `const char*` or `char const **`
    ///
    /// The last identifier that is not `const` is the base; any other
    /// qualifiers are discarded.
    pub fn parse(s: &str) -> Self {
        let words: Vec<&str> = s
            .split(|c: char| c.is_whitespace() || c == '*')
            .filter(|w| !w.is_empty())
            .collect();
        let is_const = words.iter().any(|w| *w == "const");
        let base = words
            .iter()
            .rev()
            .find(|w| **w != "const")
            .copied()
            .unwrap_or_default();
        let depth = s.matches('*').count().min(u8::MAX as usize) as u8;

        let ty = Self::pointer(base, depth);
        if is_const {
            ty.with_const()
        } else {
            ty
        }
    }

    /// Check if this is a pointer type
    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// Check if this is plain `void`
    pub fn is_void(&self) -> bool {
        self.base == "void" && self.pointer_depth == 0
    }

    /// Replace the base with another canonical type, keeping this type's
    /// pointer markers and const-ness on top of it
    pub fn substitute(&self, replacement: &CType) -> CType {
        CType {
            base: replacement.base.clone(),
            pointer_depth: replacement.pointer_depth.saturating_add(self.pointer_depth),
            is_const: self.is_const || replacement.is_const,
        }
    }

    /// Type-table key without qualifiers (`char*`)
    pub fn base_key(&self) -> String {
        format!("{}{}", self.base, "*".repeat(self.pointer_depth as usize))
    }

    /// Type-table key with qualifiers (`const char*`)
    pub fn qualified_key(&self) -> String {
        if self.is_const {
            format!("const {}", self.base_key())
        } else {
            self.base_key()
        }
    }

    /// Render as C source text
    pub fn to_c(&self) -> String {
        self.qualified_key()
    }

    /// Render as the cgo type Go sees (`*C.char`, `C.int32_t`, `unsafe.Pointer`)
    pub fn to_cgo(&self) -> String {
        if self.base == "void" && self.pointer_depth == 1 {
            return "unsafe.Pointer".to_string();
        }
        format!(
            "{}C.{}",
            "*".repeat(self.pointer_depth as usize),
            self.base
        )
    }

    /// The cgo conversion for the base type (`C.int32_t`), used on scalars
    pub fn cgo_base(&self) -> String {
        format!("C.{}", self.base)
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_c())
    }
}

/// Target (Go) representation of a native value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    // Signed integers
    Int8,
    Int16,
    Int32,
    Int64,
    // Unsigned integers
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    // Other scalars
    Bool,
    /// Opaque native pointer
    Opaque,
    /// Owned text copied out of / into a C string
    Text,
    /// Nullable text behind a `char**`
    OptionalText,
    /// Sized binary data from a buffer + length pair
    Bytes,
}

impl TargetType {
    /// Convert to Go type string
    pub fn to_go(&self) -> &'static str {
        match self {
            TargetType::Int8 => "int8",
            TargetType::Int16 => "int16",
            TargetType::Int32 => "int32",
            TargetType::Int64 => "int64",
            TargetType::Uint8 => "uint8",
            TargetType::Uint16 => "uint16",
            TargetType::Uint32 => "uint32",
            TargetType::Uint64 => "uint64",
            TargetType::Bool => "bool",
            TargetType::Opaque => "unsafe.Pointer",
            TargetType::Text => "string",
            TargetType::OptionalText => "*string",
            TargetType::Bytes => "[]byte",
        }
    }

    /// Go zero value, returned on every error path
    pub fn zero_value(&self) -> &'static str {
        match self {
            TargetType::Bool => "false",
            TargetType::Text => "\"\"",
            TargetType::Opaque | TargetType::OptionalText | TargetType::Bytes => "nil",
            _ => "0",
        }
    }

    /// Check if this is a signed or unsigned integer
    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Check if this is a signed integer
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            TargetType::Int8 | TargetType::Int16 | TargetType::Int32 | TargetType::Int64
        )
    }

    /// Check if this is an unsigned integer (valid as a buffer length)
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            TargetType::Uint8 | TargetType::Uint16 | TargetType::Uint32 | TargetType::Uint64
        )
    }

    /// Check if marshaling this value allocates a C buffer that must be freed
    pub fn owns_native_buffer(&self) -> bool {
        matches!(
            self,
            TargetType::Text | TargetType::OptionalText | TargetType::Bytes
        )
    }

    /// Check if the Go side of this value needs the `unsafe` package
    pub fn needs_unsafe(&self) -> bool {
        matches!(self, TargetType::Opaque) || self.owns_native_buffer()
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_go())
    }
}

//! Forge-Splice: binding generator for callback-based C APIs
//!
//! This crate reads C declarations that complete asynchronously through a
//! trailing callback (`extern ret name(params..., void (*cb)(handle, status, ...))`)
//! and emits, per header, a native C unit of trampolines and a Go unit of
//! blocking wrappers that correlate each call with its callback through a
//! call registry.
//!
//! # Architecture
//!
//! - `header`: Declaration parsing and typedef alias resolution
//! - `mapping`: Closed C to Go type table
//! - `ir`: Intermediate representation for declarations, types and artifacts
//! - `codegen`: Binding emitter and the C and Go renderers
//! - `build`: Batch entry point
//!
//! # Usage
//!
//! ```rust,ignore
//! use forge_splice::{SpliceBuilder, SpliceConfig};
//!
//! let config = SpliceConfig::from_toml_str(&std::fs::read_to_string("splice.toml")?)?;
//! let domains = SpliceBuilder::new(config)
//!     .types_source(std::fs::read_to_string("include/indy_types.h")?)
//!     .header("indy_wallet.h", std::fs::read_to_string("include/indy_wallet.h")?)
//!     .generate()?;
//!
//! for domain in &domains {
//!     println!("{}", domain.go_source);
//! }
//! ```

pub mod build;
pub mod codegen;
pub mod config;
pub mod error;
pub mod header;
pub mod ir;
pub mod mapping;

// Re-export commonly used types
pub use build::{GeneratedDomain, SpliceBuilder};
pub use codegen::{BindingEmitter, GoGenerator, NativeGenerator};
pub use config::SpliceConfig;
pub use error::{SpliceError, SpliceResult};
pub use header::{parse_declarations, AliasTable};
pub use ir::{
    Binding, BindingModule, CType, CallState, Declaration, ModuleValidationError, Parameter,
    ResultShape, ScalarParameter, TargetType,
};
pub use mapping::TypeTable;

//! Code generation for forge-splice
//!
//! This module provides:
//! - The binding emitter (declarations -> artifact trees)
//! - The native C unit generator (trampolines)
//! - The Go unit generator (wrappers and callback handlers)

pub mod binding;
pub mod go;
pub mod native;

pub use binding::BindingEmitter;
pub use go::GoGenerator;
pub use native::NativeGenerator;

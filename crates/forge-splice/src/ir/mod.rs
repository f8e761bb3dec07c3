//! Intermediate Representation (IR) for forge-splice
//!
//! This module provides the parsed declaration model, the type
//! representations on both sides of the boundary, and the artifact trees
//! the renderers consume.

pub mod artifact;
pub mod declaration;
pub mod types;

pub use artifact::*;
pub use declaration::*;
pub use types::*;

//! Batch generation for forge-splice
//!
//! This module provides [`SpliceBuilder`], the entry point that takes one
//! optional types source and any number of header sources and returns the
//! generated units per header.

pub mod builder;

pub use builder::{GeneratedDomain, SpliceBuilder};

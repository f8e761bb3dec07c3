//! Header parsing for forge-splice
//!
//! This module turns raw C header text into [`Declaration`](crate::ir::Declaration)
//! trees and resolves typedef aliases inside them.

pub mod alias;
pub mod declaration;
pub mod param;
pub mod split;

pub use alias::AliasTable;
pub use declaration::{parse_declarations, parse_function_pointer};
pub use param::parse_scalar_parameter;
pub use split::{normalize_whitespace, split_parameters};

//! Parameter tokenization
//!
//! Turns one parameter fragment (`const char * name`) into a
//! [`ScalarParameter`] following the header grammar:
//!
//! - tokens made only of `*` attach to the previous token
//! - leading `*` on a token (`*name`) moves to the previous token
//! - `const` marks the pointed-to data const when a pointer marker follows
//!   it; a `const` after the last marker qualifies the pointer itself and
//!   is dropped, as is `const` on a value
//! - last token is the name, the one before it the base type, anything
//!   earlier (`unsigned`, `struct`, ...) is discarded

use crate::ir::{CType, ScalarParameter};

/// Tokenize a scalar parameter fragment
///
/// Returns a message describing the problem when the fragment does not
/// contain both a type and a name.
pub fn parse_scalar_parameter(fragment: &str) -> Result<ScalarParameter, String> {
    let mut parts: Vec<String> = Vec::new();
    let mut qualifier = ConstQualifier::default();

    for token in fragment.split_whitespace() {
        let rest = token.trim_start_matches('*');
        let leading = token.len() - rest.len();
        let trailing = rest.len() - rest.trim_end_matches('*').len();

        if leading > 0 {
            attach_pointers(&mut parts, leading, fragment)?;
            qualifier.pointer();
        }
        if rest.is_empty() {
            continue;
        }

        if rest.trim_end_matches('*') == "const" {
            qualifier.pending = true;
            if trailing > 0 {
                attach_pointers(&mut parts, trailing, fragment)?;
            }
        } else {
            parts.push(rest.to_string());
        }
        if trailing > 0 {
            qualifier.pointer();
        }
    }

    if parts.len() < 2 {
        return Err(format!("parameter `{}` needs a type and a name", fragment));
    }

    let name = &parts[parts.len() - 1];
    let base = &parts[parts.len() - 2];
    if name.contains('*') {
        return Err(format!("parameter `{}` has no name", fragment));
    }

    let mut ty = CType::parse(base);
    if qualifier.data {
        ty = ty.with_const();
    }

    Ok(ScalarParameter::new(name.clone(), ty))
}

/// Tracks whether a `const` qualifies the pointed-to data
#[derive(Default)]
struct ConstQualifier {
    /// `const` seen, no pointer marker since
    pending: bool,
    /// `const` followed by a pointer marker
    data: bool,
}

impl ConstQualifier {
    fn pointer(&mut self) {
        if self.pending {
            self.data = true;
            self.pending = false;
        }
    }
}

fn attach_pointers(parts: &mut [String], count: usize, fragment: &str) -> Result<(), String> {
    match parts.last_mut() {
        Some(last) => {
            last.push_str(&"*".repeat(count));
            Ok(())
        }
        None => Err(format!("pointer marker without a type in `{}`", fragment)),
    }
}

//! Whitespace normalization and depth-aware parameter splitting

/// Collapse every whitespace run (newlines, tabs, spaces) into one space
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a parameter list at top-level commas
///
/// Commas inside parentheses belong to a nested signature and never split:
///
/// ```rust
/// use forge_splice::header::split_parameters;
///
/// assert_eq!(split_parameters("a, f(b,c), d"), vec!["a", "f(b,c)", "d"]);
/// ```
pub fn split_parameters(params: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(normalize_whitespace(&params[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(normalize_whitespace(&params[start..]));

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("extern\tint32_t\n  foo(\n int32_t a)"),
            "extern int32_t foo( int32_t a)"
        );
    }

    #[test]
    fn test_nested_commas_do_not_split() {
        assert_eq!(split_parameters("a, f(b,c), d"), vec!["a", "f(b,c)", "d"]);
        assert_eq!(
            split_parameters("int32_t h, void (*cb)(int32_t x, int32_t err)"),
            vec!["int32_t h", "void (*cb)(int32_t x, int32_t err)"]
        );
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(split_parameters("const char* name"), vec!["const char* name"]);
        assert_eq!(split_parameters("   "), vec![""]);
    }
}

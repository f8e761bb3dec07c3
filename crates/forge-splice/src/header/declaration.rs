//! Async declaration parsing
//!
//! Extracts every `extern <ret> <name>(<params>, void (*<cb>)(<cb params>));`
//! declaration from a header. Declarations without a trailing callback are
//! not part of the generated surface and are skipped silently; once a
//! callback fragment has been located, failing to parse it is an error.

use crate::error::{SpliceError, SpliceResult};
use crate::header::param::parse_scalar_parameter;
use crate::header::split::{normalize_whitespace, split_parameters};
use crate::ir::{CType, Declaration, Parameter};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Callback-terminated extern declaration, on whitespace-normalized text
    static ref ASYNC_DECLARATION_REGEX: Regex = Regex::new(
        r"\bextern (?P<rtype>\w+) (?P<name>\w+) ?\((?:(?P<params>[^;]*?), ?)?(?P<callback>void ?\([^;()]*\) ?\((?:[^;()]|\([^;()]*\))*\)) ?\) ?;"
    ).unwrap();

    /// Function-pointer fragment: `<ret> (*<name>)(<params>)`
    static ref FUNCTION_POINTER_REGEX: Regex = Regex::new(
        r"^(?P<rtype>\w+) ?\( ?\* ?(?P<name>\w+) ?\) ?\((?P<params>.*)\)$"
    ).unwrap();
}

/// Parse all async declarations in a header, keyed by name in source order
///
/// A name declared twice keeps its first position and the last definition.
pub fn parse_declarations(header: &str) -> SpliceResult<IndexMap<String, Declaration>> {
    let content = normalize_whitespace(header);
    let mut declarations = IndexMap::new();

    for captures in ASYNC_DECLARATION_REGEX.captures_iter(&content) {
        let name = &captures["name"];
        let return_type = CType::parse(&captures["rtype"]);
        let params = match captures.name("params") {
            Some(params) => parse_parameter_list(name, params.as_str())?,
            None => Vec::new(),
        };

        let callback = parse_function_pointer(name, &captures["callback"])?;
        if callback.params.iter().any(|p| matches!(p, Parameter::Callback(_))) {
            return Err(SpliceError::decl_parse(
                name,
                format!("callback `{}` takes a callback of its own", callback.name),
            ));
        }

        let declaration = Declaration::new(name, return_type)
            .with_params(params)
            .with_callback(callback);

        tracing::debug!(
            "Parsed declaration {} ({} params, callback arity {})",
            name,
            declaration.params.len(),
            declaration.callback.as_ref().map_or(0, |cb| cb.params.len())
        );

        if declarations.insert(name.to_string(), declaration).is_some() {
            tracing::warn!("Declaration {} appears more than once, keeping the last", name);
        }
    }

    Ok(declarations)
}

/// Parse a function-pointer fragment such as `void (*cb)(int32_t h, int32_t err)`
///
/// `owner` is the enclosing declaration, used to attribute errors.
pub fn parse_function_pointer(owner: &str, fragment: &str) -> SpliceResult<Declaration> {
    let fragment = normalize_whitespace(fragment);
    let captures = FUNCTION_POINTER_REGEX.captures(&fragment).ok_or_else(|| {
        SpliceError::decl_parse(
            owner,
            format!("`{}` is not a function pointer declaration", fragment),
        )
    })?;

    let params = parse_parameter_list(owner, &captures["params"])?;
    Ok(Declaration::new(&captures["name"], CType::parse(&captures["rtype"])).with_params(params))
}

fn parse_parameter_list(owner: &str, params: &str) -> SpliceResult<Vec<Parameter>> {
    let trimmed = params.trim();
    if trimmed.is_empty() || trimmed == "void" {
        return Ok(Vec::new());
    }

    split_parameters(trimmed)
        .iter()
        .map(|fragment| {
            if fragment.contains('(') || fragment.contains(')') {
                parse_function_pointer(owner, fragment).map(Parameter::Callback)
            } else {
                parse_scalar_parameter(fragment)
                    .map(Parameter::Scalar)
                    .map_err(|message| SpliceError::decl_parse(owner, message))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WALLET_HEADER: &str = r#"
#ifndef __indy__wallet__included__
#define __indy__wallet__included__

#include "indy_mod.h"
#include "indy_types.h"

#ifdef __cplusplus
extern "C" {
#endif

    /// Opens the wallet.
    extern indy_error_t indy_open_wallet(indy_handle_t  command_handle,
                                         const char*    config,
                                         const char*    credentials,

                                         void           (*cb)(indy_handle_t command_handle_,
                                                              indy_error_t  err,
                                                              indy_handle_t handle)
                                        );

    extern indy_error_t indy_close_wallet(indy_handle_t  command_handle,
                                          indy_handle_t  wallet_handle,
                                          void           (*cb)(indy_handle_t command_handle_,
                                                               indy_error_t  err)
                                         );

    extern indy_error_t indy_set_runtime_config(const char* config);

#ifdef __cplusplus
}
#endif

#endif
"#;

    #[test]
    fn test_parses_only_callback_declarations() {
        let decls = parse_declarations(WALLET_HEADER).expect("header parses");
        let names: Vec<&str> = decls.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["indy_open_wallet", "indy_close_wallet"]);
    }

    #[test]
    fn test_declaration_structure() {
        let decls = parse_declarations(WALLET_HEADER).expect("header parses");
        let open = &decls["indy_open_wallet"];

        assert_eq!(open.return_type, CType::new("indy_error_t"));
        let params: Vec<&str> = open.params.iter().map(Parameter::name).collect();
        assert_eq!(params, vec!["command_handle", "config", "credentials"]);

        let callback = open.callback.as_ref().expect("callback");
        assert_eq!(callback.name, "cb");
        assert!(callback.return_type.is_void());
        let cb_params: Vec<&str> = callback.params.iter().map(Parameter::name).collect();
        assert_eq!(cb_params, vec!["command_handle_", "err", "handle"]);
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let first = parse_declarations(WALLET_HEADER).expect("header parses");
        let second = parse_declarations(WALLET_HEADER).expect("header parses");
        assert_eq!(first, second);
    }

    #[test]
    fn test_last_declaration_wins() {
        let header = "
            extern int32_t ping(int32_t h, void (*cb)(int32_t h, int32_t err));
            extern int32_t other(int32_t h, void (*cb)(int32_t h, int32_t err));
            extern int32_t ping(int32_t h, const char* msg, void (*cb)(int32_t h, int32_t err));
        ";
        let decls = parse_declarations(header).expect("header parses");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls.get_index(0).map(|(k, _)| k.as_str()), Some("ping"));
        assert_eq!(decls["ping"].params.len(), 2);
    }

    #[test]
    fn test_callback_only_declaration() {
        let header = "extern int32_t poll_events(void (*cb)(int32_t h, int32_t err));";
        let decls = parse_declarations(header).expect("header parses");
        assert!(decls["poll_events"].params.is_empty());
    }

    #[test]
    fn test_parameter_position_callback() {
        let header = "extern int32_t subscribe(int32_t h, void (*on_event)(int32_t h, const char* event), \
                      void (*cb)(int32_t h, int32_t err));";
        let decls = parse_declarations(header).expect("header parses");
        let decl = &decls["subscribe"];

        assert_eq!(decl.params.len(), 2);
        match &decl.params[1] {
            Parameter::Callback(inner) => {
                assert_eq!(inner.name, "on_event");
                assert_eq!(inner.params.len(), 2);
            }
            other => panic!("expected callback parameter, got {:?}", other),
        }
        assert_eq!(decl.callback.as_ref().map(|cb| cb.name.as_str()), Some("cb"));
    }

    #[test]
    fn test_malformed_callback_is_an_error() {
        // callback located but missing the `*`
        let header = "extern int32_t broken(int32_t h, void (cb)(int32_t h, int32_t err));";
        let err = parse_declarations(header).unwrap_err();
        assert_eq!(err.declaration(), Some("broken"));

        // callback parameter without a name
        let header = "extern int32_t broken(int32_t h, void (*cb)(int32_t, int32_t err));";
        assert!(parse_declarations(header).is_err());
    }

    #[test]
    fn test_nested_callback_depth_is_bounded() {
        let header = "extern int32_t deep(int32_t h, void (*cb)(int32_t h, void (*inner)(int32_t x)));";
        let err = parse_declarations(header).unwrap_err();
        assert!(err.to_string().contains("deep"));
    }
}

//! Generator configuration, usually read from a `splice.toml`
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! go_package = "indy"
//! registry_import = "github.com/example/indy/internal/callreg"
//! cgo_ldflags = "-lindy"
//!
//! [types]
//! "const char*" = "text"
//! "indy_bool_t" = "bool"
//! ```

use crate::error::SpliceResult;
use crate::ir::{RegistryContract, TargetType};
use crate::mapping::TypeTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpliceConfig {
    /// Go package clause of the emitted units
    pub go_package: String,
    /// Import path of the call registry package
    pub registry_import: String,
    /// Qualifier the emitted code uses for the registry package
    pub registry_package: String,
    /// Prefix stripped from C names before camel-casing
    pub strip_prefix: Option<String>,
    /// Value of the `#cgo LDFLAGS` directive, omitted when unset
    pub cgo_ldflags: Option<String>,
    /// Error-code alias seeded into every alias table
    pub error_code_alias: String,
    /// Underlying type of the error-code alias
    pub error_code_type: String,
    /// Leading parameter that carries the correlation handle
    pub correlation_param: Option<String>,
    /// Resolve alias chains to a fixed point instead of one level
    pub transitive_aliases: bool,
    /// Retire the registered handle when the native call is rejected
    pub deregister_on_dispatch_failure: bool,
    /// Type table additions and overrides, keyed by C type
    pub types: BTreeMap<String, TargetType>,
}

impl Default for SpliceConfig {
    fn default() -> Self {
        Self {
            go_package: "indy".to_string(),
            registry_import: "indy/internal/callreg".to_string(),
            registry_package: "callreg".to_string(),
            strip_prefix: Some("indy_".to_string()),
            cgo_ldflags: None,
            error_code_alias: "indy_error_t".to_string(),
            error_code_type: "int32_t".to_string(),
            correlation_param: Some("command_handle".to_string()),
            transitive_aliases: false,
            deregister_on_dispatch_failure: true,
            types: BTreeMap::new(),
        }
    }
}

impl SpliceConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> SpliceResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Default type table with the configured overrides applied
    pub fn type_table(&self) -> TypeTable {
        TypeTable::new().with_entries(&self.types)
    }

    /// Registry contract for the emitted Go code
    pub fn registry(&self) -> RegistryContract {
        RegistryContract {
            import: self.registry_import.clone(),
            package: self.registry_package.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::CType;

    #[test]
    fn test_empty_document_is_default() {
        let config = SpliceConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, SpliceConfig::default());
        assert!(config.deregister_on_dispatch_failure);
        assert!(!config.transitive_aliases);
    }

    #[test]
    fn test_overrides() {
        let config = SpliceConfig::from_toml_str(
            r#"
            go_package = "wallet"
            strip_prefix = "vdr_"
            transitive_aliases = true

            [types]
            "const char *" = "bytes"
            "indy_bool_t" = "bool"
            "#,
        )
        .expect("config parses");

        assert_eq!(config.go_package, "wallet");
        assert_eq!(config.strip_prefix.as_deref(), Some("vdr_"));
        assert_eq!(config.registry_package, "callreg");

        let table = config.type_table();
        assert_eq!(
            table.lookup(&CType::pointer("char", 1).with_const()),
            Some(TargetType::Bytes)
        );
        assert_eq!(table.lookup(&CType::pointer("char", 1)), Some(TargetType::Text));
        assert_eq!(table.lookup(&CType::new("indy_bool_t")), Some(TargetType::Bool));
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        assert!(SpliceConfig::from_toml_str("go_package = 3").is_err());
        assert!(SpliceConfig::from_toml_str("[types]\n\"char*\" = \"float\"").is_err());
    }
}

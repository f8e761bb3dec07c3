//! SpliceBuilder for batch generation
//!
//! This module provides a high-level API that runs every stage (parse,
//! resolve aliases, emit, render) for a set of headers.

use crate::codegen::{BindingEmitter, GoGenerator, NativeGenerator};
use crate::config::SpliceConfig;
use crate::error::SpliceResult;
use crate::header::{parse_declarations, AliasTable};
use crate::ir::{BindingModule, Declaration};
use indexmap::IndexMap;

/// Builder for one generation run
///
/// Headers are processed in the order they were added. The first error
/// aborts the run and no partial output is returned.
///
/// # Example
/// ```
/// use forge_splice::build::SpliceBuilder;
/// use forge_splice::SpliceConfig;
///
/// let domains = SpliceBuilder::new(SpliceConfig::default())
///     .types_source("typedef int32_t indy_handle_t;")
///     .header(
///         "wallet.h",
///         "extern indy_error_t indy_close_wallet(indy_handle_t command_handle, \
///          indy_handle_t wallet_handle, \
///          void (*cb)(indy_handle_t command_handle_, indy_error_t err));",
///     )
///     .generate()
///     .expect("Failed to generate bindings");
///
/// assert!(domains[0].go_source.contains("func closeWallet(walletHandle int32) error {"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpliceBuilder {
    config: SpliceConfig,
    types_source: Option<String>,
    headers: Vec<(String, String)>,
}

impl SpliceBuilder {
    /// Create a new builder
    pub fn new(config: SpliceConfig) -> Self {
        Self {
            config,
            types_source: None,
            headers: Vec::new(),
        }
    }

    /// Set the source holding the shared typedefs
    pub fn types_source(mut self, source: impl Into<String>) -> Self {
        self.types_source = Some(source.into());
        self
    }

    /// Add a header; `domain` names it in generated output and errors
    pub fn header(mut self, domain: impl Into<String>, source: impl Into<String>) -> Self {
        self.headers.push((domain.into(), source.into()));
        self
    }

    /// Alias table built from the types source and the configured seed
    pub fn alias_table(&self) -> AliasTable {
        AliasTable::from_source(
            self.types_source.as_deref(),
            &self.config.error_code_alias,
            &self.config.error_code_type,
        )
        .transitive(self.config.transitive_aliases)
    }

    /// Run every stage for every header
    pub fn generate(&self) -> SpliceResult<Vec<GeneratedDomain>> {
        let aliases = self.alias_table();
        let types = self.config.type_table();
        let emitter = BindingEmitter::new(&self.config, &types);

        let mut domains = Vec::with_capacity(self.headers.len());
        for (domain, source) in &self.headers {
            let mut declarations = parse_declarations(source)?;
            for declaration in declarations.values_mut() {
                aliases.apply(declaration);
            }

            let module = emitter.emit_module(domain, declarations.values())?;
            let native_source = NativeGenerator::new(&module).generate();
            let go_source = GoGenerator::new(&module).generate();

            tracing::info!(
                "Generated {} bindings for {}",
                module.bindings.len(),
                domain
            );

            domains.push(GeneratedDomain {
                domain: domain.clone(),
                declarations,
                module,
                native_source,
                go_source,
            });
        }

        Ok(domains)
    }
}

/// Output of one header
#[derive(Debug, Clone)]
pub struct GeneratedDomain {
    /// Domain name the header was added under
    pub domain: String,
    /// Resolved declarations, in source order
    pub declarations: IndexMap<String, Declaration>,
    /// Artifact trees the units were rendered from
    pub module: BindingModule,
    /// Native C unit
    pub native_source: String,
    /// Go unit
    pub go_source: String,
}

impl GeneratedDomain {
    /// Resolved declarations as pretty-printed JSON
    pub fn declarations_json(&self) -> SpliceResult<String> {
        Ok(serde_json::to_string_pretty(&self.declarations)?)
    }
}

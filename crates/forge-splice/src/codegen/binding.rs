//! Binding emitter
//!
//! Turns resolved declarations into [`Binding`] artifact trees. All protocol
//! decisions (result shape, correlation, buffer pairing, naming) are made
//! here; the renderers only lay out text.

use crate::codegen::go::GENERATED_LOCALS;
use crate::config::SpliceConfig;
use crate::error::{SpliceError, SpliceResult};
use crate::ir::{
    escape_reserved, to_camel_case, wrapper_name, Binding, BindingModule, BoundValue,
    CallbackExtern, CallbackHandler, Declaration, Delivery, NativeParam, Parameter,
    ResultAggregate, ResultField, ResultShape, TargetType, Trampoline, Wrapper, WrapperParam,
};
use crate::mapping::TypeTable;
use std::collections::HashSet;

/// Builds artifact trees from resolved declarations
pub struct BindingEmitter<'a> {
    config: &'a SpliceConfig,
    types: &'a TypeTable,
}

impl<'a> BindingEmitter<'a> {
    /// Create a new emitter
    pub fn new(config: &'a SpliceConfig, types: &'a TypeTable) -> Self {
        Self { config, types }
    }

    /// Emit the bindings of one domain, in declaration order
    pub fn emit_module<'d>(
        &self,
        domain: &str,
        declarations: impl IntoIterator<Item = &'d Declaration>,
    ) -> SpliceResult<BindingModule> {
        let mut module =
            BindingModule::new(domain, self.config.go_package.clone(), self.config.registry())
                .with_ldflags(self.config.cgo_ldflags.clone());

        for declaration in declarations {
            module = module.binding(self.emit(declaration)?);
        }

        module.validate().map_err(|source| SpliceError::Validation {
            domain: domain.to_string(),
            source,
        })?;
        Ok(module)
    }

    /// Emit the binding of one declaration
    pub fn emit(&self, declaration: &Declaration) -> SpliceResult<Binding> {
        let owner = declaration.name.as_str();
        let callback = declaration.callback.as_deref().ok_or_else(|| {
            SpliceError::decl_parse(owner, "declaration has no completion callback")
        })?;
        let arity_error = || {
            SpliceError::decl_parse(
                owner,
                format!(
                    "callback `{}` needs a handle and a status parameter",
                    callback.name
                ),
            )
        };
        let shape = ResultShape::from_arity(callback.params.len()).ok_or_else(arity_error)?;

        self.types.map_integer(owner, &declaration.return_type)?;

        let inputs = self.bind_values(owner, &declaration.params)?;
        let mut outputs = self.bind_values(owner, &callback.params)?.into_iter();
        let (handle, status) = match (outputs.next(), outputs.next()) {
            (Some(handle), Some(status)) => (handle, status),
            _ => return Err(arity_error()),
        };
        for value in [&handle, &status] {
            if !value.target.is_integer() {
                return Err(SpliceError::type_mapping(owner, &value.native.ty));
            }
        }
        let mut taken: HashSet<String> =
            callback.scalar_params().map(|p| p.name.clone()).collect();
        let payload: Vec<BoundValue> = outputs
            .map(|value| match value.target {
                TargetType::OptionalText => {
                    let local = unique_local(format!("{}Text", value.name), &mut taken);
                    value.with_local(local)
                }
                _ => value,
            })
            .collect();

        let go_name = wrapper_name(owner, self.config.strip_prefix.as_deref());
        let handler_name = format!("{}Callback", go_name);

        let returns: Vec<ResultField> = payload
            .iter()
            .map(|value| ResultField::new(&value.name, value.target))
            .collect();
        let status_field = status_field_name(&returns);

        let result = match shape {
            ResultShape::Scalar => None,
            ResultShape::Aggregate => Some(ResultAggregate {
                name: format!("{}Result", go_name),
                status: ResultField::new(&status_field, status.target),
                payload: returns.clone(),
            }),
        };
        let delivery = match &result {
            Some(aggregate) => Delivery::Aggregate {
                result: aggregate.name.clone(),
                status_field: aggregate.status.name.clone(),
            },
            None => Delivery::Status,
        };

        let callback_params = native_params(callback);
        let trampoline = Trampoline {
            name: format!("{}_trampoline", owner),
            target: owner.to_string(),
            return_type: declaration.return_type.clone(),
            params: native_params(declaration),
            callback_params: callback_params.iter().map(|p| p.ty.clone()).collect(),
            callback: handler_name.clone(),
        };

        let wrapper = Wrapper {
            doc: format!(
                "{} calls {} and blocks until its callback delivers the result.",
                go_name, owner
            ),
            name: go_name,
            operation: owner.to_string(),
            params: self.wrapper_params(inputs),
            trampoline: trampoline.name.clone(),
            shape,
            returns,
            result_type: result.as_ref().map(|r| r.name.clone()),
            status_target: status.target,
            status_field,
            deregister_on_dispatch_failure: self.config.deregister_on_dispatch_failure,
        };

        tracing::debug!(
            "Emitting {} -> {} ({:?}, {} payload values)",
            owner,
            wrapper.name,
            shape,
            wrapper.returns.len()
        );
        if wrapper.correlation().is_none() {
            tracing::warn!(
                "{} has no leading `{}` parameter; the registry handle never reaches the native side and its callback cannot be correlated",
                owner,
                self.config.correlation_param.as_deref().unwrap_or("<unset>")
            );
        }

        Ok(Binding {
            declaration: owner.to_string(),
            shape,
            trampoline,
            callback_extern: CallbackExtern {
                name: handler_name.clone(),
                params: callback_params.clone(),
            },
            handler: CallbackHandler {
                name: handler_name,
                operation: owner.to_string(),
                params: callback_params,
                handle,
                status,
                payload,
                delivery,
            },
            wrapper,
            result,
        })
    }

    /// Map parameters to Go values, collapsing each buffer with the length
    /// parameter that follows it
    fn bind_values(&self, owner: &str, params: &[Parameter]) -> SpliceResult<Vec<BoundValue>> {
        let mut values = Vec::new();
        let mut iter = params.iter().peekable();

        while let Some(param) = iter.next() {
            let scalar = match param {
                Parameter::Scalar(scalar) => scalar,
                Parameter::Callback(inner) => {
                    return Err(SpliceError::type_mapping(owner, inner.to_original_c()))
                }
            };

            let target = self.types.map(owner, &scalar.ty)?;
            let native = NativeParam::new(&scalar.name, scalar.ty.clone());
            let mut value = BoundValue::new(go_identifier(&scalar.name), target, native);

            if target == TargetType::Bytes {
                let length = iter
                    .next_if(|next| self.is_length(next))
                    .and_then(Parameter::as_scalar)
                    .ok_or_else(|| SpliceError::type_mapping(owner, &scalar.ty))?;
                value = value.with_length(NativeParam::new(&length.name, length.ty.clone()));
            }

            values.push(value);
        }

        Ok(values)
    }

    fn is_length(&self, param: &Parameter) -> bool {
        param
            .as_scalar()
            .and_then(|scalar| self.types.lookup(&scalar.ty))
            .is_some_and(|target| target.is_unsigned())
    }

    fn wrapper_params(&self, inputs: Vec<BoundValue>) -> Vec<WrapperParam> {
        let correlation = self.config.correlation_param.as_deref();
        let mut taken: HashSet<String> = inputs.iter().map(|v| v.name.clone()).collect();
        inputs
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let is_correlation = index == 0
                    && value.target.is_integer()
                    && correlation == Some(value.native.name.as_str());
                let value = match value.target {
                    TargetType::Text | TargetType::OptionalText | TargetType::Bytes => {
                        let local = unique_local(native_copy(&value.name), &mut taken);
                        value.with_local(local)
                    }
                    _ => value,
                };
                if is_correlation {
                    WrapperParam::Correlation(value)
                } else {
                    WrapperParam::Public(value)
                }
            })
            .collect()
    }
}

/// Go identifier for a native parameter name
fn go_identifier(name: &str) -> String {
    let mut ident = escape_reserved(&to_camel_case(name));
    while GENERATED_LOCALS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Name of the native copy of a wrapper input (`name` -> `cName`)
fn native_copy(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("c{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "c".to_string(),
    }
}

/// `candidate`, suffixed until it is neither taken nor a generated local
fn unique_local(candidate: String, taken: &mut HashSet<String>) -> String {
    let mut name = candidate;
    while taken.contains(&name) || GENERATED_LOCALS.contains(&name.as_str()) {
        name.push('_');
    }
    taken.insert(name.clone());
    name
}

/// Native parameters of a signature, buffer pairs kept apart
fn native_params(declaration: &Declaration) -> Vec<NativeParam> {
    declaration
        .scalar_params()
        .map(|p| NativeParam::new(&p.name, p.ty.clone()))
        .collect()
}

/// `status`, suffixed until it does not collide with a payload field
fn status_field_name(payload: &[ResultField]) -> String {
    let mut name = "status".to_string();
    while payload.iter().any(|field| field.name == name) {
        name.push('_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CType, WrapperStep};
    use pretty_assertions::assert_eq;

    fn int32() -> CType {
        CType::new("int32_t")
    }

    fn text() -> CType {
        CType::pointer("char", 1).with_const()
    }

    fn emit(config: &SpliceConfig, declaration: &Declaration) -> SpliceResult<Binding> {
        let types = config.type_table();
        BindingEmitter::new(config, &types).emit(declaration)
    }

    fn do_thing() -> Declaration {
        Declaration::new("do_thing", int32())
            .param("handle", int32())
            .param("name", text())
            .with_callback(
                Declaration::new("cb", CType::new("void"))
                    .param("xhandle", int32())
                    .param("err", int32())
                    .param("out", text()),
            )
    }

    #[test]
    fn test_aggregate_binding() {
        let binding = emit(&SpliceConfig::default(), &do_thing()).expect("binding");
        assert_eq!(binding.shape, ResultShape::Aggregate);
        assert_eq!(binding.wrapper.name, "doThing");
        assert_eq!(binding.handler.name, "doThingCallback");
        assert_eq!(binding.trampoline.name, "do_thing_trampoline");

        let public: Vec<String> = binding
            .wrapper
            .public_params()
            .map(BoundValue::to_go_param)
            .collect();
        assert_eq!(public, vec!["handle int32", "name string"]);

        let result = binding.result.expect("aggregate");
        assert_eq!(result.name, "doThingResult");
        let fields: Vec<&str> = result.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["status", "out"]);
        assert_eq!(
            binding.wrapper.returns,
            vec![ResultField::new("out", TargetType::Text)]
        );
    }

    #[test]
    fn test_scalar_binding() {
        let declaration = Declaration::new("indy_close_wallet", int32())
            .param("command_handle", int32())
            .param("wallet_handle", int32())
            .with_callback(
                Declaration::new("cb", CType::new("void"))
                    .param("command_handle_", int32())
                    .param("err", int32()),
            );
        let binding = emit(&SpliceConfig::default(), &declaration).expect("binding");

        assert_eq!(binding.shape, ResultShape::Scalar);
        assert!(binding.result.is_none());
        assert!(binding.wrapper.returns.is_empty());
        assert_eq!(binding.handler.delivery, Delivery::Status);

        // correlation parameter is filled from the registry
        assert!(!binding.wrapper.params[0].is_public());
        let public: Vec<&str> = binding
            .wrapper
            .public_params()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(public, vec!["walletHandle"]);
        assert_eq!(binding.wrapper.name, "closeWallet");
        assert_eq!(
            binding.wrapper.correlation().map(|v| v.native.name.as_str()),
            Some("command_handle")
        );
        assert!(!binding.wrapper.steps().contains(&WrapperStep::Marshal));
    }

    #[test]
    fn test_wrapper_without_correlation_is_flagged() {
        let config = SpliceConfig::default();
        let types = config.type_table();
        let module = BindingEmitter::new(&config, &types)
            .emit_module("thing.h", [&do_thing()])
            .expect("module");

        // `handle` stays public, so the registry handle is never passed on
        assert!(module.bindings[0].wrapper.correlation().is_none());
        let flagged: Vec<&str> = module.uncorrelated().map(|w| w.name.as_str()).collect();
        assert_eq!(flagged, vec!["doThing"]);
    }

    #[test]
    fn test_native_copies_do_not_shadow_params() {
        let declaration = Declaration::new("indy_rename", int32())
            .param("command_handle", int32())
            .param("name", text())
            .param("c_name", text())
            .param("call_ptr", int32())
            .with_callback(
                Declaration::new("cb", CType::new("void"))
                    .param("h", int32())
                    .param("err", int32()),
            );
        let binding = emit(&SpliceConfig::default(), &declaration).expect("binding");

        let values: Vec<(&str, Option<&str>)> = binding
            .wrapper
            .public_params()
            .map(|v| (v.name.as_str(), v.local.as_deref()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("name", Some("cName_")),
                ("cName", Some("cCName")),
                ("callPtr_", None),
            ]
        );
    }

    #[test]
    fn test_optional_text_payload_locals_are_unique() {
        let declaration = Declaration::new("indy_lookup", int32()).with_callback(
            Declaration::new("cb", CType::new("void"))
                .param("h", int32())
                .param("err", int32())
                .param("note", CType::pointer("char", 2))
                .param("noteText", text()),
        );
        let binding = emit(&SpliceConfig::default(), &declaration).expect("binding");
        assert_eq!(
            binding.handler.payload[0].local.as_deref(),
            Some("noteText_")
        );
        assert_eq!(binding.handler.payload[1].local, None);
    }

    #[test]
    fn test_buffer_pairs_collapse() {
        let declaration = Declaration::new("indy_sign", int32())
            .param("command_handle", int32())
            .param("message", CType::pointer("uint8_t", 1).with_const())
            .param("message_len", CType::new("uint32_t"))
            .with_callback(
                Declaration::new("cb", CType::new("void"))
                    .param("command_handle_", int32())
                    .param("err", int32())
                    .param("signature", CType::pointer("uint8_t", 1).with_const())
                    .param("signature_len", CType::new("uint32_t")),
            );
        let binding = emit(&SpliceConfig::default(), &declaration).expect("binding");

        let public: Vec<String> = binding
            .wrapper
            .public_params()
            .map(BoundValue::to_go_param)
            .collect();
        assert_eq!(public, vec!["message []byte"]);
        assert_eq!(binding.trampoline.params.len(), 3);
        assert_eq!(binding.handler.payload.len(), 1);
        assert_eq!(
            binding.handler.payload[0].length.as_ref().map(|l| l.name.as_str()),
            Some("signature_len")
        );
    }

    #[test]
    fn test_buffer_without_length_is_rejected() {
        let declaration = Declaration::new("indy_sign", int32())
            .param("message", CType::pointer("uint8_t", 1))
            .param("name", text())
            .with_callback(
                Declaration::new("cb", CType::new("void"))
                    .param("h", int32())
                    .param("err", int32()),
            );
        let err = emit(&SpliceConfig::default(), &declaration).unwrap_err();
        assert!(matches!(err, SpliceError::TypeMapping { .. }));
        assert_eq!(err.declaration(), Some("indy_sign"));
    }

    #[test]
    fn test_unmappable_declarations() {
        let config = SpliceConfig::default();

        // too few callback parameters
        let declaration = Declaration::new("f", int32())
            .with_callback(Declaration::new("cb", CType::new("void")).param("h", int32()));
        assert!(matches!(
            emit(&config, &declaration),
            Err(SpliceError::DeclParse { .. })
        ));

        // text status
        let declaration = Declaration::new("f", int32()).with_callback(
            Declaration::new("cb", CType::new("void"))
                .param("h", int32())
                .param("err", text()),
        );
        assert!(matches!(
            emit(&config, &declaration),
            Err(SpliceError::TypeMapping { .. })
        ));

        // callback in parameter position
        let declaration = Declaration::new("f", int32())
            .with_params(vec![Parameter::Callback(
                Declaration::new("on_event", CType::new("void")).param("h", int32()),
            )])
            .with_callback(
                Declaration::new("cb", CType::new("void"))
                    .param("h", int32())
                    .param("err", int32()),
            );
        assert!(matches!(
            emit(&config, &declaration),
            Err(SpliceError::TypeMapping { .. })
        ));
    }

    #[test]
    fn test_status_field_avoids_payload_names() {
        let declaration = Declaration::new("get_status", int32()).with_callback(
            Declaration::new("cb", CType::new("void"))
                .param("h", int32())
                .param("err", int32())
                .param("status", text()),
        );
        let binding = emit(&SpliceConfig::default(), &declaration).expect("binding");
        assert_eq!(binding.wrapper.status_field, "status_");
        assert_eq!(
            binding.handler.delivery,
            Delivery::Aggregate {
                result: "getStatusResult".to_string(),
                status_field: "status_".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_wrapper_names_fail_validation() {
        let config = SpliceConfig::default();
        let types = config.type_table();
        let first = Declaration::new("indy_ping", int32()).with_callback(
            Declaration::new("cb", CType::new("void"))
                .param("h", int32())
                .param("err", int32()),
        );
        let mut second = first.clone();
        second.name = "ping".to_string();

        let err = BindingEmitter::new(&config, &types)
            .emit_module("ping.h", [&first, &second])
            .unwrap_err();
        assert!(matches!(err, SpliceError::Validation { .. }));
    }
}

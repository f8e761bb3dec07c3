//! Go (cgo) unit generator
//!
//! Renders the package clause, the cgo preamble with the trampoline
//! prototypes, the result structs, the blocking wrappers and the exported
//! callback handlers. Output is laid out the way `gofmt` would.

use crate::codegen::native::FN_PARAM;
use crate::ir::{
    BindingModule, BoundValue, CallbackHandler, Delivery, RegistryContract, ResultAggregate,
    ResultShape, TargetType, Wrapper, WrapperParam, WrapperStep,
};

// Locals of the emitted wrapper and handler bodies
const CALL_PTR: &str = "callPtr";
const CALL_HANDLE: &str = "callHandle";
const CALL_CH: &str = "callCh";
const CALL_ERR: &str = "callErr";
const CALL_STATUS: &str = "callStatus";
const CALL_RESULT: &str = "callResult";
const DISPATCH_STATUS: &str = "dispatchStatus";

/// Locals every wrapper or handler body declares
pub const GENERATED_LOCALS: &[&str] = &[
    CALL_PTR,
    CALL_HANDLE,
    CALL_CH,
    CALL_ERR,
    CALL_STATUS,
    CALL_RESULT,
    DISPATCH_STATUS,
];

/// Generator for the Go unit of a domain
pub struct GoGenerator<'a> {
    module: &'a BindingModule,
}

impl<'a> GoGenerator<'a> {
    /// Create a new Go generator for a module
    pub fn new(module: &'a BindingModule) -> Self {
        Self { module }
    }

    /// Generate the complete Go source
    pub fn generate(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "// Code generated by forge-splice from {}. DO NOT EDIT.\n\n",
            self.module.domain
        ));
        output.push_str(&format!("package {}\n\n", self.module.package));
        output.push_str(&self.generate_preamble());

        if self.module.bindings.is_empty() {
            return output;
        }

        output.push('\n');
        output.push_str(&self.generate_imports());

        for result in self.module.results() {
            output.push('\n');
            output.push_str(&self.generate_result_struct(result));
        }

        for binding in &self.module.bindings {
            output.push('\n');
            output.push_str(&self.generate_wrapper(&binding.wrapper));
        }

        for binding in &self.module.bindings {
            output.push('\n');
            output.push_str(&self.generate_handler(&binding.handler));
        }

        output
    }

    /// Generate the cgo preamble and `import "C"`
    fn generate_preamble(&self) -> String {
        let mut output = String::from("/*\n");

        if let Some(ref flags) = self.module.cgo_ldflags {
            output.push_str(&format!("#cgo LDFLAGS: {}\n", flags));
        }
        output.push_str("#include <stdbool.h>\n");
        output.push_str("#include <stdint.h>\n");
        output.push_str("#include <stdlib.h>\n");

        if !self.module.bindings.is_empty() {
            output.push('\n');
            for binding in &self.module.bindings {
                output.push_str(&binding.trampoline.prototype(FN_PARAM));
                output.push_str(";\n");
            }
        }

        output.push_str("*/\n");
        output.push_str("import \"C\"\n");
        output
    }

    /// Generate the import block
    fn generate_imports(&self) -> String {
        let mut output = String::from("import (\n");
        output.push_str("\t\"fmt\"\n");
        if self.module.needs_unsafe() {
            output.push_str("\t\"unsafe\"\n");
        }
        output.push('\n');
        output.push_str(&format!("\t\"{}\"\n", self.module.registry.import));
        output.push_str(")\n");
        output
    }

    /// Generate a result struct
    fn generate_result_struct(&self, result: &ResultAggregate) -> String {
        let width = result.fields().map(|f| f.name.len()).max().unwrap_or(0);

        let mut output = format!("type {} struct {{\n", result.name);
        for field in result.fields() {
            output.push_str(&format!(
                "\t{:<width$} {}\n",
                field.name,
                field.target.to_go(),
                width = width
            ));
        }
        output.push_str("}\n");
        output
    }

    /// Generate a blocking wrapper
    fn generate_wrapper(&self, wrapper: &Wrapper) -> String {
        let registry = &self.module.registry;
        let op = &wrapper.operation;

        let params: Vec<String> = wrapper.public_params().map(BoundValue::to_go_param).collect();
        let mut returns: Vec<&str> = wrapper.returns.iter().map(|f| f.target.to_go()).collect();
        let signature = match returns.len() {
            0 => "error".to_string(),
            _ => {
                returns.push("error");
                format!("({})", returns.join(", "))
            }
        };
        let fail = |err: String| {
            let mut values: Vec<String> = wrapper
                .returns
                .iter()
                .map(|f| f.target.zero_value().to_string())
                .collect();
            values.push(err);
            format!("\t\treturn {}\n", values.join(", "))
        };

        let handle = if wrapper.correlation().is_some() || wrapper.deregister_on_dispatch_failure {
            CALL_HANDLE
        } else {
            "_"
        };

        let mut blocks: Vec<String> = Vec::new();
        for step in wrapper.steps() {
            let mut block = String::new();
            match step {
                WrapperStep::Register => {
                    block.push_str(&format!(
                        "\t{}, {}, {}, {} := {}(\"{}\")\n",
                        CALL_PTR,
                        handle,
                        CALL_CH,
                        CALL_ERR,
                        registry.register_call(),
                        op
                    ));
                    block.push_str(&format!("\tif {} != nil {{\n", CALL_ERR));
                    block.push_str(&fail(format!(
                        "fmt.Errorf(\"{}: register call: %w\", {})",
                        op, CALL_ERR
                    )));
                    block.push_str("\t}\n");
                }
                WrapperStep::Marshal => {
                    for param in &wrapper.params {
                        block.push_str(&marshal(param.value()));
                    }
                }
                WrapperStep::Dispatch => {
                    let mut args = vec![CALL_PTR.to_string()];
                    for param in &wrapper.params {
                        args.extend(arguments(param));
                    }
                    block.push_str(&format!(
                        "\t{} := C.{}({})\n",
                        DISPATCH_STATUS,
                        wrapper.trampoline,
                        args.join(", ")
                    ));
                    block.push_str(&format!("\tif {} != 0 {{\n", DISPATCH_STATUS));
                    if wrapper.deregister_on_dispatch_failure {
                        block.push_str(&format!(
                            "\t\t{}({})\n",
                            registry.deregister_call(),
                            CALL_HANDLE
                        ));
                    }
                    block.push_str(&fail(format!(
                        "fmt.Errorf(\"{}: dispatch returned status %d\", {})",
                        op, DISPATCH_STATUS
                    )));
                    block.push_str("\t}\n");
                }
                WrapperStep::Await => match (&wrapper.shape, &wrapper.result_type) {
                    (ResultShape::Aggregate, Some(result_type)) => {
                        block.push_str(&format!(
                            "\t{} := (<-{}).({})\n",
                            CALL_RESULT, CALL_CH, result_type
                        ));
                    }
                    _ => {
                        block.push_str(&format!(
                            "\t{} := (<-{}).({})\n",
                            CALL_STATUS,
                            CALL_CH,
                            wrapper.status_target.to_go()
                        ));
                    }
                },
                WrapperStep::Unpack => {
                    let status = match wrapper.result_type {
                        Some(_) => format!("{}.{}", CALL_RESULT, wrapper.status_field),
                        None => CALL_STATUS.to_string(),
                    };
                    block.push_str(&format!("\tif {} != 0 {{\n", status));
                    block.push_str(&fail(format!(
                        "fmt.Errorf(\"{}: callback reported status %d\", {})",
                        op, status
                    )));
                    block.push_str("\t}\n");

                    let mut values: Vec<String> = wrapper
                        .returns
                        .iter()
                        .map(|f| format!("{}.{}", CALL_RESULT, f.name))
                        .collect();
                    values.push("nil".to_string());
                    block.push_str(&format!("\treturn {}\n", values.join(", ")));
                }
            }
            // the status check follows the receive directly
            match blocks.last_mut() {
                Some(last) if step == WrapperStep::Unpack => last.push_str(&block),
                _ => blocks.push(block),
            }
        }

        let mut output = String::new();
        output.push_str(&format!("// {}\n", wrapper.doc));
        output.push_str(&format!(
            "func {}({}) {} {{\n",
            wrapper.name,
            params.join(", "),
            signature
        ));
        output.push_str(&blocks.join("\n"));
        output.push_str("}\n");
        output
    }

    /// Generate an exported callback handler
    fn generate_handler(&self, handler: &CallbackHandler) -> String {
        let registry = &self.module.registry;
        let params: Vec<String> = handler.params.iter().map(|p| p.to_cgo()).collect();
        let handle = &handler.handle.native.name;

        let mut output = String::new();
        output.push_str(&format!("//export {}\n", handler.name));
        output.push_str(&format!("func {}({}) {{\n", handler.name, params.join(", ")));
        output.push_str(&format!(
            "\t{}, {} := {}({}({}))\n",
            CALL_CH,
            CALL_ERR,
            registry.deregister_call(),
            RegistryContract::HANDLE_TYPE,
            handle
        ));
        output.push_str(&format!("\tif {} != nil {{\n", CALL_ERR));
        output.push_str(&format!(
            "\t\tpanic(fmt.Sprintf(\"{}: no pending call for handle %d: %v\", {}, {}))\n",
            handler.operation, handle, CALL_ERR
        ));
        output.push_str("\t}\n");

        for value in &handler.payload {
            if value.target == TargetType::OptionalText {
                output.push_str(&unmarshal_optional_text(value));
            }
        }

        match &handler.delivery {
            Delivery::Status => {
                output.push_str(&format!("\t{} <- {}\n", CALL_CH, unmarshal(&handler.status)));
            }
            Delivery::Aggregate {
                result,
                status_field,
            } => {
                let mut fields = vec![(status_field.clone(), unmarshal(&handler.status))];
                fields.extend(
                    handler
                        .payload
                        .iter()
                        .map(|value| (value.name.clone(), unmarshal(value))),
                );
                let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0) + 1;

                output.push_str(&format!("\t{} <- {}{{\n", CALL_CH, result));
                for (field, value) in fields {
                    output.push_str(&format!(
                        "\t\t{:<width$} {},\n",
                        format!("{}:", field),
                        value,
                        width = width
                    ));
                }
                output.push_str("\t}\n");
            }
        }

        output.push_str("}\n");
        output
    }
}

/// Local holding the converted value, as assigned by the emitter
fn local(value: &BoundValue) -> &str {
    value.local.as_deref().unwrap_or(&value.name)
}

/// Conversion statements for an input that owns a C buffer
fn marshal(value: &BoundValue) -> String {
    let local = local(value);
    match value.target {
        TargetType::Text => format!(
            "\t{local} := C.CString({name})\n\tdefer C.free(unsafe.Pointer({local}))\n",
            local = local,
            name = value.name
        ),
        TargetType::Bytes => format!(
            "\t{local} := (*{base})(C.CBytes({name}))\n\tdefer C.free(unsafe.Pointer({local}))\n",
            local = local,
            base = value.native.ty.cgo_base(),
            name = value.name
        ),
        TargetType::OptionalText => format!(
            "\tvar {local} *C.char\n\tif {name} != nil {{\n\t\t{local} = C.CString(*{name})\n\t\tdefer C.free(unsafe.Pointer({local}))\n\t}}\n",
            local = local,
            name = value.name
        ),
        _ => String::new(),
    }
}

/// Trampoline arguments for one wrapper parameter
fn arguments(param: &WrapperParam) -> Vec<String> {
    let value = param.value();
    if let WrapperParam::Correlation(_) = param {
        return vec![format!("{}({})", value.native.ty.cgo_base(), CALL_HANDLE)];
    }

    match value.target {
        TargetType::Opaque => vec![value.name.clone()],
        TargetType::Text => vec![local(value).to_string()],
        TargetType::OptionalText => vec![format!("&{}", local(value))],
        TargetType::Bytes => {
            let mut args = vec![local(value).to_string()];
            if let Some(ref length) = value.length {
                args.push(format!("{}(len({}))", length.ty.cgo_base(), value.name));
            }
            args
        }
        _ => vec![format!("{}({})", value.native.ty.cgo_base(), value.name)],
    }
}

/// Expression converting a callback argument to its Go value
fn unmarshal(value: &BoundValue) -> String {
    let native = &value.native.name;
    match value.target {
        TargetType::Opaque => native.clone(),
        TargetType::Text => format!("C.GoString({})", native),
        TargetType::OptionalText => local(value).to_string(),
        TargetType::Bytes => match value.length {
            Some(ref length) => format!(
                "C.GoBytes(unsafe.Pointer({}), C.int({}))",
                native, length.name
            ),
            None => "nil".to_string(),
        },
        target => format!("{}({})", target.to_go(), native),
    }
}

/// Statements reading a `char**` out-parameter into a `*string`
fn unmarshal_optional_text(value: &BoundValue) -> String {
    format!(
        "\tvar {local} *string\n\tif {native} != nil && *{native} != nil {{\n\t\ttext := C.GoString(*{native})\n\t\t{local} = &text\n\t}}\n",
        local = unmarshal(value),
        native = value.native.name
    )
}

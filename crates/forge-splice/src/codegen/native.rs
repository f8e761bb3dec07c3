//! Native (C) unit generator
//!
//! Renders the extern declarations of the Go callback handlers, the function
//! pointer typedefs and one trampoline per binding.

use crate::ir::{Binding, BindingModule, Trampoline};

/// Name of the opaque function pointer parameter every trampoline takes
pub const FN_PARAM: &str = "splice_fn";

/// Status a trampoline returns when handed a NULL function pointer
pub const NULL_FN_STATUS: i32 = -1;

/// Generator for the native C unit of a domain
pub struct NativeGenerator<'a> {
    module: &'a BindingModule,
}

impl<'a> NativeGenerator<'a> {
    /// Create a new native generator for a module
    pub fn new(module: &'a BindingModule) -> Self {
        Self { module }
    }

    /// Generate the complete C source
    pub fn generate(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "// Code generated by forge-splice from {}. DO NOT EDIT.\n\n",
            self.module.domain
        ));
        output.push_str("#include <stdbool.h>\n");
        output.push_str("#include <stddef.h>\n");
        output.push_str("#include <stdint.h>\n");

        if self.module.bindings.is_empty() {
            return output;
        }

        // Go handlers, exported from the cgo unit
        output.push('\n');
        for binding in &self.module.bindings {
            output.push_str(&binding.callback_extern.to_c());
            output.push('\n');
        }

        for binding in &self.module.bindings {
            output.push('\n');
            output.push_str(&self.generate_typedefs(binding));
            output.push('\n');
            output.push_str(&self.generate_trampoline(&binding.trampoline));
        }

        output
    }

    /// Generate the callback and target typedefs of a binding
    fn generate_typedefs(&self, binding: &Binding) -> String {
        let trampoline = &binding.trampoline;
        let callback_types: Vec<String> =
            trampoline.callback_params.iter().map(|ty| ty.to_c()).collect();

        let mut target_types: Vec<String> = trampoline.params.iter().map(|p| p.ty.to_c()).collect();
        target_types.push(trampoline.callback_typedef());

        format!(
            "typedef void (*{})({});\ntypedef {} (*{})({});\n",
            trampoline.callback_typedef(),
            callback_types.join(", "),
            trampoline.return_type.to_c(),
            trampoline.target_typedef(),
            target_types.join(", ")
        )
    }

    /// Generate a trampoline definition
    fn generate_trampoline(&self, trampoline: &Trampoline) -> String {
        let mut args: Vec<&str> = trampoline.params.iter().map(|p| p.name.as_str()).collect();
        args.push(&trampoline.callback);

        let mut output = String::new();
        output.push_str(&trampoline.prototype(FN_PARAM));
        output.push_str("\n{\n");
        output.push_str(&format!("    if ({} == NULL) {{\n", FN_PARAM));
        output.push_str(&format!("        return {};\n", NULL_FN_STATUS));
        output.push_str("    }\n");
        output.push_str(&format!(
            "    return (({}){})({});\n",
            trampoline.target_typedef(),
            FN_PARAM,
            args.join(", ")
        ));
        output.push_str("}\n");
        output
    }
}

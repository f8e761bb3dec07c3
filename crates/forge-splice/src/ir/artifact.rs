//! Artifact trees for generated bindings
//!
//! This module provides the typed intermediate representation the binding
//! emitter produces and the renderers in [`crate::codegen`] consume. Nothing
//! here knows about text layout; it records *what* each generated function
//! does, per declaration:
//!
//! - [`Trampoline`]: native function calling an opaque function pointer
//! - [`CallbackExtern`]: native declaration of the Go callback handler
//! - [`CallbackHandler`]: Go function the native library calls on completion
//! - [`Wrapper`]: blocking Go function driving the [`CallState`] machine
//! - [`ResultAggregate`]: Go struct delivered from handler to wrapper

use crate::ir::{CType, ResultShape, TargetType};
use serde::{Deserialize, Serialize};

/// A parameter as it appears in a native signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeParam {
    /// Parameter name
    pub name: String,
    /// Canonical native type
    pub ty: CType,
}

impl NativeParam {
    /// Create a new native parameter
    pub fn new(name: impl Into<String>, ty: CType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// C declaration text (`const char* name`)
    pub fn to_c(&self) -> String {
        format!("{} {}", self.ty.to_c(), self.name)
    }

    /// Go declaration text for an exported callback (`name *C.char`)
    pub fn to_cgo(&self) -> String {
        format!("{} {}", self.name, self.ty.to_cgo())
    }
}

/// One Go-side value bound to the native parameter(s) carrying it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundValue {
    /// Go identifier
    pub name: String,
    /// Go representation
    pub target: TargetType,
    /// Native parameter (the buffer, for `bytes`)
    pub native: NativeParam,
    /// Length parameter of a buffer pair
    pub length: Option<NativeParam>,
    /// Go local holding the converted value, for values that need one
    pub local: Option<String>,
}

impl BoundValue {
    /// Bind a value to a single native parameter
    pub fn new(name: impl Into<String>, target: TargetType, native: NativeParam) -> Self {
        Self {
            name: name.into(),
            target,
            native,
            length: None,
            local: None,
        }
    }

    /// Attach the length parameter of a buffer pair
    pub fn with_length(mut self, length: NativeParam) -> Self {
        self.length = Some(length);
        self
    }

    /// Set the Go local holding the converted value
    pub fn with_local(mut self, local: impl Into<String>) -> Self {
        self.local = Some(local.into());
        self
    }

    /// Go parameter text (`name string`)
    pub fn to_go_param(&self) -> String {
        format!("{} {}", self.name, self.target.to_go())
    }
}

/// Native function that calls an opaque function pointer with the
/// original signature, passing the generated callback last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trampoline {
    /// Trampoline symbol
    pub name: String,
    /// C name of the wrapped declaration
    pub target: String,
    /// Return type of the wrapped declaration
    pub return_type: CType,
    /// Leading parameters of the wrapped declaration
    pub params: Vec<NativeParam>,
    /// Parameter types of the completion callback
    pub callback_params: Vec<CType>,
    /// Symbol of the generated callback handler
    pub callback: String,
}

impl Trampoline {
    /// Typedef name for the wrapped function pointer
    pub fn target_typedef(&self) -> String {
        format!("{}_fn", self.target)
    }

    /// Typedef name for the completion callback pointer
    pub fn callback_typedef(&self) -> String {
        format!("{}_cb", self.target)
    }

    /// Native prototype, shared by the C definition and the cgo preamble
    pub fn prototype(&self, fn_param: &str) -> String {
        let mut params = vec![format!("void* {}", fn_param)];
        params.extend(self.params.iter().map(NativeParam::to_c));
        format!(
            "{} {}({})",
            self.return_type.to_c(),
            self.name,
            params.join(", ")
        )
    }
}

/// Native declaration of the Go callback handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackExtern {
    /// Handler symbol
    pub name: String,
    /// Exact native parameter list of the callback
    pub params: Vec<NativeParam>,
}

impl CallbackExtern {
    /// `extern void name(params);`
    pub fn to_c(&self) -> String {
        let params: Vec<String> = self.params.iter().map(NativeParam::to_c).collect();
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };
        format!("extern void {}({});", self.name, params)
    }
}

/// Field of a result aggregate or a wrapper return value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultField {
    /// Go identifier
    pub name: String,
    /// Go representation
    pub target: TargetType,
}

impl ResultField {
    /// Create a new field
    pub fn new(name: impl Into<String>, target: TargetType) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

/// Go struct carrying status and payload from the handler to the wrapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAggregate {
    /// Struct name
    pub name: String,
    /// Designated status field
    pub status: ResultField,
    /// Payload fields, in callback order
    pub payload: Vec<ResultField>,
}

impl ResultAggregate {
    /// All fields, status first
    pub fn fields(&self) -> impl Iterator<Item = &ResultField> {
        std::iter::once(&self.status).chain(self.payload.iter())
    }
}

/// Value the handler delivers on the call's channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// Bare status value
    Status,
    /// Result aggregate
    Aggregate {
        /// Struct name
        result: String,
        /// Name of the status field
        status_field: String,
    },
}

/// Go function exported to the native library as the completion callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackHandler {
    /// Exported symbol
    pub name: String,
    /// C name of the declaration the callback completes
    pub operation: String,
    /// Exact native parameter list
    pub params: Vec<NativeParam>,
    /// Correlation handle (first parameter)
    pub handle: BoundValue,
    /// Status (second parameter)
    pub status: BoundValue,
    /// Payload values (remaining parameters, buffer pairs collapsed)
    pub payload: Vec<BoundValue>,
    /// What is sent on the channel
    pub delivery: Delivery,
}

/// A wrapper parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapperParam {
    /// Caller-visible parameter
    Public(BoundValue),
    /// Parameter filled with the registry-issued correlation handle
    Correlation(BoundValue),
}

impl WrapperParam {
    /// The bound value behind the parameter
    pub fn value(&self) -> &BoundValue {
        match self {
            WrapperParam::Public(v) | WrapperParam::Correlation(v) => v,
        }
    }

    /// Check if the caller supplies this parameter
    pub fn is_public(&self) -> bool {
        matches!(self, WrapperParam::Public(_))
    }
}

/// Lifecycle of one wrapped call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// No handle issued yet
    Unregistered,
    /// Handle issued, native call not made
    Pending,
    /// Native call accepted, waiting on the channel
    AwaitingCallback,
    /// Result delivered
    Completed,
    /// Call abandoned
    Failed(FailureKind),
}

/// Why a call was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The registry refused to issue a handle
    Registration,
    /// The native call returned a non-zero immediate status
    Dispatch,
}

/// Events that move a call between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallEvent {
    RegisterOk,
    RegisterFailed,
    DispatchOk,
    DispatchFailed,
    Delivered,
}

impl CallState {
    /// Next state for an event, or `None` if the event is not valid here
    pub fn on(self, event: CallEvent) -> Option<CallState> {
        match (self, event) {
            (CallState::Unregistered, CallEvent::RegisterOk) => Some(CallState::Pending),
            (CallState::Unregistered, CallEvent::RegisterFailed) => {
                Some(CallState::Failed(FailureKind::Registration))
            }
            (CallState::Pending, CallEvent::DispatchOk) => Some(CallState::AwaitingCallback),
            (CallState::Pending, CallEvent::DispatchFailed) => {
                Some(CallState::Failed(FailureKind::Dispatch))
            }
            (CallState::AwaitingCallback, CallEvent::Delivered) => Some(CallState::Completed),
            _ => None,
        }
    }

    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Completed | CallState::Failed(_))
    }
}

/// Steps of the blocking wrapper, in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapperStep {
    /// Obtain dispatch token, handle and channel
    Register,
    /// Convert inputs to native values
    Marshal,
    /// Call the trampoline
    Dispatch,
    /// Block on the channel
    Await,
    /// Check the delivered status and return payloads
    Unpack,
}

impl WrapperStep {
    /// State of the call when the step starts
    pub fn entry_state(&self) -> CallState {
        match self {
            WrapperStep::Register => CallState::Unregistered,
            WrapperStep::Marshal | WrapperStep::Dispatch => CallState::Pending,
            WrapperStep::Await => CallState::AwaitingCallback,
            WrapperStep::Unpack => CallState::Completed,
        }
    }

    /// Event emitted when the step succeeds
    pub fn success(&self) -> Option<CallEvent> {
        match self {
            WrapperStep::Register => Some(CallEvent::RegisterOk),
            WrapperStep::Dispatch => Some(CallEvent::DispatchOk),
            WrapperStep::Await => Some(CallEvent::Delivered),
            WrapperStep::Marshal | WrapperStep::Unpack => None,
        }
    }

    /// Event emitted when the step fails, for steps with an early return
    pub fn failure(&self) -> Option<CallEvent> {
        match self {
            WrapperStep::Register => Some(CallEvent::RegisterFailed),
            WrapperStep::Dispatch => Some(CallEvent::DispatchFailed),
            _ => None,
        }
    }
}

/// Blocking Go function turning the callback protocol into a plain call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wrapper {
    /// Go function name
    pub name: String,
    /// C name, passed to the registry as the operation name
    pub operation: String,
    /// Doc comment line
    pub doc: String,
    /// Parameters in native order
    pub params: Vec<WrapperParam>,
    /// Trampoline symbol
    pub trampoline: String,
    /// Result shape of the completion callback
    pub shape: ResultShape,
    /// Payload values returned before the error
    pub returns: Vec<ResultField>,
    /// Result aggregate type received on the channel
    pub result_type: Option<String>,
    /// Go type of the delivered status
    pub status_target: TargetType,
    /// Name of the status field in the aggregate
    pub status_field: String,
    /// Whether a failed dispatch retires the registered handle
    pub deregister_on_dispatch_failure: bool,
}

impl Wrapper {
    /// Caller-visible parameters
    pub fn public_params(&self) -> impl Iterator<Item = &BoundValue> {
        self.params
            .iter()
            .filter(|p| p.is_public())
            .map(WrapperParam::value)
    }

    /// Parameter filled with the registry-issued handle, if any
    ///
    /// Without one the native side never sees the handle, so the callback
    /// cannot be matched to its call.
    pub fn correlation(&self) -> Option<&BoundValue> {
        self.params.iter().find_map(|p| match p {
            WrapperParam::Correlation(value) => Some(value),
            WrapperParam::Public(_) => None,
        })
    }

    /// Check if any input needs conversion before dispatch
    pub fn needs_marshaling(&self) -> bool {
        self.params
            .iter()
            .any(|p| p.value().target.owns_native_buffer())
    }

    /// Steps to emit, in order
    pub fn steps(&self) -> Vec<WrapperStep> {
        let mut steps = vec![WrapperStep::Register];
        if self.needs_marshaling() {
            steps.push(WrapperStep::Marshal);
        }
        steps.extend([WrapperStep::Dispatch, WrapperStep::Await, WrapperStep::Unpack]);
        steps
    }
}

/// Everything generated for one declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// C name of the declaration
    pub declaration: String,
    /// Result shape
    pub shape: ResultShape,
    /// Native trampoline
    pub trampoline: Trampoline,
    /// Native declaration of the callback handler
    pub callback_extern: CallbackExtern,
    /// Go callback handler
    pub handler: CallbackHandler,
    /// Go blocking wrapper
    pub wrapper: Wrapper,
    /// Result aggregate (aggregate shape only)
    pub result: Option<ResultAggregate>,
}

/// Registry package the emitted Go code calls into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryContract {
    /// Go import path
    pub import: String,
    /// Package qualifier used at call sites
    pub package: String,
}

impl RegistryContract {
    /// Go type of a correlation handle
    pub const HANDLE_TYPE: &'static str = "int32";

    /// `pkg.RegisterCall`
    pub fn register_call(&self) -> String {
        format!("{}.RegisterCall", self.package)
    }

    /// `pkg.DeregisterCall`
    pub fn deregister_call(&self) -> String {
        format!("{}.DeregisterCall", self.package)
    }
}

/// All bindings generated for one header (domain)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingModule {
    /// Domain name (the header the declarations came from)
    pub domain: String,
    /// Go package name
    pub package: String,
    /// `#cgo LDFLAGS` value
    pub cgo_ldflags: Option<String>,
    /// Registry the emitted code consumes
    pub registry: RegistryContract,
    /// Bindings in declaration order
    pub bindings: Vec<Binding>,
}

impl BindingModule {
    /// Create an empty module
    pub fn new(
        domain: impl Into<String>,
        package: impl Into<String>,
        registry: RegistryContract,
    ) -> Self {
        Self {
            domain: domain.into(),
            package: package.into(),
            cgo_ldflags: None,
            registry,
            bindings: Vec::new(),
        }
    }

    /// Set the linker flags for the cgo preamble
    pub fn with_ldflags(mut self, flags: Option<String>) -> Self {
        self.cgo_ldflags = flags;
        self
    }

    /// Add a binding
    pub fn binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Result aggregates, in declaration order
    pub fn results(&self) -> impl Iterator<Item = &ResultAggregate> {
        self.bindings.iter().filter_map(|b| b.result.as_ref())
    }

    /// Wrappers that never pass the registry handle to the native side
    pub fn uncorrelated(&self) -> impl Iterator<Item = &Wrapper> {
        self.bindings
            .iter()
            .map(|b| &b.wrapper)
            .filter(|w| w.correlation().is_none())
    }

    /// Check if any emitted Go code uses the `unsafe` package
    pub fn needs_unsafe(&self) -> bool {
        self.bindings.iter().any(|b| {
            b.wrapper
                .params
                .iter()
                .any(|p| p.value().target.needs_unsafe())
                || b.handler.params.iter().any(|p| p.ty.to_cgo() == "unsafe.Pointer")
                || b
                    .handler
                    .payload
                    .iter()
                    .any(|v| v.target == TargetType::Bytes)
        })
    }

    /// Validate that generated Go symbols do not collide
    pub fn validate(&self) -> Result<(), ModuleValidationError> {
        if self.package.is_empty() {
            return Err(ModuleValidationError::EmptyPackage);
        }

        let mut seen = std::collections::HashSet::new();
        for binding in &self.bindings {
            for symbol in [&binding.wrapper.name, &binding.handler.name] {
                if !seen.insert(symbol.as_str()) {
                    return Err(ModuleValidationError::DuplicateSymbol(symbol.clone()));
                }
            }
            if let Some(result) = &binding.result {
                if !seen.insert(result.name.as_str()) {
                    return Err(ModuleValidationError::DuplicateSymbol(result.name.clone()));
                }
            }
        }

        Ok(())
    }
}

/// Errors that can occur during module validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleValidationError {
    /// Go package name is empty
    EmptyPackage,
    /// Two declarations produced the same Go symbol
    DuplicateSymbol(String),
}

impl std::fmt::Display for ModuleValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleValidationError::EmptyPackage => write!(f, "go package name cannot be empty"),
            ModuleValidationError::DuplicateSymbol(name) => {
                write!(f, "duplicate generated symbol: {}", name)
            }
        }
    }
}

impl std::error::Error for ModuleValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(steps: &[WrapperStep]) -> CallState {
        let mut state = CallState::Unregistered;
        for step in steps {
            assert_eq!(step.entry_state(), state);
            if let Some(event) = step.success() {
                state = state.on(event).expect("valid transition");
            }
        }
        state
    }

    #[test]
    fn test_happy_path_reaches_completed() {
        let steps = [
            WrapperStep::Register,
            WrapperStep::Marshal,
            WrapperStep::Dispatch,
            WrapperStep::Await,
        ];
        assert_eq!(walk(&steps), CallState::Completed);
        assert!(CallState::Completed.is_terminal());
    }

    #[test]
    fn test_failure_edges() {
        let failed = CallState::Unregistered.on(CallEvent::RegisterFailed);
        assert_eq!(failed, Some(CallState::Failed(FailureKind::Registration)));

        let failed = CallState::Pending.on(CallEvent::DispatchFailed);
        assert_eq!(failed, Some(CallState::Failed(FailureKind::Dispatch)));

        // terminal states accept nothing
        let done = CallState::Failed(FailureKind::Dispatch);
        assert!(done.is_terminal());
        assert_eq!(done.on(CallEvent::Delivered), None);
        // no waiting before dispatch succeeded
        assert_eq!(CallState::Pending.on(CallEvent::Delivered), None);
    }

    #[test]
    fn test_only_register_and_dispatch_fail_early() {
        let failing: Vec<_> = [
            WrapperStep::Register,
            WrapperStep::Marshal,
            WrapperStep::Dispatch,
            WrapperStep::Await,
            WrapperStep::Unpack,
        ]
        .into_iter()
        .filter(|s| s.failure().is_some())
        .collect();
        assert_eq!(failing, vec![WrapperStep::Register, WrapperStep::Dispatch]);
    }

    #[test]
    fn test_trampoline_prototype() {
        let trampoline = Trampoline {
            name: "do_thing_trampoline".into(),
            target: "do_thing".into(),
            return_type: CType::new("int32_t"),
            params: vec![
                NativeParam::new("handle", CType::new("int32_t")),
                NativeParam::new("name", CType::pointer("char", 1).with_const()),
            ],
            callback_params: vec![],
            callback: "doThingCallback".into(),
        };
        assert_eq!(
            trampoline.prototype("splice_fn"),
            "int32_t do_thing_trampoline(void* splice_fn, int32_t handle, const char* name)"
        );
        assert_eq!(trampoline.target_typedef(), "do_thing_fn");
    }

    #[test]
    fn test_module_validation() {
        let registry = RegistryContract {
            import: "example.com/callreg".into(),
            package: "callreg".into(),
        };
        let module = BindingModule::new("wallet.h", "", registry);
        assert_eq!(module.validate(), Err(ModuleValidationError::EmptyPackage));
    }
}

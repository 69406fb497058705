//! The `invoke-*` family of instructions.
//!
//! [`InvokeOp::execute`] resolves one call site against the state of the
//! calling [`ExecutionNode`]:
//!
//! 1. `Object.<init>()` on a placeholder builds the concrete object directly
//! 2. argument types are reconciled against the declared signature
//! 3. `invoke-virtual` on a non-final method is dispatched on the receiver's
//!    runtime type
//! 4. the target is classified into an [`ExecutionStrategy`] and run
//!
//! Whatever cannot be resolved is widened: mutable arguments and the result
//! register become unknown so later instructions make no unfounded
//! assumptions about them.

use std::{fmt, sync::Arc};

use rayon::prelude::*;
use strum::{Display, EnumString};

use crate::{
    context::{
        ExecutionContext, ExecutionNode, HeapItem, Instance, MethodState, Register, SideEffect,
        Value, VirtualException,
    },
    opcode::{
        params::{all_arguments_known, marshal_arguments, reconcile_arguments},
        strategy::ExecutionStrategy,
    },
    types::{
        name::{self, TypeName},
        VirtualMethodRc,
    },
    vm::VirtualMachine,
    Result, VmError,
};

/// Invoke instruction variants.
///
/// # Example
///
/// ```rust
/// use std::str::FromStr;
///
/// use smaliscope::opcode::InvokeKind;
///
/// let kind = InvokeKind::from_str("invoke-virtual/range").unwrap();
/// assert_eq!(kind, InvokeKind::VirtualRange);
/// assert!(kind.is_range() && kind.is_virtual());
/// assert_eq!(InvokeKind::Static.to_string(), "invoke-static");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
pub enum InvokeKind {
    /// `invoke-virtual`
    #[strum(serialize = "invoke-virtual")]
    Virtual,
    /// `invoke-virtual/range`
    #[strum(serialize = "invoke-virtual/range")]
    VirtualRange,
    /// `invoke-super`
    #[strum(serialize = "invoke-super")]
    Super,
    /// `invoke-super/range`
    #[strum(serialize = "invoke-super/range")]
    SuperRange,
    /// `invoke-direct`
    #[strum(serialize = "invoke-direct")]
    Direct,
    /// `invoke-direct/range`
    #[strum(serialize = "invoke-direct/range")]
    DirectRange,
    /// `invoke-static`
    #[strum(serialize = "invoke-static")]
    Static,
    /// `invoke-static/range`
    #[strum(serialize = "invoke-static/range")]
    StaticRange,
    /// `invoke-interface`
    #[strum(serialize = "invoke-interface")]
    Interface,
    /// `invoke-interface/range`
    #[strum(serialize = "invoke-interface/range")]
    InterfaceRange,
}

impl InvokeKind {
    /// Returns `true` for the `/range` forms.
    #[must_use]
    pub fn is_range(self) -> bool {
        matches!(
            self,
            InvokeKind::VirtualRange
                | InvokeKind::SuperRange
                | InvokeKind::DirectRange
                | InvokeKind::StaticRange
                | InvokeKind::InterfaceRange
        )
    }

    /// Returns `true` for `invoke-virtual` and `invoke-virtual/range`.
    #[must_use]
    pub fn is_virtual(self) -> bool {
        matches!(self, InvokeKind::Virtual | InvokeKind::VirtualRange)
    }
}

/// Why a call was not executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum GiveUpReason {
    /// An emulated or reflected target received unknown arguments.
    UnknownArguments,
    /// The target is framework code not whitelisted for execution.
    UnsafeFramework,
    /// The target has no body and is not native.
    MissingImplementation,
    /// The target is native.
    NativeMethod,
    /// Nested execution returned nothing (call depth or visit limits).
    RecursionAborted,
}

/// How a call site ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The call ran and its effects were applied to the caller.
    Completed,
    /// The call was not run; the caller's state was widened.
    AssumedUnknown(GiveUpReason),
    /// The call raised this many exceptions; the node's path ends here.
    Raised(usize),
    /// A nested execution failed; the caller's state was widened.
    Indeterminate(VmError),
    /// The resolver hit an internal inconsistency; the caller was left as is
    /// past the point of failure.
    InternalFault(String),
}

/// Result of [`InvokeOp::execute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Strategy chosen for the target.
    pub strategy: ExecutionStrategy,
    /// Side-effect level of the call, also stored on the node.
    pub side_effect: SideEffect,
    /// What happened.
    pub outcome: InvokeOutcome,
}

/// One `invoke-*` instruction.
///
/// `parameter_registers` holds one caller register per declared parameter
/// (receiver first for instance methods). For wide parameters it is the
/// first register of the pair.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use smaliscope::{
///     opcode::{InvokeKind, InvokeOp},
///     types::{MethodFlags, VirtualMethod},
/// };
///
/// let method = Arc::new(VirtualMethod::new("Lapp/A;->f(JI)V", MethodFlags::PUBLIC)?);
/// let op = InvokeOp::from_registers(0x10, InvokeKind::Virtual, method, &[3, 4, 5, 6])?;
///
/// assert_eq!(op.parameter_registers(), &[3, 4, 6]);
/// assert_eq!(op.to_string(), "invoke-virtual {r3, r4, r6}, Lapp/A;->f(JI)V");
/// # Ok::<(), smaliscope::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct InvokeOp {
    address: usize,
    kind: InvokeKind,
    method: VirtualMethodRc,
    parameter_registers: Vec<u16>,
}

impl InvokeOp {
    /// Creates an invoke with one register per declared parameter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the register count does not
    /// match the declared parameter count.
    pub fn new(
        address: usize,
        kind: InvokeKind,
        method: VirtualMethodRc,
        parameter_registers: Vec<u16>,
    ) -> Result<Self> {
        if parameter_registers.len() != method.parameter_types().len() {
            return Err(malformed_error!(
                "{} expects {} parameter registers, got {}",
                method,
                method.parameter_types().len(),
                parameter_registers.len()
            ));
        }
        Ok(InvokeOp {
            address,
            kind,
            method,
            parameter_registers,
        })
    }

    /// Creates an invoke from the raw register list of the instruction, in
    /// which wide arguments occupy two consecutive entries.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the list does not match the
    /// method's parameter layout.
    pub fn from_registers(
        address: usize,
        kind: InvokeKind,
        method: VirtualMethodRc,
        registers: &[u16],
    ) -> Result<Self> {
        if registers.len() != usize::from(method.parameter_size()) {
            return Err(malformed_error!(
                "{} occupies {} registers, got {}",
                method,
                method.parameter_size(),
                registers.len()
            ));
        }

        let collapsed = method
            .parameter_offsets()
            .filter_map(|(offset, _)| registers.get(usize::from(offset)).copied())
            .collect();
        Self::new(address, kind, method, collapsed)
    }

    /// Creates an invoke from a `/range` instruction covering `count`
    /// registers starting at `first`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the range overflows or does not
    /// match the method's parameter layout.
    pub fn from_range(
        address: usize,
        kind: InvokeKind,
        method: VirtualMethodRc,
        first: u16,
        count: u16,
    ) -> Result<Self> {
        let Some(end) = first.checked_add(count) else {
            return Err(malformed_error!(
                "Register range r{} + {} overflows",
                first,
                count
            ));
        };
        let registers: Vec<u16> = (first..end).collect();
        Self::from_registers(address, kind, method, &registers)
    }

    /// Code address of the instruction.
    #[must_use]
    pub fn address(&self) -> usize {
        self.address
    }

    /// Instruction variant.
    #[must_use]
    pub fn kind(&self) -> InvokeKind {
        self.kind
    }

    /// Declared target.
    #[must_use]
    pub fn method(&self) -> &VirtualMethodRc {
        &self.method
    }

    /// Caller registers, one per declared parameter.
    #[must_use]
    pub fn parameter_registers(&self) -> &[u16] {
        &self.parameter_registers
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> &TypeName {
        self.method.return_type()
    }

    /// Resolves this call against the state of `node`.
    ///
    /// The caller's registers in `node` are updated in place, its side-effect
    /// level is set and, if the call raises, its children are dropped and the
    /// exceptions attached. Internal failures are logged and reported in the
    /// outcome; they never abort the analysis.
    pub fn execute(&self, vm: &VirtualMachine, node: &mut ExecutionNode) -> Invocation {
        if self.method.signature() == name::OBJECT_INIT {
            let (side_effect, outcome) = self.construct_object(vm, node);
            return Invocation {
                strategy: ExecutionStrategy::ConstructObject,
                side_effect,
                outcome,
            };
        }

        let reconciled = reconcile_arguments(
            vm.classes(),
            &self.method,
            &self.parameter_registers,
            node.context_mut().state_mut(),
        );
        let target = self.resolve_target(vm, node.context());
        let strategy = ExecutionStrategy::classify(vm, &target);

        let (side_effect, outcome) = match strategy {
            ExecutionStrategy::ConstructObject => self.construct_object(vm, node),
            ExecutionStrategy::EmulateOrReflect => {
                self.emulate_or_reflect(vm, node, &target, &reconciled)
            }
            ExecutionStrategy::UnsafeFramework => {
                log::debug!(
                    "Not executing unsafe framework method {}, assuming maximum ambiguity",
                    target
                );
                self.give_up(vm, node.context_mut().state_mut(), &reconciled);
                (
                    SideEffect::Strong,
                    InvokeOutcome::AssumedUnknown(GiveUpReason::UnsafeFramework),
                )
            }
            ExecutionStrategy::NoImplementation { native } => {
                let reason = if native {
                    log::warn!(
                        "Cannot execute native method {}, assuming maximum ambiguity",
                        target
                    );
                    GiveUpReason::NativeMethod
                } else {
                    log::warn!(
                        "No implementation for {}, assuming maximum ambiguity",
                        target
                    );
                    GiveUpReason::MissingImplementation
                };
                self.give_up(vm, node.context_mut().state_mut(), &reconciled);
                (SideEffect::Strong, InvokeOutcome::AssumedUnknown(reason))
            }
            ExecutionStrategy::LocalRecurse => self.execute_local(vm, node, &target, &reconciled),
        };

        node.set_side_effect(side_effect);
        Invocation {
            strategy,
            side_effect,
            outcome,
        }
    }

    /// Resolves independent call sites in parallel.
    ///
    /// Each site is resolved against its own node, so sites must not share
    /// register files. Sites sharing a heap observe each other's allocations.
    pub fn execute_all(
        vm: &VirtualMachine,
        sites: &mut [(InvokeOp, ExecutionNode)],
    ) -> Vec<Invocation> {
        sites
            .par_iter_mut()
            .map(|(op, node)| op.execute(vm, node))
            .collect()
    }

    /// Replaces the placeholder receiver of `Object.<init>()` with a concrete
    /// instance. Always a strong side effect.
    fn construct_object(
        &self,
        vm: &VirtualMachine,
        node: &mut ExecutionNode,
    ) -> (SideEffect, InvokeOutcome) {
        let outcome = match self.instantiate_receiver(vm, node.context_mut()) {
            Ok(()) => InvokeOutcome::Completed,
            Err(error) => {
                log::error!(
                    "Unexpected failure initializing object at {:#x}: {}",
                    self.address,
                    error
                );
                InvokeOutcome::InternalFault(error.to_string())
            }
        };
        node.set_side_effect(SideEffect::Strong);
        (SideEffect::Strong, outcome)
    }

    fn instantiate_receiver(&self, vm: &VirtualMachine, context: &mut ExecutionContext) -> Result<()> {
        let Some(&register) = self.parameter_registers.first() else {
            return Err(malformed_error!("Object.<init> without receiver"));
        };
        let item = context.state().peek_register(register);
        let Some(handle) = item.reference_handle() else {
            return Err(malformed_error!(
                "Object.<init> receiver is not an object - {}",
                item
            ));
        };
        let Instance::Uninitialized(type_name) = context.heap().get(handle)? else {
            return Err(malformed_error!(
                "Object.<init> receiver is already initialized - {}",
                item
            ));
        };

        let virtual_type = vm.classes().resolve_type(&type_name)?;
        let instance = vm.instantiator().instantiate(&virtual_type)?;
        let created = context.heap().alloc(instance)?;
        let (state, heap) = context.state_and_heap();
        state.assign_register_and_update_identities(
            register,
            HeapItem::reference(created, type_name),
            heap,
        )
    }

    /// Picks the method that actually runs for an `invoke-virtual`.
    fn resolve_target(&self, vm: &VirtualMachine, context: &ExecutionContext) -> VirtualMethodRc {
        let declared = &self.method;
        if !self.kind.is_virtual() || declared.is_final() {
            return Arc::clone(declared);
        }
        let Some(&receiver) = self.parameter_registers.first() else {
            return Arc::clone(declared);
        };

        let item = context.state().peek_register(receiver);
        let runtime_type = match item.value() {
            Value::Null | Value::Unknown => return Arc::clone(declared),
            Value::Reference(handle) => match context.heap().type_name_of(handle) {
                Ok(type_name) => type_name,
                Err(_) => return Arc::clone(declared),
            },
            _ => item.type_name().clone(),
        };

        let dispatched = vm
            .classes()
            .resolve_type(&runtime_type)
            .ok()
            .and_then(|virtual_type| virtual_type.method(declared.descriptor()).cloned())
            .filter(|method| method.has_implementation());

        match dispatched {
            Some(target) => {
                if log::log_enabled!(log::Level::Trace) && target.signature() != declared.signature()
                {
                    log::trace!("Dispatched {} to {}", declared, target);
                }
                target
            }
            None => Arc::clone(declared),
        }
    }

    fn emulate_or_reflect(
        &self,
        vm: &VirtualMachine,
        node: &mut ExecutionNode,
        target: &VirtualMethodRc,
        reconciled: &[TypeName],
    ) -> (SideEffect, InvokeOutcome) {
        let signature = target.signature();
        let callee = self.build_non_local_context(node.context_mut(), reconciled);

        let known = all_arguments_known(&self.method, callee.state());
        if !known && !vm.emulator().can_handle_unknown_values(signature) {
            log::trace!(
                "Not emulating or reflecting {} because not all arguments are known",
                signature
            );
            self.give_up(vm, node.context_mut().state_mut(), reconciled);
            return (
                SideEffect::Strong,
                InvokeOutcome::AssumedUnknown(GiveUpReason::UnknownArguments),
            );
        }

        self.execute_non_local(vm, node, target, callee, reconciled)
    }

    /// A callee frame holding only the parameters, sharing the caller's heap.
    fn build_non_local_context(
        &self,
        caller: &mut ExecutionContext,
        reconciled: &[TypeName],
    ) -> ExecutionContext {
        let mut state = MethodState::for_parameters(&self.method);
        marshal_arguments(
            &self.parameter_registers,
            reconciled,
            caller.state_mut(),
            &mut state,
        );
        let mut callee =
            ExecutionContext::new(Arc::clone(&self.method), state, Arc::clone(caller.heap()));
        callee.register_caller(caller, self.address);
        callee
    }

    fn execute_non_local(
        &self,
        vm: &VirtualMachine,
        node: &mut ExecutionNode,
        target: &VirtualMethodRc,
        mut callee: ExecutionContext,
        reconciled: &[TypeName],
    ) -> (SideEffect, InvokeOutcome) {
        let signature = target.signature();
        let mut side_effect = SideEffect::Strong;

        if vm.emulator().can_emulate(signature) {
            match vm.emulator().emulate(vm, &mut callee, signature) {
                Ok(result) => {
                    side_effect = result.side_effect;
                    if !result.exceptions.is_empty() {
                        let count = result.exceptions.len();
                        node.clear_children();
                        node.set_exceptions(result.exceptions);
                        return (side_effect, InvokeOutcome::Raised(count));
                    }
                }
                Err(error) => {
                    log::warn!("Emulating {} failed: {}", signature, error);
                    self.give_up(vm, node.context_mut().state_mut(), reconciled);
                    return (
                        SideEffect::Strong,
                        InvokeOutcome::Indeterminate(VmError::from(error)),
                    );
                }
            }
        } else if vm.configuration().is_safe(signature) {
            debug_assert!(all_arguments_known(&self.method, callee.state()));

            let (state, heap) = callee.state_and_heap();
            if let Err(error) = vm.reflector().reflect(target, state, heap) {
                log::debug!("Reflecting {} raised {}", signature, error);
                node.clear_children();
                node.set_exceptions(vec![VirtualException::from(error)]);
                return (side_effect, InvokeOutcome::Raised(1));
            }
            side_effect = SideEffect::None;
        }

        let caller = node.context_mut();
        if !self.method.is_static() {
            if let Err(error) = self.propagate_receiver(vm, caller, &callee) {
                log::error!(
                    "Failed to propagate receiver of {} at {:#x}: {}",
                    signature,
                    self.address,
                    error
                );
                return (side_effect, InvokeOutcome::InternalFault(error.to_string()));
            }
        }
        if !self.method.returns_void() {
            let returned = callee.state_mut().read_return_register();
            caller.state_mut().assign_result_register(returned);
        }

        (side_effect, InvokeOutcome::Completed)
    }

    /// Copies a possibly initialized or mutated receiver back to the caller.
    fn propagate_receiver(
        &self,
        vm: &VirtualMachine,
        caller: &mut ExecutionContext,
        callee: &ExecutionContext,
    ) -> Result<()> {
        let Some(&receiver) = self.parameter_registers.first() else {
            return Ok(());
        };
        let original = caller.state().peek_register(receiver);
        let updated = callee.state().peek_parameter(0);

        let identity_changed = match (original.reference_handle(), updated.reference_handle()) {
            (Some(a), Some(b)) => !caller.heap().same_identity(a, b),
            _ => original.value() != updated.value(),
        };

        if identity_changed {
            let (state, heap) = caller.state_and_heap();
            state.assign_register_and_update_identities(receiver, updated, heap)?;
        } else if !vm.configuration().is_immutable(updated.type_name()) {
            caller.state_mut().assign_register(receiver, updated);
        }
        Ok(())
    }

    fn execute_local(
        &self,
        vm: &VirtualMachine,
        node: &mut ExecutionNode,
        target: &VirtualMethodRc,
        reconciled: &[TypeName],
    ) -> (SideEffect, InvokeOutcome) {
        let signature = target.signature();
        let caller = node.context_mut();

        let mut callee = vm.spawn_root_context(target, Some(&*caller), self.address);
        marshal_arguments(
            &self.parameter_registers,
            reconciled,
            caller.state_mut(),
            callee.state_mut(),
        );
        let instance_register = callee.state().parameter_start();

        let graph = match vm.execute(signature, callee, Some(&*caller), self.address) {
            Ok(Some(graph)) => graph,
            Ok(None) => {
                log::info!("Problem executing {}, propagating ambiguity", signature);
                self.give_up(vm, caller.state_mut(), reconciled);
                return (
                    SideEffect::Strong,
                    InvokeOutcome::AssumedUnknown(GiveUpReason::RecursionAborted),
                );
            }
            Err(error) => {
                log::warn!("Executing {} failed: {}", signature, error);
                self.give_up(vm, caller.state_mut(), reconciled);
                return (SideEffect::Strong, InvokeOutcome::Indeterminate(error));
            }
        };

        if !self.method.returns_void() {
            let consensus = graph.terminating_register_consensus(Register::Return);
            caller.state_mut().assign_result_register(consensus);
        } else if name::is_constructor_signature(signature) {
            let instance = graph.terminating_register_consensus(Register::Index(instance_register));
            if let Some(&receiver) = self.parameter_registers.first() {
                let (state, heap) = caller.state_and_heap();
                if let Err(error) = state.assign_register_and_update_identities(receiver, instance, heap)
                {
                    log::error!(
                        "Failed to propagate constructed instance of {}: {}",
                        signature,
                        error
                    );
                    return (
                        graph.highest_side_effect_level(),
                        InvokeOutcome::InternalFault(error.to_string()),
                    );
                }
            }
        }

        (graph.highest_side_effect_level(), InvokeOutcome::Completed)
    }

    /// Widens the caller state after a call that could not be resolved.
    fn give_up(&self, vm: &VirtualMachine, state: &mut MethodState, reconciled: &[TypeName]) {
        let initializing = name::is_constructor_signature(self.method.signature());
        for (&register, parameter_type) in self.parameter_registers.iter().zip(reconciled) {
            let item = state.read_register(register);
            if item.is_null() {
                continue;
            }

            // An initializer changes internal state even of immutable types.
            if !initializing {
                if vm.configuration().is_immutable(parameter_type) {
                    log::trace!("{} (parameter) is immutable", parameter_type);
                    continue;
                }
                if item.is_immutable() || vm.configuration().is_immutable(item.type_name()) {
                    log::trace!("{} (actual {}) is immutable", parameter_type, item.type_name());
                    continue;
                }
            }

            log::debug!(
                "{} is mutable and passed to an unresolved call, marking unknown",
                parameter_type
            );
            state.poke_register(register, HeapItem::unknown(parameter_type.clone()));
        }

        if !self.method.returns_void() {
            state.assign_result_register(HeapItem::unknown(self.method.return_type().clone()));
        }
    }
}

impl fmt::Display for InvokeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.kind)?;
        if self.kind.is_range() {
            if let (Some(first), Some(last)) =
                (self.parameter_registers.first(), self.parameter_registers.last())
            {
                write!(f, "r{first} .. r{last}")?;
            }
        } else {
            for (i, register) in self.parameter_registers.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "r{register}")?;
            }
        }
        write!(f, "}}, {}", self.method)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::types::{MethodFlags, VirtualMethod};

    fn method(signature: &str, flags: MethodFlags) -> VirtualMethodRc {
        Arc::new(VirtualMethod::new(signature, flags).unwrap())
    }

    #[test]
    fn test_kind_parsing() {
        for (mnemonic, kind) in [
            ("invoke-virtual", InvokeKind::Virtual),
            ("invoke-super/range", InvokeKind::SuperRange),
            ("invoke-direct", InvokeKind::Direct),
            ("invoke-static/range", InvokeKind::StaticRange),
            ("invoke-interface", InvokeKind::Interface),
        ] {
            assert_eq!(InvokeKind::from_str(mnemonic).unwrap(), kind);
            assert_eq!(kind.to_string(), mnemonic);
        }
        assert!(InvokeKind::from_str("invoke-polymorphic").is_err());
        assert!(!InvokeKind::Interface.is_virtual());
        assert!(!InvokeKind::Static.is_range());
    }

    #[test]
    fn test_new_checks_register_count() {
        let m = method("Lapp/A;->f(II)V", MethodFlags::STATIC);
        assert!(InvokeOp::new(0, InvokeKind::Static, Arc::clone(&m), vec![0]).is_err());
        assert!(InvokeOp::new(0, InvokeKind::Static, m, vec![0, 1]).is_ok());
    }

    #[test]
    fn test_from_registers_collapses_wide_pairs() {
        let m = method("Lapp/A;->f(DIJ)V", MethodFlags::STATIC);
        let op = InvokeOp::from_registers(0, InvokeKind::Static, Arc::clone(&m), &[1, 2, 3, 4, 5])
            .unwrap();
        assert_eq!(op.parameter_registers(), &[1, 3, 4]);
        assert!(InvokeOp::from_registers(0, InvokeKind::Static, m, &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_from_range() {
        let m = method("Lapp/A;->f(JJ)J", MethodFlags::PUBLIC);
        let op = InvokeOp::from_range(4, InvokeKind::VirtualRange, Arc::clone(&m), 10, 5).unwrap();
        assert_eq!(op.parameter_registers(), &[10, 11, 13]);
        assert_eq!(op.address(), 4);
        assert_eq!(&**op.return_type(), "J");
        assert_eq!(
            op.to_string(),
            "invoke-virtual/range {r10 .. r13}, Lapp/A;->f(JJ)J"
        );
        assert!(InvokeOp::from_range(0, InvokeKind::VirtualRange, m, u16::MAX, 5).is_err());
    }

    #[test]
    fn test_display_without_arguments() {
        let m = method("Lapp/A;->f()V", MethodFlags::STATIC);
        let op = InvokeOp::new(0, InvokeKind::Static, m, Vec::new()).unwrap();
        assert_eq!(op.to_string(), "invoke-static {}, Lapp/A;->f()V");
    }

    #[test]
    fn test_object_init_on_initialized_receiver_faults() {
        let vm = crate::test::vm();
        let heap = vm.new_heap();
        let mut node = crate::test::caller_node(&heap, 1);
        let built = heap.alloc(Instance::Object(name::OBJECT.into())).unwrap();
        node.context_mut()
            .state_mut()
            .assign_register(0, HeapItem::reference(built, name::OBJECT));

        let init = method(name::OBJECT_INIT, MethodFlags::PUBLIC);
        let op = InvokeOp::new(0, InvokeKind::Direct, init, vec![0]).unwrap();
        let invocation = op.execute(&vm, &mut node);

        assert!(matches!(invocation.outcome, InvokeOutcome::InternalFault(_)));
        assert_eq!(invocation.strategy, ExecutionStrategy::ConstructObject);
        assert_eq!(node.side_effect(), SideEffect::Strong);
    }

    #[test]
    fn test_unknown_argument_to_reflected_method_gives_up() {
        let vm = crate::test::vm();
        let heap = vm.new_heap();
        let mut node = crate::test::caller_node(&heap, 2);
        node.context_mut()
            .state_mut()
            .assign_register(0, HeapItem::unknown("I"));
        node.context_mut()
            .state_mut()
            .assign_register(1, HeapItem::int(4));

        let max = method("Ljava/lang/Math;->max(II)I", MethodFlags::STATIC);
        let op = InvokeOp::new(0, InvokeKind::Static, max, vec![0, 1]).unwrap();
        let invocation = op.execute(&vm, &mut node);

        assert_eq!(
            invocation.outcome,
            InvokeOutcome::AssumedUnknown(GiveUpReason::UnknownArguments)
        );
        assert_eq!(invocation.strategy, ExecutionStrategy::EmulateOrReflect);
        let state = node.context().state();
        assert_eq!(state.peek(Register::Result), HeapItem::unknown("I"));
        assert_eq!(state.peek_register(1), HeapItem::int(4));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(GiveUpReason::UnsafeFramework.to_string(), "unsafe-framework");
        assert_eq!(GiveUpReason::RecursionAborted.to_string(), "recursion-aborted");
    }
}

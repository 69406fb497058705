//! Invocation resolution.
//!
//! Given an `invoke-*` instruction in an analyzed method, this module decides
//! how the call is executed and propagates its effects back into the caller:
//!
//! | Strategy | Taken when | Execution |
//! |----------|------------|-----------|
//! | [`ExecutionStrategy::ConstructObject`] | `Object.<init>()` on a placeholder | [`ObjectInstantiator`](crate::vm::ObjectInstantiator), identity replaced in the caller |
//! | [`ExecutionStrategy::EmulateOrReflect`] | target is emulated or configured safe | [`MethodEmulator`](crate::emulate::MethodEmulator) or [`MethodReflector`](crate::reflect::MethodReflector) on a parameter-only frame |
//! | [`ExecutionStrategy::UnsafeFramework`] | framework class not whitelisted | none, caller widened |
//! | [`ExecutionStrategy::NoImplementation`] | no body or native | none, caller widened |
//! | [`ExecutionStrategy::LocalRecurse`] | application method with a body | [`VirtualMachine::execute`](crate::vm::VirtualMachine::execute) |
//!
//! `Object.<init>()` is recognized before argument reconciliation and
//! dispatch, so it never reads more than its receiver.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use smaliscope::{
//!     context::{ExecutionContext, ExecutionNode, HeapItem, MethodState, Register, Value},
//!     opcode::{InvokeKind, InvokeOp, InvokeOutcome},
//!     types::{ClassManager, MethodFlags, VirtualMethod},
//!     vm::VirtualMachine,
//! };
//!
//! let vm = VirtualMachine::builder(Arc::new(ClassManager::new())).build();
//!
//! let caller = Arc::new(VirtualMethod::new("Lapp/Main;->run()V", MethodFlags::STATIC)?.with_body(2));
//! let mut state = MethodState::for_method(&caller);
//! state.assign_register(0, HeapItem::int(3));
//! state.assign_register(1, HeapItem::int(9));
//! let mut node = ExecutionNode::new(0, ExecutionContext::new(caller, state, vm.new_heap()));
//!
//! let max = Arc::new(VirtualMethod::new("Ljava/lang/Math;->max(II)I", MethodFlags::STATIC)?);
//! let op = InvokeOp::new(0, InvokeKind::Static, max, vec![0, 1])?;
//!
//! let invocation = op.execute(&vm, &mut node);
//! assert_eq!(invocation.outcome, InvokeOutcome::Completed);
//! assert_eq!(node.context().state().peek(Register::Result).value(), Value::Int(9));
//! # Ok::<(), smaliscope::Error>(())
//! ```

mod invoke;
mod params;
mod strategy;

pub use invoke::{GiveUpReason, Invocation, InvokeKind, InvokeOp, InvokeOutcome};
pub use params::reconcile_type;
pub use strategy::ExecutionStrategy;

//! Runtime state of analyzed methods.
//!
//! This module holds the data the invocation resolver reads and writes:
//!
//! - [`Value`] / [`HeapItem`] - typed register contents
//! - [`Heap`] / [`Instance`] - the object arena registers point into
//! - [`MethodState`] - one invocation's register file
//! - [`ExecutionContext`] - method, register file, heap and call stack
//! - [`ExecutionGraph`] / [`ExecutionNode`] - explored paths of an interpreted body
//! - [`SideEffect`] - effect classification of an instruction
//! - [`VirtualException`] - exceptions the analyzed code would throw

#[allow(clippy::module_inception)]
mod context;
mod exception;
mod graph;
mod heap;
mod item;
mod sideeffect;
mod state;
mod value;

pub use context::{ExecutionContext, StackFrame};
pub use exception::VirtualException;
pub use graph::{ExecutionGraph, ExecutionNode, NodeId};
pub use heap::{Heap, Instance, DEFAULT_MAX_INSTANCES};
pub use item::HeapItem;
pub use sideeffect::SideEffect;
pub use state::{MethodState, Register};
pub use value::{InstanceRef, Value};

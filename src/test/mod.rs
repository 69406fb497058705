//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::{
    context::{ExecutionContext, ExecutionNode, Heap, MethodState},
    types::{ClassManager, MethodFlags, VirtualMethod},
    vm::VirtualMachine,
};

// Helper function to create a virtual machine with default collaborators
pub fn vm() -> VirtualMachine {
    VirtualMachine::builder(Arc::new(ClassManager::new())).build()
}

// Helper function to create a parameter-only frame for `signature` on a shared heap
pub fn callee_context(heap: &Arc<Heap>, signature: &str, is_static: bool) -> ExecutionContext {
    let flags = if is_static {
        MethodFlags::PUBLIC | MethodFlags::STATIC
    } else {
        MethodFlags::PUBLIC
    };
    let method = Arc::new(VirtualMethod::new(signature, flags).unwrap());
    let state = MethodState::for_parameters(&method);
    ExecutionContext::new(method, state, Arc::clone(heap))
}

// Helper function to create a caller node with `registers` locals and no parameters
pub fn caller_node(heap: &Arc<Heap>, registers: u16) -> ExecutionNode {
    let method = Arc::new(
        VirtualMethod::new("Lapp/Caller;->run()V", MethodFlags::STATIC)
            .unwrap()
            .with_body(registers),
    );
    let state = MethodState::for_method(&method);
    ExecutionNode::new(0, ExecutionContext::new(method, state, Arc::clone(heap)))
}

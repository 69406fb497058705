//! Execution context of one method invocation.

use std::{fmt, sync::Arc};

use crate::{
    context::{heap::Heap, state::MethodState},
    types::{method::VirtualMethodRc, name},
};

/// One caller frame: the calling method and the address of its invoke.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    /// Signature of the calling method.
    pub signature: Arc<str>,
    /// Code address of the invoke instruction in the caller.
    pub address: usize,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{:#x}", self.signature, self.address)
    }
}

/// Everything needed to run one method: its descriptor, its register file,
/// the heap it allocates into and the chain of callers that led here.
///
/// The heap is shared with the caller. Two contexts spawned from the same
/// caller see each other's allocations unless one of them is given a
/// [`fork`](Heap::fork) of the heap.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    method: VirtualMethodRc,
    state: MethodState,
    heap: Arc<Heap>,
    call_stack: Vec<StackFrame>,
}

impl ExecutionContext {
    /// Creates a root context with an empty call stack.
    #[must_use]
    pub fn new(method: VirtualMethodRc, state: MethodState, heap: Arc<Heap>) -> Self {
        ExecutionContext {
            method,
            state,
            heap,
            call_stack: Vec::new(),
        }
    }

    /// Links this context to `caller`, which invoked it from `address`.
    pub fn register_caller(&mut self, caller: &ExecutionContext, address: usize) {
        self.call_stack = caller.call_stack.clone();
        self.call_stack.push(StackFrame {
            signature: Arc::from(caller.method.signature()),
            address,
        });
    }

    /// The method being executed.
    #[must_use]
    pub fn method(&self) -> &VirtualMethodRc {
        &self.method
    }

    /// The register file.
    #[must_use]
    pub fn state(&self) -> &MethodState {
        &self.state
    }

    /// The register file, mutably.
    pub fn state_mut(&mut self) -> &mut MethodState {
        &mut self.state
    }

    /// Consumes the context, returning its register file.
    #[must_use]
    pub fn into_state(self) -> MethodState {
        self.state
    }

    /// The shared heap.
    #[must_use]
    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    /// Register file and heap at the same time.
    pub fn state_and_heap(&mut self) -> (&mut MethodState, &Heap) {
        (&mut self.state, &self.heap)
    }

    /// Caller frames, outermost first.
    #[must_use]
    pub fn call_stack(&self) -> &[StackFrame] {
        &self.call_stack
    }

    /// Number of callers above this context.
    #[must_use]
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Renders a stack trace, innermost frame first.
    #[must_use]
    pub fn stack_trace(&self) -> String {
        let mut trace = format!("at {}", self.method.signature());
        for frame in self.call_stack.iter().rev() {
            trace.push_str("\n  at ");
            trace.push_str(&frame.to_string());
        }
        trace
    }

    /// Runtime type of the value in register `index`, looking through heap
    /// references.
    #[must_use]
    pub fn runtime_type_of(&self, index: u16) -> Arc<str> {
        let item = self.state.peek_register(index);
        item.reference_handle()
            .and_then(|handle| self.heap.type_name_of(handle).ok())
            .unwrap_or_else(|| {
                if item.is_null() {
                    Arc::from(name::OBJECT)
                } else {
                    item.type_name().clone()
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::HeapItem,
        types::{MethodFlags, VirtualMethod},
    };

    fn context_for(signature: &str) -> ExecutionContext {
        let method = Arc::new(
            VirtualMethod::new(signature, MethodFlags::STATIC)
                .unwrap()
                .with_body(2),
        );
        let state = MethodState::for_method(&method);
        ExecutionContext::new(method, state, Arc::new(Heap::default()))
    }

    #[test]
    fn test_call_stack_grows() {
        let root = context_for("Lapp/A;->main()V");
        let mut middle = context_for("Lapp/B;->step()V");
        middle.register_caller(&root, 0x10);
        let mut leaf = context_for("Lapp/C;->leaf()V");
        leaf.register_caller(&middle, 0x4);

        assert_eq!(leaf.call_depth(), 2);
        assert_eq!(&*leaf.call_stack()[0].signature, "Lapp/A;->main()V");
        assert_eq!(
            leaf.stack_trace(),
            "at Lapp/C;->leaf()V\n  at Lapp/B;->step()V @0x4\n  at Lapp/A;->main()V @0x10"
        );
    }

    #[test]
    fn test_runtime_type_follows_heap() {
        let mut context = context_for("Lapp/A;->main()V");
        let handle = context.heap().alloc_string("x").unwrap();
        context
            .state_mut()
            .assign_register(0, HeapItem::reference(handle, name::OBJECT));
        assert_eq!(&*context.runtime_type_of(0), name::STRING);
        context.state_mut().assign_register(1, HeapItem::int(1));
        assert_eq!(&*context.runtime_type_of(1), "I");
    }
}

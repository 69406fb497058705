//! The virtual machine facade.
//!
//! [`VirtualMachine`] owns every collaborator the invocation resolver talks
//! to and is the entry point for nested execution:
//!
//! - [`ClassManager`] - classes, methods and hierarchies
//! - [`Configuration`] - safety policy and [`ExecutionLimits`]
//! - [`MethodEmulator`] - emulated framework methods
//! - [`MethodReflector`] - host execution of safe framework methods
//! - [`ObjectInstantiator`] - concrete objects for `Object.<init>`
//! - [`MethodInterpreter`] - the per-opcode loop for local method bodies
//!
//! The interpreter is a trait seam. Without one ([`NoInterpreter`]) every
//! local recursion gives up and the caller's registers are widened to unknown.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use smaliscope::{
//!     types::{ClassManager, MethodFlags, VirtualMethod, VirtualType},
//!     vm::{Configuration, VirtualMachine},
//! };
//!
//! let classes = ClassManager::new();
//! classes.register(
//!     VirtualType::new("Lapp/Main;")
//!         .with_method(VirtualMethod::new("Lapp/Main;->run()V", MethodFlags::PUBLIC)?.with_body(4)),
//! );
//!
//! let vm = VirtualMachine::builder(Arc::new(classes))
//!     .config(Configuration::strict())
//!     .build();
//!
//! let method = vm.classes().method("Lapp/Main;->run()V")?;
//! let context = vm.spawn_root_context(&method, None, 0);
//! assert_eq!(context.state().register_count(), 4);
//! assert!(vm.execute("Lapp/Main;->run()V", context, None, 0)?.is_none());
//! # Ok::<(), smaliscope::Error>(())
//! ```

mod config;

use std::sync::Arc;

use crate::{
    context::{ExecutionContext, ExecutionGraph, Heap, Instance, MethodState},
    emulate::MethodEmulator,
    reflect::{BuiltinReflector, MethodReflector},
    types::{name, ClassManager, VirtualMethodRc, VirtualType},
    Error, Result, VmError,
};

pub use config::{Configuration, ExecutionLimits};

/// Runs the body of an application method.
///
/// Implementations walk the method's instructions starting from `context`
/// and record every explored path in an [`ExecutionGraph`]. Invoke
/// instructions are handed back to
/// [`InvokeOp::execute`](crate::opcode::InvokeOp::execute) with the same `vm`.
pub trait MethodInterpreter: Send + Sync {
    /// Interprets `method` from the state in `context`.
    ///
    /// Returns `Ok(None)` if the interpreter gave up (for example because a
    /// visit limit was reached).
    ///
    /// # Errors
    ///
    /// Returns a [`VmError`] if execution hit an unrecoverable fault.
    fn interpret(
        &self,
        vm: &VirtualMachine,
        method: &VirtualMethodRc,
        context: ExecutionContext,
    ) -> std::result::Result<Option<ExecutionGraph>, VmError>;
}

/// Creates concrete objects for placeholders completing `Object.<init>`.
pub trait ObjectInstantiator: Send + Sync {
    /// Creates an instance of `virtual_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Instantiation`] if the type cannot be instantiated.
    fn instantiate(&self, virtual_type: &VirtualType) -> Result<Instance>;
}

/// Instantiates any concrete class.
///
/// Strings and string builders start empty so the emulated `java.lang`
/// methods can operate on them; every other class becomes a plain
/// [`Instance::Object`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultInstantiator;

impl ObjectInstantiator for DefaultInstantiator {
    fn instantiate(&self, virtual_type: &VirtualType) -> Result<Instance> {
        if virtual_type.is_abstract() {
            return Err(Error::Instantiation(format!(
                "{} is abstract or an interface",
                virtual_type.name()
            )));
        }
        Ok(match &**virtual_type.name() {
            name::STRING => Instance::String(Arc::from("")),
            name::STRING_BUILDER => Instance::StringBuilder(String::new()),
            _ => Instance::Object(virtual_type.name().clone()),
        })
    }
}

/// An interpreter that never runs anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInterpreter;

impl MethodInterpreter for NoInterpreter {
    fn interpret(
        &self,
        _vm: &VirtualMachine,
        method: &VirtualMethodRc,
        _context: ExecutionContext,
    ) -> std::result::Result<Option<ExecutionGraph>, VmError> {
        log::trace!("No interpreter installed, skipping {}", method);
        Ok(None)
    }
}

/// Shared state of one analysis run.
#[derive(Clone)]
pub struct VirtualMachine {
    classes: Arc<ClassManager>,
    config: Arc<Configuration>,
    emulator: Arc<MethodEmulator>,
    reflector: Arc<dyn MethodReflector>,
    instantiator: Arc<dyn ObjectInstantiator>,
    interpreter: Arc<dyn MethodInterpreter>,
}

impl VirtualMachine {
    /// Starts building a virtual machine over `classes`.
    #[must_use]
    pub fn builder(classes: Arc<ClassManager>) -> VirtualMachineBuilder {
        VirtualMachineBuilder::new(classes)
    }

    /// The class catalog.
    #[must_use]
    pub fn classes(&self) -> &Arc<ClassManager> {
        &self.classes
    }

    /// The active configuration.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// The emulated-method registry.
    #[must_use]
    pub fn emulator(&self) -> &MethodEmulator {
        &self.emulator
    }

    /// The host reflection bridge.
    #[must_use]
    pub fn reflector(&self) -> &dyn MethodReflector {
        self.reflector.as_ref()
    }

    /// The object instantiator.
    #[must_use]
    pub fn instantiator(&self) -> &dyn ObjectInstantiator {
        self.instantiator.as_ref()
    }

    /// Creates an empty heap bounded by the configured instance limit.
    #[must_use]
    pub fn new_heap(&self) -> Arc<Heap> {
        Arc::new(Heap::new(self.config.limits.max_heap_instances))
    }

    /// Creates a context for interpreting `method` from its first instruction.
    ///
    /// With a `caller`, the new context shares the caller's heap and extends
    /// its call stack with a frame for `address`. Without one, it gets a
    /// fresh heap and an empty call stack.
    #[must_use]
    pub fn spawn_root_context(
        &self,
        method: &VirtualMethodRc,
        caller: Option<&ExecutionContext>,
        address: usize,
    ) -> ExecutionContext {
        let heap = caller.map_or_else(|| self.new_heap(), |caller| Arc::clone(caller.heap()));
        let mut context =
            ExecutionContext::new(Arc::clone(method), MethodState::for_method(method), heap);
        if let Some(caller) = caller {
            context.register_caller(caller, address);
        }
        context
    }

    /// Interprets the method of `callee`, invoked as `signature` by `caller`
    /// at `address`.
    ///
    /// Returns `Ok(None)` without running the interpreter once the callee's
    /// call depth exceeds [`ExecutionLimits::max_call_depth`].
    ///
    /// # Errors
    ///
    /// Returns whatever the [`MethodInterpreter`] fails with.
    pub fn execute(
        &self,
        signature: &str,
        callee: ExecutionContext,
        caller: Option<&ExecutionContext>,
        address: usize,
    ) -> std::result::Result<Option<ExecutionGraph>, VmError> {
        if callee.call_depth() > self.config.limits.max_call_depth {
            log::debug!(
                "Call depth {} exceeds limit {}, not executing {} (from {:?} @{:#x})",
                callee.call_depth(),
                self.config.limits.max_call_depth,
                signature,
                caller.map(|caller| caller.method().signature()),
                address
            );
            return Ok(None);
        }

        let method = Arc::clone(callee.method());
        self.interpreter.interpret(self, &method, callee)
    }
}

/// Builder for [`VirtualMachine`].
///
/// By default the builder uses [`Configuration::default()`],
/// [`MethodEmulator::with_builtins()`], the [`BuiltinReflector`], the
/// [`DefaultInstantiator`] and [`NoInterpreter`].
pub struct VirtualMachineBuilder {
    classes: Arc<ClassManager>,
    config: Configuration,
    emulator: MethodEmulator,
    reflector: Arc<dyn MethodReflector>,
    instantiator: Arc<dyn ObjectInstantiator>,
    interpreter: Arc<dyn MethodInterpreter>,
}

impl VirtualMachineBuilder {
    /// Creates a builder with default collaborators.
    #[must_use]
    pub fn new(classes: Arc<ClassManager>) -> Self {
        VirtualMachineBuilder {
            classes,
            config: Configuration::default(),
            emulator: MethodEmulator::with_builtins(),
            reflector: Arc::new(BuiltinReflector),
            instantiator: Arc::new(DefaultInstantiator),
            interpreter: Arc::new(NoInterpreter),
        }
    }

    /// Sets the configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration to use
    ///
    /// # Returns
    ///
    /// The builder for chaining.
    #[must_use]
    pub fn config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    /// Replaces the emulated-method registry.
    #[must_use]
    pub fn emulator(mut self, emulator: MethodEmulator) -> Self {
        self.emulator = emulator;
        self
    }

    /// Replaces the reflection bridge.
    #[must_use]
    pub fn reflector(mut self, reflector: impl MethodReflector + 'static) -> Self {
        self.reflector = Arc::new(reflector);
        self
    }

    /// Replaces the object instantiator.
    #[must_use]
    pub fn instantiator(mut self, instantiator: impl ObjectInstantiator + 'static) -> Self {
        self.instantiator = Arc::new(instantiator);
        self
    }

    /// Installs the interpreter used for local recursion.
    #[must_use]
    pub fn interpreter(mut self, interpreter: impl MethodInterpreter + 'static) -> Self {
        self.interpreter = Arc::new(interpreter);
        self
    }

    /// Builds the virtual machine.
    #[must_use]
    pub fn build(self) -> VirtualMachine {
        VirtualMachine {
            classes: self.classes,
            config: Arc::new(self.config),
            emulator: Arc::new(self.emulator),
            reflector: self.reflector,
            instantiator: self.instantiator,
            interpreter: self.interpreter,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        context::ExecutionNode,
        types::{ClassFlags, MethodFlags, VirtualMethod},
    };

    struct CountingInterpreter(AtomicUsize);

    impl MethodInterpreter for CountingInterpreter {
        fn interpret(
            &self,
            vm: &VirtualMachine,
            method: &VirtualMethodRc,
            context: ExecutionContext,
        ) -> std::result::Result<Option<ExecutionGraph>, VmError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            let root = ExecutionNode::new(0, context);
            Ok(Some(ExecutionGraph::new(
                Arc::clone(vm.classes()),
                Arc::clone(method),
                root,
            )))
        }
    }

    fn method() -> VirtualMethodRc {
        Arc::new(
            VirtualMethod::new("Lapp/A;->f(I)V", MethodFlags::STATIC)
                .unwrap()
                .with_body(3),
        )
    }

    #[test]
    fn test_default_instantiator() {
        let instantiator = DefaultInstantiator;
        assert_eq!(
            instantiator
                .instantiate(&VirtualType::new(name::STRING_BUILDER))
                .unwrap(),
            Instance::StringBuilder(String::new())
        );
        assert_eq!(
            instantiator
                .instantiate(&VirtualType::new("Lapp/A;"))
                .unwrap(),
            Instance::Object("Lapp/A;".into())
        );
        let interface = VirtualType::new("Lapp/I;").with_flags(ClassFlags::INTERFACE);
        assert!(matches!(
            instantiator.instantiate(&interface),
            Err(Error::Instantiation(_))
        ));
    }

    #[test]
    fn test_spawn_root_context() {
        let vm = VirtualMachine::builder(Arc::new(ClassManager::new())).build();
        let method = method();
        let root = vm.spawn_root_context(&method, None, 0);
        assert_eq!(root.state().register_count(), 3);
        assert_eq!(root.state().parameter_start(), 2);
        assert_eq!(root.call_depth(), 0);

        let nested = vm.spawn_root_context(&method, Some(&root), 0x10);
        assert_eq!(nested.call_depth(), 1);
        assert!(Arc::ptr_eq(nested.heap(), root.heap()));
        assert_eq!(nested.call_stack()[0].address, 0x10);
    }

    #[test]
    fn test_execute_without_interpreter() {
        let vm = VirtualMachine::builder(Arc::new(ClassManager::new())).build();
        let method = method();
        let context = vm.spawn_root_context(&method, None, 0);
        assert!(vm
            .execute(method.signature(), context, None, 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_execute_respects_call_depth() {
        let interpreter = Arc::new(CountingInterpreter(AtomicUsize::new(0)));
        let vm = VirtualMachine::builder(Arc::new(ClassManager::new()))
            .config(Configuration::default().with_limits(ExecutionLimits::new().with_max_call_depth(1)))
            .interpreter(SharedInterpreter(Arc::clone(&interpreter)))
            .build();
        let method = method();

        let root = vm.spawn_root_context(&method, None, 0);
        let depth_one = vm.spawn_root_context(&method, Some(&root), 0);
        let depth_two = vm.spawn_root_context(&method, Some(&depth_one), 0);

        assert!(vm
            .execute(method.signature(), depth_one.clone(), Some(&root), 0)
            .unwrap()
            .is_some());
        assert!(vm
            .execute(method.signature(), depth_two, Some(&depth_one), 0)
            .unwrap()
            .is_none());
        assert_eq!(interpreter.0.load(Ordering::SeqCst), 1);
    }

    struct SharedInterpreter(Arc<CountingInterpreter>);

    impl MethodInterpreter for SharedInterpreter {
        fn interpret(
            &self,
            vm: &VirtualMachine,
            method: &VirtualMethodRc,
            context: ExecutionContext,
        ) -> std::result::Result<Option<ExecutionGraph>, VmError> {
            self.0.interpret(vm, method, context)
        }
    }

    #[test]
    fn test_new_heap_uses_limit() {
        let vm = VirtualMachine::builder(Arc::new(ClassManager::new()))
            .config(Configuration::default().with_limits(ExecutionLimits::new().with_max_heap_instances(1)))
            .build();
        let heap = vm.new_heap();
        heap.alloc_string("a").unwrap();
        assert!(matches!(heap.alloc_string("b"), Err(Error::HeapLimit(1))));
    }
}

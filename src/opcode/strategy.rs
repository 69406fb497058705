//! Choosing how a resolved call target is executed.

use strum::Display;

use crate::{
    types::{name, VirtualMethod},
    vm::VirtualMachine,
};

/// How the resolver executes a call target.
///
/// Strategies are checked in declaration order; the first that applies wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ExecutionStrategy {
    /// `Object.<init>()` completing a `new-instance` placeholder.
    ConstructObject,
    /// The target is emulated or safe to run on the host.
    EmulateOrReflect,
    /// The target belongs to the framework and may not run on the host.
    UnsafeFramework,
    /// The target has no body to interpret.
    NoImplementation {
        /// The method is declared `native`.
        native: bool,
    },
    /// The target's body is interpreted by a nested execution.
    LocalRecurse,
}

impl ExecutionStrategy {
    /// Selects the strategy for `target`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use smaliscope::{
    ///     opcode::ExecutionStrategy,
    ///     types::{ClassManager, MethodFlags, VirtualMethod},
    ///     vm::VirtualMachine,
    /// };
    ///
    /// let vm = VirtualMachine::builder(Arc::new(ClassManager::new())).build();
    /// let sleep = VirtualMethod::new("Ljava/lang/Thread;->sleep(J)V", MethodFlags::STATIC)?;
    /// assert_eq!(ExecutionStrategy::classify(&vm, &sleep), ExecutionStrategy::UnsafeFramework);
    /// # Ok::<(), smaliscope::Error>(())
    /// ```
    #[must_use]
    pub fn classify(vm: &VirtualMachine, target: &VirtualMethod) -> Self {
        let signature = target.signature();
        if signature == name::OBJECT_INIT {
            ExecutionStrategy::ConstructObject
        } else if vm.configuration().is_safe(signature) || vm.emulator().can_emulate(signature) {
            ExecutionStrategy::EmulateOrReflect
        } else if vm.classes().is_framework_class(signature)
            && !vm.classes().is_safe_framework_class(signature)
        {
            ExecutionStrategy::UnsafeFramework
        } else if !target.has_implementation() {
            ExecutionStrategy::NoImplementation {
                native: target.is_native(),
            }
        } else {
            ExecutionStrategy::LocalRecurse
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        types::{ClassManager, MethodFlags, VirtualType},
        vm::Configuration,
    };

    fn vm(classes: ClassManager, config: Configuration) -> VirtualMachine {
        VirtualMachine::builder(Arc::new(classes)).config(config).build()
    }

    #[test]
    fn test_safe_beats_framework() {
        let vm = vm(ClassManager::new(), Configuration::default());
        let max = VirtualMethod::new("Ljava/lang/Math;->max(II)I", MethodFlags::STATIC).unwrap();
        assert_eq!(
            ExecutionStrategy::classify(&vm, &max),
            ExecutionStrategy::EmulateOrReflect
        );
        let to_string = VirtualMethod::new(
            "Ljava/lang/StringBuilder;->toString()Ljava/lang/String;",
            MethodFlags::PUBLIC,
        )
        .unwrap();
        assert_eq!(
            ExecutionStrategy::classify(&vm, &to_string),
            ExecutionStrategy::EmulateOrReflect
        );
    }

    #[test]
    fn test_unsafe_framework_unless_whitelisted() {
        let classes = ClassManager::new();
        let method =
            VirtualMethod::new("Landroid/util/Log;->d(Ljava/lang/String;Ljava/lang/String;)I", MethodFlags::STATIC)
                .unwrap();
        let vm_default = vm(ClassManager::new(), Configuration::default());
        assert_eq!(
            ExecutionStrategy::classify(&vm_default, &method),
            ExecutionStrategy::UnsafeFramework
        );

        classes.register_safe_framework_class("Landroid/util/Log;");
        let vm_safe = vm(classes, Configuration::default());
        assert_eq!(
            ExecutionStrategy::classify(&vm_safe, &method),
            ExecutionStrategy::NoImplementation { native: false }
        );
    }

    #[test]
    fn test_application_methods() {
        let classes = ClassManager::new();
        classes.register(VirtualType::new("Lapp/A;"));
        let vm = vm(classes, Configuration::default());

        let native = VirtualMethod::new("Lapp/A;->n()V", MethodFlags::NATIVE).unwrap();
        let missing = VirtualMethod::new("Lapp/A;->m()V", MethodFlags::PUBLIC).unwrap();
        let local = VirtualMethod::new("Lapp/A;->l()V", MethodFlags::PUBLIC)
            .unwrap()
            .with_body(2);

        assert_eq!(
            ExecutionStrategy::classify(&vm, &native),
            ExecutionStrategy::NoImplementation { native: true }
        );
        assert_eq!(
            ExecutionStrategy::classify(&vm, &missing),
            ExecutionStrategy::NoImplementation { native: false }
        );
        assert_eq!(
            ExecutionStrategy::classify(&vm, &local),
            ExecutionStrategy::LocalRecurse
        );
        assert_eq!(ExecutionStrategy::LocalRecurse.to_string(), "local-recurse");
    }

    #[test]
    fn test_object_init_constructs() {
        let vm = vm(ClassManager::new(), Configuration::permissive());
        let init = VirtualMethod::new(name::OBJECT_INIT, MethodFlags::PUBLIC).unwrap();
        assert_eq!(
            ExecutionStrategy::classify(&vm, &init),
            ExecutionStrategy::ConstructObject
        );
        assert_eq!(init.signature(), "Ljava/lang/Object;-><init>()V");
    }

    #[test]
    fn test_configured_safe_application_method() {
        let vm = vm(
            ClassManager::new(),
            Configuration::default().with_safe_method("Lapp/A;->l()V"),
        );
        let local = VirtualMethod::new("Lapp/A;->l()V", MethodFlags::PUBLIC)
            .unwrap()
            .with_body(2);
        assert_eq!(
            ExecutionStrategy::classify(&vm, &local),
            ExecutionStrategy::EmulateOrReflect
        );
    }
}

//! Virtual machine configuration.
//!
//! [`Configuration`] holds the safety policy the invocation resolver consults
//! (which framework methods may run on the host, which types are immutable)
//! together with the [`ExecutionLimits`] that bound nested interpretation.
//!
//! # Presets
//!
//! - [`Configuration::default()`] - balanced limits, built-in reflected methods marked safe
//! - [`Configuration::strict()`] - shallow recursion and small heaps for quick passes
//! - [`Configuration::permissive()`] - deep recursion for whole-program analysis
//!
//! # Example
//!
//! ```rust
//! use smaliscope::vm::{Configuration, ExecutionLimits};
//!
//! let config = Configuration::strict()
//!     .with_safe_class("Lapp/util/Hex;")
//!     .with_unsafe_method("Lapp/util/Hex;->wipe()V")
//!     .with_limits(ExecutionLimits::new().with_max_call_depth(3));
//!
//! assert!(config.is_safe("Lapp/util/Hex;->encode([B)Ljava/lang/String;"));
//! assert!(!config.is_safe("Lapp/util/Hex;->wipe()V"));
//! assert_eq!(config.limits.max_call_depth, 3);
//! ```

use rustc_hash::FxHashSet;

use crate::{reflect::BuiltinReflector, types::name};

/// Safety policy and execution limits.
///
/// # Default Configuration
///
/// - Every signature the [`BuiltinReflector`] implements is a safe method
/// - No safe classes, unsafe methods or extra immutable classes
/// - [`ExecutionLimits::default()`]
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Limits for nested execution.
    pub limits: ExecutionLimits,

    /// Classes whose every method may be executed on the host.
    pub safe_classes: FxHashSet<String>,

    /// Individual methods that may be executed on the host.
    pub safe_methods: FxHashSet<String>,

    /// Methods that must never run on the host, even in a safe class.
    pub unsafe_methods: FxHashSet<String>,

    /// Types treated as immutable on top of the built-in set.
    pub immutable_classes: FxHashSet<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            limits: ExecutionLimits::default(),
            safe_classes: FxHashSet::default(),
            safe_methods: BuiltinReflector::SIGNATURES
                .iter()
                .map(ToString::to_string)
                .collect(),
            unsafe_methods: FxHashSet::default(),
            immutable_classes: FxHashSet::default(),
        }
    }
}

impl Configuration {
    /// Default policy with [`ExecutionLimits::strict()`].
    #[must_use]
    pub fn strict() -> Self {
        Configuration {
            limits: ExecutionLimits::strict(),
            ..Default::default()
        }
    }

    /// Default policy with [`ExecutionLimits::permissive()`].
    #[must_use]
    pub fn permissive() -> Self {
        Configuration {
            limits: ExecutionLimits::permissive(),
            ..Default::default()
        }
    }

    /// Returns `true` if the method may be executed on the host.
    ///
    /// An unsafe-method entry overrides both safe lists.
    #[must_use]
    pub fn is_safe(&self, signature: &str) -> bool {
        if self.unsafe_methods.contains(signature) {
            return false;
        }
        self.safe_methods.contains(signature)
            || self
                .safe_classes
                .contains(name::class_of_signature(signature))
    }

    /// Returns `true` if values of `type_name` cannot be mutated by a call.
    #[must_use]
    pub fn is_immutable(&self, type_name: &str) -> bool {
        name::is_immutable_type(type_name) || self.immutable_classes.contains(type_name)
    }

    /// Replaces the execution limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Marks every method of `class_name` as safe.
    #[must_use]
    pub fn with_safe_class(mut self, class_name: &str) -> Self {
        self.safe_classes.insert(class_name.to_string());
        self
    }

    /// Marks a single method as safe.
    #[must_use]
    pub fn with_safe_method(mut self, signature: &str) -> Self {
        self.safe_methods.insert(signature.to_string());
        self
    }

    /// Forbids host execution of a method.
    #[must_use]
    pub fn with_unsafe_method(mut self, signature: &str) -> Self {
        self.unsafe_methods.insert(signature.to_string());
        self
    }

    /// Adds an immutable type.
    #[must_use]
    pub fn with_immutable_class(mut self, class_name: &str) -> Self {
        self.immutable_classes.insert(class_name.to_string());
        self
    }
}

/// Bounds for nested execution.
///
/// # Default Values
///
/// | Limit | Default | Strict | Permissive |
/// |-------|---------|--------|------------|
/// | `max_call_depth` | 20 | 5 | 50 |
/// | `max_method_visits` | 1,000,000 | 100,000 | 10,000,000 |
/// | `max_address_visits` | 500 | 100 | 10,000 |
/// | `max_heap_instances` | 65,536 | 4,096 | 1,000,000 |
///
/// `max_call_depth` is enforced by
/// [`VirtualMachine::execute`](crate::vm::VirtualMachine::execute); the visit
/// limits are advisory values for [`MethodInterpreter`](crate::vm::MethodInterpreter)
/// implementations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum number of callers above a nested execution.
    pub max_call_depth: usize,

    /// Maximum instructions an interpreter visits per method.
    ///
    /// Not enforced here. Read by [`MethodInterpreter`](crate::vm::MethodInterpreter)
    /// implementations.
    pub max_method_visits: usize,

    /// Maximum visits of a single address, bounding loops.
    ///
    /// Not enforced here. Read by [`MethodInterpreter`](crate::vm::MethodInterpreter)
    /// implementations.
    pub max_address_visits: usize,

    /// Instance limit for heaps created by the virtual machine.
    pub max_heap_instances: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        ExecutionLimits {
            max_call_depth: 20,
            max_method_visits: 1_000_000,
            max_address_visits: 500,
            max_heap_instances: crate::context::DEFAULT_MAX_INSTANCES,
        }
    }
}

impl ExecutionLimits {
    /// Creates limits with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Small limits for quick, shallow passes.
    #[must_use]
    pub fn strict() -> Self {
        ExecutionLimits {
            max_call_depth: 5,
            max_method_visits: 100_000,
            max_address_visits: 100,
            max_heap_instances: 4_096,
        }
    }

    /// Large limits for deep analysis.
    #[must_use]
    pub fn permissive() -> Self {
        ExecutionLimits {
            max_call_depth: 50,
            max_method_visits: 10_000_000,
            max_address_visits: 10_000,
            max_heap_instances: 1_000_000,
        }
    }

    /// Sets the maximum call depth.
    ///
    /// # Arguments
    ///
    /// * `max` - Maximum number of callers above a nested execution
    ///
    /// # Returns
    ///
    /// Returns `self` for method chaining.
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }

    /// Sets the per-method instruction visit limit.
    #[must_use]
    pub fn with_max_method_visits(mut self, max: usize) -> Self {
        self.max_method_visits = max;
        self
    }

    /// Sets the per-address visit limit.
    #[must_use]
    pub fn with_max_address_visits(mut self, max: usize) -> Self {
        self.max_address_visits = max;
        self
    }

    /// Sets the heap instance limit.
    #[must_use]
    pub fn with_max_heap_instances(mut self, max: usize) -> Self {
        self.max_heap_instances = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Configuration::default();
        assert_eq!(config.limits, ExecutionLimits::default());
        assert_eq!(config.limits.max_call_depth, 20);
        assert!(config.is_safe("Ljava/lang/Math;->max(II)I"));
        assert!(!config.is_safe("Ljava/lang/Math;->min(II)I"));
        assert!(config.unsafe_methods.is_empty());
    }

    #[test]
    fn test_presets() {
        assert_eq!(Configuration::strict().limits.max_call_depth, 5);
        assert_eq!(Configuration::strict().limits.max_heap_instances, 4_096);
        assert_eq!(Configuration::permissive().limits.max_call_depth, 50);
        assert_eq!(
            Configuration::permissive().limits.max_address_visits,
            10_000
        );
    }

    #[test]
    fn test_unsafe_overrides_safe() {
        let config = Configuration::default()
            .with_safe_class("Lapp/Util;")
            .with_safe_method("Lapp/Other;->f()V")
            .with_unsafe_method("Lapp/Util;->exit()V")
            .with_unsafe_method("Lapp/Other;->f()V");
        assert!(config.is_safe("Lapp/Util;->hash(I)I"));
        assert!(!config.is_safe("Lapp/Util;->exit()V"));
        assert!(!config.is_safe("Lapp/Other;->f()V"));
    }

    #[test]
    fn test_immutable() {
        let config = Configuration::default().with_immutable_class("Lapp/Point;");
        assert!(config.is_immutable("I"));
        assert!(config.is_immutable("Ljava/lang/String;"));
        assert!(config.is_immutable("Lapp/Point;"));
        assert!(!config.is_immutable("Ljava/lang/StringBuilder;"));
        assert!(!config.is_immutable("[I"));
    }

    #[test]
    fn test_limit_builders() {
        let limits = ExecutionLimits::new()
            .with_max_call_depth(2)
            .with_max_method_visits(10)
            .with_max_address_visits(3)
            .with_max_heap_instances(8);
        assert_eq!(
            limits,
            ExecutionLimits {
                max_call_depth: 2,
                max_method_visits: 10,
                max_address_visits: 3,
                max_heap_instances: 8,
            }
        );
    }
}

//! Class registry and type hierarchy queries.
//!
//! [`ClassManager`] is the type catalog consulted by the invocation resolver.
//! It answers three kinds of questions:
//!
//! - **Lookup**: resolve a descriptor to a [`VirtualType`], or a signature to a
//!   [`VirtualMethod`](crate::types::VirtualMethod)
//! - **Hierarchy**: ancestor chains, subtype checks and nearest common ancestors
//! - **Classification**: framework-owned vs. application-owned code, and which
//!   framework classes are whitelisted as safe to execute
//!
//! # Storage
//!
//! Types live in a lock-free `SkipMap` keyed by descriptor. Ancestor chains are
//! computed lazily and memoized in a `DashMap`, so a manager can be shared
//! between threads resolving independent call sites.

use std::{collections::VecDeque, sync::Arc};

use crossbeam_skiplist::SkipMap;
use dashmap::{DashMap, DashSet};
use rustc_hash::FxHashSet;

use crate::{
    types::{
        class::{TypeOrigin, VirtualType, VirtualTypeRc},
        method::VirtualMethodRc,
        name::{self, TypeName},
    },
    Error, Result,
};

/// Maximum depth of a class hierarchy before it is considered cyclic.
pub const MAX_HIERARCHY_DEPTH: usize = 64;

/// Package prefixes treated as framework code when a class is not registered.
const FRAMEWORK_PREFIXES: &[&str] = &["Ljava/", "Ljavax/", "Landroid/", "Ldalvik/"];

/// Interfaces every array type implements.
const ARRAY_INTERFACES: &[&str] = &["Ljava/lang/Cloneable;", "Ljava/io/Serializable;"];

/// Registry of every class known to the analysis.
///
/// # Examples
///
/// ```rust
/// use smaliscope::types::{ClassManager, VirtualType};
///
/// let classes = ClassManager::new();
/// classes.register(VirtualType::new("Lapp/Parent;").extends("Ljava/lang/Object;"));
/// classes.register(VirtualType::new("Lapp/Child;").extends("Lapp/Parent;"));
///
/// assert!(classes.is_instance_of("Lapp/Child;", "Lapp/Parent;"));
/// assert!(!classes.is_instance_of("Lapp/Parent;", "Lapp/Child;"));
/// ```
#[derive(Debug)]
pub struct ClassManager {
    types: SkipMap<TypeName, VirtualTypeRc>,
    ancestors: DashMap<TypeName, Arc<[TypeName]>>,
    safe_framework_classes: DashSet<TypeName>,
}

impl Default for ClassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        ClassManager {
            types: SkipMap::new(),
            ancestors: DashMap::new(),
            safe_framework_classes: DashSet::new(),
        }
    }

    /// Registers (or replaces) a type.
    ///
    /// Cached ancestor chains are dropped since the new definition may change
    /// them.
    pub fn register(&self, virtual_type: VirtualType) {
        self.types
            .insert(virtual_type.name().clone(), Arc::new(virtual_type));
        self.ancestors.clear();
    }

    /// Whitelists a framework class as safe to execute.
    pub fn register_safe_framework_class(&self, name: &str) {
        self.safe_framework_classes.insert(TypeName::from(name));
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Resolves a type descriptor.
    ///
    /// Array types that were not registered explicitly are synthesized as
    /// framework types deriving from `java.lang.Object`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] if the type is unknown.
    pub fn resolve_type(&self, name: &str) -> Result<VirtualTypeRc> {
        if let Some(entry) = self.types.get(name) {
            return Ok(Arc::clone(entry.value()));
        }

        if name::is_array(name) {
            let mut array = VirtualType::new(name).extends(name::OBJECT).framework();
            for interface in ARRAY_INTERFACES {
                array = array.implements(interface);
            }
            return Ok(Arc::new(array));
        }

        Err(Error::TypeNotFound(name.to_string()))
    }

    /// Resolves a full method signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] if the declaring class is unknown, or
    /// [`Error::MethodNotFound`] if it does not declare the method.
    pub fn method(&self, signature: &str) -> Result<VirtualMethodRc> {
        let virtual_type = self.resolve_type(name::class_of_signature(signature))?;
        virtual_type
            .method(name::descriptor_of_signature(signature))
            .cloned()
            .ok_or_else(|| Error::MethodNotFound(signature.to_string()))
    }

    /// Returns the ancestor chain of `name`, nearest first and including the
    /// type itself.
    ///
    /// Supertypes that are not registered appear in the chain but are not
    /// expanded further. Every reference type ends with `java.lang.Object`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] if `name` itself is unknown, or
    /// [`Error::RecursionLimit`] if the hierarchy is deeper than
    /// [`MAX_HIERARCHY_DEPTH`] (which indicates a cycle).
    pub fn ancestors(&self, name: &str) -> Result<Arc<[TypeName]>> {
        if let Some(cached) = self.ancestors.get(name) {
            return Ok(Arc::clone(cached.value()));
        }

        let chain: Arc<[TypeName]> = if name::is_primitive(name) {
            Arc::from(vec![TypeName::from(name)])
        } else {
            Arc::from(self.collect_ancestors(name)?)
        };

        self.ancestors
            .insert(TypeName::from(name), Arc::clone(&chain));
        Ok(chain)
    }

    fn collect_ancestors(&self, name: &str) -> Result<Vec<TypeName>> {
        let root = self.resolve_type(name)?;

        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::new();
        queue.push_back((root.name().clone(), 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth > MAX_HIERARCHY_DEPTH {
                return Err(Error::RecursionLimit(MAX_HIERARCHY_DEPTH));
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            chain.push(current.clone());

            if let Ok(current_type) = self.resolve_type(&current) {
                for supertype in current_type.direct_supertypes() {
                    queue.push_back((supertype.clone(), depth + 1));
                }
            }
        }

        if !seen.contains(name::OBJECT) {
            chain.push(TypeName::from(name::OBJECT));
        }
        Ok(chain)
    }

    /// Returns `true` if a value of type `actual` can be used where `declared`
    /// is expected.
    ///
    /// Unknown types are never instances of anything but themselves.
    #[must_use]
    pub fn is_instance_of(&self, actual: &str, declared: &str) -> bool {
        if actual == declared {
            return true;
        }

        let actual_dims = name::dimension_count(actual);
        let declared_dims = name::dimension_count(declared);
        if actual_dims > 0 && declared_dims == 0 {
            return declared == name::OBJECT || ARRAY_INTERFACES.contains(&declared);
        }
        if actual_dims > 0 && actual_dims == declared_dims {
            let actual_base = name::component_base(actual);
            let declared_base = name::component_base(declared);
            if name::is_primitive(actual_base) || name::is_primitive(declared_base) {
                return actual_base == declared_base;
            }
            return self.is_instance_of(actual_base, declared_base);
        }
        if actual_dims != declared_dims {
            return false;
        }

        self.ancestors(actual)
            .map(|chain| chain.iter().any(|ancestor| &**ancestor == declared))
            .unwrap_or(false)
    }

    /// Returns the nearest type both `a` and `b` are instances of.
    ///
    /// Falls back to `java.lang.Object` when either chain is unavailable.
    #[must_use]
    pub fn common_ancestor(&self, a: &str, b: &str) -> TypeName {
        if a == b {
            return TypeName::from(a);
        }
        if let (Ok(chain_a), Ok(chain_b)) = (self.ancestors(a), self.ancestors(b)) {
            if let Some(shared) = chain_a.iter().find(|candidate| chain_b.contains(candidate)) {
                return shared.clone();
            }
        }
        TypeName::from(name::OBJECT)
    }

    /// Returns `true` if the class owning `signature` is framework code.
    ///
    /// `signature` may be a full method signature or a bare class descriptor.
    /// Unregistered classes are classified by package prefix.
    #[must_use]
    pub fn is_framework_class(&self, signature: &str) -> bool {
        let class_name = name::component_base(name::class_of_signature(signature));
        match self.types.get(class_name) {
            Some(entry) => entry.value().origin() == TypeOrigin::Framework,
            None => FRAMEWORK_PREFIXES
                .iter()
                .any(|prefix| class_name.starts_with(prefix)),
        }
    }

    /// Returns `true` if the class owning `signature` is a whitelisted
    /// framework class.
    #[must_use]
    pub fn is_safe_framework_class(&self, signature: &str) -> bool {
        let class_name = name::component_base(name::class_of_signature(signature));
        self.safe_framework_classes.contains(class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MethodFlags, VirtualMethod};

    fn hierarchy() -> ClassManager {
        let classes = ClassManager::new();
        classes.register(VirtualType::new(name::OBJECT).framework());
        classes.register(
            VirtualType::new("Lapp/Parent;")
                .extends(name::OBJECT)
                .implements("Lapp/Marker;"),
        );
        classes.register(VirtualType::new("Lapp/Marker;"));
        classes.register(VirtualType::new("Lapp/Child;").extends("Lapp/Parent;"));
        classes.register(VirtualType::new("Lapp/Sibling;").extends("Lapp/Parent;"));
        classes
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let classes = hierarchy();
        let chain = classes.ancestors("Lapp/Child;").unwrap();
        let names: Vec<&str> = chain.iter().map(AsRef::as_ref).collect();
        assert_eq!(
            names,
            vec!["Lapp/Child;", "Lapp/Parent;", name::OBJECT, "Lapp/Marker;"]
        );
    }

    #[test]
    fn test_ancestors_unknown_type() {
        let classes = hierarchy();
        assert!(matches!(
            classes.ancestors("Lapp/Missing;"),
            Err(Error::TypeNotFound(_))
        ));
    }

    #[test]
    fn test_ancestors_cycle_is_bounded() {
        let classes = ClassManager::new();
        classes.register(VirtualType::new("Lapp/A;").extends("Lapp/B;"));
        classes.register(VirtualType::new("Lapp/B;").extends("Lapp/A;"));
        let chain = classes.ancestors("Lapp/A;").unwrap();
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_cache_invalidated_on_register() {
        let classes = hierarchy();
        assert!(!classes.is_instance_of("Lapp/Late;", "Lapp/Parent;"));
        classes.register(VirtualType::new("Lapp/Late;").extends("Lapp/Parent;"));
        assert!(classes.is_instance_of("Lapp/Late;", "Lapp/Parent;"));
    }

    #[test]
    fn test_is_instance_of_arrays() {
        let classes = hierarchy();
        assert!(classes.is_instance_of("[Lapp/Child;", "[Lapp/Parent;"));
        assert!(!classes.is_instance_of("[Lapp/Parent;", "[Lapp/Child;"));
        assert!(classes.is_instance_of("[I", name::OBJECT));
        assert!(!classes.is_instance_of("[I", "[J"));
        assert!(!classes.is_instance_of("[[I", "[I"));
        assert!(!classes.is_instance_of("Lapp/Child;", "[Lapp/Child;"));
    }

    #[test]
    fn test_common_ancestor() {
        let classes = hierarchy();
        assert_eq!(
            &*classes.common_ancestor("Lapp/Child;", "Lapp/Sibling;"),
            "Lapp/Parent;"
        );
        assert_eq!(&*classes.common_ancestor("Lapp/Child;", "Lapp/Child;"), "Lapp/Child;");
        assert_eq!(
            &*classes.common_ancestor("Lapp/Child;", "Lapp/Unknown;"),
            name::OBJECT
        );
    }

    #[test]
    fn test_framework_classification() {
        let classes = hierarchy();
        classes.register_safe_framework_class("Ljava/lang/Math;");
        assert!(classes.is_framework_class("Ljava/lang/Object;-><init>()V"));
        assert!(classes.is_framework_class("Landroid/util/Log;->d()I"));
        assert!(!classes.is_framework_class("Lapp/Child;->f()V"));
        assert!(classes.is_safe_framework_class("Ljava/lang/Math;->abs(I)I"));
        assert!(!classes.is_safe_framework_class("Landroid/util/Log;->d()I"));
    }

    #[test]
    fn test_method_lookup() {
        let classes = ClassManager::new();
        classes.register(VirtualType::new("Lapp/A;").with_method(
            VirtualMethod::new("Lapp/A;->f()V", MethodFlags::PUBLIC).unwrap(),
        ));
        assert!(classes.method("Lapp/A;->f()V").is_ok());
        assert!(matches!(
            classes.method("Lapp/A;->g()V"),
            Err(Error::MethodNotFound(_))
        ));
        assert!(matches!(
            classes.method("Lapp/B;->f()V"),
            Err(Error::TypeNotFound(_))
        ));
    }

    #[test]
    fn test_synthesized_array_type() {
        let classes = ClassManager::new();
        let array = classes.resolve_type("[Ljava/lang/String;").unwrap();
        assert_eq!(array.origin(), TypeOrigin::Framework);
        assert_eq!(array.superclass().map(AsRef::as_ref), Some(name::OBJECT));
    }
}

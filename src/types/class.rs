//! Class descriptors.
//!
//! [`VirtualType`] holds the information the resolver needs about a class:
//! its direct supertypes (used to build ancestor chains), where it comes from
//! (framework or application code) and its method table keyed by descriptor.

use std::{fmt, sync::Arc};

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use strum::{Display, EnumString};

use crate::types::{
    method::{VirtualMethod, VirtualMethodRc},
    name::TypeName,
};

bitflags! {
    /// Dalvik class access flags relevant to instantiation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u32 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Cannot be subclassed
        const FINAL = 0x0010;
        /// Declared as an interface
        const INTERFACE = 0x0200;
        /// Cannot be instantiated directly
        const ABSTRACT = 0x0400;
    }
}

/// Where a class definition comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TypeOrigin {
    /// Part of the platform (android / java framework).
    Framework,
    /// Part of the analyzed application.
    Application,
}

/// Shared handle to a [`VirtualType`].
pub type VirtualTypeRc = Arc<VirtualType>;

/// A class or interface known to the [`ClassManager`](crate::types::ClassManager).
///
/// # Examples
///
/// ```rust
/// use smaliscope::types::{MethodFlags, TypeOrigin, VirtualMethod, VirtualType};
///
/// let child = VirtualType::new("Lapp/Child;")
///     .extends("Lapp/Parent;")
///     .implements("Ljava/lang/Runnable;")
///     .with_method(VirtualMethod::new("Lapp/Child;->run()V", MethodFlags::PUBLIC)?.with_body(1));
///
/// assert_eq!(child.origin(), TypeOrigin::Application);
/// assert!(child.method("run()V").is_some());
/// # Ok::<(), smaliscope::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct VirtualType {
    name: TypeName,
    superclass: Option<TypeName>,
    interfaces: Vec<TypeName>,
    origin: TypeOrigin,
    flags: ClassFlags,
    methods: FxHashMap<Arc<str>, VirtualMethodRc>,
}

impl VirtualType {
    /// Creates an application class with no supertypes and no methods.
    #[must_use]
    pub fn new(name: &str) -> Self {
        VirtualType {
            name: TypeName::from(name),
            superclass: None,
            interfaces: Vec::new(),
            origin: TypeOrigin::Application,
            flags: ClassFlags::PUBLIC,
            methods: FxHashMap::default(),
        }
    }

    /// Sets the direct superclass.
    #[must_use]
    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(TypeName::from(superclass));
        self
    }

    /// Adds a directly implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(TypeName::from(interface));
        self
    }

    /// Marks the type as framework-owned.
    #[must_use]
    pub fn framework(mut self) -> Self {
        self.origin = TypeOrigin::Framework;
        self
    }

    /// Replaces the access flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds a method, keyed by its descriptor.
    #[must_use]
    pub fn with_method(mut self, method: VirtualMethod) -> Self {
        self.methods
            .insert(Arc::from(method.descriptor()), Arc::new(method));
        self
    }

    /// Type descriptor.
    #[must_use]
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Direct superclass, if any.
    #[must_use]
    pub fn superclass(&self) -> Option<&TypeName> {
        self.superclass.as_ref()
    }

    /// Directly implemented interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[TypeName] {
        &self.interfaces
    }

    /// Framework or application.
    #[must_use]
    pub fn origin(&self) -> TypeOrigin {
        self.origin
    }

    /// Access flags.
    #[must_use]
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    /// Returns `true` for interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    /// Returns `true` for abstract classes and interfaces.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags
            .intersects(ClassFlags::ABSTRACT | ClassFlags::INTERFACE)
    }

    /// Looks up a method declared directly on this type.
    #[must_use]
    pub fn method(&self, descriptor: &str) -> Option<&VirtualMethodRc> {
        self.methods.get(descriptor)
    }

    /// Iterates the methods declared on this type.
    pub fn methods(&self) -> impl Iterator<Item = &VirtualMethodRc> {
        self.methods.values()
    }

    /// Direct supertypes: the superclass followed by the interfaces.
    pub fn direct_supertypes(&self) -> impl Iterator<Item = &TypeName> {
        self.superclass.iter().chain(self.interfaces.iter())
    }
}

impl fmt::Display for VirtualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

//! Instance arena shared by an execution context and its callees.
//!
//! This module provides [`Heap`], the arena every object reference points
//! into. Registers never hold objects directly, only [`InstanceRef`] handles,
//! so that all aliases of an object observe the same slot.
//!
//! # Object Identity
//!
//! A `new-instance` places an [`Instance::Uninitialized`] placeholder in a
//! slot. When a constructor produces a different object, the placeholder slot
//! is turned into [`Instance::Forwarded`] pointing at the new slot. Every read
//! resolves forwarding chains, so registers still holding the placeholder
//! handle see the constructed object without being rewritten.
//!
//! # Copy-on-Write Semantics
//!
//! Slots are stored in an `imbl::Vector`. [`Heap::fork`] is O(1) and only the
//! slots touched afterwards are copied, which lets diverging execution paths
//! keep independent heaps.
//!
//! # Limits
//!
//! The heap refuses to grow beyond its configured instance count and returns
//! [`Error::HeapLimit`] instead.

use std::{fmt, sync::Arc, sync::RwLock};

use imbl::Vector;

use crate::{
    context::value::InstanceRef,
    types::name::{self, TypeName},
    Error, Result,
};

/// Default maximum number of heap slots.
pub const DEFAULT_MAX_INSTANCES: usize = 65_536;

/// An object stored in a heap slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instance {
    /// Allocated by `new-instance`, constructor not yet run.
    Uninitialized(TypeName),
    /// An opaque constructed object.
    Object(TypeName),
    /// A `java.lang.String`.
    String(Arc<str>),
    /// A `java.lang.StringBuilder` and its current contents.
    StringBuilder(String),
    /// A `java.lang.Class` object for the given type.
    Class(TypeName),
    /// The slot was replaced; reads continue at the target.
    Forwarded(InstanceRef),
}

impl Instance {
    /// Runtime type of the instance, `None` for forwarded slots.
    #[must_use]
    pub fn type_name(&self) -> Option<TypeName> {
        match self {
            Instance::Uninitialized(t) | Instance::Object(t) => Some(t.clone()),
            Instance::String(_) => Some(TypeName::from(name::STRING)),
            Instance::StringBuilder(_) => Some(TypeName::from(name::STRING_BUILDER)),
            Instance::Class(_) => Some(TypeName::from(name::CLASS)),
            Instance::Forwarded(_) => None,
        }
    }

    /// Returns `true` for constructor placeholders.
    #[must_use]
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Instance::Uninitialized(_))
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::Uninitialized(t) => write!(f, "uninitialized {t}"),
            Instance::Object(t) => write!(f, "{t}"),
            Instance::String(s) => write!(f, "\"{s}\""),
            Instance::StringBuilder(s) => write!(f, "StringBuilder(\"{s}\")"),
            Instance::Class(t) => write!(f, "class {t}"),
            Instance::Forwarded(r) => write!(f, "-> {r}"),
        }
    }
}

/// Arena of [`Instance`] slots.
///
/// # Example
///
/// ```rust
/// use smaliscope::context::{Heap, Instance};
///
/// let heap = Heap::new(16);
/// let placeholder = heap.alloc_uninitialized("Lapp/Widget;")?;
/// let built = heap.alloc(Instance::Object("Lapp/Widget;".into()))?;
///
/// heap.forward(placeholder, built)?;
/// assert!(heap.same_identity(placeholder, built));
/// assert_eq!(heap.get(placeholder)?, Instance::Object("Lapp/Widget;".into()));
/// # Ok::<(), smaliscope::Error>(())
/// ```
#[derive(Debug)]
pub struct Heap {
    slots: RwLock<Vector<Instance>>,
    max_instances: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INSTANCES)
    }
}

impl Heap {
    /// Creates an empty heap holding at most `max_instances` slots.
    #[must_use]
    pub fn new(max_instances: usize) -> Self {
        Heap {
            slots: RwLock::new(Vector::new()),
            max_instances,
        }
    }

    /// Forks this heap. Both copies can be modified independently.
    ///
    /// The resolver never forks. A [`MethodInterpreter`](crate::vm::MethodInterpreter)
    /// calls this at a branch so each path of its graph owns a heap.
    #[must_use]
    pub fn fork(&self) -> Self {
        Heap {
            slots: RwLock::new(read_lock!(self.slots).clone()),
            max_instances: self.max_instances,
        }
    }

    /// Number of allocated slots, forwarded ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        read_lock!(self.slots).len()
    }

    /// Returns `true` if nothing was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates a new slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeapLimit`] if the heap is full.
    pub fn alloc(&self, instance: Instance) -> Result<InstanceRef> {
        let mut slots = write_lock!(self.slots);
        if slots.len() >= self.max_instances {
            return Err(Error::HeapLimit(self.max_instances));
        }
        slots.push_back(instance);
        Ok(InstanceRef::new(slots.len() - 1))
    }

    /// Allocates a constructor placeholder of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeapLimit`] if the heap is full.
    pub fn alloc_uninitialized(&self, type_name: &str) -> Result<InstanceRef> {
        self.alloc(Instance::Uninitialized(TypeName::from(type_name)))
    }

    /// Allocates a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeapLimit`] if the heap is full.
    pub fn alloc_string(&self, value: &str) -> Result<InstanceRef> {
        self.alloc(Instance::String(Arc::from(value)))
    }

    /// Follows forwarding until a live slot is reached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeapReference`] for dangling handles or
    /// forwarding cycles.
    pub fn resolve(&self, instance: InstanceRef) -> Result<InstanceRef> {
        let slots = read_lock!(self.slots);
        Self::resolve_in(&slots, instance)
    }

    fn resolve_in(slots: &Vector<Instance>, instance: InstanceRef) -> Result<InstanceRef> {
        let mut current = instance;
        for _ in 0..=slots.len() {
            match slots.get(current.index()) {
                Some(Instance::Forwarded(next)) => current = *next,
                Some(_) => return Ok(current),
                None => return Err(Error::InvalidHeapReference(current.index())),
            }
        }
        Err(Error::InvalidHeapReference(instance.index()))
    }

    /// Returns a copy of the instance behind `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeapReference`] for dangling handles.
    pub fn get(&self, instance: InstanceRef) -> Result<Instance> {
        let slots = read_lock!(self.slots);
        let resolved = Self::resolve_in(&slots, instance)?;
        slots
            .get(resolved.index())
            .cloned()
            .ok_or(Error::InvalidHeapReference(resolved.index()))
    }

    /// Overwrites the instance behind `instance` in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeapReference`] for dangling handles.
    pub fn replace(&self, instance: InstanceRef, value: Instance) -> Result<()> {
        let mut slots = write_lock!(self.slots);
        let resolved = Self::resolve_in(&slots, instance)?;
        slots.set(resolved.index(), value);
        Ok(())
    }

    /// Makes every handle to `old` observe `new` from now on.
    ///
    /// Forwarding an object to itself (directly or through an existing chain)
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeapReference`] if either handle is dangling.
    pub fn forward(&self, old: InstanceRef, new: InstanceRef) -> Result<()> {
        let mut slots = write_lock!(self.slots);
        let from = Self::resolve_in(&slots, old)?;
        let to = Self::resolve_in(&slots, new)?;
        if from != to {
            slots.set(from.index(), Instance::Forwarded(to));
        }
        Ok(())
    }

    /// Returns `true` if both handles resolve to the same slot.
    #[must_use]
    pub fn same_identity(&self, a: InstanceRef, b: InstanceRef) -> bool {
        let slots = read_lock!(self.slots);
        match (Self::resolve_in(&slots, a), Self::resolve_in(&slots, b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Runtime type of the instance behind `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeapReference`] for dangling handles.
    pub fn type_name_of(&self, instance: InstanceRef) -> Result<TypeName> {
        self.get(instance)?
            .type_name()
            .ok_or(Error::InvalidHeapReference(instance.index()))
    }

    /// Contents of a string instance, `None` if the slot holds something else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeapReference`] for dangling handles.
    pub fn get_string(&self, instance: InstanceRef) -> Result<Option<Arc<str>>> {
        match self.get(instance)? {
            Instance::String(s) => Ok(Some(s)),
            _ => Ok(None),
        }
    }
}

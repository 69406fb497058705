//! Typed register contents.

use std::fmt;

use crate::{
    context::value::{InstanceRef, Value},
    types::name::{self, TypeName},
};

/// A register value together with its static type.
///
/// The immutability flag is derived from the type when the item is built and
/// never changes afterwards. Updates create a new item.
///
/// # Examples
///
/// ```rust
/// use smaliscope::context::{HeapItem, Value};
///
/// let answer = HeapItem::new(Value::Int(42), "I");
/// assert!(answer.is_immutable());
///
/// let unknown = HeapItem::unknown("Ljava/lang/StringBuilder;");
/// assert!(unknown.is_unknown());
/// assert!(!unknown.is_immutable());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapItem {
    value: Value,
    type_name: TypeName,
    immutable: bool,
}

impl HeapItem {
    /// Creates an item of `type_name`.
    #[must_use]
    pub fn new(value: Value, type_name: impl Into<TypeName>) -> Self {
        let type_name = type_name.into();
        HeapItem {
            immutable: name::is_immutable_type(&type_name),
            value,
            type_name,
        }
    }

    /// An unknown value of `type_name`.
    #[must_use]
    pub fn unknown(type_name: impl Into<TypeName>) -> Self {
        Self::new(Value::Unknown, type_name)
    }

    /// A `null` reference typed as `java.lang.Object`.
    #[must_use]
    pub fn null() -> Self {
        Self::new(Value::Null, name::OBJECT)
    }

    /// An `int` constant.
    #[must_use]
    pub fn int(value: i32) -> Self {
        Self::new(Value::Int(value), "I")
    }

    /// A reference to `instance` typed as `type_name`.
    #[must_use]
    pub fn reference(instance: InstanceRef, type_name: impl Into<TypeName>) -> Self {
        Self::new(Value::Reference(instance), type_name)
    }

    /// The payload.
    #[must_use]
    pub fn value(&self) -> Value {
        self.value
    }

    /// The static type.
    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Returns `true` if values of this item's type cannot be mutated.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Returns `true` if the payload is unknown.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.value.is_unknown()
    }

    /// Returns `true` if the payload is `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Returns `true` if the static type is a primitive.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        name::is_primitive(&self.type_name)
    }

    /// Returns `true` if the type is primitive or an array of primitives.
    #[must_use]
    pub fn is_primitive_or_primitive_array(&self) -> bool {
        name::is_primitive(name::component_base(&self.type_name))
    }

    /// The heap handle, if the payload is a reference.
    #[must_use]
    pub fn reference_handle(&self) -> Option<InstanceRef> {
        self.value.as_reference()
    }

    /// Same payload, different static type.
    #[must_use]
    pub fn retyped(&self, type_name: impl Into<TypeName>) -> Self {
        Self::new(self.value, type_name)
    }

    /// Converts a primitive payload into `type_name`'s representation and
    /// retypes the item.
    #[must_use]
    pub fn cast_to_primitive(&self, type_name: &str) -> Self {
        Self::new(self.value.cast_to(type_name), type_name)
    }
}

impl fmt::Display for HeapItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.type_name)
    }
}

//! Register payloads.
//!
//! [`Value`] is the untyped half of a [`HeapItem`](crate::context::HeapItem):
//! either a primitive scalar, a handle into the [`Heap`](crate::context::Heap),
//! `null`, or [`Value::Unknown`] when the analysis cannot tell.

use std::fmt;

use crate::types::name;

/// Handle to a slot in the [`Heap`](crate::context::Heap).
///
/// Two registers holding equal handles alias the same object. Replacing the
/// object behind a handle is therefore visible through every alias.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceRef(usize);

impl InstanceRef {
    /// Creates a handle for heap slot `index`.
    #[must_use]
    pub fn new(index: usize) -> Self {
        InstanceRef(index)
    }

    /// Heap slot index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A register payload.
#[derive(Clone, Copy, Debug, Default)]
pub enum Value {
    /// Nothing is known about the value.
    #[default]
    Unknown,
    /// The `null` reference.
    Null,
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `char` (UTF-16 code unit)
    Char(u16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// An object in the heap.
    Reference(InstanceRef),
}

impl Value {
    /// Returns `true` for [`Value::Unknown`].
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the heap handle for references.
    #[must_use]
    pub fn as_reference(&self) -> Option<InstanceRef> {
        match self {
            Value::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns the value widened to `i64` for integral and boolean payloads.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Boolean(b) => Some(i64::from(b)),
            Value::Byte(v) => Some(i64::from(v)),
            Value::Short(v) => Some(i64::from(v)),
            Value::Char(v) => Some(i64::from(v)),
            Value::Int(v) => Some(i64::from(v)),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(f64::from(v)),
            Value::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Converts a primitive payload to the representation of `type_name`.
    ///
    /// Dalvik registers do not distinguish `boolean`, `byte`, `short`, `char`
    /// and `int`, so a `const/4` feeding a `Z` parameter arrives as an `Int`.
    /// Non-primitive targets and non-primitive payloads are returned as is.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cast_to(self, type_name: &str) -> Value {
        if !name::is_primitive(type_name) {
            return self;
        }
        let integral = self.as_i64();
        let floating = self.as_f64();
        match (type_name, integral, floating) {
            ("Z", Some(v), _) => Value::Boolean(v != 0),
            ("B", Some(v), _) => Value::Byte(v as i8),
            ("S", Some(v), _) => Value::Short(v as i16),
            ("C", Some(v), _) => Value::Char(v as u16),
            ("I", Some(v), _) => Value::Int(v as i32),
            ("J", Some(v), _) => Value::Long(v),
            ("F", _, Some(v)) => Value::Float(v as f32),
            ("D", _, Some(v)) => Value::Double(v),
            ("Z" | "B" | "S" | "C" | "I" | "J", None, Some(v)) => {
                Value::Long(v as i64).cast_to(type_name)
            }
            _ => self,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unknown, Value::Unknown) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Reference(a), Value::Reference(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unknown => f.write_str("unknown"),
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{v:04x}'"),
            },
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}L"),
            Value::Float(v) => write!(f, "{v}f"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Reference(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_int_like() {
        assert_eq!(Value::Int(1).cast_to("Z"), Value::Boolean(true));
        assert_eq!(Value::Int(0).cast_to("Z"), Value::Boolean(false));
        assert_eq!(Value::Int(0x141).cast_to("B"), Value::Byte(0x41));
        assert_eq!(Value::Int(65).cast_to("C"), Value::Char(65));
        assert_eq!(Value::Int(-1).cast_to("J"), Value::Long(-1));
        assert_eq!(Value::Int(3).cast_to("D"), Value::Double(3.0));
    }

    #[test]
    fn test_cast_leaves_references_alone() {
        let r = Value::Reference(InstanceRef::new(4));
        assert_eq!(r.cast_to("I"), r);
        assert_eq!(Value::Int(0).cast_to("Ljava/lang/Object;"), Value::Int(0));
        assert_eq!(Value::Unknown.cast_to("I"), Value::Unknown);
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Float(f32::NAN), Value::Float(f32::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_ne!(Value::Int(1), Value::Long(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Long(5).to_string(), "5L");
        assert_eq!(Value::Char(0x61).to_string(), "'a'");
        assert_eq!(Value::Reference(InstanceRef::new(2)).to_string(), "@2");
        assert_eq!(Value::Unknown.to_string(), "unknown");
    }
}

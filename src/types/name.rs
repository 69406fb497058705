//! Dalvik type descriptor utilities.
//!
//! Types are carried around as their internal descriptor strings exactly as they
//! appear in smali: `I`, `J`, `Ljava/lang/String;`, `[[B`. This module provides
//! the small set of classification helpers the resolver needs to reason about
//! them without a class lookup.
//!
//! # Descriptor Forms
//!
//! | Descriptor | Meaning | Register size |
//! |------------|---------|---------------|
//! | `Z B S C I F` | 32-bit primitives | 1 |
//! | `J D` | 64-bit primitives | 2 |
//! | `V` | void (return types only) | 0 |
//! | `Lpkg/Name;` | class or interface | 1 |
//! | `[T` | array of `T` | 1 |

use std::sync::Arc;

/// A Dalvik type descriptor.
///
/// Reference counted so that descriptors can be shared between methods, heap
/// items and registers without copying the string.
pub type TypeName = Arc<str>;

/// `java.lang.Object`.
pub const OBJECT: &str = "Ljava/lang/Object;";
/// `java.lang.String`.
pub const STRING: &str = "Ljava/lang/String;";
/// `java.lang.StringBuilder`.
pub const STRING_BUILDER: &str = "Ljava/lang/StringBuilder;";
/// `java.lang.Class`.
pub const CLASS: &str = "Ljava/lang/Class;";
/// `void`.
pub const VOID: &str = "V";
/// Signature of the root object constructor.
pub const OBJECT_INIT: &str = "Ljava/lang/Object;-><init>()V";

/// Types whose instances cannot change once constructed.
const IMMUTABLE_TYPES: &[&str] = &[
    "Ljava/lang/Boolean;",
    "Ljava/lang/Byte;",
    "Ljava/lang/Character;",
    "Ljava/lang/Class;",
    "Ljava/lang/Double;",
    "Ljava/lang/Float;",
    "Ljava/lang/Integer;",
    "Ljava/lang/Long;",
    "Ljava/lang/Short;",
    "Ljava/lang/String;",
    "Ljava/math/BigDecimal;",
    "Ljava/math/BigInteger;",
];

/// Returns `true` if `name` is a primitive descriptor (including `V`).
#[must_use]
pub fn is_primitive(name: &str) -> bool {
    matches!(name, "Z" | "B" | "S" | "C" | "I" | "J" | "F" | "D" | "V")
}

/// Returns `true` if `name` describes a class, interface or array.
#[must_use]
pub fn is_object(name: &str) -> bool {
    name.starts_with('L') || name.starts_with('[')
}

/// Returns `true` if `name` is an array descriptor.
#[must_use]
pub fn is_array(name: &str) -> bool {
    name.starts_with('[')
}

/// Returns `true` for `J` and `D`.
#[must_use]
pub fn is_wide(name: &str) -> bool {
    matches!(name, "J" | "D")
}

/// Returns `true` for the 32-bit integral primitives that `const` instructions
/// cannot tell apart.
#[must_use]
pub fn is_int_like(name: &str) -> bool {
    matches!(name, "Z" | "B" | "S" | "C" | "I")
}

/// Number of registers a value of type `name` occupies.
#[must_use]
pub fn register_size(name: &str) -> u16 {
    if is_wide(name) {
        2
    } else {
        1
    }
}

/// Strips every array dimension from `name`.
///
/// ```rust
/// use smaliscope::types::name::component_base;
///
/// assert_eq!(component_base("[[I"), "I");
/// assert_eq!(component_base("Lfoo;"), "Lfoo;");
/// ```
#[must_use]
pub fn component_base(name: &str) -> &str {
    name.trim_start_matches('[')
}

/// Number of array dimensions in `name`.
#[must_use]
pub fn dimension_count(name: &str) -> usize {
    name.len() - component_base(name).len()
}

/// Returns `true` if values of this type are immutable regardless of
/// configuration: every primitive and the well-known value classes.
#[must_use]
pub fn is_immutable_type(name: &str) -> bool {
    is_primitive(name) || IMMUTABLE_TYPES.contains(&name)
}

/// Converts an internal descriptor to a binary (source-level) name.
///
/// ```rust
/// use smaliscope::types::name::binary_name;
///
/// assert_eq!(binary_name("Ljava/lang/String;"), "java.lang.String");
/// assert_eq!(binary_name("[I"), "[I");
/// ```
#[must_use]
pub fn binary_name(name: &str) -> String {
    if let Some(inner) = name.strip_prefix('L').and_then(|n| n.strip_suffix(';')) {
        inner.replace('/', ".")
    } else {
        name.to_string()
    }
}

/// Returns the class part of a method signature (`Lfoo;->bar()V` -> `Lfoo;`).
///
/// Signatures without `->` are returned unchanged so a plain class name can
/// be passed where a signature is accepted.
#[must_use]
pub fn class_of_signature(signature: &str) -> &str {
    signature
        .split_once("->")
        .map_or(signature, |(class, _)| class)
}

/// Returns the method descriptor part of a signature (`Lfoo;->bar()V` -> `bar()V`).
#[must_use]
pub fn descriptor_of_signature(signature: &str) -> &str {
    signature
        .split_once("->")
        .map_or(signature, |(_, descriptor)| descriptor)
}

/// Returns `true` if `signature` names an instance constructor.
#[must_use]
pub fn is_constructor_signature(signature: &str) -> bool {
    signature.contains(";-><init>(")
}

/// Splits a parameter list such as `IJLjava/lang/String;[Z` into descriptors.
///
/// Returns `None` if the list is malformed.
#[must_use]
pub fn split_parameter_list(list: &str) -> Option<Vec<TypeName>> {
    let bytes = list.as_bytes();
    let mut types = Vec::new();
    let mut index = 0;
    while index < bytes.len() {
        let start = index;
        while bytes.get(index) == Some(&b'[') {
            index += 1;
        }
        match bytes.get(index)? {
            b'L' => {
                let end = list[index..].find(';')?;
                index += end + 1;
            }
            b'Z' | b'B' | b'S' | b'C' | b'I' | b'J' | b'F' | b'D' => index += 1,
            _ => return None,
        }
        types.push(TypeName::from(&list[start..index]));
    }
    Some(types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_classification() {
        assert!(is_primitive("I"));
        assert!(is_primitive("V"));
        assert!(!is_primitive("Ljava/lang/Object;"));
        assert!(!is_primitive("[I"));
        assert!(is_int_like("Z"));
        assert!(!is_int_like("J"));
    }

    #[test]
    fn test_register_size() {
        assert_eq!(register_size("J"), 2);
        assert_eq!(register_size("D"), 2);
        assert_eq!(register_size("I"), 1);
        assert_eq!(register_size("[J"), 1);
    }

    #[test]
    fn test_component_base() {
        assert_eq!(component_base("[[Ljava/lang/String;"), STRING);
        assert_eq!(dimension_count("[[Ljava/lang/String;"), 2);
        assert_eq!(dimension_count("I"), 0);
    }

    #[test]
    fn test_signature_parts() {
        let sig = "Lfoo/Bar;->baz(ILjava/lang/String;)V";
        assert_eq!(class_of_signature(sig), "Lfoo/Bar;");
        assert_eq!(descriptor_of_signature(sig), "baz(ILjava/lang/String;)V");
        assert_eq!(class_of_signature("Lfoo/Bar;"), "Lfoo/Bar;");
        assert!(is_constructor_signature("Lfoo/Bar;-><init>(I)V"));
        assert!(!is_constructor_signature("Lfoo/Bar;-><clinit>()V"));
    }

    #[test]
    fn test_split_parameter_list() {
        let types = split_parameter_list("IJLjava/lang/String;[Z[[Lfoo;").unwrap();
        let names: Vec<&str> = types.iter().map(AsRef::as_ref).collect();
        assert_eq!(names, vec!["I", "J", STRING, "[Z", "[[Lfoo;"]);
        assert_eq!(split_parameter_list("").unwrap().len(), 0);
        assert!(split_parameter_list("Lunterminated").is_none());
        assert!(split_parameter_list("Q").is_none());
    }

    #[test]
    fn test_immutable_types() {
        assert!(is_immutable_type("I"));
        assert!(is_immutable_type(STRING));
        assert!(!is_immutable_type(STRING_BUILDER));
        assert!(!is_immutable_type("[I"));
    }
}

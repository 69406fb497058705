//! Method descriptors.
//!
//! A [`VirtualMethod`] is the resolver's view of a method: its full signature,
//! the declared parameter types (including the receiver for instance methods),
//! the return type, the access flags and whether a body is available for local
//! interpretation.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

use crate::{
    types::name::{self, TypeName},
    Result,
};

bitflags! {
    /// Dalvik method access flags.
    ///
    /// Values match the `access_flags` encoding of the dex format.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MethodFlags: u32 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Only visible to the defining class
        const PRIVATE = 0x0002;
        /// Visible to package and subclasses
        const PROTECTED = 0x0004;
        /// No receiver
        const STATIC = 0x0008;
        /// Not overridable
        const FINAL = 0x0010;
        /// Acquires the receiver's monitor
        const SYNCHRONIZED = 0x0020;
        /// Implemented in native code
        const NATIVE = 0x0100;
        /// No implementation, must be overridden
        const ABSTRACT = 0x0400;
        /// Instance or static initializer
        const CONSTRUCTOR = 0x1_0000;
    }
}

/// Shared handle to a [`VirtualMethod`].
pub type VirtualMethodRc = Arc<VirtualMethod>;

/// A resolved method descriptor.
///
/// # Parameter Types
///
/// For instance methods the first entry of [`parameter_types`](Self::parameter_types)
/// is the declaring class, mirroring how invoke instructions pass the receiver
/// in their first register.
///
/// # Examples
///
/// ```rust
/// use smaliscope::types::{MethodFlags, VirtualMethod};
///
/// let method = VirtualMethod::new("Lfoo/Bar;->add(IJ)J", MethodFlags::PUBLIC)?
///     .with_body(6);
///
/// assert_eq!(method.name(), "add");
/// assert_eq!(method.parameter_types().len(), 3);
/// assert_eq!(method.parameter_size(), 4);
/// assert!(method.has_implementation());
/// # Ok::<(), smaliscope::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualMethod {
    signature: Arc<str>,
    class_name: TypeName,
    name: Arc<str>,
    descriptor: Arc<str>,
    parameter_types: Vec<TypeName>,
    return_type: TypeName,
    flags: MethodFlags,
    register_count: u16,
    has_body: bool,
}

impl VirtualMethod {
    /// Parses a full method signature such as `Lfoo;->bar(ILjava/lang/String;)V`.
    ///
    /// The method has no body until [`with_body`](Self::with_body) is called.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the signature cannot be parsed.
    pub fn new(signature: &str, flags: MethodFlags) -> Result<Self> {
        let Some((class_name, descriptor)) = signature.split_once("->") else {
            return Err(malformed_error!("Signature without '->' - {}", signature));
        };
        let Some((method_name, rest)) = descriptor.split_once('(') else {
            return Err(malformed_error!("Signature without '(' - {}", signature));
        };
        let Some((parameter_list, return_type)) = rest.split_once(')') else {
            return Err(malformed_error!("Signature without ')' - {}", signature));
        };
        if !name::is_object(class_name) || return_type.is_empty() {
            return Err(malformed_error!("Invalid class or return type - {}", signature));
        }

        let Some(declared) = name::split_parameter_list(parameter_list) else {
            return Err(malformed_error!("Invalid parameter list - {}", signature));
        };

        let mut flags = flags;
        if method_name == "<init>" || method_name == "<clinit>" {
            flags |= MethodFlags::CONSTRUCTOR;
        }

        let class_name = TypeName::from(class_name);
        let mut parameter_types = Vec::with_capacity(declared.len() + 1);
        if !flags.contains(MethodFlags::STATIC) {
            parameter_types.push(class_name.clone());
        }
        parameter_types.extend(declared);

        let mut method = VirtualMethod {
            signature: Arc::from(signature),
            class_name,
            name: Arc::from(method_name),
            descriptor: Arc::from(descriptor),
            parameter_types,
            return_type: TypeName::from(return_type),
            flags,
            register_count: 0,
            has_body: false,
        };
        method.register_count = method.parameter_size();
        Ok(method)
    }

    /// Attaches a bytecode body using `registers` registers in total.
    ///
    /// The register count never drops below the parameter size.
    #[must_use]
    pub fn with_body(mut self, registers: u16) -> Self {
        self.register_count = registers.max(self.parameter_size());
        self.has_body = true;
        self
    }

    /// Full signature, `Lclass;->name(params)ret`.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Declaring class descriptor.
    #[must_use]
    pub fn class_name(&self) -> &TypeName {
        &self.class_name
    }

    /// Simple method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor without the class part, `name(params)ret`.
    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Declared parameter types, receiver first for instance methods.
    #[must_use]
    pub fn parameter_types(&self) -> &[TypeName] {
        &self.parameter_types
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> &TypeName {
        &self.return_type
    }

    /// Access flags.
    #[must_use]
    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    /// Total registers used by the body (parameter size if there is none).
    #[must_use]
    pub fn register_count(&self) -> u16 {
        self.register_count
    }

    /// Number of registers the parameters occupy, counting wide types twice.
    #[must_use]
    pub fn parameter_size(&self) -> u16 {
        self.parameter_types
            .iter()
            .map(|t| name::register_size(t))
            .sum()
    }

    /// Returns `true` if the method returns `void`.
    #[must_use]
    pub fn returns_void(&self) -> bool {
        &*self.return_type == name::VOID
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    /// Returns `true` for final methods.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(MethodFlags::FINAL)
    }

    /// Returns `true` for native methods.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.flags.contains(MethodFlags::NATIVE)
    }

    /// Returns `true` for abstract methods.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    /// Returns `true` for `<init>` methods.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodFlags::CONSTRUCTOR) && &*self.name == "<init>"
    }

    /// Returns `true` if a bytecode body is reachable for interpretation.
    #[must_use]
    pub fn has_implementation(&self) -> bool {
        self.has_body && !self.is_native() && !self.is_abstract()
    }

    /// Offset of each parameter from the start of the parameter region,
    /// paired with its declared type.
    pub fn parameter_offsets(&self) -> impl Iterator<Item = (u16, &TypeName)> + '_ {
        self.parameter_types.iter().scan(0u16, |offset, parameter_type| {
            let current = *offset;
            *offset += name::register_size(parameter_type);
            Some((current, parameter_type))
        })
    }

    /// Declared type of the parameter stored in `register`, given the first
    /// parameter register of a frame for this method.
    #[must_use]
    pub fn parameter_type_at(&self, parameter_start: u16, register: u16) -> Option<&TypeName> {
        let mut current = parameter_start;
        for parameter_type in &self.parameter_types {
            if current == register {
                return Some(parameter_type);
            }
            current += name::register_size(parameter_type);
        }
        None
    }
}

impl fmt::Display for VirtualMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}

//! Modeled exceptions raised by analyzed code.

use std::fmt;

use crate::{
    reflect::ReflectionError,
    types::name::{self, TypeName},
};

/// An exception the analyzed program would throw at a call site.
///
/// These are data, not Rust errors: they are attached to the
/// [`ExecutionNode`](crate::context::ExecutionNode) of the throwing
/// instruction, which stops that execution path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualException {
    exception_class: TypeName,
    message: Option<String>,
}

impl VirtualException {
    /// Creates an exception of `exception_class` carrying `message`.
    #[must_use]
    pub fn new(exception_class: &str, message: impl Into<String>) -> Self {
        VirtualException {
            exception_class: TypeName::from(exception_class),
            message: Some(message.into()),
        }
    }

    /// Creates an exception without a message.
    #[must_use]
    pub fn without_message(exception_class: &str) -> Self {
        VirtualException {
            exception_class: TypeName::from(exception_class),
            message: None,
        }
    }

    /// Exception class descriptor.
    #[must_use]
    pub fn exception_class(&self) -> &TypeName {
        &self.exception_class
    }

    /// Exception message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for VirtualException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = name::binary_name(&self.exception_class);
        match &self.message {
            Some(message) => write!(f, "{class}: {message}"),
            None => f.write_str(&class),
        }
    }
}

impl From<ReflectionError> for VirtualException {
    fn from(error: ReflectionError) -> Self {
        match error {
            ReflectionError::Thrown {
                exception_class,
                message,
            } => VirtualException::new(&exception_class, message),
            ReflectionError::Unsupported(signature) => VirtualException::new(
                "Ljava/lang/UnsupportedOperationException;",
                signature,
            ),
            other @ ReflectionError::InvalidArgument { .. } => {
                VirtualException::new("Ljava/lang/IllegalArgumentException;", other.to_string())
            }
        }
    }
}

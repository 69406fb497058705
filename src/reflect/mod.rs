//! Host execution of pure framework methods.
//!
//! When every argument of a call is known and the configuration marks the
//! target as safe, the resolver hands the callee register file to a
//! [`MethodReflector`], which computes the real result and writes it to the
//! return register.
//!
//! [`BuiltinReflector`] implements a handful of pure `java.lang` methods
//! natively. Embedders with access to a real runtime supply their own
//! implementation of the trait.

mod builtin;

use thiserror::Error;

use crate::{
    context::{Heap, MethodState},
    types::VirtualMethod,
};

pub use builtin::BuiltinReflector;

/// Failure of a reflected call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReflectionError {
    /// The real method threw.
    #[error("{exception_class}: {message}")]
    Thrown {
        /// Exception class descriptor
        exception_class: String,
        /// Exception message
        message: String,
    },

    /// The reflector has no implementation for this method.
    #[error("No reflection target for {0}")]
    Unsupported(String),

    /// An argument could not be converted to a host value.
    #[error("Argument {index} of {signature} is not usable")]
    InvalidArgument {
        /// Signature of the reflected method
        signature: String,
        /// Argument position, receiver first
        index: usize,
    },
}

/// Executes framework methods on the host.
///
/// Implementations read arguments from the parameter region of `state`
/// (receiver first for instance methods) and write the result with
/// [`MethodState::assign_return_register`]. Objects are read from and
/// allocated in `heap`.
pub trait MethodReflector: Send + Sync {
    /// Runs `method` on the arguments in `state`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReflectionError`] if the method throws or cannot be run.
    fn reflect(
        &self,
        method: &VirtualMethod,
        state: &mut MethodState,
        heap: &Heap,
    ) -> Result<(), ReflectionError>;
}

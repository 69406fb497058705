use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - A signature, descriptor or instruction could not be parsed
///
/// ## Type System Errors
/// - [`Error::TypeNotFound`] - Requested class is not registered
/// - [`Error::MethodNotFound`] - Requested method is not declared on its class
/// - [`Error::RecursionLimit`] - A class hierarchy is deeper than allowed (usually a cycle)
///
/// ## Execution Errors
/// - [`Error::InvalidHeapReference`] - A reference points outside the heap
/// - [`Error::HeapLimit`] - The heap reached its configured instance limit
/// - [`Error::Instantiation`] - An object of the requested type cannot be created
/// - [`Error::Vm`] - A nested method execution failed
///
/// # Examples
///
/// ```rust
/// use smaliscope::{types::ClassManager, Error};
///
/// let classes = ClassManager::new();
/// match classes.method("Lapp/Missing;->run()V") {
///     Err(Error::TypeNotFound(name)) => assert_eq!(name, "Lapp/Missing;"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Failed to find a class in the [`ClassManager`](crate::types::ClassManager).
    #[error("Failed to find type - {0}")]
    TypeNotFound(String),

    /// The class exists but does not declare the requested method.
    #[error("Failed to find method - {0}")]
    MethodNotFound(String),

    /// A reference does not point at a live heap slot.
    #[error("Invalid heap reference - {0}")]
    InvalidHeapReference(usize),

    /// The heap holds as many instances as the configuration allows.
    #[error("Heap limit reached - {0} instances")]
    HeapLimit(usize),

    /// Recursion limit reached.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The instantiator refused to create an object of this type.
    #[error("Cannot instantiate {0}")]
    Instantiation(String),

    /// A nested method execution failed.
    #[error("{0}")]
    Vm(#[from] VmError),
}

/// Failures raised while executing a method body.
///
/// These are returned from [`VirtualMachine::execute`](crate::vm::VirtualMachine::execute)
/// and are caught by the invocation resolver, which falls back to assuming
/// unknown results instead of propagating them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// The callee raised an exception the analysis could not model.
    #[error("Unhandled virtual exception {class}: {message}")]
    UnhandledVirtualException {
        /// Exception class descriptor
        class: String,
        /// Exception message
        message: String,
    },

    /// The callee referenced a method that cannot be resolved.
    #[error("Method not found during execution - {0}")]
    MethodNotFound(String),

    /// The interpreter gave up on the callee (visit limits, unsupported
    /// instructions, heap exhaustion).
    #[error("Internal execution error - {0}")]
    Internal(String),
}

impl From<Error> for VmError {
    fn from(error: Error) -> Self {
        match error {
            Error::Vm(inner) => inner,
            Error::MethodNotFound(signature) => VmError::MethodNotFound(signature),
            other => VmError::Internal(other.to_string()),
        }
    }
}

//! Type system: descriptors, methods, classes and the class registry.
//!
//! Everything the invocation resolver knows about the program under analysis
//! is expressed through this module. Method and class descriptors are built
//! by the front end (or by tests) and registered in a [`ClassManager`], which
//! is then shared by the [`VirtualMachine`](crate::vm::VirtualMachine).

pub mod class;
pub mod manager;
pub mod method;
pub mod name;

pub use class::{ClassFlags, TypeOrigin, VirtualType, VirtualTypeRc};
pub use manager::{ClassManager, MAX_HIERARCHY_DEPTH};
pub use method::{MethodFlags, VirtualMethod, VirtualMethodRc};
pub use name::TypeName;

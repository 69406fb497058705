//! # smaliscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the smaliscope library. Import this module to get quick access to the essential
//! types for resolving call sites.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all smaliscope operations
pub use crate::Error;

/// The result type used throughout smaliscope
pub use crate::Result;

/// Failure of a nested method execution
pub use crate::VmError;

// ================================================================================================
// Type Catalog
// ================================================================================================

/// Classes, methods and the registry holding them
pub use crate::types::{
    ClassFlags, ClassManager, MethodFlags, TypeName, TypeOrigin, VirtualMethod, VirtualMethodRc,
    VirtualType,
};

// ================================================================================================
// Execution State
// ================================================================================================

/// Register values and the heap
pub use crate::context::{Heap, HeapItem, Instance, InstanceRef, Value};

/// Register files, contexts and graphs
pub use crate::context::{
    ExecutionContext, ExecutionGraph, ExecutionNode, MethodState, Register, SideEffect,
    VirtualException,
};

// ================================================================================================
// Virtual Machine
// ================================================================================================

/// The virtual machine, its configuration and collaborator traits
pub use crate::vm::{
    Configuration, ExecutionLimits, MethodInterpreter, ObjectInstantiator, VirtualMachine,
};

/// Emulated methods
pub use crate::emulate::{EmulatedMethod, EmulationResult, MethodEmulator};

/// Host reflection
pub use crate::reflect::{MethodReflector, ReflectionError};

// ================================================================================================
// Invocation Resolution
// ================================================================================================

/// Invoke instructions and their results
pub use crate::opcode::{
    ExecutionStrategy, GiveUpReason, Invocation, InvokeKind, InvokeOp, InvokeOutcome,
};

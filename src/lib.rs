// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # smaliscope
//!
//! The invocation-resolution core of an abstract interpreter for Dalvik bytecode.
//!
//! Given a call instruction in an analyzed method, `smaliscope` decides *how*
//! to execute it, performs virtual dispatch, marshals arguments with type
//! reconciliation, and propagates results, side-effect levels and object
//! identity back into the caller's registers. Calls that cannot be resolved
//! widen the caller's state to unknown rather than failing the analysis.
//!
//! ## Features
//!
//! - **Strategy selection** - emulate, reflect, recurse into local code, or give up
//! - **Virtual dispatch** - on the receiver's runtime type for `invoke-virtual`
//! - **Type reconciliation** - untyped register constants take the declared parameter type
//! - **Identity tracking** - constructor placeholders are replaced across every alias
//! - **Side-effect classification** - per call, lowered only on evidence
//! - **Parallel resolution** - independent call sites resolved with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use smaliscope::prelude::*;
//! use std::sync::Arc;
//!
//! let classes = Arc::new(ClassManager::new());
//! let vm = VirtualMachine::builder(classes).build();
//!
//! // A caller with a string in v0
//! let caller = Arc::new(VirtualMethod::new("Lapp/Main;->run()V", MethodFlags::STATIC)?.with_body(1));
//! let heap = vm.new_heap();
//! let text = heap.alloc_string("smali")?;
//! let mut state = MethodState::for_method(&caller);
//! state.assign_register(0, HeapItem::reference(text, "Ljava/lang/String;"));
//! let mut node = ExecutionNode::new(0, ExecutionContext::new(caller, state, heap));
//!
//! // invoke-virtual {v0}, Ljava/lang/String;->length()I
//! let length = Arc::new(VirtualMethod::new("Ljava/lang/String;->length()I", MethodFlags::PUBLIC)?);
//! let op = InvokeOp::new(0x4, InvokeKind::Virtual, length, vec![0])?;
//! let invocation = op.execute(&vm, &mut node);
//!
//! assert_eq!(invocation.outcome, InvokeOutcome::Completed);
//! assert_eq!(invocation.side_effect, SideEffect::None);
//! assert_eq!(node.context().state().peek(Register::Result), HeapItem::int(5));
//! # Ok::<(), smaliscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - class catalog: descriptors, methods, hierarchies
//! - [`context`] - registers, heap, execution contexts and graphs
//! - [`emulate`] - framework methods modeled directly on heap items
//! - [`reflect`] - framework methods computed on the host
//! - [`vm`] - configuration and the recursion entry point
//! - [`opcode`] - the invocation resolver
//!
//! Bytecode decoding and the per-opcode loop for non-invoke instructions are
//! outside this crate. They plug in through [`vm::MethodInterpreter`].
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T, Error>`](Result). Resolving a call
//! never fails: problems are logged through the `log` facade and reported in
//! the [`opcode::InvokeOutcome`].
//!
//! ```rust
//! use smaliscope::{types::ClassManager, Error};
//!
//! let classes = ClassManager::new();
//! match classes.resolve_type("Lapp/Missing;") {
//!     Err(Error::TypeNotFound(name)) => println!("Unknown class {}", name),
//!     Err(e) => println!("Other error: {}", e),
//!     Ok(_) => unreachable!(),
//! }
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use smaliscope::prelude::*;
///
/// let config = Configuration::strict();
/// assert_eq!(config.limits.max_call_depth, 5);
/// ```
pub mod prelude;

/// Registers, heap and execution state of analyzed methods.
///
/// # Key Types
///
/// - [`context::HeapItem`] - a typed register value
/// - [`context::Heap`] - the object arena registers point into
/// - [`context::MethodState`] - one invocation's register file
/// - [`context::ExecutionContext`] - method, registers, heap and call stack
/// - [`context::ExecutionGraph`] - explored paths of an interpreted method
pub mod context;

/// Emulated framework methods.
pub mod emulate;

/// The invocation resolver.
///
/// See [`opcode::InvokeOp::execute`].
pub mod opcode;

/// Host execution of safe framework methods.
pub mod reflect;

/// Type descriptors, methods, classes and the class catalog.
pub mod types;

/// Virtual machine facade, configuration and collaborator traits.
pub mod vm;

/// `smaliscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `smaliscope` Error type
///
/// The main error type for all fallible operations in this crate.
pub use error::Error;

/// Failure of a nested method execution.
///
/// Returned by [`vm::MethodInterpreter`] implementations and
/// [`vm::VirtualMachine::execute`].
pub use error::VmError;

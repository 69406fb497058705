//! Emulated framework methods.
//!
//! Some framework methods are cheaper (or only possible) to model directly on
//! [`HeapItem`](crate::context::HeapItem)s than to interpret or reflect. The
//! [`MethodEmulator`] maps method signatures to such handlers.
//!
//! # Handler Contract
//!
//! A handler receives the callee [`ExecutionContext`] whose parameter region
//! holds the marshaled arguments. It writes its result to the return register,
//! may replace the receiver parameter (constructors) and reports:
//!
//! - the side-effect level of the call, and
//! - any exceptions the call raises in the analyzed program.
//!
//! Handlers only see unknown arguments if they were registered with
//! [`EmulatedMethod::handles_unknown`].
//!
//! # Example
//!
//! ```rust
//! use smaliscope::{
//!     context::{HeapItem, SideEffect},
//!     emulate::{EmulatedMethod, EmulationResult, MethodEmulator},
//! };
//!
//! let mut emulator = MethodEmulator::with_builtins();
//! emulator.register(
//!     EmulatedMethod::new("Lapp/Flags;->debug()Z", |_vm, context| {
//!         context.state_mut().assign_return_register(HeapItem::int(0).cast_to_primitive("Z"));
//!         Ok(EmulationResult::with_side_effect(SideEffect::None))
//!     })
//!     .handles_unknown(),
//! );
//!
//! assert!(emulator.can_emulate("Lapp/Flags;->debug()Z"));
//! assert!(emulator.can_handle_unknown_values("Lapp/Flags;->debug()Z"));
//! assert!(emulator.can_emulate("Ljava/lang/StringBuilder;->toString()Ljava/lang/String;"));
//! ```

mod lang;

use std::{fmt, sync::Arc};

use rustc_hash::FxHashMap;

use crate::{
    context::{ExecutionContext, SideEffect, VirtualException},
    vm::VirtualMachine,
    Result,
};

/// Signature of an emulation handler.
pub type EmulationFn =
    Arc<dyn Fn(&VirtualMachine, &mut ExecutionContext) -> Result<EmulationResult> + Send + Sync>;

/// What an emulated call did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmulationResult {
    /// Side-effect level of the call.
    pub side_effect: SideEffect,
    /// Exceptions raised by the call, empty on normal completion.
    pub exceptions: Vec<VirtualException>,
}

impl EmulationResult {
    /// Normal completion with the given side-effect level.
    #[must_use]
    pub fn with_side_effect(side_effect: SideEffect) -> Self {
        EmulationResult {
            side_effect,
            exceptions: Vec::new(),
        }
    }

    /// The call throws `exception`. Throwing has no side effect of its own.
    #[must_use]
    pub fn raised(exception: VirtualException) -> Self {
        EmulationResult {
            side_effect: SideEffect::None,
            exceptions: vec![exception],
        }
    }
}

/// A registered emulation handler.
#[derive(Clone)]
pub struct EmulatedMethod {
    signature: Arc<str>,
    handles_unknown: bool,
    handler: EmulationFn,
}

impl EmulatedMethod {
    /// Creates a handler for `signature`.
    pub fn new<F>(signature: &str, handler: F) -> Self
    where
        F: Fn(&VirtualMachine, &mut ExecutionContext) -> Result<EmulationResult>
            + Send
            + Sync
            + 'static,
    {
        EmulatedMethod {
            signature: Arc::from(signature),
            handles_unknown: false,
            handler: Arc::new(handler),
        }
    }

    /// Marks the handler as able to work with unknown arguments.
    #[must_use]
    pub fn handles_unknown(mut self) -> Self {
        self.handles_unknown = true;
        self
    }

    /// The emulated signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl fmt::Debug for EmulatedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedMethod")
            .field("signature", &self.signature)
            .field("handles_unknown", &self.handles_unknown)
            .finish_non_exhaustive()
    }
}

/// Registry of emulated methods keyed by signature.
#[derive(Debug, Default, Clone)]
pub struct MethodEmulator {
    methods: FxHashMap<Arc<str>, EmulatedMethod>,
}

impl MethodEmulator {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `java.lang` handlers.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut emulator = Self::new();
        lang::register(&mut emulator);
        emulator
    }

    /// Registers (or replaces) a handler.
    pub fn register(&mut self, method: EmulatedMethod) {
        self.methods.insert(Arc::clone(&method.signature), method);
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Returns `true` if a handler exists for `signature`.
    #[must_use]
    pub fn can_emulate(&self, signature: &str) -> bool {
        self.methods.contains_key(signature)
    }

    /// Returns `true` if the handler for `signature` accepts unknown
    /// arguments.
    #[must_use]
    pub fn can_handle_unknown_values(&self, signature: &str) -> bool {
        self.methods
            .get(signature)
            .is_some_and(|method| method.handles_unknown)
    }

    /// Runs the handler for `signature` against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodNotFound`](crate::Error::MethodNotFound) if no
    /// handler is registered, or whatever the handler fails with.
    pub fn emulate(
        &self,
        vm: &VirtualMachine,
        context: &mut ExecutionContext,
        signature: &str,
    ) -> Result<EmulationResult> {
        let Some(method) = self.methods.get(signature) else {
            return Err(crate::Error::MethodNotFound(signature.to_string()));
        };
        log::trace!("Emulating {}", signature);
        (method.handler)(vm, context)
    }
}

//! Per-invocation register file.
//!
//! A [`MethodState`] maps register indices to [`HeapItem`]s. The last
//! `parameter_size` registers form the parameter region, addressed either by
//! absolute index or by offset from [`parameter_start`](MethodState::parameter_start).
//! Two extra slots hold the value produced by the last call (`move-result`)
//! and the value this method returns.
//!
//! Reads through [`read_register`](MethodState::read_register) and writes
//! through [`assign_register`](MethodState::assign_register) are recorded so
//! later passes can tell which registers an instruction consumed or defined.
//! The `peek`/`poke` variants skip the bookkeeping.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::{
    context::{heap::Heap, item::HeapItem},
    types::{method::VirtualMethod, name},
    Result,
};

/// A register slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    /// Numbered register `vN`.
    Index(u16),
    /// Holds the value of the last invoke for `move-result`.
    Result,
    /// Holds the method's return value.
    Return,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Index(index) => write!(f, "r{index}"),
            Register::Result => f.write_str("result"),
            Register::Return => f.write_str("return"),
        }
    }
}

/// Register file of one method invocation.
///
/// # Examples
///
/// ```rust
/// use smaliscope::context::{HeapItem, MethodState, Register};
///
/// // 4 registers, the last 2 hold parameters
/// let mut state = MethodState::new(4, 2);
/// state.assign_parameter(0, HeapItem::int(7));
///
/// assert_eq!(state.parameter_start(), 2);
/// assert_eq!(state.peek_register(2), HeapItem::int(7));
/// assert!(state.registers_assigned().contains(&Register::Index(2)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodState {
    registers: Vec<Option<HeapItem>>,
    result: Option<HeapItem>,
    return_value: Option<HeapItem>,
    parameter_start: u16,
    assigned: FxHashSet<Register>,
    read: FxHashSet<Register>,
}

impl MethodState {
    /// Creates an empty register file with `register_count` registers, the
    /// last `parameter_size` of which are parameters.
    #[must_use]
    pub fn new(register_count: u16, parameter_size: u16) -> Self {
        let parameter_size = parameter_size.min(register_count);
        MethodState {
            registers: vec![None; usize::from(register_count)],
            result: None,
            return_value: None,
            parameter_start: register_count - parameter_size,
            assigned: FxHashSet::default(),
            read: FxHashSet::default(),
        }
    }

    /// Creates a register file sized for `method`'s body.
    #[must_use]
    pub fn for_method(method: &VirtualMethod) -> Self {
        Self::new(method.register_count(), method.parameter_size())
    }

    /// Creates a register file that only holds `method`'s parameters.
    #[must_use]
    pub fn for_parameters(method: &VirtualMethod) -> Self {
        Self::new(method.parameter_size(), method.parameter_size())
    }

    /// Total number of numbered registers.
    #[must_use]
    pub fn register_count(&self) -> u16 {
        u16::try_from(self.registers.len()).unwrap_or(u16::MAX)
    }

    /// First register of the parameter region.
    #[must_use]
    pub fn parameter_start(&self) -> u16 {
        self.parameter_start
    }

    /// Number of registers in the parameter region.
    #[must_use]
    pub fn parameter_size(&self) -> u16 {
        self.register_count() - self.parameter_start
    }

    /// Returns the item in `register` without recording a read.
    #[must_use]
    pub fn get(&self, register: Register) -> Option<&HeapItem> {
        match register {
            Register::Index(index) => self
                .registers
                .get(usize::from(index))
                .and_then(Option::as_ref),
            Register::Result => self.result.as_ref(),
            Register::Return => self.return_value.as_ref(),
        }
    }

    fn slot_mut(&mut self, register: Register) -> Option<&mut Option<HeapItem>> {
        match register {
            Register::Index(index) => self.registers.get_mut(usize::from(index)),
            Register::Result => Some(&mut self.result),
            Register::Return => Some(&mut self.return_value),
        }
    }

    /// Returns the item in `register`, or an unknown `java.lang.Object` for
    /// registers that were never written.
    #[must_use]
    pub fn peek(&self, register: Register) -> HeapItem {
        self.get(register)
            .cloned()
            .unwrap_or_else(|| HeapItem::unknown(name::OBJECT))
    }

    /// Like [`peek`](Self::peek) but records the read.
    pub fn read(&mut self, register: Register) -> HeapItem {
        self.read.insert(register);
        self.peek(register)
    }

    /// Writes `item` and records the assignment.
    ///
    /// Writes to registers outside the file are ignored.
    pub fn assign(&mut self, register: Register, item: HeapItem) {
        if let Some(slot) = self.slot_mut(register) {
            *slot = Some(item);
            self.assigned.insert(register);
        }
    }

    /// Writes `item` without recording the assignment.
    pub fn poke(&mut self, register: Register, item: HeapItem) {
        if let Some(slot) = self.slot_mut(register) {
            *slot = Some(item);
        }
    }

    /// Reads numbered register `index`, recording the read.
    pub fn read_register(&mut self, index: u16) -> HeapItem {
        self.read(Register::Index(index))
    }

    /// Returns numbered register `index` without recording a read.
    #[must_use]
    pub fn peek_register(&self, index: u16) -> HeapItem {
        self.peek(Register::Index(index))
    }

    /// Returns the parameter `offset` registers into the parameter region.
    #[must_use]
    pub fn peek_parameter(&self, offset: u16) -> HeapItem {
        self.peek_register(self.parameter_start + offset)
    }

    /// Assigns numbered register `index`.
    pub fn assign_register(&mut self, index: u16, item: HeapItem) {
        self.assign(Register::Index(index), item);
    }

    /// Writes numbered register `index` silently.
    pub fn poke_register(&mut self, index: u16, item: HeapItem) {
        self.poke(Register::Index(index), item);
    }

    /// Assigns the parameter `offset` registers into the parameter region.
    pub fn assign_parameter(&mut self, offset: u16, item: HeapItem) {
        self.assign_register(self.parameter_start + offset, item);
    }

    /// Assigns the `move-result` slot.
    pub fn assign_result_register(&mut self, item: HeapItem) {
        self.assign(Register::Result, item);
    }

    /// Assigns the return slot.
    pub fn assign_return_register(&mut self, item: HeapItem) {
        self.assign(Register::Return, item);
    }

    /// Reads the return slot, recording the read.
    pub fn read_return_register(&mut self) -> HeapItem {
        self.read(Register::Return)
    }

    /// Reads the `move-result` slot without recording a read.
    #[must_use]
    pub fn peek_result_register(&self) -> HeapItem {
        self.peek(Register::Result)
    }

    /// Assigns `item` to register `index` and propagates an identity change
    /// to every alias of the previous object.
    ///
    /// When the register held a reference and `item` differs from it, every
    /// register of this file holding the old handle, and the result slot,
    /// receives `item`, including when `item` is not a reference at all. If
    /// `item` carries a different handle, the old heap
    /// slot is also forwarded to the new one (a no-op if a callee already
    /// forwarded it).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeapReference`](crate::Error::InvalidHeapReference)
    /// if either handle is dangling.
    pub fn assign_register_and_update_identities(
        &mut self,
        index: u16,
        item: HeapItem,
        heap: &Heap,
    ) -> Result<()> {
        let previous = self.peek_register(index);

        if let Some(old) = previous.reference_handle() {
            if previous != item {
                if let Some(new) = item.reference_handle().filter(|new| *new != old) {
                    heap.forward(old, new)?;
                }
                let aliases: Vec<Register> = self
                    .registers
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| {
                        matches!(slot, Some(existing) if existing.reference_handle() == Some(old))
                    })
                    .filter_map(|(i, _)| u16::try_from(i).ok().map(Register::Index))
                    .chain(
                        self.result
                            .as_ref()
                            .and_then(HeapItem::reference_handle)
                            .filter(|handle| *handle == old)
                            .map(|_| Register::Result),
                    )
                    .collect();
                for alias in aliases {
                    self.assign(alias, item.clone());
                }
            }
        }

        self.assign_register(index, item);
        Ok(())
    }

    /// Registers written through the recording API.
    #[must_use]
    pub fn registers_assigned(&self) -> &FxHashSet<Register> {
        &self.assigned
    }

    /// Registers read through the recording API.
    #[must_use]
    pub fn registers_read(&self) -> &FxHashSet<Register> {
        &self.read
    }
}

//! Leaf registries: the constant table and the buffer state table.

use std::collections::HashMap;
use std::rc::Rc;

use snafu::OptionExt;

use crate::buffer::{Buffer, BufferId};
use crate::error::{Result, UnknownBufferSnafu, UnknownConstantSnafu};
use crate::state::LocalState;
use crate::task::ConstValue;

/// Deduplicated storage for immutable scalar arguments.
///
/// Invariant: two constants equal by value share one slot.
#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    values: Vec<ConstValue>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of a value, inserting it on first sight.
    pub fn insert(&mut self, value: ConstValue) -> usize {
        match self.values.iter().position(|existing| *existing == value) {
            Some(index) => index,
            None => {
                self.values.push(value);
                self.values.len() - 1
            }
        }
    }

    /// Swap a registered value for a new one, keeping its slot.
    pub fn replace(&mut self, old: ConstValue, new: ConstValue) -> Result<usize> {
        let index = self
            .values
            .iter()
            .position(|existing| *existing == old)
            .context(UnknownConstantSnafu)?;
        self.values[index] = new;
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<ConstValue> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConstValue> {
        self.values.iter()
    }
}

/// Identity-keyed registry of buffers and their per-context local state.
///
/// Lookups go through the buffer's stable [`BufferId`] into an explicit
/// id-to-index map; the index is the buffer's argument slot and survives
/// buffer substitution.
#[derive(Debug, Clone, Default)]
pub struct ObjectStateTable {
    objects: Vec<Rc<Buffer>>,
    index: HashMap<BufferId, usize>,
    states: Vec<LocalState>,
}

impl ObjectStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table index of a buffer, registering it with a fresh all-false state
    /// on first sight.
    pub fn register(&mut self, buffer: &Rc<Buffer>) -> usize {
        if let Some(&index) = self.index.get(&buffer.id()) {
            return index;
        }
        let index = self.objects.len();
        self.objects.push(Rc::clone(buffer));
        self.index.insert(buffer.id(), index);
        self.states.push(LocalState::new());
        index
    }

    /// State for a buffer, registering it on first sight.
    pub fn state_for(&mut self, buffer: &Rc<Buffer>) -> &mut LocalState {
        let index = self.register(buffer);
        &mut self.states[index]
    }

    /// Substitute the buffer at `old`'s slot.
    ///
    /// The new buffer takes over the old index so argument slots baked into
    /// the task list stay valid. Streaming intent carries over to a fresh
    /// state; residency does not (the new buffer has never been
    /// transferred).
    pub fn replace(&mut self, old: &Rc<Buffer>, new: &Rc<Buffer>) -> Result<usize> {
        let index = self.index.remove(&old.id()).context(UnknownBufferSnafu { id: old.id() })?;
        let mut state = LocalState::new();
        state.copy_streaming_from(&self.states[index]);
        self.objects[index] = Rc::clone(new);
        self.index.insert(new.id(), index);
        self.states[index] = state;
        Ok(index)
    }

    pub fn lookup(&self, id: BufferId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn buffer(&self, index: usize) -> Option<&Rc<Buffer>> {
        self.objects.get(index)
    }

    pub fn state(&self, index: usize) -> Option<&LocalState> {
        self.states.get(index)
    }

    pub fn state_mut(&mut self, index: usize) -> Option<&mut LocalState> {
        self.states.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

//! Per-field handlers and the per-message field table.

use std::collections::HashMap;
use std::fmt;

use super::callback::{EndFieldHandler, StartFieldHandler, ValueHandler};
use super::{Flow, HandlerValue, MessageId, StartFlow, Value};
use crate::protocol::{FieldKey, FieldType};

/// Largest dense array the table will build.
const MAX_DENSE_SLOTS: usize = 4096;

/// Minimum fill of the dense array: one used slot per this many.
///
/// Keys carry the wire type in their low three bits, so consecutive field
/// numbers already land eight slots apart.
const DENSE_FILL_RATIO: usize = 16;

/// Handle to one field's handlers inside a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub(crate) message: MessageId,
    pub(crate) index: u32,
}

impl FieldRef {
    /// The message the field belongs to.
    #[inline]
    pub fn message(self) -> MessageId {
        self.message
    }
}

/// Handlers for one field.
pub struct FieldHandlers<C> {
    field_type: FieldType,
    repeated: bool,
    repeated_primitive: bool,
    number: u32,
    key: FieldKey,
    fval: HandlerValue,
    owner: MessageId,
    submsg: Option<MessageId>,
    value: Option<ValueHandler<C>>,
    start_seq: Option<StartFieldHandler<C>>,
    end_seq: Option<EndFieldHandler<C>>,
    start_submsg: Option<StartFieldHandler<C>>,
    end_submsg: Option<EndFieldHandler<C>>,
}

impl<C> FieldHandlers<C> {
    pub(crate) fn new(
        owner: MessageId,
        number: u32,
        field_type: FieldType,
        repeated: bool,
        submsg: Option<MessageId>,
    ) -> Self {
        Self {
            field_type,
            repeated,
            repeated_primitive: repeated && field_type.is_primitive(),
            number,
            key: FieldKey::for_field(number, field_type),
            fval: HandlerValue::None,
            owner,
            submsg,
            value: None,
            start_seq: None,
            end_seq: None,
            start_submsg: None,
            end_submsg: None,
        }
    }

    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[inline]
    pub fn key(&self) -> FieldKey {
        self.key
    }

    #[inline]
    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    /// Repeated scalar; the decoder may see it packed.
    #[inline]
    pub fn is_repeated_primitive(&self) -> bool {
        self.repeated_primitive
    }

    /// Message whose table holds this field.
    #[inline]
    pub fn owner(&self) -> MessageId {
        self.owner
    }

    /// Handlers of the nested message, for message and group fields.
    #[inline]
    pub fn submsg(&self) -> Option<MessageId> {
        self.submsg
    }

    /// Opaque value passed to every callback of this field.
    #[inline]
    pub fn fval(&self) -> &HandlerValue {
        &self.fval
    }

    /// Set the opaque value passed to every callback of this field.
    pub fn set_fval(&mut self, fval: HandlerValue) -> &mut Self {
        self.fval = fval;
        self
    }

    /// Set the handler for decoded scalar values.
    pub fn on_value<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&C, &HandlerValue, &Value) -> Flow + Send + Sync + 'static,
    {
        self.value = Some(Box::new(f));
        self
    }

    /// Set the handler for the start of a repeated field.
    pub fn on_start_seq<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&C, &HandlerValue) -> StartFlow<C> + Send + Sync + 'static,
    {
        self.start_seq = Some(Box::new(f));
        self
    }

    /// Set the handler for the end of a repeated field.
    pub fn on_end_seq<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&C, &HandlerValue) -> Flow + Send + Sync + 'static,
    {
        self.end_seq = Some(Box::new(f));
        self
    }

    /// Set the handler for the start of a nested message.
    pub fn on_start_submsg<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&C, &HandlerValue) -> StartFlow<C> + Send + Sync + 'static,
    {
        self.start_submsg = Some(Box::new(f));
        self
    }

    /// Set the handler for the end of a nested message.
    pub fn on_end_submsg<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&C, &HandlerValue) -> Flow + Send + Sync + 'static,
    {
        self.end_submsg = Some(Box::new(f));
        self
    }

    // Invocation helpers: an absent handler is a pass-through.

    pub(crate) fn call_value(&self, closure: &C, value: &Value) -> Flow {
        match &self.value {
            Some(h) => h(closure, &self.fval, value),
            None => Flow::Continue,
        }
    }

    pub(crate) fn call_start_seq(&self, closure: &C) -> StartFlow<C> {
        match &self.start_seq {
            Some(h) => h(closure, &self.fval),
            None => StartFlow::Continue,
        }
    }

    pub(crate) fn call_end_seq(&self, closure: &C) -> Flow {
        match &self.end_seq {
            Some(h) => h(closure, &self.fval),
            None => Flow::Continue,
        }
    }

    pub(crate) fn call_start_submsg(&self, closure: &C) -> StartFlow<C> {
        match &self.start_submsg {
            Some(h) => h(closure, &self.fval),
            None => StartFlow::Continue,
        }
    }

    pub(crate) fn call_end_submsg(&self, closure: &C) -> Flow {
        match &self.end_submsg {
            Some(h) => h(closure, &self.fval),
            None => Flow::Continue,
        }
    }
}

impl<C> fmt::Debug for FieldHandlers<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHandlers")
            .field("number", &self.number)
            .field("field_type", &self.field_type)
            .field("repeated", &self.repeated)
            .field("owner", &self.owner)
            .field("submsg", &self.submsg)
            .field("fval", &self.fval)
            .finish_non_exhaustive()
    }
}

/// Field key to field index, with a dense array part for small keys.
#[derive(Debug, Default)]
pub(crate) struct FieldTable {
    dense: Vec<Option<u32>>,
    sparse: HashMap<FieldKey, u32>,
}

impl FieldTable {
    /// Insert a key. Returns `false` if the key is already present.
    pub(crate) fn insert(&mut self, key: FieldKey, index: u32) -> bool {
        let slot = key.tag() as usize;
        if slot < self.dense.len() {
            if self.dense[slot].is_some() {
                return false;
            }
            self.dense[slot] = Some(index);
            return true;
        }
        if self.sparse.contains_key(&key) {
            return false;
        }
        self.sparse.insert(key, index);
        true
    }

    #[inline]
    pub(crate) fn get(&self, key: FieldKey) -> Option<u32> {
        let slot = key.tag() as usize;
        if slot < self.dense.len() {
            self.dense[slot]
        } else {
            self.sparse.get(&key).copied()
        }
    }

    pub(crate) fn contains(&self, key: FieldKey) -> bool {
        self.get(key).is_some()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.dense.iter().filter(|s| s.is_some()).count() + self.sparse.len()
    }

    #[cfg(test)]
    pub(crate) fn dense_len(&self) -> usize {
        self.dense.len()
    }

    /// Move small keys into the dense array.
    ///
    /// Picks the largest power-of-two array that stays at least
    /// 1/`DENSE_FILL_RATIO` full. Lookups give the same answers before and after.
    pub(crate) fn compact(&mut self) {
        let mut entries: Vec<(FieldKey, u32)> = self
            .dense
            .iter()
            .enumerate()
            .filter_map(|(slot, idx)| idx.map(|i| (FieldKey::from_tag(slot as u32), i)))
            .chain(self.sparse.drain())
            .collect();
        entries.sort_unstable_by_key(|(key, _)| *key);

        let mut size = 0;
        for (count, (key, _)) in entries.iter().enumerate() {
            let needed = (key.tag() as usize + 1).next_power_of_two();
            if needed > MAX_DENSE_SLOTS {
                break;
            }
            if (count + 1) * DENSE_FILL_RATIO >= needed {
                size = needed;
            }
        }

        self.dense = vec![None; size];
        for (key, index) in entries {
            let slot = key.tag() as usize;
            if slot < size {
                self.dense[slot] = Some(index);
            } else {
                self.sparse.insert(key, index);
            }
        }
    }
}

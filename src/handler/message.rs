//! Per-message handlers.

use std::fmt;

use super::callback::{EndMsgHandler, StartMsgHandler};
use super::field::FieldTable;
use super::{FieldHandlers, FieldRef, Flow, Status};
use crate::protocol::{FieldKey, FieldType};

/// Handle to one message's handlers inside a registry.
///
/// Index 0 is the registry's root message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub(crate) u32);

impl MessageId {
    /// The registry's root message.
    pub const ROOT: Self = Self(0);

    /// Position of the message in the registry.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handlers for one message type: its field table plus begin/end callbacks.
pub struct MessageHandlers<C> {
    id: MessageId,
    fields: Vec<FieldHandlers<C>>,
    table: FieldTable,
    start_msg: Option<StartMsgHandler<C>>,
    end_msg: Option<EndMsgHandler<C>>,
    is_group: bool,
}

impl<C> MessageHandlers<C> {
    pub(crate) fn new(id: MessageId) -> Self {
        Self {
            id,
            fields: Vec::new(),
            table: FieldTable::default(),
            start_msg: None,
            end_msg: None,
            is_group: false,
        }
    }

    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Whether this message is encoded as a wire group.
    #[inline]
    pub fn is_group(&self) -> bool {
        self.is_group
    }

    pub(crate) fn set_group(&mut self) {
        self.is_group = true;
    }

    /// Set the handler called when a message of this type begins.
    pub fn on_start_msg<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&C) -> Flow + Send + Sync + 'static,
    {
        self.start_msg = Some(Box::new(f));
        self
    }

    /// Set the handler called when a message of this type ends.
    pub fn on_end_msg<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&C, &mut Status) + Send + Sync + 'static,
    {
        self.end_msg = Some(Box::new(f));
        self
    }

    /// Add a scalar, string or bytes field.
    ///
    /// # Panics
    ///
    /// Panics if `field_type` is a message or group (use
    /// [`HandlerRegistry::new_submessage_field`](super::HandlerRegistry::new_submessage_field)),
    /// or if a field with the same key already exists.
    pub fn new_field(&mut self, number: u32, field_type: FieldType, repeated: bool) -> FieldRef {
        assert!(
            !field_type.is_submessage(),
            "{:?} field {} needs a submessage handler set",
            field_type,
            number
        );
        self.insert_field(FieldHandlers::new(self.id, number, field_type, repeated, None))
    }

    /// Insert a field, panicking on a duplicate key.
    pub(crate) fn insert_field(&mut self, field: FieldHandlers<C>) -> FieldRef {
        let key = field.key();
        let index = self.fields.len() as u32;
        if !self.table.insert(key, index) {
            panic!(
                "duplicate field key {} (number {}) in message handlers {}",
                key.tag(),
                key.number(),
                self.id.0
            );
        }
        self.fields.push(field);
        FieldRef {
            message: self.id,
            index,
        }
    }

    pub(crate) fn has_key(&self, key: FieldKey) -> bool {
        self.table.contains(key)
    }

    /// Resolve a field key to a field handle.
    #[inline]
    pub fn lookup(&self, key: FieldKey) -> Option<FieldRef> {
        self.table.get(key).map(|index| FieldRef {
            message: self.id,
            index,
        })
    }

    /// Resolve a field key to its handlers.
    pub fn field(&self, key: FieldKey) -> Option<&FieldHandlers<C>> {
        self.table.get(key).map(|i| &self.fields[i as usize])
    }

    /// Find a field's handlers by field number, whatever its wire type.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldHandlers<C>> {
        self.fields
            .iter()
            .find(|f| f.number() == number && f.field_type() != FieldType::EndGroup)
    }

    /// Fields in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldHandlers<C>> {
        self.fields.iter()
    }

    /// Number of fields, including a synthesized end-of-group field.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline]
    pub(crate) fn field_at(&self, index: u32) -> &FieldHandlers<C> {
        &self.fields[index as usize]
    }

    #[inline]
    pub(crate) fn field_at_mut(&mut self, index: u32) -> &mut FieldHandlers<C> {
        &mut self.fields[index as usize]
    }

    pub(crate) fn compact(&mut self) {
        self.table.compact();
    }

    pub(crate) fn call_start_msg(&self, closure: &C) -> Flow {
        match &self.start_msg {
            Some(h) => h(closure),
            None => Flow::Continue,
        }
    }

    pub(crate) fn call_end_msg(&self, closure: &C, status: &mut Status) {
        if let Some(h) = &self.end_msg {
            h(closure, status);
        }
    }
}

impl<C> fmt::Debug for MessageHandlers<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandlers")
            .field("id", &self.id)
            .field("fields", &self.fields)
            .field("is_group", &self.is_group)
            .field("start_msg", &self.start_msg.is_some())
            .field("end_msg", &self.end_msg.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WireType;

    #[test]
    fn test_new_field_and_lookup() {
        let mut m = MessageHandlers::<()>::new(MessageId(0));
        let f = m.new_field(1, FieldType::Int32, false);
        m.new_field(2, FieldType::String, true);

        assert_eq!(m.lookup(FieldKey::new(1, WireType::Varint)), Some(f));
        assert_eq!(m.field(FieldKey::new(2, WireType::Delimited)).unwrap().number(), 2);
        assert!(m.lookup(FieldKey::new(1, WireType::Delimited)).is_none());
        assert_eq!(m.len(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate field key")]
    fn test_duplicate_key_panics() {
        let mut m = MessageHandlers::<()>::new(MessageId(0));
        m.new_field(1, FieldType::Int32, false);
        m.new_field(1, FieldType::UInt64, true);
    }

    #[test]
    fn test_same_number_different_wire_type() {
        let mut m = MessageHandlers::<()>::new(MessageId(0));
        m.new_field(1, FieldType::Int32, false);
        m.new_field(1, FieldType::Fixed32, false);
        assert_eq!(m.len(), 2);
    }

    #[test]
    #[should_panic(expected = "needs a submessage handler set")]
    fn test_message_field_needs_submsg() {
        let mut m = MessageHandlers::<()>::new(MessageId(0));
        m.new_field(1, FieldType::Message, false);
    }

    #[test]
    fn test_end_msg_writes_status() {
        let mut m = MessageHandlers::<u32>::new(MessageId(0));
        m.on_end_msg(|c, status| {
            if *c == 0 {
                status.set_handler_error("empty");
            }
        });

        let mut status = Status::new();
        m.call_end_msg(&1, &mut status);
        assert!(status.is_ok());
        m.call_end_msg(&0, &mut status);
        assert!(!status.is_ok());
    }

    #[test]
    fn test_lookup_survives_compaction() {
        let mut m = MessageHandlers::<()>::new(MessageId(3));
        let a = m.new_field(1, FieldType::Bool, false);
        let b = m.new_field(40_000, FieldType::Bool, false);
        m.compact();

        assert_eq!(m.lookup(FieldKey::for_field(1, FieldType::Bool)), Some(a));
        assert_eq!(m.lookup(FieldKey::for_field(40_000, FieldType::Bool)), Some(b));
        assert_eq!(a.message(), MessageId(3));
    }
}

//! Handler registry: the compiled handler tables for one schema.
//!
//! A [`HandlerRegistry`] is built once, mutably, then frozen into a
//! [`Handlers`] handle that any number of dispatchers share. Submessage links
//! are [`MessageId`]s into the registry's arena, so growing the arena never
//! invalidates them.
//!
//! # Example
//!
//! ```
//! use protodispatch::handler::{HandlerRegistry, StartFlow};
//! use protodispatch::protocol::FieldType;
//! use protodispatch::schema::{FieldDef, MessageDef, SchemaPool};
//!
//! let mut pool = SchemaPool::new();
//! pool.add(
//!     MessageDef::new("demo.List")
//!         .field(FieldDef::scalar("item", 1, FieldType::Int32).repeated())
//!         .field(FieldDef::message("next", 2, "demo.List")),
//! );
//!
//! let mut registry = HandlerRegistry::<u32>::new();
//! let root = registry
//!     .register_schema_with(
//!         &pool,
//!         "demo.List",
//!         |_msg, _def| {},
//!         |field, def| {
//!             if def.is_submessage() {
//!                 field.on_start_submsg(|depth, _| StartFlow::ContinueWith(depth + 1));
//!             }
//!         },
//!     )
//!     .unwrap();
//!
//! let handlers = registry.freeze();
//! assert_eq!(handlers.len(), 1);
//! assert_eq!(handlers.message(root).unwrap().len(), 2);
//! ```

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use super::{FieldHandlers, FieldRef, MessageHandlers, MessageId};
use crate::error::{Error, Result};
use crate::protocol::{FieldKey, FieldType, MAX_FIELD_NUMBER};
use crate::schema::{FieldDef, MessageDef, SchemaPool};

/// Initial arena capacity; the arena doubles when full.
const INITIAL_CAPACITY: usize = 4;

/// Mutable collection of message handlers, under construction.
pub struct HandlerRegistry<C> {
    msgs: Vec<MessageHandlers<C>>,
}

impl<C> HandlerRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            msgs: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Append a new, empty message handler set.
    ///
    /// The first set created is the root that dispatchers start from.
    pub fn new_message_handlers(&mut self) -> MessageId {
        if self.msgs.len() == self.msgs.capacity() {
            self.msgs.reserve_exact(self.msgs.capacity().max(1));
        }
        let id = MessageId(self.msgs.len() as u32);
        self.msgs.push(MessageHandlers::new(id));
        id
    }

    /// Number of message handler sets.
    pub fn len(&self) -> usize {
        self.msgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }

    /// The root message handlers (first created).
    pub fn root(&self) -> Option<&MessageHandlers<C>> {
        self.msgs.first()
    }

    pub fn message(&self, id: MessageId) -> Option<&MessageHandlers<C>> {
        self.msgs.get(id.index())
    }

    pub fn message_mut(&mut self, id: MessageId) -> Option<&mut MessageHandlers<C>> {
        self.msgs.get_mut(id.index())
    }

    /// Message handler sets in creation order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageHandlers<C>> {
        self.msgs.iter()
    }

    pub fn field(&self, f: FieldRef) -> Option<&FieldHandlers<C>> {
        self.message(f.message)
            .filter(|m| (f.index as usize) < m.len())
            .map(|m| m.field_at(f.index))
    }

    // Dispatch-path accessors: handles always come from this registry.

    #[inline]
    pub(crate) fn message_at(&self, id: MessageId) -> &MessageHandlers<C> {
        &self.msgs[id.index()]
    }

    #[inline]
    pub(crate) fn field_at(&self, f: FieldRef) -> &FieldHandlers<C> {
        self.msgs[f.message.index()].field_at(f.index)
    }

    pub fn field_mut(&mut self, f: FieldRef) -> Option<&mut FieldHandlers<C>> {
        self.message_mut(f.message)
            .filter(|m| (f.index as usize) < m.len())
            .map(|m| m.field_at_mut(f.index))
    }

    /// Add a scalar, string or bytes field to `msg`.
    ///
    /// # Panics
    ///
    /// Panics if `msg` is not in this registry, if `field_type` is a message
    /// or group, or on a duplicate field key.
    pub fn new_field(
        &mut self,
        msg: MessageId,
        number: u32,
        field_type: FieldType,
        repeated: bool,
    ) -> FieldRef {
        self.msgs[msg.index()].new_field(number, field_type, repeated)
    }

    /// Add a message or group field to `msg`, linked to the handlers of `submsg`.
    ///
    /// A group field also registers its end-of-group marker on `submsg` and
    /// flags `submsg` as a group.
    ///
    /// # Panics
    ///
    /// Panics if either id is not in this registry, if `field_type` is not a
    /// message or group, or on a duplicate field key.
    pub fn new_submessage_field(
        &mut self,
        msg: MessageId,
        number: u32,
        field_type: FieldType,
        repeated: bool,
        submsg: MessageId,
    ) -> FieldRef {
        assert!(
            field_type.is_submessage(),
            "{:?} field {} cannot link a submessage",
            field_type,
            number
        );
        assert!(
            submsg.index() < self.msgs.len(),
            "submessage handlers {} not in registry",
            submsg.0
        );

        let field = FieldHandlers::new(msg, number, field_type, repeated, Some(submsg));
        let fref = self.msgs[msg.index()].insert_field(field);

        if field_type == FieldType::Group {
            let sub = &mut self.msgs[submsg.index()];
            let end_key = FieldKey::for_field(number, FieldType::EndGroup);
            // The same group type may be reached from several fields of one number.
            if !sub.has_key(end_key) {
                sub.insert_field(FieldHandlers::new(submsg, number, FieldType::EndGroup, false, None));
            }
            sub.set_group();
        }
        fref
    }

    /// Compile `root` and every message reachable from it.
    ///
    /// Returns the handlers of `root`.
    pub fn register_schema(&mut self, pool: &SchemaPool, root: &str) -> Result<MessageId> {
        self.register_schema_with(pool, root, |_, _| {}, |_, _| {})
    }

    /// Compile `root` and every message reachable from it, calling
    /// `on_message` once per distinct message and `on_field` once per field so
    /// the caller can attach handlers.
    ///
    /// Message types are deduplicated by full name for the duration of this
    /// call, so self-referential and mutually recursive schemas terminate with
    /// one handler set per type.
    pub fn register_schema_with<M, F>(
        &mut self,
        pool: &SchemaPool,
        root: &str,
        mut on_message: M,
        mut on_field: F,
    ) -> Result<MessageId>
    where
        M: FnMut(&mut MessageHandlers<C>, &MessageDef),
        F: FnMut(&mut FieldHandlers<C>, &FieldDef),
    {
        let def = pool
            .get(root)
            .ok_or_else(|| Error::UnknownMessage(root.to_string()))?;

        let before = self.msgs.len();
        let mut seen = HashMap::new();
        let id = match self.register_message(pool, def, &mut on_message, &mut on_field, &mut seen)
        {
            Ok(id) => id,
            Err(e) => {
                // Every set this call touched was allocated after `before`.
                tracing::warn!(
                    "Schema {} rejected, discarding {} partial handler sets: {}",
                    root,
                    self.msgs.len() - before,
                    e
                );
                self.msgs.truncate(before);
                return Err(e);
            }
        };

        tracing::debug!(
            "Registered schema {} ({} message handler sets)",
            root,
            self.msgs.len() - before
        );
        Ok(id)
    }

    fn register_message<'p, M, F>(
        &mut self,
        pool: &'p SchemaPool,
        def: &'p MessageDef,
        on_message: &mut M,
        on_field: &mut F,
        seen: &mut HashMap<&'p str, MessageId>,
    ) -> Result<MessageId>
    where
        M: FnMut(&mut MessageHandlers<C>, &MessageDef),
        F: FnMut(&mut FieldHandlers<C>, &FieldDef),
    {
        let id = self.new_message_handlers();
        seen.insert(def.full_name.as_str(), id);
        on_message(&mut self.msgs[id.index()], def);

        for field in &def.fields {
            if field.number == 0 || field.number > MAX_FIELD_NUMBER {
                return Err(Error::Schema(format!(
                    "{}.{}: field number {} out of range",
                    def.full_name, field.name, field.number
                )));
            }
            let fref = if field.is_submessage() {
                let target = field.type_name.as_deref().ok_or_else(|| {
                    Error::Schema(format!(
                        "{}.{}: message field without type name",
                        def.full_name, field.name
                    ))
                })?;
                let submsg = match seen.get(target) {
                    Some(&existing) => existing,
                    None => {
                        let sub_def = pool
                            .get(target)
                            .ok_or_else(|| Error::UnknownMessage(target.to_string()))?;
                        self.register_message(pool, sub_def, on_message, on_field, seen)?
                    }
                };
                self.new_submessage_field(
                    id,
                    field.number,
                    field.field_type,
                    field.is_repeated(),
                    submsg,
                )
            } else {
                self.new_field(id, field.number, field.field_type, field.is_repeated())
            };

            let fh = self.msgs[fref.message.index()].field_at_mut(fref.index);
            on_field(fh, field);
        }

        tracing::trace!("Compiled {} as handler set {}", def.full_name, id.0);
        Ok(id)
    }

    /// Optimize every field table and share the registry.
    pub fn freeze(mut self) -> Handlers<C> {
        for m in &mut self.msgs {
            m.compact();
        }
        tracing::debug!("Froze handler registry with {} message sets", self.msgs.len());
        Handlers {
            inner: Arc::new(self),
        }
    }
}

impl<C> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, read-only handle to a frozen registry.
///
/// The handle is an atomic reference count: [`retain`](Self::retain) adds a
/// reference, [`release`](Self::release) drops one, and the registry and all
/// its handlers are freed with the last reference.
pub struct Handlers<C> {
    inner: Arc<HandlerRegistry<C>>,
}

impl<C> Handlers<C> {
    /// Take another reference to the registry.
    #[inline]
    pub fn retain(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Give up this reference; frees the registry if it was the last one.
    #[inline]
    pub fn release(self) {
        drop(self);
    }

    /// Current number of references.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether two handles share one registry.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<C> Clone for Handlers<C> {
    fn clone(&self) -> Self {
        self.retain()
    }
}

impl<C> Deref for Handlers<C> {
    type Target = HandlerRegistry<C>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerValue;
    use crate::protocol::WireType;

    fn pool(defs: Vec<MessageDef>) -> SchemaPool {
        SchemaPool::from(defs)
    }

    #[test]
    fn test_arena_grows() {
        let mut reg = HandlerRegistry::<()>::new();
        let ids: Vec<_> = (0..9).map(|_| reg.new_message_handlers()).collect();

        assert_eq!(reg.len(), 9);
        assert_eq!(ids[8].index(), 8);
        assert_eq!(reg.root().unwrap().id(), ids[0]);
    }

    #[test]
    fn test_self_reference_single_set() {
        let pool = pool(vec![MessageDef::new("t.A").field(FieldDef::message("a", 1, "t.A"))]);
        let mut reg = HandlerRegistry::<()>::new();
        let root = reg.register_schema(&pool, "t.A").unwrap();

        assert_eq!(reg.len(), 1);
        let f = reg.message(root).unwrap().field_by_number(1).unwrap();
        assert_eq!(f.submsg(), Some(root));
        assert_eq!(f.owner(), root);
    }

    #[test]
    fn test_mutual_recursion() {
        let pool = pool(vec![
            MessageDef::new("t.A")
                .field(FieldDef::message("b", 1, "t.B"))
                .field(FieldDef::message("b2", 2, "t.B").repeated()),
            MessageDef::new("t.B").field(FieldDef::message("a", 1, "t.A")),
        ]);
        let mut reg = HandlerRegistry::<()>::new();
        let a = reg.register_schema(&pool, "t.A").unwrap();

        assert_eq!(reg.len(), 2);
        let am = reg.message(a).unwrap();
        let b = am.field_by_number(1).unwrap().submsg().unwrap();
        assert_eq!(am.field_by_number(2).unwrap().submsg(), Some(b));
        assert_eq!(reg.message(b).unwrap().field_by_number(1).unwrap().submsg(), Some(a));
    }

    #[test]
    fn test_callbacks_once_per_message_and_field() {
        let pool = pool(vec![
            MessageDef::new("t.A")
                .field(FieldDef::scalar("x", 1, FieldType::Int32))
                .field(FieldDef::message("b", 2, "t.B"))
                .field(FieldDef::message("self", 3, "t.A")),
            MessageDef::new("t.B").field(FieldDef::scalar("y", 1, FieldType::String)),
        ]);

        let mut messages = Vec::new();
        let mut fields = Vec::new();
        let mut reg = HandlerRegistry::<()>::new();
        reg.register_schema_with(
            &pool,
            "t.A",
            |_, def| messages.push(def.full_name.clone()),
            |fh, def| {
                fh.set_fval(HandlerValue::UInt(u64::from(def.number)));
                fields.push(def.name.clone());
            },
        )
        .unwrap();

        assert_eq!(messages, vec!["t.A", "t.B"]);
        // B's field is registered while A's field 2 is being resolved.
        assert_eq!(fields, vec!["x", "y", "b", "self"]);

        let root = reg.root().unwrap();
        assert_eq!(root.field_by_number(3).unwrap().fval().as_uint(), Some(3));
    }

    #[test]
    fn test_group_synthesizes_end_marker() {
        let pool = pool(vec![
            MessageDef::new("t.Outer").field(FieldDef::group("item", 4, "t.Item").repeated()),
            MessageDef::new("t.Item").field(FieldDef::scalar("id", 1, FieldType::UInt32)),
        ]);
        let mut reg = HandlerRegistry::<()>::new();
        let outer = reg.register_schema(&pool, "t.Outer").unwrap();

        let item = reg.message(outer).unwrap().field_by_number(4).unwrap().submsg().unwrap();
        let item = reg.message(item).unwrap();
        assert!(item.is_group());
        let end = item.field(FieldKey::new(4, WireType::EndGroup)).unwrap();
        assert_eq!(end.field_type(), FieldType::EndGroup);
        assert!(end.submsg().is_none());
        assert!(!reg.message(outer).unwrap().is_group());
    }

    #[test]
    fn test_self_referencing_group() {
        let pool = pool(vec![MessageDef::new("t.G").field(FieldDef::group("g", 2, "t.G"))]);
        let mut reg = HandlerRegistry::<()>::new();
        let g = reg.register_schema(&pool, "t.G").unwrap();

        let m = reg.message(g).unwrap();
        assert_eq!(m.len(), 2);
        assert!(m.is_group());
    }

    #[test]
    fn test_unknown_root() {
        let mut reg = HandlerRegistry::<()>::new();
        let result = reg.register_schema(&SchemaPool::new(), "t.Nope");
        assert!(matches!(result, Err(Error::UnknownMessage(_))));
    }

    #[test]
    fn test_unknown_submessage() {
        let pool = pool(vec![MessageDef::new("t.A").field(FieldDef::message("b", 1, "t.B"))]);
        let mut reg = HandlerRegistry::<()>::new();
        match reg.register_schema(&pool, "t.A") {
            Err(Error::UnknownMessage(name)) => assert_eq!(name, "t.B"),
            other => panic!("expected UnknownMessage, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_failed_schema_leaves_registry_untouched() {
        let pool = pool(vec![
            MessageDef::new("t.A")
                .field(FieldDef::message("b", 1, "t.B"))
                .field(FieldDef::message("c", 2, "t.Missing")),
            MessageDef::new("t.B").field(FieldDef::scalar("x", 1, FieldType::Int32)),
        ]);
        let mut reg = HandlerRegistry::<()>::new();
        let kept = reg.new_message_handlers();

        let result = reg.register_schema(&pool, "t.A");
        assert!(matches!(result, Err(Error::UnknownMessage(name)) if name == "t.Missing"));
        assert_eq!(reg.len(), 1);
        assert!(reg.message(kept).unwrap().is_empty());

        // The registry stays usable after the failure.
        let b = reg.register_schema(&pool, "t.B").unwrap();
        assert_eq!(b.index(), 1);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_field_number_out_of_range() {
        let mut reg = HandlerRegistry::<()>::new();
        for number in [0, MAX_FIELD_NUMBER + 1, u32::MAX] {
            let pool = pool(vec![MessageDef::new("t.A")
                .field(FieldDef::scalar("ok", 1, FieldType::Int32))
                .field(FieldDef::scalar("bad", number, FieldType::Int32))]);
            let result = reg.register_schema(&pool, "t.A");
            assert!(matches!(result, Err(Error::Schema(msg)) if msg.contains("out of range")));
        }
        assert!(reg.is_empty());
    }

    #[test]
    #[should_panic(expected = "duplicate field key")]
    fn test_duplicate_field_in_schema_panics() {
        let pool = pool(vec![MessageDef::new("t.A")
            .field(FieldDef::scalar("x", 1, FieldType::Int32))
            .field(FieldDef::scalar("y", 1, FieldType::SInt64))]);
        let mut reg = HandlerRegistry::<()>::new();
        let _ = reg.register_schema(&pool, "t.A");
    }

    #[test]
    fn test_manual_construction() {
        let mut reg = HandlerRegistry::<()>::new();
        let root = reg.new_message_handlers();
        let child = reg.new_message_handlers();
        let f = reg.new_submessage_field(root, 1, FieldType::Message, true, child);
        let g = reg.new_field(child, 1, FieldType::Double, true);

        assert_eq!(reg.field(f).unwrap().submsg(), Some(child));
        assert!(reg.field(g).unwrap().is_repeated_primitive());
        reg.field_mut(g).unwrap().set_fval(HandlerValue::Int(-1));
        assert_eq!(reg.field(g).unwrap().fval().as_int(), Some(-1));
    }

    #[test]
    #[should_panic(expected = "cannot link a submessage")]
    fn test_scalar_with_submessage_panics() {
        let mut reg = HandlerRegistry::<()>::new();
        let root = reg.new_message_handlers();
        reg.new_submessage_field(root, 1, FieldType::Int32, false, root);
    }

    #[test]
    fn test_retain_release_counts() {
        let marker = Arc::new(());
        let mut reg = HandlerRegistry::<()>::new();
        let root = reg.new_message_handlers();
        let f = reg.new_field(root, 1, FieldType::Bool, false);
        reg.field_mut(f).unwrap().set_fval(HandlerValue::Shared(marker.clone()));

        let handlers = reg.freeze();
        assert_eq!(handlers.ref_count(), 1);

        let second = handlers.retain();
        assert_eq!(handlers.ref_count(), 2);
        assert!(second.ptr_eq(&handlers));

        second.release();
        assert_eq!(Arc::strong_count(&marker), 2, "registry still alive after first release");

        handlers.release();
        assert_eq!(Arc::strong_count(&marker), 1, "registry freed after last release");
    }

    #[test]
    fn test_frozen_lookup() {
        let pool = pool(vec![MessageDef::new("t.A")
            .field(FieldDef::scalar("x", 1, FieldType::Int32))
            .field(FieldDef::scalar("big", 300_000, FieldType::Fixed64))]);
        let mut reg = HandlerRegistry::<()>::new();
        let a = reg.register_schema(&pool, "t.A").unwrap();
        let handlers = reg.freeze();

        let m = handlers.message(a).unwrap();
        assert!(m.lookup(FieldKey::for_field(1, FieldType::Int32)).is_some());
        assert!(m.lookup(FieldKey::for_field(300_000, FieldType::Fixed64)).is_some());
    }
}

//! Dispatcher stack frames.

use crate::handler::FieldRef;

/// What opened a nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The implicit top-level scope wrapping the root message.
    Root,
    /// A repeated field.
    Sequence(FieldRef),
    /// A nested message or group.
    Submessage(FieldRef),
}

/// One level of the dispatcher's nesting stack.
#[derive(Debug, Clone)]
pub struct Frame<C> {
    kind: FrameKind,
    closure: C,
    packed: bool,
}

impl<C> Frame<C> {
    pub(crate) fn root(closure: C) -> Self {
        Self {
            kind: FrameKind::Root,
            closure,
            packed: false,
        }
    }

    pub(crate) fn sequence(field: FieldRef, closure: C) -> Self {
        Self {
            kind: FrameKind::Sequence(field),
            closure,
            packed: false,
        }
    }

    pub(crate) fn submessage(field: FieldRef, closure: C) -> Self {
        Self {
            kind: FrameKind::Submessage(field),
            closure,
            packed: false,
        }
    }

    #[inline]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// The user closure for this level.
    #[inline]
    pub fn closure(&self) -> &C {
        &self.closure
    }

    /// The field that opened this level; `None` for the root.
    #[inline]
    pub fn field(&self) -> Option<FieldRef> {
        match self.kind {
            FrameKind::Root => None,
            FrameKind::Sequence(f) | FrameKind::Submessage(f) => Some(f),
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.kind == FrameKind::Root
    }

    #[inline]
    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, FrameKind::Sequence(_))
    }

    /// Whether this sequence arrived as one packed, length-delimited run.
    #[inline]
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub(crate) fn set_packed(&mut self, packed: bool) {
        self.packed = packed;
    }
}

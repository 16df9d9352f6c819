//! The per-session dispatcher.
//!
//! A decoder drives the dispatcher with structural events; the dispatcher
//! keeps the nesting stack, switches the active handler table and calls the
//! registered callbacks in order. Every event returns the resulting [`Flow`]:
//!
//! - `Continue` - keep feeding events
//! - `SkipSubmessage` - the innermost level was abandoned; skip its bytes
//! - `Break` - the pass is over; stop consuming input

use std::fmt;

use super::config::DispatcherConfig;
use super::frame::{Frame, FrameKind};
use crate::error::DispatchError;
use crate::handler::{
    FieldRef, Flow, Handlers, MessageHandlers, MessageId, StartFlow, Status, Value,
};
use crate::protocol::FieldKey;

/// Callback into the embedding decoder.
type SourceCallback = Box<dyn FnMut() + Send>;

/// Builder for a [`Dispatcher`].
pub struct DispatcherBuilder<C> {
    handlers: Handlers<C>,
    config: DispatcherConfig,
    skip: Option<SourceCallback>,
    exit: Option<SourceCallback>,
}

impl<C: Clone> DispatcherBuilder<C> {
    /// Start building a dispatcher over `handlers` (takes a reference).
    pub fn new(handlers: &Handlers<C>) -> Self {
        Self {
            handlers: handlers.retain(),
            config: DispatcherConfig::default(),
            skip: None,
            exit: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum nesting depth (root frame included).
    ///
    /// Default: [`MAX_NESTING`](super::MAX_NESTING)
    pub fn max_nesting(mut self, limit: usize) -> Self {
        self.config.max_nesting = limit;
        self
    }

    /// Set the callback the decoder uses to discard the rest of the current field.
    pub fn on_skip<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.skip = Some(Box::new(f));
        self
    }

    /// Set the callback invoked once when a decode pass aborts completely.
    pub fn on_exit<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.exit = Some(Box::new(f));
        self
    }

    /// Build the dispatcher.
    ///
    /// # Panics
    ///
    /// Panics if the registry has no message handlers.
    pub fn build(self) -> Dispatcher<C> {
        assert!(
            !self.handlers.is_empty(),
            "dispatcher needs at least one message handler set"
        );
        let limit = self.config.effective_max_nesting();
        tracing::debug!(
            "Dispatcher created over {} message sets (max nesting {})",
            self.handlers.len(),
            limit
        );
        Dispatcher {
            handlers: self.handlers,
            stack: Vec::with_capacity(limit),
            limit,
            msg: MessageId::ROOT,
            status: Status::new(),
            skip: self.skip,
            exit: self.exit,
        }
    }
}

/// Runtime state of one decode session.
///
/// Holds a reference to its registry until [`teardown`](Self::teardown) (or drop).
/// Until [`reset`](Self::reset) is called, and again after a pass has
/// aborted, the stack is empty and every event returns `Flow::Break`.
pub struct Dispatcher<C> {
    handlers: Handlers<C>,
    stack: Vec<Frame<C>>,
    limit: usize,
    /// Message whose field table is active.
    msg: MessageId,
    status: Status,
    skip: Option<SourceCallback>,
    exit: Option<SourceCallback>,
}

impl<C: Clone> Dispatcher<C> {
    /// Create a dispatcher with default configuration and no callbacks.
    pub fn new(handlers: &Handlers<C>) -> Self {
        DispatcherBuilder::new(handlers).build()
    }

    /// Create a dispatcher builder.
    pub fn builder(handlers: &Handlers<C>) -> DispatcherBuilder<C> {
        DispatcherBuilder::new(handlers)
    }

    /// Prepare a new decode pass rooted at the registry's root message.
    pub fn reset(&mut self, closure: C) -> &Frame<C> {
        self.msg = MessageId::ROOT;
        self.status.clear();
        self.stack.clear();
        self.stack.push(Frame::root(closure));
        &self.stack[0]
    }

    /// Release the registry reference. Must be the last call on the dispatcher.
    pub fn teardown(self) {
        tracing::debug!(
            "Dispatcher torn down ({} registry refs before release)",
            self.handlers.ref_count()
        );
        drop(self);
    }

    /// Begin the message of the active handler table.
    pub fn start_msg(&mut self) -> Flow {
        if !self.is_running("start_msg") {
            return Flow::Break;
        }
        let flow = self
            .handlers
            .message_at(self.msg)
            .call_start_msg(self.top_frame().closure());
        self.proceed(flow)
    }

    /// End the top-level message and copy the session status into `status`.
    pub fn end_msg(&mut self, status: &mut Status) {
        // After an abort the root's end handler has already run during unwind.
        if self.stack.len() == 1 {
            let root = &self.stack[0];
            self.handlers
                .message_at(self.msg)
                .call_end_msg(root.closure(), &mut self.status);
        } else if !self.stack.is_empty() {
            tracing::warn!("end_msg with {} levels still open", self.stack.len() - 1);
        }
        status.copy_from(&self.status);
    }

    /// Begin a repeated field.
    pub fn start_seq(&mut self, field: FieldRef) -> Flow {
        if !self.is_running("start_seq") {
            return Flow::Break;
        }
        if self.stack.len() >= self.limit {
            return self.nesting_too_deep();
        }

        let parent = self.top_frame().closure().clone();
        tracing::trace!("start_seq field {}", self.handlers.field_at(field).number());
        match self.handlers.field_at(field).call_start_seq(&parent) {
            StartFlow::Continue => {
                self.stack.push(Frame::sequence(field, parent));
                Flow::Continue
            }
            StartFlow::ContinueWith(closure) => {
                self.stack.push(Frame::sequence(field, closure));
                Flow::Continue
            }
            StartFlow::Break => self.unwind(Flow::Break),
            StartFlow::SkipSubmessage => {
                self.stack.push(Frame::sequence(field, parent));
                self.unwind(Flow::SkipSubmessage)
            }
        }
    }

    /// End the innermost repeated field.
    pub fn end_seq(&mut self) -> Flow {
        if !self.is_running("end_seq") {
            return Flow::Break;
        }
        let FrameKind::Sequence(field) = self.top_frame().kind() else {
            tracing::warn!("end_seq without an open sequence");
            return Flow::Continue;
        };

        self.stack.pop();
        let flow = self
            .handlers
            .field_at(field)
            .call_end_seq(self.top_frame().closure());
        if !flow.is_continue() {
            return self.unwind(flow);
        }
        self.msg = self.frame_message(self.top_frame());
        Flow::Continue
    }

    /// Begin a nested message or group, then its begin-of-message handler.
    ///
    /// # Panics
    ///
    /// Panics if `field` is not a message or group field.
    pub fn start_submsg(&mut self, field: FieldRef) -> Flow {
        if !self.is_running("start_submsg") {
            return Flow::Break;
        }
        if self.stack.len() >= self.limit {
            return self.nesting_too_deep();
        }

        let fh = self.handlers.field_at(field);
        let Some(submsg) = fh.submsg() else {
            panic!("field {} has no submessage handler set", fh.number());
        };
        tracing::trace!("start_submsg field {}", fh.number());

        let parent = self.top_frame().closure().clone();
        match fh.call_start_submsg(&parent) {
            StartFlow::Continue => {
                self.stack.push(Frame::submessage(field, parent));
                self.msg = submsg;
                self.start_msg()
            }
            StartFlow::ContinueWith(closure) => {
                self.stack.push(Frame::submessage(field, closure));
                self.msg = submsg;
                self.start_msg()
            }
            StartFlow::Break => self.unwind(Flow::Break),
            StartFlow::SkipSubmessage => {
                // The level was never entered, so only the field's end handler runs.
                fh.call_end_submsg(&parent);
                Flow::SkipSubmessage
            }
        }
    }

    /// End the innermost nested message.
    pub fn end_submsg(&mut self) -> Flow {
        if !self.is_running("end_submsg") {
            return Flow::Break;
        }
        let FrameKind::Submessage(field) = self.top_frame().kind() else {
            tracing::warn!("end_submsg without an open submessage");
            return Flow::Continue;
        };

        let handlers = &self.handlers;
        let top = &self.stack[self.stack.len() - 1];
        handlers
            .message_at(self.msg)
            .call_end_msg(top.closure(), &mut self.status);

        let fh = handlers.field_at(field);
        self.msg = fh.owner();
        self.stack.pop();
        let flow = fh.call_end_submsg(self.stack[self.stack.len() - 1].closure());
        self.proceed(flow)
    }

    /// Deliver one decoded scalar of `field`.
    pub fn value(&mut self, field: FieldRef, value: &Value) -> Flow {
        if !self.is_running("value") {
            return Flow::Break;
        }
        let flow = self
            .handlers
            .field_at(field)
            .call_value(self.top_frame().closure(), value);
        self.proceed(flow)
    }

    /// Ask the embedding decoder to discard the rest of the current field.
    pub fn skip(&mut self) {
        if let Some(skip) = self.skip.as_mut() {
            skip();
        }
    }

    /// Mark the innermost sequence as packed (or not).
    pub fn set_packed(&mut self, packed: bool) {
        match self.stack.last_mut() {
            Some(top) if top.is_sequence() => top.set_packed(packed),
            _ => tracing::warn!("set_packed without an open sequence"),
        }
    }

    /// Whether input may end here: at the root, or inside a single unpacked
    /// top-level sequence that has no explicit terminator on the wire.
    pub fn is_legal_end(&self) -> bool {
        match self.stack.as_slice() {
            [_root] => true,
            [_root, top] => top.is_sequence() && !top.is_packed(),
            _ => false,
        }
    }

    /// Whether only the root frame is open.
    pub fn at_root(&self) -> bool {
        self.stack.len() == 1
    }

    /// Whether a pass is in progress (reset and not aborted).
    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Number of open levels above the root.
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    /// The innermost frame.
    pub fn top(&self) -> Option<&Frame<C>> {
        self.stack.last()
    }

    /// Resolve a field key in the active handler table.
    #[inline]
    pub fn lookup(&self, key: FieldKey) -> Option<FieldRef> {
        self.handlers.message_at(self.msg).lookup(key)
    }

    /// The active handler table.
    pub fn active_message(&self) -> &MessageHandlers<C> {
        self.handlers.message_at(self.msg)
    }

    /// The session status.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// The registry this dispatcher holds.
    pub fn handlers(&self) -> &Handlers<C> {
        &self.handlers
    }

    fn is_running(&self, event: &str) -> bool {
        if self.stack.is_empty() {
            tracing::warn!("{} ignored: no decode pass in progress", event);
            return false;
        }
        true
    }

    #[inline]
    fn top_frame(&self) -> &Frame<C> {
        &self.stack[self.stack.len() - 1]
    }

    /// Message whose table is active while `frame` is on top.
    fn frame_message(&self, frame: &Frame<C>) -> MessageId {
        match frame.kind() {
            FrameKind::Root => MessageId::ROOT,
            FrameKind::Sequence(f) => self.handlers.field_at(f).owner(),
            FrameKind::Submessage(f) => self
                .handlers
                .field_at(f)
                .submsg()
                .unwrap_or(MessageId::ROOT),
        }
    }

    #[inline]
    fn proceed(&mut self, flow: Flow) -> Flow {
        if flow.is_continue() {
            Flow::Continue
        } else {
            self.unwind(flow)
        }
    }

    fn nesting_too_deep(&mut self) -> Flow {
        tracing::warn!("Nesting too deep: limit of {} frames reached", self.limit);
        self.status.set_error(DispatchError::NestingTooDeep);
        self.unwind(Flow::Break)
    }

    /// Close open frames, innermost first.
    ///
    /// `SkipSubmessage` closes one frame; `Break` closes all of them. Closing
    /// the root always ends the pass and calls the exit callback.
    fn unwind(&mut self, flow: Flow) -> Flow {
        tracing::debug!("Unwinding {} frames on {:?}", self.stack.len(), flow);
        while let Some(frame) = self.stack.pop() {
            let handlers = &self.handlers;
            match frame.kind() {
                FrameKind::Root => {
                    handlers
                        .message_at(MessageId::ROOT)
                        .call_end_msg(frame.closure(), &mut self.status);
                }
                FrameKind::Submessage(f) => {
                    let fh = handlers.field_at(f);
                    if let Some(submsg) = fh.submsg() {
                        handlers
                            .message_at(submsg)
                            .call_end_msg(frame.closure(), &mut self.status);
                    }
                    if let Some(parent) = self.stack.last() {
                        fh.call_end_submsg(parent.closure());
                    }
                }
                FrameKind::Sequence(f) => {
                    if let Some(parent) = self.stack.last() {
                        handlers.field_at(f).call_end_seq(parent.closure());
                    }
                }
            }

            let Some(top) = self.stack.last() else {
                break;
            };
            if flow == Flow::SkipSubmessage {
                self.msg = self.frame_message(top);
                return Flow::SkipSubmessage;
            }
        }

        tracing::debug!("Decode pass aborted");
        if let Some(exit) = self.exit.as_mut() {
            exit();
        }
        Flow::Break
    }
}

impl<C> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("depth", &self.stack.len())
            .field("limit", &self.limit)
            .field("msg", &self.msg)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

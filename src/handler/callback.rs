//! Control-flow signals and callback signatures.
//!
//! Every callback receives the closure of the level it runs in. Begin
//! callbacks may hand back a replacement closure for the level they open.

use super::{HandlerValue, Status, Value};

/// Result of a callback: proceed, abort the pass, or abandon the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Proceed normally.
    #[default]
    Continue,
    /// Abort the whole decode pass.
    Break,
    /// Abort only the innermost submessage/sequence; the decoder skips its bytes.
    SkipSubmessage,
}

impl Flow {
    /// Check if dispatch proceeds.
    #[inline]
    pub fn is_continue(self) -> bool {
        self == Self::Continue
    }
}

/// Result of a begin callback (sequence or submessage start).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartFlow<C> {
    /// Enter the level with the parent's closure.
    Continue,
    /// Enter the level with a new closure.
    ContinueWith(C),
    /// Abort the whole decode pass.
    Break,
    /// Do not enter the level; the decoder skips its bytes.
    SkipSubmessage,
}

impl<C> StartFlow<C> {
    /// The control-flow part of the result.
    pub fn flow(&self) -> Flow {
        match self {
            Self::Continue | Self::ContinueWith(_) => Flow::Continue,
            Self::Break => Flow::Break,
            Self::SkipSubmessage => Flow::SkipSubmessage,
        }
    }
}

impl<C> From<Flow> for StartFlow<C> {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::Continue => Self::Continue,
            Flow::Break => Self::Break,
            Flow::SkipSubmessage => Self::SkipSubmessage,
        }
    }
}

/// Called when a message begins.
pub type StartMsgHandler<C> = Box<dyn Fn(&C) -> Flow + Send + Sync>;

/// Called when a message ends; may record an error in the session status.
pub type EndMsgHandler<C> = Box<dyn Fn(&C, &mut Status) + Send + Sync>;

/// Called for each decoded scalar of a field.
pub type ValueHandler<C> = Box<dyn Fn(&C, &HandlerValue, &Value) -> Flow + Send + Sync>;

/// Called when a sequence or submessage begins.
pub type StartFieldHandler<C> = Box<dyn Fn(&C, &HandlerValue) -> StartFlow<C> + Send + Sync>;

/// Called when a sequence or submessage ends, with the parent closure.
pub type EndFieldHandler<C> = Box<dyn Fn(&C, &HandlerValue) -> Flow + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_flow_projection() {
        assert_eq!(StartFlow::<u8>::Continue.flow(), Flow::Continue);
        assert_eq!(StartFlow::ContinueWith(7u8).flow(), Flow::Continue);
        assert_eq!(StartFlow::<u8>::Break.flow(), Flow::Break);
        assert_eq!(StartFlow::<u8>::SkipSubmessage.flow(), Flow::SkipSubmessage);
    }

    #[test]
    fn test_from_flow() {
        assert_eq!(StartFlow::<()>::from(Flow::Break), StartFlow::Break);
        assert_eq!(StartFlow::<()>::from(Flow::Continue), StartFlow::Continue);
    }

    #[test]
    fn test_default_is_continue() {
        assert!(Flow::default().is_continue());
        assert!(!Flow::SkipSubmessage.is_continue());
    }
}

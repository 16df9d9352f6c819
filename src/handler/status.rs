//! Session status holder.

use crate::error::DispatchError;

/// Error state of one decode pass.
///
/// The dispatcher owns one; end-of-message handlers write to it and
/// `end_msg` copies it out to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    error: Option<DispatchError>,
}

impl Status {
    /// Create an ok status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no error has been recorded.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The recorded error, if any.
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    /// Record an error. The first error wins.
    pub fn set_error(&mut self, error: DispatchError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Record a handler-defined error message.
    pub fn set_handler_error(&mut self, message: impl Into<String>) {
        self.set_error(DispatchError::Handler(message.into()));
    }

    /// Overwrite this status with `other`.
    pub fn copy_from(&mut self, other: &Status) {
        self.error = other.error.clone();
    }

    /// Reset to ok.
    pub fn clear(&mut self) {
        self.error = None;
    }

    /// Convert into a `Result`.
    pub fn into_result(self) -> Result<(), DispatchError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

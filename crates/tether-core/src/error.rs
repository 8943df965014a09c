//! Error types for failures raised by user-supplied binding logic.

/// Error produced by user code plugged into a binding: fallible getters,
/// setters and model→presentation conversions.
///
/// Binding logic runs on a single UI thread, so the box is not `Send`.
pub type UserError = Box<dyn std::error::Error + 'static>;

/// A plain message error, for user code that has nothing richer to report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MessageError(pub String);

impl MessageError {
    /// Create a new message error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Create a boxed [`UserError`] carrying `message`.
    pub fn boxed(message: impl Into<String>) -> UserError {
        Box::new(Self::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_error_displays_message() {
        let err = MessageError::new("setter exploded");
        assert_eq!(err.to_string(), "setter exploded");
    }

    #[test]
    fn boxed_message_keeps_text() {
        let err = MessageError::boxed("nope");
        assert_eq!(err.to_string(), "nope");
        assert!(err.downcast_ref::<MessageError>().is_some());
    }
}

//! Result and error types for internal consistency faults.

/// The result type for operations that can only fail because of a bug.
///
/// `Err` means the caller handed over a graph that violates an IR invariant
/// (for example a reference to an object that was never defined) or that a
/// traversal visited objects in the wrong order. It never describes bad input
/// bytes; those are reported by the decoder's own error type.
pub type LumenResult<T> = Result<T, InternalError>;

/// An internal compiler error indicating a bug, not a user input problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal compiler error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("value %3 used before definition");
        assert_eq!(
            format!("{err}"),
            "internal compiler error: value %3 used before definition"
        );
    }

    #[test]
    fn err_path() {
        let r: LumenResult<i32> = Err(InternalError::new("test error"));
        assert_eq!(r.unwrap_err().message, "test error");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
    }
}

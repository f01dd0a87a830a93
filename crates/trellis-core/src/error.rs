//! Error types for Trellis.
//!
//! Reactive propagation itself never fails: missing keys resolve to null,
//! redundant writes are inert and validation problems are data. Errors only
//! come out of the edges where external input is parsed or converted.

/// Result type alias for Trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;

/// Errors raised when converting external input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrellisError {
    /// A dotted key path could not be parsed.
    #[error("Invalid key path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Deserialization input was not a JSON object.
    #[error("Expected a JSON object to deserialize a model, got {found}")]
    NotAnObject { found: &'static str },

    /// An attribute's deserialize hook rejected its input.
    #[error("Failed to deserialize attribute '{key}': {message}")]
    Deserialize { key: String, message: String },
}

impl TrellisError {
    /// Create an attribute deserialization error.
    pub fn deserialize(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deserialize {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TrellisError::deserialize("age", "not a number");
        assert_eq!(
            err.to_string(),
            "Failed to deserialize attribute 'age': not a number"
        );
    }
}

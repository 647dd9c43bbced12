/// Core error types for the BotLog engine.

/// A specialized Result type for BotLog operations.
pub type BotlogResult<T> = Result<T, BotlogError>;

/// Top-level error type encompassing all BotLog subsystems.
#[derive(Debug, thiserror::Error)]
pub enum BotlogError {
    #[error("analyze error: {message}")]
    Analyze { message: String },

    #[error("generate error: {message}")]
    Generate { message: String },

    #[error("store error: {message}")]
    Store { message: String },

    #[error("session error: {message}")]
    Session { message: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(String),
}

impl BotlogError {
    /// Create an analyzer error.
    pub fn analyze(message: impl Into<String>) -> Self {
        BotlogError::Analyze {
            message: message.into(),
        }
    }

    /// Create an image-generation error.
    pub fn generate(message: impl Into<String>) -> Self {
        BotlogError::Generate {
            message: message.into(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        BotlogError::Store {
            message: message.into(),
        }
    }

    /// Create a session-persistence error.
    pub fn session(message: impl Into<String>) -> Self {
        BotlogError::Session {
            message: message.into(),
        }
    }

    /// Create a precondition failure.
    pub fn precondition(message: impl Into<String>) -> Self {
        BotlogError::Precondition(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_error_display() {
        let err = BotlogError::analyze("upstream returned 503");
        assert_eq!(err.to_string(), "analyze error: upstream returned 503");
    }

    #[test]
    fn test_precondition_display() {
        let err = BotlogError::precondition("canvas is empty");
        assert_eq!(err.to_string(), "precondition failed: canvas is empty");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BotlogError = io.into();
        assert!(err.to_string().contains("missing"));
    }
}

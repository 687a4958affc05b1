use thiserror::Error;

/// Central error type for the streampipe crate
#[derive(Error, Debug)]
pub enum StreamPipeError {
    // ============================================================================
    // Reference Resolution Errors
    // ============================================================================
    #[error("Unsupported reference: {0}")]
    TypeCondition(String),

    // ============================================================================
    // Pipeline Errors
    // ============================================================================
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Invalid stage option: {0}")]
    InvalidOption(String),

    #[error("Pipeline already flushed")]
    PipelineClosed,

    // ============================================================================
    // Generic/System Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Text decoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    GenericError(String),
}

// Conversion to String for command line reporting
impl From<StreamPipeError> for String {
    fn from(error: StreamPipeError) -> Self {
        error.to_string()
    }
}

// Business functions may fail with a plain message
impl From<String> for StreamPipeError {
    fn from(err: String) -> Self {
        StreamPipeError::GenericError(err)
    }
}

impl From<&str> for StreamPipeError {
    fn from(err: &str) -> Self {
        StreamPipeError::GenericError(err.to_string())
    }
}

// Helper type alias for Results
pub type StreamPipeResult<T> = Result<T, StreamPipeError>;

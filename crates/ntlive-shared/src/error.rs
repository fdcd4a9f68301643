use thiserror::Error;

/// Failures while decoding or encoding a data-channel frame.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame belongs to channel {0:?}")]
    ForeignChannel(String),
}

/// Result alias that carries the custom [`MixerError`] type.
pub type Result<T> = std::result::Result<T, MixerError>;

/// Common error type for the core crate.
///
/// Only control-thread and loading paths produce these. The mixing callback
/// never returns an error; see [`crate::Mixer::fill`].
#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// A source does not match the fixed engine format.
    #[error("format mismatch: expected {what} {expected}, found {found}")]
    FormatMismatch {
        what: &'static str,
        expected: u32,
        found: u32,
    },
    /// A cue sheet or bank lookup named a source that was never registered.
    #[error("unknown source `{0}`")]
    UnknownSource(String),
    /// Every slot of the pool is taken.
    #[error("no free stream slot (capacity {capacity})")]
    PoolExhausted { capacity: usize },
    /// Configuration values that cannot drive the engine.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Errors raised while decoding or encoding WAV data.
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    /// Errors raised while parsing configuration or cue sheets.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl MixerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for MixerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MixerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

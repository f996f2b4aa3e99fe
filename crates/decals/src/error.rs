//! Error types for the decal system.

/// Errors raised inside the decal system.
///
/// None of these reach the caller of a spawn request: inbound message errors
/// drop the message and texture errors degrade to a flat-colored decal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Inbound message name is not one of the spawn messages.
    #[error("unknown message `{0}`")]
    UnknownMessage(String),

    /// Wire value outside the closed set of decal kinds.
    #[error("unknown decal kind {0}")]
    UnknownDecalKind(i32),

    /// Spawn request fails validation.
    #[error("invalid spawn request: {0}")]
    InvalidRequest(&'static str),

    /// Malformed protobuf payload.
    #[error("failed to decode message: {0}")]
    Decode(#[from] prost::DecodeError),

    /// HTTP request failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Downloaded body exceeds the configured limit.
    #[error("payload exceeds the {limit} byte limit ({actual} bytes)")]
    PayloadTooLarge { limit: usize, actual: u64 },

    /// Image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Key is not an HTTP(S) URL.
    #[error("not a texture URL: {0}")]
    InvalidUrl(String),

    /// Settings document could not be parsed.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result alias for decal operations.
pub type Result<T> = std::result::Result<T, Error>;

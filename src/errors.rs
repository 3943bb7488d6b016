use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal failure modes of the pipeline.
///
/// Recoverable extraction failures (unreachable link, unsupported type,
/// missing transcript) are not errors; they travel as tagged
/// [`crate::extract::SourceKind::Error`] records so callers can decide
/// whether to skip, retry with another source, or report back.
#[derive(Debug, Error)]
pub enum Error {
    /// The material index could not be reached or rejected the request.
    #[error("material index unavailable: {0}")]
    StorageUnavailable(String),

    /// The embedding call failed; there is no fallback.
    #[error("embedding request failed: {0}")]
    EncodingFailure(String),

    /// The model completion could not be obtained.
    #[error("completion request failed: {0}")]
    Completion(String),

    /// The model answered but no grade could be parsed out of the text.
    #[error("completion contained no parsable grade: {0:?}")]
    MalformedGrade(String),

    /// A local document exists but its bytes could not be decoded.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

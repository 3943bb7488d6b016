pub mod files;
pub mod web;
pub mod youtube;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::errors::Result;

/// Placeholder content carried by every `error:*` record.
pub const MISSING_CONTENT: &str = "N/A";

/// Default number of fetch attempts before a URL is declared unreachable.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 50;

/// Why an extraction produced no usable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFailure {
    NoLink,
    Unreachable,
    UnsupportedContentType,
    UnsupportedFileType,
    NoTranscript,
}

impl ExtractionFailure {
    fn reason(self) -> &'static str {
        match self {
            Self::NoLink => "no-link",
            Self::Unreachable => "unreachable",
            Self::UnsupportedContentType => "unsupported-content-type",
            Self::UnsupportedFileType => "unsupported-file-type",
            Self::NoTranscript => "no-transcript",
        }
    }
}

/// Tag carried by every extracted record.
///
/// Serialized as its string form (`plaintext`, `video`, `error:<reason>`),
/// which is also the shape persisted in the material index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Plaintext,
    Video,
    Error(ExtractionFailure),
}

impl SourceKind {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext => f.write_str("plaintext"),
            Self::Video => f.write_str("video"),
            Self::Error(failure) => write!(f, "error:{}", failure.reason()),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "plaintext" => Ok(Self::Plaintext),
            "video" => Ok(Self::Video),
            "error:no-link" => Ok(Self::Error(ExtractionFailure::NoLink)),
            "error:unreachable" => Ok(Self::Error(ExtractionFailure::Unreachable)),
            "error:unsupported-content-type" => {
                Ok(Self::Error(ExtractionFailure::UnsupportedContentType))
            }
            "error:unsupported-file-type" => {
                Ok(Self::Error(ExtractionFailure::UnsupportedFileType))
            }
            "error:no-transcript" => Ok(Self::Error(ExtractionFailure::NoTranscript)),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

impl Serialize for SourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// One normalized extraction result.
///
/// Invariant: an error kind implies `content == MISSING_CONTENT`, never
/// partial text. Check `kind` before consuming `content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub link: String,
    pub kind: SourceKind,
    pub content: String,
}

impl SourceRecord {
    pub fn plaintext(link: &str, content: &str) -> Self {
        Self {
            link: link.to_string(),
            kind: SourceKind::Plaintext,
            content: content.trim().to_string(),
        }
    }

    pub fn video(link: &str, content: &str) -> Self {
        Self {
            link: link.to_string(),
            kind: SourceKind::Video,
            content: content.trim().to_string(),
        }
    }

    pub fn failed(link: &str, failure: ExtractionFailure) -> Self {
        Self {
            link: link.to_string(),
            kind: SourceKind::Error(failure),
            content: MISSING_CONTENT.to_string(),
        }
    }
}

/// Normalizes an identifier (file path or URL) into a [`SourceRecord`].
pub struct SourceExtractor {
    client: reqwest::Client,
    max_attempts: u32,
}

impl SourceExtractor {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_attempts: DEFAULT_FETCH_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Extracts text from a file path or URL.
    ///
    /// Expected failure modes (unreachable link, unsupported type, missing
    /// transcript) come back as `error:*` records. Only unexpected I/O or
    /// decode problems surface as `Err`.
    pub async fn extract(&self, identifier: &str) -> Result<SourceRecord> {
        if identifier.trim().is_empty() {
            tracing::warn!("no link or path provided");
            return Ok(SourceRecord::failed(identifier, ExtractionFailure::NoLink));
        }
        match Url::parse(identifier) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                web::extract_url(&self.client, self.max_attempts, identifier, &url).await
            }
            _ => files::extract_path(identifier).await,
        }
    }
}

use std::io::Write;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response};
use scraper::{Html, Selector};
use tempfile::NamedTempFile;
use url::Url;

use super::{files, youtube, ExtractionFailure, SourceRecord};
use crate::errors::Result;

// Some course portals refuse requests without a browser user agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36";

const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_secs(2);

/// Content family declared by the response, decided once and matched
/// exhaustively. Adding a new source kind is a compile-time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclaredContent {
    Pdf,
    PlainText,
    Html,
    Docx,
    Unsupported,
}

impl DeclaredContent {
    pub(crate) fn from_header(value: &str) -> Self {
        let value = value.to_ascii_lowercase();
        if value.contains("application/pdf") {
            Self::Pdf
        } else if value.contains("text/plain") {
            Self::PlainText
        } else if value.contains("text/html") {
            Self::Html
        } else if value.contains("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
            || value.contains("application/msword")
        {
            Self::Docx
        } else {
            Self::Unsupported
        }
    }
}

pub(crate) async fn extract_url(
    client: &Client,
    max_attempts: u32,
    link: &str,
    url: &Url,
) -> Result<SourceRecord> {
    // Video hosts are decided by host name; the transcript fetch goes
    // through the same bounded retry loop as every other URL.
    if youtube::is_youtube_host(url) {
        return youtube::transcript(client, max_attempts, link, url).await;
    }

    let Some(response) = fetch_with_retry(client, link, max_attempts).await else {
        return Ok(SourceRecord::failed(link, ExtractionFailure::Unreachable));
    };

    let declared = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(DeclaredContent::from_header)
        .unwrap_or(DeclaredContent::Unsupported);

    match declared {
        DeclaredContent::Pdf => {
            let transient = download_to_temp(response, ".pdf").await?;
            let text = files::pdf_text(transient.path())?;
            Ok(SourceRecord::plaintext(link, &text))
        }
        DeclaredContent::PlainText => {
            // Persist-then-read normalizes the encoding to UTF-8.
            let transient = download_to_temp(response, ".txt").await?;
            let bytes = tokio::fs::read(transient.path()).await?;
            Ok(SourceRecord::plaintext(link, &String::from_utf8_lossy(&bytes)))
        }
        DeclaredContent::Html => {
            let body = response.text().await?;
            Ok(SourceRecord::plaintext(link, &html_text(&body)))
        }
        DeclaredContent::Docx => {
            let transient = download_to_temp(response, ".docx").await?;
            let text = files::docx_text(transient.path())?;
            Ok(SourceRecord::plaintext(link, &text))
        }
        DeclaredContent::Unsupported => {
            tracing::warn!(link, "unsupported content type");
            Ok(SourceRecord::failed(
                link,
                ExtractionFailure::UnsupportedContentType,
            ))
        }
    }
}

/// Polls the URL until a success status, up to `max_attempts` fresh requests.
/// Backoff doubles from 100ms and caps at 2s.
pub(crate) async fn fetch_with_retry(
    client: &Client,
    link: &str,
    max_attempts: u32,
) -> Option<Response> {
    let mut delay = BACKOFF_BASE;
    for attempt in 1..=max_attempts {
        match client
            .get(link)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => return Some(response),
            Ok(response) => {
                tracing::debug!(link, attempt, status = %response.status(), "fetch returned non-success");
            }
            Err(err) => {
                tracing::debug!(link, attempt, %err, "fetch attempt failed");
            }
        }
        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(BACKOFF_CAP);
        }
    }
    None
}

/// Streams the response body into a transient file with a randomized name,
/// so concurrent extractions cannot clobber each other. The file is removed
/// when the handle drops, on success and on failure alike.
async fn download_to_temp(mut response: Response, suffix: &str) -> Result<NamedTempFile> {
    let mut transient = tempfile::Builder::new()
        .prefix("studium-")
        .suffix(suffix)
        .tempfile()?;
    while let Some(chunk) = response.chunk().await? {
        transient.write_all(&chunk)?;
    }
    transient.flush()?;
    Ok(transient)
}

/// Concatenates the text of heading, paragraph and list elements in document
/// order, joined by single spaces.
pub(crate) fn html_text(body: &str) -> String {
    let document = Html::parse_document(body);
    let selector = Selector::parse("p, h1, h2, h3, h4, h5, h6, li").unwrap();
    document
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

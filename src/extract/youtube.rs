use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use url::Url;

use super::{web, ExtractionFailure, SourceRecord};
use crate::errors::Result;

const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

pub(crate) fn is_youtube_host(url: &Url) -> bool {
    matches!(url.host_str(), Some(host) if host == "youtube.com" || host.ends_with(".youtube.com"))
}

/// Video id from the conventional `v` query parameter.
pub(crate) fn video_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}

/// Fetches the public caption track for a video and joins its entries
/// chronologically with newlines.
///
/// The track request runs through the same bounded retry loop as any other
/// URL: a caption service that never answers is `error:unreachable`. Only a
/// reachable service with a missing or empty track becomes
/// `error:no-transcript`.
pub(crate) async fn transcript(
    client: &Client,
    max_attempts: u32,
    link: &str,
    url: &Url,
) -> Result<SourceRecord> {
    let Some(id) = video_id(url) else {
        tracing::warn!(link, "youtube link without a video id");
        return Ok(SourceRecord::failed(link, ExtractionFailure::NoTranscript));
    };

    let track = match Url::parse_with_params(TIMEDTEXT_URL, &[("lang", "en"), ("v", id.as_str())])
    {
        Ok(track) => track,
        Err(err) => {
            tracing::warn!(link, %err, "could not build caption track url");
            return Ok(SourceRecord::failed(link, ExtractionFailure::NoTranscript));
        }
    };

    let Some(response) = web::fetch_with_retry(client, track.as_str(), max_attempts).await else {
        tracing::debug!(link, "caption service unreachable");
        return Ok(SourceRecord::failed(link, ExtractionFailure::Unreachable));
    };
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!(link, %err, "caption track read failed");
            return Ok(SourceRecord::failed(link, ExtractionFailure::Unreachable));
        }
    };

    let lines = caption_lines(&body);
    if lines.is_empty() {
        return Ok(SourceRecord::failed(link, ExtractionFailure::NoTranscript));
    }
    Ok(SourceRecord::video(link, &lines.join("\n")))
}

/// Caption entries from a timedtext XML track, in document (chronological)
/// order. Malformed XML yields whatever parsed cleanly before the error.
pub(crate) fn caption_lines(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut in_entry = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"text" => in_entry = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"text" => in_entry = false,
            Ok(Event::Text(t)) if in_entry => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        lines.push(text.to_string());
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_youtube_hosts() {
        let watch = Url::parse("https://www.youtube.com/watch?v=abc123").unwrap();
        assert!(is_youtube_host(&watch));
        let bare = Url::parse("https://youtube.com/watch?v=abc123").unwrap();
        assert!(is_youtube_host(&bare));
        let other = Url::parse("https://example.com/watch?v=abc123").unwrap();
        assert!(!is_youtube_host(&other));
    }

    #[test]
    fn video_id_comes_from_v_parameter() {
        let url = Url::parse("https://www.youtube.com/watch?t=42&v=dQw4w9WgXcQ").unwrap();
        assert_eq!(video_id(&url).as_deref(), Some("dQw4w9WgXcQ"));
        let missing = Url::parse("https://www.youtube.com/watch?t=42").unwrap();
        assert_eq!(video_id(&missing), None);
    }

    #[test]
    fn caption_entries_join_in_track_order() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
            <transcript>
              <text start="0.0" dur="2.1">welcome to lecture ten</text>
              <text start="2.1" dur="3.0">today: crash recovery</text>
            </transcript>"#;
        assert_eq!(
            caption_lines(xml),
            vec!["welcome to lecture ten", "today: crash recovery"]
        );
    }

    #[test]
    fn empty_track_has_no_captions() {
        assert!(caption_lines("").is_empty());
        assert!(caption_lines("<transcript></transcript>").is_empty());
    }
}

use rstest::rstest;

use studium::extract::{ExtractionFailure, SourceExtractor, SourceKind, MISSING_CONTENT};

fn extractor() -> SourceExtractor {
    SourceExtractor::new(reqwest::Client::new())
}

#[rstest]
#[case("tests/fixtures/lecture.txt")]
#[case("tests/fixtures/notes.docx")]
#[case("tests/fixtures/slides.pdf")]
#[tokio::test]
async fn supported_local_files_extract_to_plaintext(#[case] path: &str) {
    let record = extractor().extract(path).await.unwrap();
    assert_eq!(record.kind, SourceKind::Plaintext);
    assert!(!record.content.is_empty());
    assert_eq!(record.content, record.content.trim());
}

#[tokio::test]
async fn text_fixture_content_survives_extraction() {
    let record = extractor()
        .extract("tests/fixtures/lecture.txt")
        .await
        .unwrap();
    assert!(record.content.contains("Crash Recovery in File Systems"));
}

#[tokio::test]
async fn docx_fixture_yields_paragraph_text() {
    let record = extractor()
        .extract("tests/fixtures/notes.docx")
        .await
        .unwrap();
    assert!(record.content.contains("crash recovery and block caching"));
    assert!(record.content.contains("Rubric:"));
}

#[tokio::test]
async fn pdf_fixture_yields_page_text() {
    let record = extractor()
        .extract("tests/fixtures/slides.pdf")
        .await
        .unwrap();
    assert!(record.content.contains("Ordered writes"));
}

#[tokio::test]
async fn unsupported_suffix_becomes_error_record() {
    let transient = tempfile::Builder::new()
        .suffix(".xyz")
        .tempfile()
        .unwrap();
    std::fs::write(transient.path(), b"binary blob").unwrap();

    let path = transient.path().to_string_lossy().to_string();
    let record = extractor().extract(&path).await.unwrap();
    assert_eq!(
        record.kind,
        SourceKind::Error(ExtractionFailure::UnsupportedFileType)
    );
    assert_eq!(record.content, MISSING_CONTENT);
}

#[tokio::test]
async fn missing_text_file_is_a_fatal_io_error() {
    let result = extractor().extract("tests/fixtures/nope.txt").await;
    assert!(matches!(result, Err(studium::Error::Io(_))));
}

#[tokio::test]
async fn youtube_link_without_transcript_track_is_recoverable() {
    // No `v` parameter: the transcript path resolves without any network
    // traffic and must come back as a tagged record, not a failure.
    let record = extractor()
        .extract("https://www.youtube.com/watch")
        .await
        .unwrap();
    assert_eq!(
        record.kind,
        SourceKind::Error(ExtractionFailure::NoTranscript)
    );
    assert_eq!(record.content, MISSING_CONTENT);
}

#[tokio::test]
async fn empty_identifier_is_a_tagged_error() {
    for identifier in ["", "   "] {
        let record = extractor().extract(identifier).await.unwrap();
        assert_eq!(record.kind, SourceKind::Error(ExtractionFailure::NoLink));
        assert_eq!(record.content, MISSING_CONTENT);
    }
}

#[tokio::test]
async fn unreachable_caption_service_is_not_a_missing_transcript() {
    // All traffic through a blackholed proxy: the caption track request
    // exhausts its attempts without ever reaching the host, which is an
    // unreachable source, not a video without captions.
    let client = reqwest::Client::builder()
        .proxy(reqwest::Proxy::all("http://192.0.2.1:9").unwrap())
        .timeout(std::time::Duration::from_millis(200))
        .build()
        .unwrap();
    let extractor = SourceExtractor::new(client).with_max_attempts(2);

    let record = extractor
        .extract("https://www.youtube.com/watch?v=abc123")
        .await
        .unwrap();
    assert_eq!(
        record.kind,
        SourceKind::Error(ExtractionFailure::Unreachable)
    );
    assert_eq!(record.content, MISSING_CONTENT);
}

#[tokio::test]
async fn unreachable_url_becomes_error_record_after_bounded_retries() {
    let extractor = SourceExtractor::new(
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap(),
    )
    .with_max_attempts(2);
    // Reserved TEST-NET-1 address; connections fail fast.
    let record = extractor
        .extract("http://192.0.2.1/syllabus.pdf")
        .await
        .unwrap();
    assert_eq!(
        record.kind,
        SourceKind::Error(ExtractionFailure::Unreachable)
    );
}

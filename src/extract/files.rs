use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{ExtractionFailure, SourceRecord};
use crate::errors::{Error, Result};

/// Local formats decided once from the filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalFormat {
    Text,
    Docx,
    Pdf,
    Unsupported,
}

impl LocalFormat {
    fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".txt") {
            Self::Text
        } else if lower.ends_with(".docx") {
            Self::Docx
        } else if lower.ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Unsupported
        }
    }
}

pub(crate) async fn extract_path(path: &str) -> Result<SourceRecord> {
    match LocalFormat::from_path(path) {
        LocalFormat::Text => {
            let bytes = tokio::fs::read(path).await?;
            Ok(SourceRecord::plaintext(path, &String::from_utf8_lossy(&bytes)))
        }
        LocalFormat::Docx => {
            let text = docx_text(Path::new(path))?;
            Ok(SourceRecord::plaintext(path, &text))
        }
        LocalFormat::Pdf => {
            let text = pdf_text(Path::new(path))?;
            Ok(SourceRecord::plaintext(path, &text))
        }
        LocalFormat::Unsupported => {
            tracing::warn!(path, "no extractor for file suffix");
            Ok(SourceRecord::failed(
                path,
                ExtractionFailure::UnsupportedFileType,
            ))
        }
    }
}

pub(crate) fn pdf_text(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|err| Error::MalformedDocument(format!("{}: {err}", path.display())))
}

/// Pulls the text runs out of an OOXML word-processing document.
///
/// A `.docx` file is a zip archive; the body lives in `word/document.xml`
/// as `w:t` runs grouped into `w:p` paragraphs.
pub(crate) fn docx_text(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|err| Error::MalformedDocument(format!("{}: {err}", path.display())))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| Error::MalformedDocument(format!("{}: {err}", path.display())))?
        .read_to_string(&mut xml)?;

    ooxml_body_text(&xml)
        .map_err(|err| Error::MalformedDocument(format!("{}: {err}", path.display())))
}

fn ooxml_body_text(xml: &str) -> std::result::Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

//! Text extraction: turns a local document into plain resume text.

use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

use crate::evaluation::errors::EvaluationError;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0} (only PDF, DOCX and plain text are accepted)")]
    UnsupportedFormat(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("no text could be recovered from {0}")]
    Empty(String),

    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
}

impl From<ExtractError> for EvaluationError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::UnsupportedFormat(msg) => EvaluationError::UnsupportedFormat(msg),
            other => EvaluationError::Extraction(other.to_string()),
        }
    }
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &Path) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => Ok(DocumentFormat::Pdf),
            Some("docx") => Ok(DocumentFormat::Docx),
            Some("txt") | Some("md") => Ok(DocumentFormat::PlainText),
            Some(other) => Err(ExtractError::UnsupportedFormat(format!(
                "unsupported extension '.{other}'"
            ))),
            None => Err(ExtractError::UnsupportedFormat(format!(
                "'{}' has no file extension",
                path.display()
            ))),
        }
    }
}

/// Reads PDFs with `pdf-extract`, DOCX body text from `word/document.xml`
/// and plain text files as-is.
///
/// Parsing runs on the blocking pool; a parser panic on a malformed PDF comes
/// back as a `Read` error instead of taking the worker down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTextExtractor;

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract(&self, document: &Path) -> Result<String, ExtractError> {
        let format = DocumentFormat::from_path(document)?;
        let shown = document.display().to_string();

        if !tokio::fs::try_exists(document).await.unwrap_or(false) {
            return Err(ExtractError::NotFound(shown));
        }

        let path = document.to_path_buf();
        let raw = tokio::task::spawn_blocking(move || read_document(&path, format))
            .await
            .map_err(|e| ExtractError::Read {
                path: shown.clone(),
                message: e.to_string(),
            })??;

        let text = clean_text(&raw);
        debug!(document = %shown, ?format, chars = text.len(), "text extracted");

        if text.is_empty() {
            return Err(ExtractError::Empty(shown));
        }
        Ok(text)
    }
}

fn read_document(path: &Path, format: DocumentFormat) -> Result<String, ExtractError> {
    let read_error = |message: String| ExtractError::Read {
        path: path.display().to_string(),
        message,
    };

    match format {
        DocumentFormat::Pdf => pdf_extract::extract_text(path).map_err(|e| read_error(e.to_string())),
        DocumentFormat::Docx => read_docx(path).map_err(read_error),
        DocumentFormat::PlainText => {
            std::fs::read_to_string(path).map_err(|e| read_error(e.to_string()))
        }
    }
}

/// Collects the run text of every paragraph in a DOCX body, one line per
/// paragraph.
fn read_docx(path: &Path) -> Result<String, String> {
    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| e.to_string())?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;

    docx_body_text(&xml)
}

fn docx_body_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                text.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

/// Trims the text and turns tabs into spaces.
pub fn clean_text(raw: &str) -> String {
    raw.trim().replace('\t', " ")
}


use std::fmt::{self, Write as _};
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::{ChatError, Result};

/// A file handed to the extractor: the name picks the parser, the bytes
/// carry the content.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    #[inline]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Recoverable per-file problem. The batch always continues past these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    UnsupportedFileType { file: String },
    FileUnreadable { file: String, reason: String },
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFileType { file } => {
                write!(f, "Unsupported file type: {file}")
            }
            Self::FileUnreadable { file, reason } => {
                write!(f, "Failed to read {file}: {reason}")
            }
        }
    }
}

/// Result of extracting a batch of files: the concatenated text plus any
/// per-file warnings. `text` is empty when every file failed or was
/// unsupported.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub text: String,
    pub warnings: Vec<ExtractionWarning>,
}

/// Extract plain text from a batch of uploaded PDF and DOCX files.
///
/// Files are processed in order; a file that is unsupported or fails to
/// parse is skipped with a warning and never aborts the batch.
#[inline]
pub fn extract_text(files: &[UploadedFile]) -> Result<Extraction> {
    let mut extraction = Extraction::default();

    for file in files {
        let lower = file.name.to_lowercase();

        let extracted = if lower.ends_with(".pdf") {
            extract_pdf(&file.bytes)
        } else if lower.ends_with(".docx") {
            extract_docx(&file.bytes)
        } else {
            warn!("Unsupported file type: {}", file.name);
            extraction.warnings.push(ExtractionWarning::UnsupportedFileType {
                file: file.name.clone(),
            });
            continue;
        };

        match extracted {
            Ok(text) => {
                debug!("Extracted {} characters from {}", text.len(), file.name);
                extraction.text.push_str(&text);
            }
            Err(e) => {
                warn!("Failed to read {}: {}", file.name, e);
                extraction.warnings.push(ExtractionWarning::FileUnreadable {
                    file: file.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(extraction)
}

/// Extract text from a PDF, page by page. Pages with no text are skipped
/// and each remaining page is tagged with its number so chunks keep their
/// provenance.
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ChatError::Extraction(e.to_string()))?;

    // pdf-extract returns the whole document as one string with form feed
    // characters separating pages.
    let mut out = String::new();
    for (i, page) in text.split('\x0C').enumerate() {
        let page = page.trim();
        if page.is_empty() {
            continue;
        }
        let _ = writeln!(out, "[Page {}]", i + 1);
        out.push_str(page);
        out.push('\n');
    }

    Ok(out)
}

/// Extract text from a DOCX, paragraph by paragraph, skipping blank
/// paragraphs. A DOCX is a zip archive; the document body lives in
/// `word/document.xml` with paragraphs as `w:p` and text runs as `w:t`.
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ChatError::Extraction(format!("not a valid DOCX archive: {e}")))?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ChatError::Extraction(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut document_xml)
        .map_err(|e| ChatError::Extraction(format!("unreadable word/document.xml: {e}")))?;

    let mut reader = Reader::from_str(&document_xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut out = String::new();
    let mut paragraph = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:p" => paragraph.clear(),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_text_run {
                    let text = e
                        .unescape()
                        .map_err(|e| ChatError::Extraction(format!("invalid XML text: {e}")))?;
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    if !paragraph.trim().is_empty() {
                        out.push_str(paragraph.trim());
                        out.push('\n');
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ChatError::Extraction(format!(
                    "malformed document XML: {e}"
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

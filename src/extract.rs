//! Plain-text extraction from uploaded binary documents.
//!
//! The ingestion pipeline supplies bytes plus a MIME type; this module
//! returns UTF-8 text ready for cleanup and chunking. PDF content goes
//! through `pdf-extract`; DOCX is unpacked as a ZIP and the `w:t` text
//! runs of `word/document.xml` are collected with a streaming XML reader.
//! ZIP entry reads are bounded to keep a hostile archive from expanding
//! unchecked.

use std::io::Read;

use crate::error::{Error, Result};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// MIME type for a file name, judged by extension (case-insensitive).
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        Some(MIME_PDF)
    } else if lower.ends_with(".docx") {
        Some(MIME_DOCX)
    } else {
        None
    }
}

/// Extract plain text from document bytes.
///
/// An unreadable or unsupported document yields [`Error::Extraction`];
/// callers mark the document failed rather than aborting.
pub fn extract_text(bytes: &[u8], mime_type: &str) -> Result<String> {
    match mime_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_DOCX => extract_docx(bytes),
        other => Err(Error::Extraction(format!(
            "unsupported document type: {other}"
        ))),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Extraction(format!("PDF extraction failed: {e}")))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| Error::Extraction(format!("DOCX is not a readable archive: {e}")))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| Error::Extraction("word/document.xml not found".to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| Error::Extraction(format!("failed to read word/document.xml: {e}")))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(Error::Extraction(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    collect_text_runs(&doc_xml)
}

/// Walk the document XML and concatenate `w:t` text runs. Paragraph ends
/// (`w:p`) become newlines so the chunker sees paragraph structure.
fn collect_text_runs(xml: &[u8]) -> Result<String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::Text(te)) if in_text_run => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    if !out.ends_with('\n') && !out.is_empty() {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Extraction(format!(
                    "malformed document XML: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

//! Text extraction for the supported file formats.
//!
//! Callers supply raw bytes plus a [`FileFormat`]; this module returns the
//! plain UTF-8 text split into the units that become [`Document`]s: one part
//! per PDF page, one part per CSV data row, a single part for DOCX and TXT.
//!
//! [`Document`]: crate::models::Document

use std::io::Read;

use quick_xml::events::Event;
use thiserror::Error;

use crate::models::FileFormat;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const DOCX_BODY_ENTRY: &str = "word/document.xml";

/// Extraction failure. The loader logs it and skips the file.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Ooxml(String),
    #[error("CSV extraction failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("file is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// One extracted unit of text and its position within the file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPart {
    /// 1-based page number for PDFs.
    pub page: Option<u32>,
    /// 0-based data row for CSVs.
    pub row: Option<usize>,
    pub text: String,
}

impl ExtractedPart {
    fn whole(text: String) -> Self {
        Self {
            page: None,
            row: None,
            text,
        }
    }
}

/// Extract the text parts of a file.
pub fn extract(bytes: &[u8], format: FileFormat) -> Result<Vec<ExtractedPart>, ExtractError> {
    match format {
        FileFormat::Pdf => extract_pdf(bytes),
        FileFormat::Docx => extract_docx(bytes).map(|t| vec![ExtractedPart::whole(t)]),
        FileFormat::Csv => extract_csv(bytes),
        FileFormat::Txt => extract_txt(bytes).map(|t| vec![ExtractedPart::whole(t)]),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<Vec<ExtractedPart>, ExtractError> {
    // pdf-extract panics on some malformed fonts and streams.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| ExtractedPart {
            page: Some(i as u32 + 1),
            row: None,
            text,
        })
        .collect())
}

fn extract_txt(bytes: &[u8]) -> Result<String, ExtractError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let entry = archive
        .by_name(DOCX_BODY_ENTRY)
        .map_err(|_| ExtractError::Ooxml(format!("{} not found", DOCX_BODY_ENTRY)))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!(
            "{} exceeds size limit ({} bytes)",
            DOCX_BODY_ENTRY, MAX_XML_ENTRY_BYTES
        )));
    }

    wordprocessing_text(&doc_xml)
}

/// Collect `w:t` runs, ending each `w:p` paragraph with a newline.
fn wordprocessing_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    // Runs carry significant whitespace (`xml:space="preserve"`).
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" | b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

/// One part per data row, formatted as `header: value` lines.
fn extract_csv(bytes: &[u8]) -> Result<Vec<ExtractedPart>, ExtractError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut parts = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let lines: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(col, value)| {
                let header = headers
                    .get(col)
                    .filter(|h| !h.trim().is_empty())
                    .map(|h| h.trim().to_string())
                    .unwrap_or_else(|| format!("column {}", col + 1));
                format!("{}: {}", header, value.trim())
            })
            .collect();
        parts.push(ExtractedPart {
            page: None,
            row: Some(row),
            text: lines.join("\n"),
        });
    }

    Ok(parts)
}

//! Resume text extraction for uploaded PDF and Word documents.
//!
//! Extraction is plain text only: no OCR, no layout. Parse failures from the
//! underlying readers are surfaced unchanged.

use std::path::Path;

use docx_rs::{DocumentChild, ParagraphChild, RunChild};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to read resume file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("Failed to extract text from Word document: {0}")]
    Word(String),
}

/// The document formats a resume may be uploaded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word,
}

impl DocumentKind {
    /// Dispatches on the (case-insensitive) file extension.
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();

        match ext.as_str() {
            ".pdf" => Ok(DocumentKind::Pdf),
            ".docx" | ".doc" => Ok(DocumentKind::Word),
            _ => Err(ExtractError::UnsupportedFileType(ext)),
        }
    }
}

/// Reads the file at `path` and returns its plain text.
///
/// Blocking: async callers should run this on the blocking pool.
pub fn extract_resume_text(path: &Path) -> Result<String, ExtractError> {
    let kind = DocumentKind::from_path(path)?;
    let bytes = std::fs::read(path)?;

    let text = match kind {
        DocumentKind::Pdf => extract_pdf_text(&bytes)?,
        DocumentKind::Word => extract_word_text(&bytes)?,
    };

    debug!("Extracted {} chars from {}", text.len(), path.display());
    Ok(text)
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(concat_pages(pages))
}

/// Pages without extractable text contribute nothing.
fn concat_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages.into_iter().collect()
}

fn extract_word_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractError::Word(e.to_string()))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    use docx_rs::{Docx, Paragraph, Run};

    /// Builds an in-memory .docx with one paragraph per line.
    pub fn docx_bytes(lines: &[&str]) -> Vec<u8> {
        let mut docx = Docx::new();
        for line in lines {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)));
        }
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }
}

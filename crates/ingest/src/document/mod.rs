pub mod chunker;
mod docx;
mod pdf;
mod txt;
mod web;

use thiserror::Error;

pub use web::fetch_url;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: .{0}")]
    UnsupportedFormat(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("Fetch failed: {0}")]
    Fetch(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A page of extracted text.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-based page number (for PDFs). For other sources, always 1.
    pub page_number: usize,
    /// The extracted text content.
    pub text: String,
}

/// Result of extracting text from a document or web page.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Source identifier: file basename for uploads, the literal URL for pages.
    pub source: String,
    /// Source type: "pdf", "txt", "docx", "web"
    pub file_type: String,
    /// Extracted pages of plain text.
    pub pages: Vec<PageContent>,
}

impl ExtractedDocument {
    /// Get all text concatenated.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Total character count across all pages.
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Extensions accepted for knowledge base uploads.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "docx"];

/// Extract text from file bytes based on the filename's extension.
pub fn extract_file(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    let pages = match ext.as_str() {
        "pdf" => pdf::extract_pdf(bytes)?,
        "txt" => txt::extract_txt(bytes)?,
        "docx" => docx::extract_docx(bytes)?,
        other => return Err(ExtractionError::UnsupportedFormat(other.to_string())),
    };

    Ok(ExtractedDocument {
        source: filename.to_string(),
        file_type: ext,
        pages,
    })
}

use crate::error::ProcessError;
use crate::processor::text::normalize_whitespace;
use crate::processor::{DocumentProcessor, PageText};

pub const PDF_MIMETYPE: &str = "application/pdf";

pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor for PdfProcessor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ProcessError> {
        extract_pdf_pages(bytes)
    }

    fn supports(&self, mimetype: &str) -> bool {
        mimetype == PDF_MIMETYPE
    }
}

/// Extracts the text layer of every page, in page order.
///
/// Pages are numbered from 1 by position. A page whose text cannot be
/// decoded fails the whole document. lopdf can panic on some malformed
/// streams, so decoding runs under `catch_unwind` and a panic becomes an error.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<PageText>, ProcessError> {
    let _span = tracing::info_span!("processor.pdf", size = bytes.len()).entered();

    if !bytes.starts_with(b"%PDF-") {
        return Err(ProcessError::PdfProcessing(
            "missing %PDF- header".to_string(),
        ));
    }

    let pages = std::panic::catch_unwind(|| decode_pages(bytes)).map_err(|_| {
        ProcessError::PdfProcessing("PDF decoder panicked on malformed input".to_string())
    })??;

    log::debug!("Extracted {} pages from PDF", pages.len());

    Ok(pages)
}

fn decode_pages(bytes: &[u8]) -> Result<Vec<PageText>, ProcessError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for (index, number) in doc.get_pages().into_keys().enumerate() {
        let raw = doc.extract_text(&[number]).map_err(|e| {
            ProcessError::PdfProcessing(format!("Failed to extract text of page {}: {}", number, e))
        })?;

        pages.push(PageText {
            page_number: index as u32 + 1,
            text: normalize_whitespace(&raw),
        });
    }
    Ok(pages)
}

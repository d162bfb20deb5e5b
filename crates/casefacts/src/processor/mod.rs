pub mod pdf;
pub mod text;

use crate::error::ProcessError;

/// Plain text of one page, `page_number` starting at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

pub trait DocumentProcessor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ProcessError>;
    fn supports(&self, mimetype: &str) -> bool;
}

/// Routes a document to the processor for its mimetype.
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn DocumentProcessor>>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: vec![Box::new(pdf::PdfProcessor::new())],
        }
    }

    pub fn supports(&self, mimetype: &str) -> bool {
        self.processors.iter().any(|p| p.supports(mimetype))
    }

    /// Fails with `UnsupportedFormat` before touching `bytes` when no
    /// processor accepts the mimetype.
    pub fn extract_pages(&self, mimetype: &str, bytes: &[u8]) -> Result<Vec<PageText>, ProcessError> {
        self.processors
            .iter()
            .find(|p| p.supports(mimetype))
            .ok_or_else(|| ProcessError::UnsupportedFormat(mimetype.to_string()))?
            .extract_pages(bytes)
    }
}

//! PDF text extraction using lopdf.

use lopdf::Document;

use doctalk_core::error::{DocTalkError, Result};
use doctalk_core::traits::TextExtractor;

/// Extracts text from PDF documents page by page.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_from_doc(&self, doc: &Document) -> Result<String> {
        let pages = doc.get_pages();
        let mut page_numbers: Vec<u32> = pages.keys().copied().collect();
        page_numbers.sort();

        let mut page_texts: Vec<String> = Vec::new();
        for page_num in &page_numbers {
            // Pages that fail to decode (e.g. image-only) are skipped, not fatal.
            if let Ok(text) = doc.extract_text(&[*page_num]) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    page_texts.push(trimmed.to_string());
                }
            }
        }

        if page_texts.is_empty() {
            return Err(DocTalkError::Extraction(
                "no text content found in PDF; document may be scanned".into(),
            ));
        }

        tracing::debug!(
            pages = page_numbers.len(),
            pages_with_text = page_texts.len(),
            "extracted PDF text"
        );
        Ok(page_texts.join("\n\n"))
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| DocTalkError::Extraction(format!("failed to load PDF: {e}")))?;
        self.extract_from_doc(&doc)
    }
}

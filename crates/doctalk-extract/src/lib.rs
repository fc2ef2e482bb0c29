//! # DocTalk Extract
//!
//! PDF → plain text, behind the [`TextExtractor`] seam. The rest of the
//! pipeline never sees PDF bytes; it only receives the extracted text.

pub mod pdf;

pub use pdf::PdfExtractor;

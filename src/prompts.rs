//! The OCR instruction sent with every document, and the page separator it
//! asks the model to emit.
//!
//! Kept here so the handler, the page counter and the document exporter all
//! agree on the exact separator text, and so tests can inspect the prompt
//! without calling a model.

/// Separator the model is told to place between pages.
///
/// The page count and the DOCX page breaks are both derived from it.
pub const PAGE_BREAK: &str = "--- Page Break ---";

/// Instruction text sent alongside the PDF attachment.
pub const OCR_PROMPT: &str = "You are an OCR system. Extract ALL text from this PDF document. \
Preserve the original formatting, paragraphs, headings, lists, and structure as closely as possible. \
Return ONLY the extracted text, no commentary or explanation. \
If there are tables, format them clearly with alignment. \
If there are multiple pages, separate them with \"--- Page Break ---\".";

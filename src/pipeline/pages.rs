//! Page-count heuristic.
//!
//! The model is asked to separate pages with [`PAGE_BREAK`]; the page count is
//! however many separators it actually emitted, plus one. It reflects the
//! model's output, not the physical page count of the PDF.

use crate::prompts::PAGE_BREAK;

/// Count pages in extracted text: separator occurrences + 1.
pub fn count_pages(text: &str) -> u32 {
    let breaks = text.matches(PAGE_BREAK).count();
    u32::try_from(breaks).unwrap_or(u32::MAX - 1) + 1
}

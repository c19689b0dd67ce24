//! Pipeline stages for a single conversion.
//!
//! Each submodule implements exactly one step; [`crate::handler`] runs them
//! in order.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ pages
//! (fetch)   (base64)   (OCR)   (count)
//! ```
//!
//! 1. [`input`]: download the uploaded PDF from its public URL
//! 2. [`encode`]: base64-wrap the bytes as an `application/pdf` data URL
//! 3. [`llm`]: one vision-model completion over the whole document
//! 4. [`pages`]: derive the page count from the separators the model emitted

pub mod encode;
pub mod input;
pub mod llm;
pub mod pages;

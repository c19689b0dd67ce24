//! Text rendering of conversion state: file sizes, status labels, the
//! three-step progress indicator, the text preview and history lines.

use crate::record::{ConversionRecord, ConversionStatus};

/// Characters of extracted text shown before the preview is cut off.
pub const PREVIEW_CHARS: usize = 2000;

/// Marker appended to a truncated preview.
pub const TRUNCATION_MARKER: &str = "... (preview truncated)";

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Human-readable byte count with 1024-based units and at most one decimal.
///
/// `0` → `"0 B"`, `1536` → `"1.5 KB"`, `1048576` → `"1 MB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    while unit + 1 < SIZE_UNITS.len() && bytes >= 1024u64.pow(unit as u32 + 1) {
        unit += 1;
    }
    let value = bytes as f64 / 1024f64.powi(unit as i32);
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0} {}", rounded, SIZE_UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, SIZE_UNITS[unit])
    }
}

pub fn status_label(status: ConversionStatus) -> &'static str {
    match status {
        ConversionStatus::Pending => "Preparing...",
        ConversionStatus::Processing => "Extracting text with AI OCR...",
        ConversionStatus::Completed => "Conversion complete!",
        ConversionStatus::Failed => "Conversion failed",
    }
}

/// One entry of the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStep {
    pub label: &'static str,
    pub done: bool,
    pub active: bool,
}

pub fn progress_steps(status: ConversionStatus) -> [ProgressStep; 3] {
    [
        ProgressStep {
            label: "Upload PDF",
            done: true,
            active: false,
        },
        ProgressStep {
            label: "OCR Processing",
            done: status.is_terminal(),
            active: status == ConversionStatus::Processing,
        },
        ProgressStep {
            label: "Generate Document",
            done: status == ConversionStatus::Completed,
            active: false,
        },
    ]
}

/// Leading slice of the extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub text: String,
    pub truncated: bool,
}

impl std::fmt::Display for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)?;
        if self.truncated {
            f.write_str(TRUNCATION_MARKER)?;
        }
        Ok(())
    }
}

pub fn text_preview(text: &str) -> Preview {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => Preview {
            text: text[..cut].to_string(),
            truncated: true,
        },
        None => Preview {
            text: text.to_string(),
            truncated: false,
        },
    }
}

/// One row of the recent-conversions list.
pub fn history_line(record: &ConversionRecord) -> String {
    let mut parts = vec![record.original_filename.clone()];
    if let Some(size) = record.file_size.filter(|&s| s > 0) {
        parts.push(format_file_size(size));
    }
    if let Some(pages) = record.page_count.filter(|&p| p > 0) {
        parts.push(format!("{pages} pages"));
    }
    parts.push(record.created_at.format("%Y-%m-%d").to_string());
    parts.push(record.status.to_string());
    parts.join("  ")
}

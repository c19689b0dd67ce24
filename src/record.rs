//! Conversion records: one per submitted PDF.
//!
//! A record is created `pending` right after the upload succeeds and is then
//! driven through its lifecycle by [`crate::handler::ConversionHandler`]:
//!
//! ```text
//! pending ──▶ processing ──▶ completed
//!                  └───────▶ failed
//! ```
//!
//! Writes go through [`RecordUpdate`], whose variants carry exactly the fields
//! each status owns, so a record can never hold extracted text unless it is
//! `completed` or an error message unless it is `failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ConversionStatus {
    pub const ALL: [ConversionStatus; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether a record in this state may be written with `next`.
    ///
    /// `pending` is only ever assigned at creation. Terminal states may be
    /// rewritten by another terminal state (last write wins) but never fall
    /// back to `processing`.
    pub fn can_transition_to(&self, next: ConversionStatus) -> bool {
        next != Self::Pending && next.rank() >= self.rank()
    }

    /// Every status a record may currently hold for a write of `next` to succeed.
    pub fn sources_for(next: ConversionStatus) -> Vec<ConversionStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-submitted PDF and its processing outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub id: String,
    pub original_filename: String,
    pub original_file_path: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    pub status: ConversionStatus,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversionRecord {
    /// Build a fresh `pending` record. Stores that assign ids themselves
    /// (the REST backend) ignore `id` and `created_at` on insert.
    pub fn new(id: impl Into<String>, new: NewConversion) -> Self {
        Self {
            id: id.into(),
            original_filename: new.original_filename,
            original_file_path: new.original_file_path,
            file_size: new.file_size,
            status: ConversionStatus::Pending,
            extracted_text: None,
            page_count: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Apply `update` in place, enforcing the lifecycle.
    pub fn apply(&mut self, update: &RecordUpdate) -> Result<(), ConversionStatus> {
        let next = update.status();
        if !self.status.can_transition_to(next) {
            return Err(self.status);
        }

        self.status = next;
        match update {
            RecordUpdate::Processing => {}
            RecordUpdate::Completed {
                extracted_text,
                page_count,
            } => {
                self.extracted_text = Some(extracted_text.clone());
                self.page_count = Some(*page_count);
                self.error_message = None;
            }
            RecordUpdate::Failed { error_message } => {
                self.extracted_text = None;
                self.page_count = None;
                self.error_message = Some(error_message.clone());
            }
        }
        Ok(())
    }
}

/// Fields supplied by the client when a record is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversion {
    pub original_filename: String,
    pub original_file_path: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// A partial update written by the conversion handler.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordUpdate {
    Processing,
    Completed { extracted_text: String, page_count: u32 },
    Failed { error_message: String },
}

impl RecordUpdate {
    pub fn status(&self) -> ConversionStatus {
        match self {
            Self::Processing => ConversionStatus::Processing,
            Self::Completed { .. } => ConversionStatus::Completed,
            Self::Failed { .. } => ConversionStatus::Failed,
        }
    }

    /// Column set for a partial (PATCH-style) write.
    pub fn to_patch(&self) -> serde_json::Value {
        match self {
            Self::Processing => serde_json::json!({ "status": "processing" }),
            Self::Completed {
                extracted_text,
                page_count,
            } => serde_json::json!({
                "status": "completed",
                "extracted_text": extracted_text,
                "page_count": page_count,
                "error_message": null,
            }),
            Self::Failed { error_message } => serde_json::json!({
                "status": "failed",
                "error_message": error_message,
                "extracted_text": null,
                "page_count": null,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> ConversionRecord {
        ConversionRecord::new(
            "c-1",
            NewConversion {
                original_filename: "report.pdf".into(),
                original_file_path: "uploads/x.pdf".into(),
                file_size: Some(2048),
            },
        )
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in ConversionStatus::ALL {
            assert_eq!(ConversionStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ConversionStatus::parse("done"), None);
    }

    #[test]
    fn status_serialises_lowercase() {
        let json = serde_json::to_string(&ConversionStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        use ConversionStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Failed));

        for terminal in [Completed, Failed] {
            assert!(!terminal.can_transition_to(Pending));
            assert!(!terminal.can_transition_to(Processing));
        }
        for any in ConversionStatus::ALL {
            assert!(!any.can_transition_to(Pending));
        }
    }

    #[test]
    fn sources_for_processing() {
        assert_eq!(
            ConversionStatus::sources_for(ConversionStatus::Processing),
            vec![ConversionStatus::Pending, ConversionStatus::Processing]
        );
        assert!(ConversionStatus::sources_for(ConversionStatus::Pending).is_empty());
    }

    #[test]
    fn completed_sets_text_and_clears_error() {
        let mut r = pending();
        r.apply(&RecordUpdate::Processing).unwrap();
        r.apply(&RecordUpdate::Completed {
            extracted_text: "hello".into(),
            page_count: 1,
        })
        .unwrap();
        assert_eq!(r.status, ConversionStatus::Completed);
        assert_eq!(r.extracted_text.as_deref(), Some("hello"));
        assert_eq!(r.page_count, Some(1));
        assert!(r.error_message.is_none());
    }

    #[test]
    fn failed_after_completed_clears_text() {
        let mut r = pending();
        r.apply(&RecordUpdate::Completed {
            extracted_text: "hello".into(),
            page_count: 1,
        })
        .unwrap();
        r.apply(&RecordUpdate::Failed {
            error_message: "boom".into(),
        })
        .unwrap();
        assert_eq!(r.status, ConversionStatus::Failed);
        assert!(r.extracted_text.is_none());
        assert!(r.page_count.is_none());
    }

    #[test]
    fn terminal_record_rejects_processing() {
        let mut r = pending();
        r.apply(&RecordUpdate::Failed {
            error_message: "boom".into(),
        })
        .unwrap();
        assert_eq!(
            r.apply(&RecordUpdate::Processing),
            Err(ConversionStatus::Failed)
        );
        assert_eq!(r.status, ConversionStatus::Failed);
    }

    #[test]
    fn patch_for_failed_nulls_text_columns() {
        let patch = RecordUpdate::Failed {
            error_message: "x".into(),
        }
        .to_patch();
        assert_eq!(patch["status"], "failed");
        assert!(patch["extracted_text"].is_null());
        assert!(patch["page_count"].is_null());
    }
}

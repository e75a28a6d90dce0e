//! Successful results that may carry non-fatal warnings.

use serde::Serialize;

/// A step that failed or came back partial without failing the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// The log row was created but its tag associations were not.
    TagAttachmentFailed { log_id: i64, reason: String },
    /// Custom tag names could not be fetched; only preset tags are shown.
    CustomTagLookupFailed { reason: String },
    /// Some custom tags no longer exist and were left out.
    UnresolvedCustomTags { ids: Vec<i64> },
}

impl Degradation {
    pub fn kind(&self) -> &'static str {
        match self {
            Degradation::TagAttachmentFailed { .. } => "tag_attachment_failed",
            Degradation::CustomTagLookupFailed { .. } => "custom_tag_lookup_failed",
            Degradation::UnresolvedCustomTags { .. } => "unresolved_custom_tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub data: T,
    pub warnings: Vec<Degradation>,
}

impl<T> Outcome<T> {
    pub fn clean(data: T) -> Self {
        Outcome {
            data,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(data: T, warnings: Vec<Degradation>) -> Self {
        Outcome { data, warnings }
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

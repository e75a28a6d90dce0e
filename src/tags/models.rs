use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Globally defined, categorized tag. Seeded by an administrator and never
/// edited through the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetTag {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Tag authored by a single user and visible only to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTag {
    pub id: i64,
    pub name: String,
    pub owner_user_id: String,
}

/// Uniform view of a tag attached to a log, whatever catalog it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTag {
    pub id: i64,
    pub name: String,
}

impl From<CustomTag> for ResolvedTag {
    fn from(tag: CustomTag) -> Self {
        ResolvedTag {
            id: tag.id,
            name: tag.name,
        }
    }
}

/// Target of one association row. Exactly one catalog is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagRef {
    Preset(i64),
    Custom(i64),
}

impl TagRef {
    /// Preset references first, then custom ones, each in caller order.
    pub fn from_lists(preset_ids: &[i64], custom_ids: &[i64]) -> Vec<TagRef> {
        preset_ids
            .iter()
            .map(|id| TagRef::Preset(*id))
            .chain(custom_ids.iter().map(|id| TagRef::Custom(*id)))
            .collect()
    }

    /// Splits into the (preset column, custom column) pair of an association row.
    pub fn columns(&self) -> (Option<i64>, Option<i64>) {
        match self {
            TagRef::Preset(id) => (Some(*id), None),
            TagRef::Custom(id) => (None, Some(*id)),
        }
    }
}

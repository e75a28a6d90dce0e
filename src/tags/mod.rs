mod catalog;
mod models;

pub use catalog::TagCatalog;
pub use models::{CustomTag, PresetTag, ResolvedTag, TagRef};

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TagStore: Send + Sync {
    /// All preset tags, ordered by category then name.
    async fn list_preset_tags(&self) -> Result<Vec<PresetTag>>;

    /// The owner's custom tags, ordered by name.
    async fn list_custom_tags(&self, owner_id: &str) -> Result<Vec<CustomTag>>;

    /// Inserts a new custom tag. Names are not unique.
    async fn insert_custom_tag(&self, owner_id: &str, name: &str) -> Result<CustomTag>;

    /// Resolves the given custom tag ids visible to `owner_id` in one round
    /// trip. Ids that do not resolve are simply absent from the result.
    async fn lookup_custom_tags(&self, owner_id: &str, ids: &[i64]) -> Result<Vec<ResolvedTag>>;
}

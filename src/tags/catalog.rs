use super::{CustomTag, PresetTag, TagStore};
use crate::error::ServiceError;
use crate::identity::{require_identity, IdentityProvider, OwnerClaim};
use std::sync::Arc;
use tracing::info;

/// Read and create access to both tag catalogs.
pub struct TagCatalog {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn TagStore>,
}

impl TagCatalog {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn TagStore>) -> Self {
        Self { identity, store }
    }

    pub async fn list_preset_tags(&self) -> Result<Vec<PresetTag>, ServiceError> {
        self.store
            .list_preset_tags()
            .await
            .map_err(|err| ServiceError::store_rejected(&err, "Failed to fetch preset tags"))
    }

    pub async fn list_custom_tags(
        &self,
        claim: &OwnerClaim,
    ) -> Result<Vec<CustomTag>, ServiceError> {
        let owner = require_identity(self.identity.as_ref(), claim, "view your tags").await?;
        self.store
            .list_custom_tags(&owner.id)
            .await
            .map_err(|err| ServiceError::store_rejected(&err, "Failed to fetch custom tags"))
    }

    /// Creates a tag owned by the caller. The name is trimmed; duplicates of
    /// an existing name produce a second, distinct tag.
    pub async fn create_custom_tag(
        &self,
        claim: &OwnerClaim,
        name: &str,
    ) -> Result<CustomTag, ServiceError> {
        let owner = require_identity(self.identity.as_ref(), claim, "create tags").await?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Tag name must not be empty".to_string(),
            ));
        }
        let tag = self
            .store
            .insert_custom_tag(&owner.id, name)
            .await
            .map_err(|err| ServiceError::store_rejected(&err, "Failed to create tag"))?;
        info!("User {} created custom tag {} ({})", owner.id, tag.id, tag.name);
        Ok(tag)
    }
}

use super::auth::OwnerClaim;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Exchanges an owner claim for the identity behind it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns Ok(None) when the claim is anonymous, unknown or revoked.
    async fn current_user(&self, claim: &OwnerClaim) -> Result<Option<Identity>>;
}

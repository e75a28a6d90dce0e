use super::{Identity, IdentityProvider, OwnerClaim};
use crate::error::ServiceError;
use tracing::{debug, warn};

/// Resolves the caller behind `claim`, failing with `Unauthenticated` when
/// there is none. `action` completes "You must be signed in to ...".
pub async fn require_identity(
    provider: &dyn IdentityProvider,
    claim: &OwnerClaim,
    action: &'static str,
) -> Result<Identity, ServiceError> {
    if claim.token().is_none() {
        debug!("Anonymous caller tried to {}", action);
        return Err(ServiceError::Unauthenticated(action));
    }
    match provider.current_user(claim).await {
        Ok(Some(identity)) => Ok(identity),
        Ok(None) => {
            debug!("Unknown or revoked token tried to {}", action);
            Err(ServiceError::Unauthenticated(action))
        }
        Err(err) => {
            warn!("Identity lookup failed while trying to {}: {:#}", action, err);
            Err(ServiceError::Unauthenticated(action))
        }
    }
}

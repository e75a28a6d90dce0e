mod auth;
mod provider;
mod resolve;
mod user_store;

pub use auth::{AuthToken, AuthTokenValue, OwnerClaim};
pub use provider::{Identity, IdentityProvider};
pub use resolve::require_identity;
pub use user_store::UserStore;

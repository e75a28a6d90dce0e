use super::auth::{AuthToken, AuthTokenValue};
use super::provider::Identity;
use anyhow::Result;

/// Administrative user and token management.
pub trait UserStore: Send + Sync {
    /// Creates a new user with a freshly generated id.
    /// Fails if the email is already registered.
    fn create_user(&self, email: &str) -> Result<Identity>;

    /// Returns Ok(None) if no user has this email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<Identity>>;

    fn list_users(&self) -> Result<Vec<Identity>>;

    /// Issues a new random token for the given user.
    fn issue_auth_token(&self, user_id: &str) -> Result<AuthToken>;

    /// Returns the revoked token, or Ok(None) if it did not exist.
    fn revoke_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;
}

//! Bearer tokens and the per-request owner claim.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};

const TOKEN_LENGTH: usize = 64;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let value: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        AuthTokenValue(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AuthToken {
    pub user_id: String,
    pub value: AuthTokenValue,
    pub created: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// What a caller presents to prove who they are. Holding a claim proves
/// nothing by itself: it is exchanged for an identity on every privileged
/// operation, so a token revoked between two calls fails the second one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnerClaim {
    Anonymous,
    Token(AuthTokenValue),
}

impl OwnerClaim {
    pub fn token(&self) -> Option<&AuthTokenValue> {
        match self {
            OwnerClaim::Anonymous => None,
            OwnerClaim::Token(value) => Some(value),
        }
    }
}

impl From<&str> for OwnerClaim {
    fn from(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            OwnerClaim::Anonymous
        } else {
            OwnerClaim::Token(AuthTokenValue(raw.to_string()))
        }
    }
}

use async_trait::async_trait;

use crate::domain::user::User;
use crate::error::Result;

/// Resolves the caller of an operation. Token issuance lives elsewhere.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self, token: &str) -> Result<User>;
}

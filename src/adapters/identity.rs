use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::user::User;
use crate::error::{BookingError, Result};
use crate::ports::identity::IdentityProvider;
use crate::ports::repository::UserRepository;

/// Treats the caller token as a user id and looks it up.
#[derive(Clone)]
pub struct RepositoryIdentity {
    users: Arc<dyn UserRepository>,
}

impl RepositoryIdentity {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl IdentityProvider for RepositoryIdentity {
    async fn current_user(&self, token: &str) -> Result<User> {
        let id = Uuid::parse_str(token.trim())
            .map_err(|_| BookingError::Unauthenticated(format!("malformed actor id '{token}'")))?;
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| BookingError::Unauthenticated(format!("unknown actor {id}")))
    }
}

impl std::fmt::Debug for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryIdentity").finish()
    }
}

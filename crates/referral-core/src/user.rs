use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string; never the plain password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub points: i64,
}

/// A user about to be created. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Creates a user. Returns `Err(Conflict)` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Atomically adds `delta` to the user's points.
    /// Returns `false` if the user does not exist.
    async fn add_points(&self, id: &str, delta: i64) -> Result<bool>;
}

mod builder;
mod manager;
mod repository;
pub mod validation;

pub use builder::*;
pub use manager::*;
pub use repository::*;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field used as the login identifier.
pub const USERNAME_FIELD: &str = "email";
/// Fields prompted for on top of [`USERNAME_FIELD`] and the password.
pub const REQUIRED_FIELDS: &[&str] = &["username"];

/// User as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Value of the identity field.
    pub fn get_username(&self) -> &str {
        &self.email
    }

    /// Whether the stored password can ever match.
    pub fn has_usable_password(&self) -> bool {
        crate::crypto::is_usable(&self.password)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

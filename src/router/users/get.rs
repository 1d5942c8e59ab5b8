//! Read user profiles.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ServerError;
use crate::user::{User, UserManager};

/// Public part of a profile.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    id: i64,
    username: String,
    date_joined: DateTime<Utc>,
}

impl From<User> for Response {
    fn from(user: User) -> Self {
        Response {
            id: user.id,
            username: user.username,
            date_joined: user.date_joined,
        }
    }
}

/// Anyone may look at the public part of a profile.
pub async fn handler(
    State(users): State<UserManager>,
    Path(user_id): Path<i64>,
) -> Result<Json<Response>, ServerError> {
    let user = users.find_by_id(user_id).await?;

    Ok(Json(user.into()))
}

/// Full profile of the authenticated user.
pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

//! Delete the authenticated user.

use axum::Extension;
use axum::extract::State;
use axum::http::StatusCode;

use crate::ServerError;
use crate::user::{User, UserManager};

pub async fn handler(
    State(users): State<UserManager>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, ServerError> {
    users.delete(&user).await?;

    Ok(StatusCode::NO_CONTENT)
}

//! Log in with email and password.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Result, ServerError};
use crate::router::Valid;
use crate::user::{User, UserManager};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// Handler to log a user in.
pub async fn handler(
    State(users): State<UserManager>,
    Valid(body): Valid<Body>,
) -> Result<Json<User>> {
    let Some(user) = users.authenticate(&body.email, &body.password).await?
    else {
        tracing::info!("login refused");
        return Err(ServerError::InvalidCredentials);
    };

    Ok(Json(users.record_login(&user).await?))
}

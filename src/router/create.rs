use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::router::Valid;
use crate::user::{User, UserBuilder, UserManager};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(
        email(message = "Email must be formatted."),
        length(max = 255, message = "Email must be at most 255 characters.")
    )]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 50,
        message = "Username must be 1 to 50 characters long."
    ))]
    pub username: String,
    pub password: String,
    #[validate(length(max = 150, message = "First name must be at most 150 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 150, message = "Last name must be at most 150 characters."))]
    pub last_name: Option<String>,
}

/// Handler to create user.
pub async fn handler(
    State(users): State<UserManager>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<User>)> {
    let user = UserBuilder::new()
        .email(body.email)
        .username(body.username)
        .password(Some(body.password))
        .first_name(body.first_name)
        .last_name(body.last_name)
        .build();
    user.validate_password()?;

    let user = users.create_user(user).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

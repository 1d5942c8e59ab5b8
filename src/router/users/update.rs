//! Update the authenticated user.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::router::Valid;
use crate::user::validation::{UserAttributes, validate_password};
use crate::user::{User, UserManager};
use crate::ServerError;

#[derive(Debug, Validate, Serialize, Deserialize)]
pub struct Body {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Username must be 1 to 50 characters long."
    ))]
    username: Option<String>,
    #[validate(length(max = 150, message = "First name must be at most 150 characters."))]
    first_name: Option<String>,
    #[validate(length(max = 150, message = "Last name must be at most 150 characters."))]
    last_name: Option<String>,
    #[validate(
        email(message = "Email must be formatted."),
        length(max = 255, message = "Email must be at most 255 characters.")
    )]
    email: Option<String>,
    password: Option<String>,
}

pub async fn handler(
    State(users): State<UserManager>,
    Extension(mut user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<Json<User>, ServerError> {
    if let Some(username) = body.username {
        user.username = username;
    }
    if let Some(first_name) = body.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = body.last_name {
        user.last_name = last_name;
    }
    if let Some(email) = body.email {
        user.email = email;
    }

    // Checked against the attributes as they will be saved.
    if let Some(password) = body.password {
        validate_password(
            &password,
            &UserAttributes {
                username: &user.username,
                first_name: &user.first_name,
                last_name: &user.last_name,
                email: &user.email,
            },
        )?;
        users.set_password(&mut user, &password)?;
    }

    Ok(Json(users.update(user).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use crate::router::create::tests::{PASSWORD, register};
    use crate::user::User;
    use crate::*;

    #[sqlx::test]
    async fn test_update_profile(pool: Pool<Postgres>) {
        let state = test_state(pool);
        register(&state, "ada@example.com", "ada").await;

        let response = make_request(
            app(state.clone()),
            Method::PATCH,
            "/users/@me",
            json!({ "username": "Ada L.", "first_name": "Ada", "email": "ada@LOVELACE.org" })
                .to_string(),
            Some(("ada@example.com", PASSWORD)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let user: User = serde_json::from_slice(&body).unwrap();
        assert_eq!(user.username, "Ada L.");
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.email, "ada@lovelace.org");

        // Credentials now use the new email.
        assert!(
            state
                .users
                .authenticate("ada@lovelace.org", PASSWORD)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[sqlx::test]
    async fn test_update_blank_username(pool: Pool<Postgres>) {
        let state = test_state(pool);
        let ada = register(&state, "ada@example.com", "ada").await;

        let response = make_request(
            app(state.clone()),
            Method::PATCH,
            "/users/@me",
            json!({ "username": "   " }).to_string(),
            Some(("ada@example.com", PASSWORD)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["errors"][0]["field"], "username");

        let stored = state.users.find_by_id(ada.id).await.unwrap();
        assert_eq!(stored.username, "ada");

        // Surrounding spaces are dropped.
        let response = make_request(
            app(state.clone()),
            Method::PATCH,
            "/users/@me",
            json!({ "username": "  Ada L.  " }).to_string(),
            Some(("ada@example.com", PASSWORD)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let stored = state.users.find_by_id(ada.id).await.unwrap();
        assert_eq!(stored.username, "Ada L.");
    }

    #[sqlx::test]
    async fn test_update_password(pool: Pool<Postgres>) {
        let state = test_state(pool);
        register(&state, "ada@example.com", "ada").await;

        let response = make_request(
            app(state.clone()),
            Method::PATCH,
            "/users/@me",
            json!({ "password": "1234" }).to_string(),
            Some(("ada@example.com", PASSWORD)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = make_request(
            app(state.clone()),
            Method::PATCH,
            "/users/@me",
            json!({ "password": "An0ther-Secret-Phrase" }).to_string(),
            Some(("ada@example.com", PASSWORD)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let users = &state.users;
        assert!(users.authenticate("ada@example.com", PASSWORD).await.unwrap().is_none());
        assert!(
            users
                .authenticate("ada@example.com", "An0ther-Secret-Phrase")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[sqlx::test]
    async fn test_update_to_taken_email(pool: Pool<Postgres>) {
        let state = test_state(pool);
        register(&state, "ada@example.com", "ada").await;
        register(&state, "bob@example.com", "bob").await;

        let response = make_request(
            app(state),
            Method::PATCH,
            "/users/@me",
            json!({ "email": "bob@example.com" }).to_string(),
            Some(("ada@example.com", PASSWORD)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}

//! Users-related HTTP API.
mod delete;
mod get;
mod update;

use axum::extract::{Request, State};
use axum::http::header;
use axum::response::Response;
use axum::routing::get;
use axum::{Router, middleware};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::user::UserManager;
use crate::{AppState, ServerError};

const BASIC: &str = "Basic";

/// Decode `Authorization: Basic base64(email:password)`.
///
/// The scheme name is case-insensitive.
fn credentials(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BASIC) {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;

    Some((email.to_owned(), password.to_owned()))
}

/// Custom middleware for authentification.
async fn auth(
    State(users): State<UserManager>,
    mut req: Request,
    next: middleware::Next,
) -> Result<Response, ServerError> {
    let Some((email, password)) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(credentials)
    else {
        return Err(ServerError::Unauthorized);
    };

    let Some(user) = users.authenticate(&email, &password).await? else {
        return Err(ServerError::Unauthorized);
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // `GET /users/@me` goes to `get`. Authorization required.
        // `PATCH /users/@me` goes to `update`. Authorization required.
        // `DELETE /users/@me` goes to `delete`. Authorization required.
        .route(
            "/@me",
            get(get::me).patch(update::handler).delete(delete::handler),
        )
        .route_layer(middleware::from_fn_with_state(state, auth))
        // `GET /users/:ID` goes to `get`.
        .route("/{user_id}", get(get::handler))
}

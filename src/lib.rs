//! chat-app is the HTTP backend skeleton of a chat service.

#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
mod middleware;
mod router;
pub mod telemetry;
pub mod user;

pub use error::ServerError;

use std::sync::Arc;

use axum::http::{HeaderName, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use tower::ServiceBuilder;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer,
};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use config::{REQUEST_ID_HEADER, Settings};
use crypto::PasswordManager;
use database::Database;
use user::UserManager;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: axum::http::Method,
    path: &str,
    body: String,
    credentials: Option<(&str, &str)>,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::HOST, "localhost")
        .header(header::CONTENT_TYPE, "application/json");

    if let Some((email, password)) = credentials {
        request = request.header(
            header::AUTHORIZATION,
            router::users::tests::basic(email, password),
        );
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State backed by `pool`, with cheap password hashing.
#[cfg(test)]
pub fn test_state(pool: sqlx::PgPool) -> AppState {
    let settings = Arc::new(Settings::default());
    let pwd = PasswordManager::new(
        Some(crypto::Argon2Config {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }),
        settings.secret_key.expose(),
    )
    .unwrap();

    AppState {
        settings,
        db: Database {
            postgres: pool.clone(),
        },
        users: UserManager::new(pool, Arc::new(pwd)),
    }
}

/// State whose pool never connects, for routes without database access.
#[cfg(test)]
pub fn lazy_state() -> AppState {
    let options = database::connect_options(&Settings::default().database);

    test_state(sqlx::postgres::PgPoolOptions::new().connect_lazy_with(options))
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: Database,
    pub users: UserManager,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let settings = Arc::clone(&state.settings);

    let router = Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `POST /login` goes to `login`.
        .route("/login", post(router::login::handler))
        // `POST /users` goes to `create`.
        .route("/users", post(router::create::handler))
        .nest("/users", router::users::router(state.clone()))
        .layer(AxumMiddleware::from_fn_with_state(
            Arc::clone(&settings),
            middleware::allowed_hosts,
        ))
        .with_state(state);

    with_middleware(router, &settings)
}

/// Wrap `router` in the HTTP middleware stack, outermost layer first.
fn with_middleware(router: Router, settings: &Settings) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let [nosniff, referrer, opener, frame] = middleware::security_headers();

    let middleware = ServiceBuilder::new()
        // Hide credentials from logs.
        .layer(SetSensitiveHeadersLayer::new([
            header::AUTHORIZATION,
            header::COOKIE,
        ]))
        // Keep the inbound correlation ID, or generate one.
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(telemetry::CorrelationSpan)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Echo the correlation ID on the response.
        .layer(PropagateRequestIdLayer::new(request_id))
        // Add CORS preflight support.
        .layer(middleware::cors())
        .layer(nosniff)
        .layer(referrer)
        .layer(opener)
        .layer(frame)
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            settings.request_timeout,
        ));

    router.layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    settings: Arc<Settings>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let db = Database::new(&settings.database).await?;

    // execute migrations scripts on start.
    db.migrate().await?;

    let pwd = Arc::new(PasswordManager::new(None, settings.secret_key.expose())?);
    let users = UserManager::new(db.postgres.clone(), pwd);

    Ok(AppState {
        settings,
        db,
        users,
    })
}

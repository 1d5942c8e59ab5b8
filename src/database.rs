//! database (db) union structure.
use axum::extract::FromRef;
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::AppState;
use crate::config::DatabaseSettings;

/// Custom db structure to pass to Axum.
#[derive(Clone)]
pub struct Database {
    pub postgres: PgPool,
}

impl Database {
    /// Init database connections.
    pub async fn new(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(settings.pool_size);
        let postgres = pool.connect_with(connect_options(settings)).await?;

        tracing::info!(
            hostname = %settings.host,
            port = settings.port,
            db = %settings.name,
            "postgres connected"
        );

        Ok(Self { postgres })
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!().run(&self.postgres).await
    }
}

/// Connection options built field by field, so credentials need no escaping.
pub fn connect_options(settings: &DatabaseSettings) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(settings.password.expose())
        .database(&settings.name)
}

impl FromRef<AppState> for Database {
    fn from_ref(app_state: &AppState) -> Database {
        app_state.db.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    #[test]
    fn test_connect_options() {
        let settings = DatabaseSettings {
            name: "chat".into(),
            user: "chat_user".into(),
            password: Secret::new("p@ss:word/"),
            host: "db.internal".into(),
            port: 6543,
            pool_size: 2,
        };
        let options = connect_options(&settings);

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "chat_user");
        assert_eq!(options.get_database(), Some("chat"));
    }
}

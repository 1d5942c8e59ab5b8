//! Handle database requests.

use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::user::User;

const COLUMNS: &str = "id, email, username, password, first_name, last_name, \
    is_staff, is_superuser, is_active, last_login, date_joined";

/// Row ready to be inserted: email normalized, password hashed, flags set.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert [`UserRecord`] into database.
    pub async fn insert(&self, user: &UserRecord) -> Result<User> {
        let query = format!(
            r#"INSERT INTO users
                (email, username, password, first_name, last_name, is_staff, is_superuser, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {COLUMNS}"#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_email)
    }

    /// Find user using `id` field.
    pub async fn find_by_id(&self, user_id: i64) -> Result<User> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Find user using `email` field.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Update mutable fields of user.
    pub async fn update(&self, user: &User) -> Result<User> {
        let query = format!(
            r#"UPDATE users
                SET email = $1, username = $2, password = $3, first_name = $4, last_name = $5,
                    is_staff = $6, is_superuser = $7, is_active = $8
                WHERE id = $9
                RETURNING {COLUMNS}"#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.is_active)
            .bind(user.id)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_email)
    }

    /// Set `last_login` to now.
    pub async fn touch_last_login(&self, user_id: i64) -> Result<User> {
        let query = format!(
            "UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING {COLUMNS}"
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Delete user.
    pub async fn delete(&self, user_id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::Sql(sqlx::Error::RowNotFound));
        }

        Ok(())
    }
}

/// Email is the only unique column besides the primary key.
fn unique_email(err: sqlx::Error) -> ServerError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ServerError::EmailTaken
        },
        err => ServerError::Sql(err),
    }
}

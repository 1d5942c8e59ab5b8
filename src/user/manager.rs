use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::{Pool, Postgres};
use validator::{ValidationError, ValidationErrors};

use crate::AppState;
use crate::crypto::{PasswordManager, make_unusable};
use crate::error::Result;
use crate::user::{NewUser, USERNAME_FIELD, User, UserRecord, UserRepository};

const MAX_EMAIL_LENGTH: usize = 255;
const MAX_USERNAME_LENGTH: usize = 50;

/// User manager.
///
/// Every account goes through here: emails are normalized, flags get their
/// defaults and passwords are hashed before anything reaches the database.
#[derive(Clone)]
pub struct UserManager {
    pub repo: UserRepository,
    pub pwd: Arc<PasswordManager>,
}

impl FromRef<AppState> for UserManager {
    fn from_ref(state: &AppState) -> UserManager {
        state.users.clone()
    }
}

/// Lower-case the domain part of an email, keep the local part intact.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();

    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_owned(),
    }
}

/// Trimmed username, rejected when blank or too long.
fn clean_username(username: &str) -> Result<String> {
    let username = username.trim();

    if username.is_empty() {
        return Err(
            error("username", "required", "This field cannot be blank.").into()
        );
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(error(
            "username",
            "length",
            "Ensure this value has at most 50 characters.",
        )
        .into());
    }

    Ok(username.to_owned())
}

fn error(field: &'static str, code: &'static str, message: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        field,
        ValidationError::new(code).with_message(message.to_owned().into()),
    );
    errors
}

impl UserManager {
    /// Create a new [`UserManager`].
    pub fn new(pool: Pool<Postgres>, pwd: Arc<PasswordManager>) -> Self {
        Self {
            repo: UserRepository::new(pool),
            pwd,
        }
    }

    /// Create a regular account.
    ///
    /// Defaults: not staff, not superuser, active.
    pub async fn create_user(&self, user: NewUser) -> Result<User> {
        let is_staff = user.is_staff.unwrap_or(false);
        let is_superuser = user.is_superuser.unwrap_or(false);
        let record = self.record(user, is_staff, is_superuser)?;

        let user = self.repo.insert(&record).await?;
        tracing::info!(user_id = user.id, "user created");

        Ok(user)
    }

    /// Create an administrator account.
    ///
    /// Staff and superuser flags default to `true` and may not be turned off.
    pub async fn create_superuser(&self, user: NewUser) -> Result<User> {
        if user.is_staff == Some(false) {
            return Err(error(
                "is_staff",
                "superuser_staff",
                "Superuser must have is_staff=True.",
            )
            .into());
        }
        if user.is_superuser == Some(false) {
            return Err(error(
                "is_superuser",
                "superuser_flag",
                "Superuser must have is_superuser=True.",
            )
            .into());
        }

        let record = self.record(user, true, true)?;
        let user = self.repo.insert(&record).await?;
        tracing::info!(user_id = user.id, "superuser created");

        Ok(user)
    }

    fn record(
        &self,
        user: NewUser,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<UserRecord> {
        let email = normalize_email(&user.email);
        if email.is_empty() {
            return Err(
                error(USERNAME_FIELD, "required", "The Email must be set.").into()
            );
        }
        if email.chars().count() > MAX_EMAIL_LENGTH {
            return Err(error(
                USERNAME_FIELD,
                "length",
                "Ensure this value has at most 255 characters.",
            )
            .into());
        }

        let username = clean_username(&user.username)?;

        let password = match user.password {
            Some(password) => self.pwd.hash_password(password)?,
            None => make_unusable(),
        };

        Ok(UserRecord {
            email,
            username,
            password,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff,
            is_superuser,
            is_active: user.is_active.unwrap_or(true),
        })
    }

    /// Check credentials, looking the account up by email.
    ///
    /// Unknown email, wrong or unusable password and inactive accounts all
    /// give `None`.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let Some(user) = self.repo.find_by_email(&normalize_email(email)).await?
        else {
            // Keep response time close to the one of a real check.
            let _ = self.pwd.hash_password(password);
            return Ok(None);
        };

        if !self.pwd.verify_password(password, &user.password) || !user.is_active {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Find user using `id` field.
    pub async fn find_by_id(&self, user_id: i64) -> Result<User> {
        self.repo.find_by_id(user_id).await
    }

    /// Stamp a successful login.
    pub async fn record_login(&self, user: &User) -> Result<User> {
        let user = self.repo.touch_last_login(user.id).await?;
        tracing::info!(user_id = user.id, "user logged in");

        Ok(user)
    }

    /// Replace the password of user (in memory only).
    pub fn set_password(&self, user: &mut User, password: &str) -> Result<()> {
        user.password = self.pwd.hash_password(password)?;
        Ok(())
    }

    /// Persist field updates; email and username are cleaned again.
    pub async fn update(&self, mut user: User) -> Result<User> {
        user.email = normalize_email(&user.email);
        user.username = clean_username(&user.username)?;
        self.repo.update(&user).await
    }

    /// Delete user.
    pub async fn delete(&self, user: &User) -> Result<()> {
        self.repo.delete(user.id).await?;
        tracing::info!(user_id = user.id, "user deleted");

        Ok(())
    }
}

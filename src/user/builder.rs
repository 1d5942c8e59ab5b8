//! Typed builder for new users.

use validator::ValidationErrors;

use crate::user::validation::{UserAttributes, validate_password};

/// Account waiting to be handed to [`crate::user::UserManager`].
///
/// Flags left to `None` receive the manager defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
}

impl NewUser {
    /// Apply the password rules against this account, if a password is set.
    pub fn validate_password(&self) -> Result<(), ValidationErrors> {
        let Some(password) = &self.password else {
            return Ok(());
        };

        validate_password(
            password,
            &UserAttributes {
                username: &self.username,
                first_name: &self.first_name,
                last_name: &self.last_name,
                email: &self.email,
            },
        )
    }
}

/// [`NewUser`] builder.
#[derive(Debug, Clone)]
pub struct UserBuilder<Email> {
    email: Email,
    user: NewUser,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

impl Default for UserBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBuilder<Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            email: Missing,
            user: NewUser::default(),
        }
    }

    /// Update `email` field on [`UserBuilder`].
    pub fn email(self, email: impl Into<String>) -> UserBuilder<Present<String>> {
        UserBuilder {
            email: Present(email.into()),
            user: self.user,
        }
    }
}

impl<Email> UserBuilder<Email> {
    /// Update `username` field on [`UserBuilder`].
    pub fn username(mut self, username: impl ToString) -> Self {
        self.user.username = username.to_string();
        self
    }

    /// Update `password` field on [`UserBuilder`].
    ///
    /// `None` leaves the account with an unusable password.
    pub fn password(mut self, password: Option<String>) -> Self {
        self.user.password = password;
        self
    }

    /// Update `first_name` field on [`UserBuilder`].
    pub fn first_name(mut self, first_name: Option<String>) -> Self {
        self.user.first_name = first_name.unwrap_or_default();
        self
    }

    /// Update `last_name` field on [`UserBuilder`].
    pub fn last_name(mut self, last_name: Option<String>) -> Self {
        self.user.last_name = last_name.unwrap_or_default();
        self
    }

    /// Update `is_staff` flag on [`UserBuilder`].
    pub fn staff(mut self, is_staff: bool) -> Self {
        self.user.is_staff = Some(is_staff);
        self
    }

    /// Update `is_superuser` flag on [`UserBuilder`].
    pub fn superuser(mut self, is_superuser: bool) -> Self {
        self.user.is_superuser = Some(is_superuser);
        self
    }

    /// Update `is_active` flag on [`UserBuilder`].
    pub fn active(mut self, is_active: bool) -> Self {
        self.user.is_active = Some(is_active);
        self
    }
}

impl UserBuilder<Present<String>> {
    /// Build a [`NewUser`] with `email`.
    pub fn build(self) -> NewUser {
        NewUser {
            email: self.email.0,
            ..self.user
        }
    }
}

//! Password strength rules applied on registration and password change.

use std::collections::HashMap;

use validator::{ValidationError, ValidationErrors};

const FIELD: &str = "password";
pub const MIN_LENGTH: usize = 8;
const MAX_SIMILARITY: f64 = 0.7;

/// Most frequent leaked passwords, lower-cased.
const COMMON_PASSWORDS: &[&str] = &[
    "123456", "123456789", "12345678", "password", "qwerty", "qwerty123",
    "1q2w3e4r", "12345", "111111", "1234567", "1234567890", "000000",
    "123123", "abc123", "password1", "password123", "iloveyou", "admin",
    "admin123", "welcome", "welcome1", "letmein", "monkey", "dragon",
    "football", "baseball", "sunshine", "princess", "superman", "qwertyuiop",
    "asdfghjkl", "zxcvbnm", "passw0rd", "trustno1", "starwars", "whatever",
    "shadow", "master", "michael", "jennifer", "jordan23", "hunter2",
    "charlie", "computer", "freedom", "mustang", "access", "login",
    "changeme", "secret", "q1w2e3r4t5", "1qaz2wsx", "aa123456", "azerty",
    "solo", "loveme", "flower", "hello123", "chatapp", "p@ssw0rd",
];

/// Account values a password must not resemble.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserAttributes<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

impl<'a> UserAttributes<'a> {
    fn named(&self) -> [(&'static str, &'a str); 4] {
        [
            ("username", self.username),
            ("first name", self.first_name),
            ("last name", self.last_name),
            ("email address", self.email),
        ]
    }
}

/// Run every password rule, collecting all failures under `password`.
pub fn validate_password(
    password: &str,
    attributes: &UserAttributes<'_>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    for error in [
        similarity(password, attributes),
        minimum_length(password),
        common(password),
        numeric(password),
    ]
    .into_iter()
    .flatten()
    {
        errors.add(FIELD, error);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn minimum_length(password: &str) -> Option<ValidationError> {
    (password.chars().count() < MIN_LENGTH).then(|| {
        ValidationError::new("password_too_short").with_message(
            format!(
                "This password is too short. It must contain at least {MIN_LENGTH} characters."
            )
            .into(),
        )
    })
}

fn common(password: &str) -> Option<ValidationError> {
    let password = password.trim().to_lowercase();

    COMMON_PASSWORDS.contains(&password.as_str()).then(|| {
        ValidationError::new("password_too_common")
            .with_message("This password is too common.".into())
    })
}

fn numeric(password: &str) -> Option<ValidationError> {
    (!password.is_empty() && password.chars().all(|c| c.is_numeric())).then(
        || {
            ValidationError::new("password_entirely_numeric")
                .with_message("This password is entirely numeric.".into())
        },
    )
}

fn similarity(
    password: &str,
    attributes: &UserAttributes<'_>,
) -> Option<ValidationError> {
    let password = password.to_lowercase();

    attributes
        .named()
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .find(|(_, value)| {
            let value = value.to_lowercase();
            std::iter::once(value.as_str())
                .chain(value.split(|c: char| !c.is_alphanumeric() && c != '_'))
                .filter(|part| !part.is_empty())
                .any(|part| similar(&password, part))
        })
        .map(|(name, _)| {
            ValidationError::new("password_too_similar").with_message(
                format!("The password is too similar to the {name}.").into(),
            )
        })
}

/// Character-overlap ratio of two strings, in `[0, 1]`.
fn overlap_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }

    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }

    let mut matches = 0usize;
    for c in a.chars() {
        if let Some(count) = available.get_mut(&c).filter(|count| **count > 0)
        {
            *count -= 1;
            matches += 1;
        }
    }

    2.0 * matches as f64 / total as f64
}

fn similar(password: &str, value: &str) -> bool {
    // A short value cannot make a much longer password similar.
    let password_len = password.chars().count();
    let value_len = value.chars().count();
    if password_len >= 10 * value_len
        && (value_len as f64) < MAX_SIMILARITY / 2.0 * password_len as f64
    {
        return false;
    }

    overlap_ratio(password, value) >= MAX_SIMILARITY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(result: Result<(), ValidationErrors>) -> Vec<String> {
        let errors = result.unwrap_err();
        let mut messages: Vec<String> = errors
            .field_errors()
            .get(FIELD)
            .map(|issues| issues.iter().map(|e| e.to_string()).collect())
            .unwrap_or_default();
        messages.sort();
        messages
    }

    #[test]
    fn test_strong_password() {
        let attributes = UserAttributes {
            username: "ada",
            email: "ada@example.com",
            ..Default::default()
        };

        assert!(validate_password("Tr1cky-Lavender-92", &attributes).is_ok());
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            messages(validate_password("x7$kQ", &UserAttributes::default())),
            vec![
                "This password is too short. It must contain at least 8 characters."
            ]
        );
    }

    #[test]
    fn test_common_and_numeric() {
        let messages =
            messages(validate_password("12345678", &UserAttributes::default()));

        assert!(messages.contains(&"This password is too common.".to_owned()));
        assert!(
            messages.contains(&"This password is entirely numeric.".to_owned())
        );
    }

    #[test]
    fn test_common_is_case_insensitive() {
        assert_eq!(
            messages(validate_password("PassWord123", &UserAttributes::default())),
            vec!["This password is too common."]
        );
    }

    #[test]
    fn test_similar_to_username() {
        let attributes = UserAttributes {
            username: "lovelace1815",
            ..Default::default()
        };

        assert_eq!(
            messages(validate_password("Lovelace1815!", &attributes)),
            vec!["The password is too similar to the username."]
        );
    }

    #[test]
    fn test_similar_to_email_part() {
        let attributes = UserAttributes {
            email: "countess.lovelace@example.com",
            ..Default::default()
        };

        assert_eq!(
            messages(validate_password("countess.lovelace", &attributes)),
            vec!["The password is too similar to the email address."]
        );
    }

    #[test]
    fn test_overlap_ratio() {
        assert_eq!(overlap_ratio("abcd", "abcd"), 1.0);
        assert_eq!(overlap_ratio("abcd", "wxyz"), 0.0);
        assert_eq!(overlap_ratio("aab", "ab"), 0.8);
    }
}

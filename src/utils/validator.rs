use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;
use validator::ValidationError;

use crate::consts::MIN_PASSWORD_LEN;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

pub fn is_email_shape(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

fn failure(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn validate_email_shape(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(failure("email_required", "Email is required."));
    }
    if !is_email_shape(email.trim()) {
        return Err(failure("email_shape", "Please enter a valid email address."));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() {
        return Err(failure("password_required", "Password is required."));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(failure(
            "password_too_short",
            "Password must be at least 6 characters.",
        ));
    }
    Ok(())
}

pub fn validate_required_password(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() {
        return Err(failure("password_required", "Password is required."));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(failure("title_required", "Title is required."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_email_shape("user@example.com"));
        assert!(!is_email_shape("user@example"));
        assert!(!is_email_shape("user@@example.com"));
        assert!(!is_email_shape(""));
        assert!(!is_email_shape("us er@example.com"));
    }

    #[test]
    fn email_messages() {
        let empty = validate_email_shape("  ").unwrap_err();
        assert_eq!(empty.message.unwrap(), "Email is required.");
        let bad = validate_email_shape("user@example").unwrap_err();
        assert_eq!(bad.message.unwrap(), "Please enter a valid email address.");
        assert!(validate_email_shape("user@example.com").is_ok());
    }

    #[test]
    fn password_minimum_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert_eq!(
            validate_password("").unwrap_err().message.unwrap(),
            "Password is required."
        );
    }
}

use validator::Validate;

use crate::app::{ServiceError, ServiceResult};

#[derive(Validate)]
struct EmailValidator {
    #[validate(email)]
    email: String,
}

/// Validate a player/user name: 3-20 characters after trimming,
/// letters, digits, whitespace and `_ - .` only.
/// Returns the trimmed name.
pub fn validate_username(username: &str) -> ServiceResult<String> {
    let username = username.trim();
    let length = username.chars().count();
    if length < 3 {
        return ServiceError::bad_request("Username must be at least 3 characters");
    }
    if length > 20 {
        return ServiceError::bad_request("Username cannot exceed 20 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '-' | '.'))
    {
        return ServiceError::bad_request(
            "Only letters, numbers, spaces and the characters _ - . are allowed",
        );
    }
    Ok(username.to_string())
}

/// Validate an email address, max 255 characters. Returns the trimmed address.
pub fn validate_email(email: &str) -> ServiceResult<String> {
    let email = email.trim();
    if email.chars().count() > 255 {
        return ServiceError::bad_request("Email is too long");
    }
    let validator = EmailValidator {
        email: email.to_string(),
    };
    if validator.validate().is_err() {
        return ServiceError::bad_request("Invalid email");
    }
    Ok(validator.email)
}

/// Validate a password: 6-100 characters, no charset restriction, no trimming.
pub fn validate_password(password: &str) -> ServiceResult<String> {
    let length = password.chars().count();
    if length < 6 {
        return ServiceError::bad_request("Password must be at least 6 characters");
    }
    if length > 100 {
        return ServiceError::bad_request("Password is too long");
    }
    Ok(password.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_accepts_allowed_charset() {
        assert_eq!(
            validate_username("Player_1.test").unwrap(),
            "Player_1.test"
        );
        assert_eq!(validate_username("abc").unwrap(), "abc");
        assert_eq!(validate_username("  spaced name  ").unwrap(), "spaced name");
    }

    #[test]
    fn test_username_rejects_bad_lengths() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("a".repeat(21).as_str()).is_err());
        assert!(validate_username("a".repeat(20).as_str()).is_ok());
    }

    #[test]
    fn test_username_rejects_bad_charset() {
        assert!(validate_username("user@name").is_err());
        assert!(validate_username("user#name").is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(validate_email("a@b.co").unwrap(), "a@b.co");
        assert_eq!(validate_email(" a@b.co ").unwrap(), "a@b.co");
        assert!(validate_email("not-an-email").is_err());
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_password_lengths() {
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password(&"p".repeat(100)).is_ok());
        assert!(validate_password(&"p".repeat(101)).is_err());
    }

    #[test]
    fn test_password_is_not_trimmed() {
        assert_eq!(validate_password("  1234").unwrap(), "  1234");
    }
}

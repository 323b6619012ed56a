//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates username format.
///
/// Requirements:
/// - Only alphanumeric characters and underscores
/// - 1-50 characters in length
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() || username.len() > 50 {
        return Err(ValidationError::new("username_invalid_length"));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::new("username_invalid_characters"));
    }

    Ok(())
}

/// Parses a free-form rep prescription into a concrete count when possible.
///
/// "12" parses; "10-12", "AMRAP" and "30 seconds" do not and yield None.
pub fn parse_rep_count(reps: &str) -> Option<i64> {
    reps.trim().parse::<i64>().ok().filter(|n| *n >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rejects_empty() {
        assert!(validate_username("").is_err());
    }

    #[test]
    fn username_rejects_special_chars() {
        assert!(validate_username("user@name").is_err());
    }

    #[test]
    fn username_accepts_valid() {
        assert!(validate_username("valid_user123").is_ok());
    }

    #[test]
    fn rep_count_parses_plain_integer() {
        assert_eq!(parse_rep_count("12"), Some(12));
        assert_eq!(parse_rep_count(" 8 "), Some(8));
    }

    #[test]
    fn rep_count_rejects_free_form() {
        assert_eq!(parse_rep_count("AMRAP"), None);
        assert_eq!(parse_rep_count("10-12"), None);
        assert_eq!(parse_rep_count("30 seconds"), None);
        assert_eq!(parse_rep_count("-3"), None);
    }
}

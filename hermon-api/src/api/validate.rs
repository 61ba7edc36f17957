//! Request field validation shared by the handlers

use crate::error::ApiError;

/// Trim and lowercase an email, rejecting obviously malformed input
pub fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(ApiError::BadRequest("Please provide a valid email".to_string()))
    }
}

/// Require a string whose trimmed length (in characters) is within bounds
pub fn text_in_range(field: &str, value: &str, min: usize, max: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if len < min || len > max {
        let message = if min <= 1 && len == 0 {
            format!("{} is required", field)
        } else {
            format!("{} must be between {} and {} characters", field, min, max)
        };
        return Err(ApiError::BadRequest(message));
    }

    Ok(trimmed.to_string())
}

/// Optional text with only an upper bound
pub fn text_at_most(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ApiError> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().chars().count() > max => Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        Some(v) => Ok(Some(v.trim().to_string())),
    }
}

pub fn password(value: &str) -> Result<(), ApiError> {
    if value.chars().count() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// Require a non-empty id-like value
pub fn required(field: &str, value: Option<&str>) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalized() {
        assert_eq!(normalize_email("  Grace@Example.ORG ").unwrap(), "grace@example.org");
    }

    #[test]
    fn test_email_rejected() {
        for bad in ["", "plain", "a@b", "@example.org", "a@@example.org", "a b@example.org"] {
            assert!(normalize_email(bad).is_err(), "{:?} accepted", bad);
        }
    }

    #[test]
    fn test_text_counts_characters_not_bytes() {
        // Seven code points, twenty-one bytes
        assert!(text_in_range("Title", "యేసుప్ర", 1, 7).is_ok());
        assert!(text_in_range("Name", "a", 2, 50).is_err());
        assert!(text_in_range("Title", "   ", 1, 200).is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(password("12345").is_err());
        assert!(password("123456").is_ok());
    }
}

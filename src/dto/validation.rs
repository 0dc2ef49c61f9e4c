//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted team id, in bytes.
pub const MAX_TEAM_ID_LEN: usize = 64;

/// Validates that a team id is non-empty, printable and at most [`MAX_TEAM_ID_LEN`] bytes.
///
/// Any printable text is accepted, emoji included.
///
/// # Examples
///
/// ```ignore
/// validate_team_id("fox")      // Ok
/// validate_team_id("🦊")       // Ok
/// validate_team_id("")         // Err - empty
/// validate_team_id("fox\nowl") // Err - control character
/// ```
pub fn validate_team_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_TEAM_ID_LEN {
        let mut err = ValidationError::new("team_id_length");
        err.message = Some(
            format!(
                "Team ID must be between 1 and {MAX_TEAM_ID_LEN} bytes (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_control) {
        let mut err = ValidationError::new("team_id_format");
        err.message = Some("Team ID must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_id_valid() {
        assert!(validate_team_id("fox").is_ok());
        assert!(validate_team_id("🦊").is_ok());
        assert!(validate_team_id("team with spaces").is_ok());
        assert!(validate_team_id(&"a".repeat(MAX_TEAM_ID_LEN)).is_ok());
    }

    #[test]
    fn test_validate_team_id_invalid_length() {
        assert!(validate_team_id("").is_err());
        assert!(validate_team_id(&"a".repeat(MAX_TEAM_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_team_id_invalid_format() {
        assert!(validate_team_id("fox\nowl").is_err());
        assert!(validate_team_id("\u{0}").is_err());
    }
}

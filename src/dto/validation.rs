//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of a Spotify base-62 track identifier.
const TRACK_ID_LEN: usize = 22;

/// Validates that a track ID looks like a Spotify identifier: 22 ASCII alphanumerics.
///
/// # Examples
///
/// ```ignore
/// validate_track_id("4uLU6hMCjMI75M1A2tKUQC") // Ok
/// validate_track_id("4uLU6hMCjMI75M1A2tKUQ")  // Err - too short
/// validate_track_id("4uLU6hMCjMI75M1A2tKU-C") // Err - not base-62
/// ```
pub fn validate_track_id(id: &str) -> Result<(), ValidationError> {
    if id.len() != TRACK_ID_LEN {
        let mut err = ValidationError::new("track_id_length");
        err.message = Some(
            format!(
                "Track ID must be exactly {TRACK_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("track_id_format");
        err.message = Some("Track ID must contain only base-62 characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_track_id_valid() {
        assert!(validate_track_id("4uLU6hMCjMI75M1A2tKUQC").is_ok());
        assert!(validate_track_id("7GhIk7Il098yCjg4BQjzvb").is_ok());
    }

    #[test]
    fn test_validate_track_id_invalid_length() {
        assert!(validate_track_id("4uLU6hMCjMI75M1A2tKUQ").is_err()); // too short
        assert!(validate_track_id("4uLU6hMCjMI75M1A2tKUQCx").is_err()); // too long
        assert!(validate_track_id("").is_err());
    }

    #[test]
    fn test_validate_track_id_invalid_format() {
        assert!(validate_track_id("4uLU6hMCjMI75M1A2tKU-C").is_err());
        assert!(validate_track_id("4uLU6hMCjMI75M1A2tK QC").is_err());
        assert!(validate_track_id("spotify:track:4uLU6hMC").is_err());
    }
}

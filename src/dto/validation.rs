//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of team access codes.
pub const ACCESS_CODE_LENGTH: usize = 8;

/// Validates that an access code is exactly 8 uppercase alphanumeric
/// characters, the shape `generate_access_code` produces.
pub fn validate_access_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != ACCESS_CODE_LENGTH {
        let mut err = ValidationError::new("access_code_length");
        err.message = Some(
            format!(
                "access code must be exactly {ACCESS_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("access_code_format");
        err.message =
            Some("access code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generated_shape() {
        assert!(validate_access_code("A1B2C3D4").is_ok());
        assert!(validate_access_code("ZZZZZZZZ").is_ok());
        assert!(validate_access_code("00000000").is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(validate_access_code("A1B2C3D").is_err());
        assert!(validate_access_code("A1B2C3D45").is_err());
        assert!(validate_access_code("").is_err());
    }

    #[test]
    fn rejects_wrong_characters() {
        assert!(validate_access_code("a1b2c3d4").is_err());
        assert!(validate_access_code("A1B2C3D!").is_err());
        assert!(validate_access_code("A1B2 3D4").is_err());
    }
}

/// Error code registry for cmdbridge
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 6000-6999: Credential errors
/// - 7000-7999: Validation errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_TOML: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_PATH_ERROR: u16 = 1006;

    // Credential errors (6000-6999)
    pub const CREDENTIAL_GENERIC: u16 = 6000;
    pub const CREDENTIAL_INVALID_HOST: u16 = 6002;

    // Validation errors (7000-7999)
    pub const VALIDATION_REQUIRED_FIELD: u16 = 7001;
    pub const VALIDATION_INVALID_FORMAT: u16 = 7005;
    pub const VALIDATION_CONFLICTING_PARAMETERS: u16 = 7006;
    pub const VALIDATION_UNKNOWN_OPERATION: u16 = 7010;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1001 => "Configuration file not found",
        1002 => "Invalid TOML syntax in configuration",
        1005 => "Invalid value in configuration",
        1006 => "Configuration path error",

        6000 => "Credential could not be used",
        6002 => "Remote host could not be determined",

        7001 => "Required parameter is missing or empty",
        7005 => "Parameter has an invalid format",
        7006 => "Mutually exclusive parameters supplied together",
        7010 => "Unknown operation",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_have_descriptions() {
        for code in [
            ErrorCode::CONFIG_NOT_FOUND,
            ErrorCode::CONFIG_INVALID_TOML,
            ErrorCode::CONFIG_INVALID_VALUE,
            ErrorCode::CONFIG_PATH_ERROR,
            ErrorCode::CREDENTIAL_GENERIC,
            ErrorCode::CREDENTIAL_INVALID_HOST,
            ErrorCode::VALIDATION_REQUIRED_FIELD,
            ErrorCode::VALIDATION_INVALID_FORMAT,
            ErrorCode::VALIDATION_CONFLICTING_PARAMETERS,
            ErrorCode::VALIDATION_UNKNOWN_OPERATION,
        ] {
            assert_ne!(describe_error_code(code), "Unknown error code");
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(describe_error_code(4242), "Unknown error code");
    }
}

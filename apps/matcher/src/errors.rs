use thiserror::Error;

/// Engine-level error type.
///
/// "No match" is never an error: resolvers return `Ok(None)` for that.
/// Only structurally wrong input (missing `displayName`, a payload that is
/// not an array, an impossible threshold) and configuration loading fail.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported synonym table format: {0}")]
    UnsupportedFormat(String),
}

impl MatchError {
    /// Stable machine-readable code, suitable for job reports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::InvalidInput(_) => "INVALID_INPUT",
            MatchError::Io(_) => "IO_ERROR",
            MatchError::Json(_) => "JSON_ERROR",
            MatchError::Yaml(_) => "YAML_ERROR",
            MatchError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        MatchError::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_code() {
        let err = MatchError::invalid("displayName is missing");
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(err.to_string(), "Invalid input: displayName is missing");
    }

    #[test]
    fn test_json_error_converts() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: MatchError = parse_err.into();
        assert_eq!(err.code(), "JSON_ERROR");
    }
}

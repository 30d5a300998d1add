use thiserror::Error;

use crate::config::ConfigError;

/// Centralized error type for the admission bot.
///
/// Handlers log these and move on; none of them is ever shown to an
/// applicant or an admin verbatim.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed settings
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Metrics registry setup errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Form payloads that are not valid applicant JSON
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::from(ConfigError::Missing("BOT_TOKEN"));
        assert_eq!(err.to_string(), "Configuration error: BOT_TOKEN is not set");
    }

    #[test]
    fn test_metrics_error_conversion() {
        let err = AppError::from(prometheus::Error::Msg("duplicate".to_string()));
        assert!(matches!(err, AppError::Metrics(_)));
        assert_eq!(err.to_string(), "Metrics error: duplicate");
    }

    #[test]
    fn test_anyhow_error_conversion() {
        let err = AppError::from(anyhow::anyhow!("bind failed"));
        assert_eq!(err.to_string(), "Application error: bind failed");
    }

    #[test]
    fn test_decode_error_conversion() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, AppError::Decode(_)));
    }
}

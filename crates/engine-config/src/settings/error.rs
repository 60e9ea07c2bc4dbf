use thiserror::Error;

/// Errors raised when building or validating run settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required environment variable was not set or is empty.
    #[error("Missing required setting: {0}")]
    Missing(String),

    /// A setting was present but could not be parsed.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// One or more settings failed validation.
    #[error("Settings validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// Settings that cannot be combined in one run.
    #[error("Conflicting settings: {}", .0.join("; "))]
    ConflictingSettings(Vec<String>),
}

impl SettingsError {
    pub fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

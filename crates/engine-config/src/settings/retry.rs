use crate::settings::error::SettingsError;
use engine_core::retry::RetryPolicy;
use std::{collections::HashMap, time::Duration};

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// Retry budget for transient database errors during writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

impl RetrySettings {
    /// Reads the optional `RETRY_MAX_ATTEMPTS` and `RETRY_DELAY_MS` overrides.
    pub fn from_env(vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let mut settings = RetrySettings::default();

        if let Some(raw) = non_empty(vars, "RETRY_MAX_ATTEMPTS") {
            settings.max_attempts = match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(SettingsError::invalid("RETRY_MAX_ATTEMPTS", raw, "expected a positive integer")),
            };
        }
        if let Some(raw) = non_empty(vars, "RETRY_DELAY_MS") {
            let ms = raw
                .parse::<u64>()
                .map_err(|e| SettingsError::invalid("RETRY_DELAY_MS", raw, e.to_string()))?;
            settings.delay = Duration::from_millis(ms);
        }

        Ok(settings)
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, self.delay)
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        let mut vars = HashMap::new();
        assert_eq!(RetrySettings::from_env(&vars).unwrap(), RetrySettings::default());

        vars.insert("RETRY_MAX_ATTEMPTS".to_string(), "5".to_string());
        vars.insert("RETRY_DELAY_MS".to_string(), "0".to_string());
        let settings = RetrySettings::from_env(&vars).unwrap();
        let policy = settings.policy();
        assert_eq!(policy.max_attempts, 5);
        assert!(policy.base_delay.is_zero());

        vars.insert("RETRY_MAX_ATTEMPTS".to_string(), "0".to_string());
        assert!(RetrySettings::from_env(&vars).is_err());
    }
}

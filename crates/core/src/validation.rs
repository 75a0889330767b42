//! Configuration validation support

use config::ConfigError;

/// Trait for validating configuration values
pub trait ValidateConfig {
    /// Returns Ok(()) if valid, or an error describing what's wrong
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Common validation helpers
pub mod validators {
    use config::ConfigError;

    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::Message(format!("{field}: cannot be empty")));
        }
        Ok(())
    }

    /// Validate URL format
    pub fn validate_url(url: &str, field: &str) -> Result<(), ConfigError> {
        url::Url::parse(url)
            .map_err(|e| ConfigError::Message(format!("{field}: invalid URL - {e}")))?;
        Ok(())
    }

    /// Validate that a value is within range
    pub fn validate_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<(), ConfigError> {
        if value < min || value > max {
            return Err(ConfigError::Message(format!(
                "{field}: must be between {min} and {max}"
            )));
        }
        Ok(())
    }

    /// Validate that a host is a bare name or address, not a URL
    pub fn validate_host(host: &str, field: &str) -> Result<(), ConfigError> {
        validate_not_empty(host, field)?;
        if host.contains("://") || host.contains('/') {
            return Err(ConfigError::Message(format!(
                "{field}: expected a host name, not a URL"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validators::*;

    #[test]
    fn test_not_empty() {
        assert!(validate_not_empty("cuic.example.com", "host").is_ok());
        assert!(validate_not_empty("   ", "host").is_err());
    }

    #[test]
    fn test_host_rejects_urls() {
        assert!(validate_host("cuic1.dcloud.cisco.com", "host").is_ok());
        assert!(validate_host("https://cuic1", "host").is_err());
        assert!(validate_host("", "host").is_err());
    }

    #[test]
    fn test_range_message() {
        let err = validate_range(0u64, 1, 86_400, "session_timeout_secs").unwrap_err();
        assert!(err.to_string().contains("session_timeout_secs"));
    }
}

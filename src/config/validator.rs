//! Validation of operator-supplied configuration values.
//!
//! The wizard runs these checks on every answer, and the setup flows run
//! them on every record before it is persisted.

use crate::error::{ConfigError, Result};

use super::spec::NodeConfig;

/// URL schemes accepted for the public hostname.
const ALLOWED_SCHEMES: &[&str] = &["https://", "http://"];

/// Validates the public hostname.
///
/// # Errors
///
/// Returns a message suitable for display next to the prompt.
pub fn validate_domain(value: &str) -> std::result::Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(String::from("Required"));
    }
    if !ALLOWED_SCHEMES.iter().any(|scheme| value.starts_with(scheme)) {
        return Err(String::from("Must start with https:// or http://"));
    }
    Ok(())
}

/// Validates the contact email. An empty value is accepted.
///
/// # Errors
///
/// Returns a message suitable for display next to the prompt.
pub fn validate_email(value: &str) -> std::result::Result<(), String> {
    let value = value.trim();
    if !value.is_empty() && !value.contains('@') {
        return Err(String::from("Must be a valid email"));
    }
    Ok(())
}

/// Validator for whole configuration records.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration record.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn validate(&self, config: &NodeConfig) -> Result<()> {
        validate_domain(&config.domain).map_err(|message| ConfigError::validation(message, "domain"))?;
        validate_email(&config.email).map_err(|message| ConfigError::validation(message, "email"))?;
        if config.compose_url.trim().is_empty() {
            return Err(ConfigError::validation("Required", "compose_url").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_config;

    #[test]
    fn test_domain_rules() {
        assert!(validate_domain("https://node1.seed.run").is_ok());
        assert!(validate_domain("http://localhost:3000").is_ok());
        assert_eq!(validate_domain(""), Err(String::from("Required")));
        assert!(validate_domain("node1.seed.run").is_err());
        assert!(validate_domain("ftp://node1.seed.run").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("").is_ok());
        assert!(validate_email("ops@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_validate_record() {
        let validator = ConfigValidator::new();
        assert!(validator.validate(&sample_config()).is_ok());

        let mut config = sample_config();
        config.domain = String::from("node1.seed.run");
        let err = validator.validate(&config).expect_err("domain without scheme");
        assert!(err.to_string().contains("domain"));
    }
}

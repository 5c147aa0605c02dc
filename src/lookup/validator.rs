//! Username validation utilities

use crate::error::{Result, SniperError};
use crate::types::{MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH};
use regex::Regex;

/// Username validator
pub struct UsernameValidator {
    pattern: Regex,
}

impl UsernameValidator {
    /// Create a new username validator
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"^[A-Za-z0-9_]+$")
            .map_err(|e| crate::internal_error!("Invalid username pattern: {}", e))?;
        Ok(Self { pattern })
    }

    /// Validate a username, returning it trimmed
    pub fn validate(&self, name: &str) -> Result<String> {
        let name = name.trim();

        let length = name.chars().count();
        if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&length) {
            return Err(crate::validation_error!(
                "A username must be between {} and {} characters long.",
                MIN_USERNAME_LENGTH,
                MAX_USERNAME_LENGTH
            ));
        }

        if !self.pattern.is_match(name) {
            return Err(SniperError::validation(
                "The username cannot contain any special characters.",
            ));
        }

        Ok(name.to_string())
    }
}

//! Environment variable management
//!
//! Handles loading and validation of environment variables for API keys
//! and configuration.

use anyhow::{anyhow, Context, Result};
use std::env;

/// Load environment variables from .env file
///
/// Uses dotenv crate to load variables from .env file in the working
/// directory. Does not fail if .env file doesn't exist (optional
/// configuration).
pub fn load_env() -> Result<()> {
    dotenv::dotenv().ok();
    Ok(())
}

/// Get GEMINI_API_KEY from environment
///
/// # Errors
/// Returns error if GEMINI_API_KEY environment variable is not set
pub fn get_gemini_key() -> Result<String> {
    env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY environment variable not set. Please set it in .env or your environment.")
}

/// Validate API key format
///
/// Checks that API key meets minimum requirements:
/// - Not empty
/// - At least 20 characters long
///
/// # Errors
/// Returns error if key doesn't meet validation requirements
pub fn validate_api_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(anyhow!("API key cannot be empty"));
    }
    if key.len() < 20 {
        return Err(anyhow!(
            "API key appears invalid (too short). Expected >= 20 characters, got {}",
            key.len()
        ));
    }
    Ok(())
}

/// Get and validate GEMINI_API_KEY
///
/// Combines get_gemini_key and validate_api_key into single operation
pub fn get_and_validate_api_key() -> Result<String> {
    let key = get_gemini_key()?;
    validate_api_key(&key)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_validate_api_key_valid_length() {
        let result = validate_api_key("AIza1234567890123456789");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_api_key_empty() {
        let result = validate_api_key("");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_api_key_too_short() {
        let result = validate_api_key("short");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .to_lowercase()
            .contains("invalid"));
    }

    #[test]
    fn test_validate_api_key_exactly_20_chars() {
        let key = "a".repeat(20);
        assert!(validate_api_key(&key).is_ok());
    }

    #[test]
    fn test_validate_api_key_19_chars() {
        let key = "a".repeat(19);
        assert!(validate_api_key(&key).is_err());
    }

    #[test]
    #[serial]
    fn test_get_gemini_key_missing() {
        let saved = env::var("GEMINI_API_KEY").ok();
        env::remove_var("GEMINI_API_KEY");

        assert!(get_gemini_key().is_err());

        if let Some(key) = saved {
            env::set_var("GEMINI_API_KEY", key);
        }
    }

    #[test]
    #[serial]
    fn test_get_and_validate_api_key() {
        let saved = env::var("GEMINI_API_KEY").ok();
        env::set_var("GEMINI_API_KEY", "AIza1234567890123456789");

        assert_eq!(
            get_and_validate_api_key().unwrap(),
            "AIza1234567890123456789"
        );

        match saved {
            Some(key) => env::set_var("GEMINI_API_KEY", key),
            None => env::remove_var("GEMINI_API_KEY"),
        }
    }

    #[test]
    fn test_load_env_doesnt_fail_on_missing_file() {
        assert!(load_env().is_ok());
    }
}

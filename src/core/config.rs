//! Framework configuration.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add wildcard delimiter overrides and ack cleanup toggle
//! - 1.0.0: Initial configuration with log level and dispatch policy

use anyhow::Result;
use log::LevelFilter;

/// Configuration for an [`InteractionService`](crate::service::InteractionService).
///
/// All fields have working defaults; construct with `InteractionConfig::default()`
/// and override what the host needs, then `validate()` before handing it to the
/// service.
#[derive(Debug, Clone)]
pub struct InteractionConfig {
    /// Minimum severity emitted through the log facade and the log event.
    pub log_level: LevelFilter,
    /// When true, handler dispatch is detached onto its own task and the
    /// pipeline reports success immediately.
    pub run_async: bool,
    /// When true, handler errors are rethrown to the caller after the
    /// executed-event has fired.
    pub throw_on_error: bool,
    /// Characters used to split component and modal custom ids into path
    /// segments. Empty means the whole custom id is a single segment.
    pub custom_id_delimiters: Vec<char>,
    /// Delete the original interaction acknowledgement when command lookup
    /// misses.
    pub delete_unknown_command_ack: bool,
    /// Opening delimiter of the named-wildcard syntax in handler names.
    pub wildcard_open: char,
    /// Closing delimiter of the named-wildcard syntax in handler names.
    pub wildcard_close: char,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            log_level: LevelFilter::Info,
            run_async: false,
            throw_on_error: false,
            custom_id_delimiters: Vec::new(),
            delete_unknown_command_ack: true,
            wildcard_open: '{',
            wildcard_close: '}',
        }
    }
}

impl InteractionConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.wildcard_open == self.wildcard_close {
            return Err(anyhow::anyhow!(
                "wildcard delimiters must differ: both are '{}'",
                self.wildcard_open
            ));
        }
        if self.custom_id_delimiters.contains(&self.wildcard_open)
            || self.custom_id_delimiters.contains(&self.wildcard_close)
        {
            return Err(anyhow::anyhow!(
                "custom id delimiters may not overlap the wildcard delimiters"
            ));
        }
        Ok(())
    }

    /// Split a custom id into path segments using the configured delimiters.
    ///
    /// With no delimiters configured the whole id is one segment.
    pub fn split_custom_id<'a>(&self, custom_id: &'a str) -> Vec<&'a str> {
        if self.custom_id_delimiters.is_empty() {
            return vec![custom_id];
        }
        custom_id
            .split(|c: char| self.custom_id_delimiters.contains(&c))
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = InteractionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wildcard_open, '{');
        assert_eq!(config.wildcard_close, '}');
        assert!(!config.run_async);
    }

    #[test]
    fn test_equal_wildcard_delimiters_rejected() {
        let config = InteractionConfig {
            wildcard_open: '%',
            wildcard_close: '%',
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_custom_id_without_delimiters() {
        let config = InteractionConfig::default();
        assert_eq!(config.split_custom_id("vote:42"), vec!["vote:42"]);
    }

    #[test]
    fn test_split_custom_id_with_delimiters() {
        let config = InteractionConfig {
            custom_id_delimiters: vec![':', ','],
            ..Default::default()
        };
        assert_eq!(config.split_custom_id("vote:42,up"), vec!["vote", "42", "up"]);
    }

    #[test]
    fn test_delimiter_overlapping_wildcard_rejected() {
        let config = InteractionConfig {
            custom_id_delimiters: vec!['{'],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

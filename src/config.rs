use std::env;

use crate::error::{Error, Result};
use crate::random::{DEFAULT_SEED, DEFAULT_STREAM};

/// Environment variable overriding the seed in [`Config::from_env`].
pub const SEED_VAR: &str = "MDMATRIX_SEED";

/// Environment variable overriding the stream id in [`Config::from_env`].
pub const STREAM_VAR: &str = "MDMATRIX_STREAM";

/// Environment variable overriding dimension validation in [`Config::from_env`].
pub const VALIDATE_VAR: &str = "MDMATRIX_VALIDATE";

/// Settings of a matrix factory.
///
/// The configuration is constructed once, e.g. at startup, and passed to
/// [`Factory::new`](crate::Factory::new). Installing a factory as the process default
/// also applies the random seed and the validation flag to the process-wide state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Seed of the random generator.
    pub seed: u64,
    /// Stream id of the random generator.
    pub stream: u64,
    /// Enables dimension validation.
    pub validate: bool,
}

impl Config {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default configuration, overridden by the `MDMATRIX_SEED`,
    /// `MDMATRIX_STREAM` and `MDMATRIX_VALIDATE` environment variables if set.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = env::var(SEED_VAR) {
            config.seed = parse_var(SEED_VAR, &value)?;
        }

        if let Ok(value) = env::var(STREAM_VAR) {
            config.stream = parse_var(STREAM_VAR, &value)?;
        }

        if let Ok(value) = env::var(VALIDATE_VAR) {
            config.validate = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => return Err(Error::Config(format!("{VALIDATE_VAR}={value} is not a boolean"))),
            };
        }

        log::debug!("configuration from environment: {config:?}");

        Ok(config)
    }

    /// Returns the configuration with another random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the configuration with another random stream id.
    pub fn with_stream(mut self, stream: u64) -> Self {
        self.stream = stream;
        self
    }

    /// Returns the configuration with dimension validation enabled or disabled.
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { seed: DEFAULT_SEED, stream: DEFAULT_STREAM, validate: true }
    }
}

fn parse_var(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{name}={value} is not an unsigned integer: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::new().with_seed(7).with_validate(false);

        assert_eq!(config.seed, 7);
        assert_eq!(config.stream, DEFAULT_STREAM);
        assert!(!config.validate);
    }

    #[test]
    fn unparsable_values_are_rejected() {
        assert_eq!(parse_var(SEED_VAR, " 12 "), Ok(12));
        assert!(matches!(parse_var(SEED_VAR, "-1"), Err(Error::Config(_))));
    }
}

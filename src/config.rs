//! Environment configuration.

use std::env;
use std::fmt;

/// Port both front ends listen on unless `PORT` overrides it.
pub const DEFAULT_PORT: u16 = 8081;

/// Port the metrics page is served on.
pub const DEFAULT_METRICS_PORT: u16 = 2112;

/// Runtime configuration for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Main port, shared by the UDP and TCP front ends.
    pub port: u16,
    /// Metrics exposition port.
    pub metrics_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, metrics_port: DEFAULT_METRICS_PORT }
    }
}

/// Rejected environment configuration. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `PORT` was set but did not parse as a port number.
    InvalidPort(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort(raw) => {
                write!(f, "cannot parse PORT environment variable {:?} as a port number", raw)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Read configuration from the environment.
    ///
    /// `PORT` overrides the main port and must parse as a decimal port
    /// number; anything else is a fatal startup error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        match env::var("PORT") {
            Ok(raw) => {
                config.port =
                    raw.trim().parse().map_err(|_| ConfigError::InvalidPort(raw))?;
            }
            Err(env::VarError::NotPresent) => {}
            Err(env::VarError::NotUnicode(raw)) => {
                return Err(ConfigError::InvalidPort(raw.to_string_lossy().into_owned()));
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment mutation is process-global, so everything runs in one
    // test to avoid interleaving with parallel test threads.
    #[test]
    fn port_override_parsing() {
        env::remove_var("PORT");
        assert_eq!(Config::from_env().unwrap(), Config::default());

        env::set_var("PORT", "9100");
        assert_eq!(
            Config::from_env().unwrap(),
            Config { port: 9100, ..Config::default() }
        );

        env::set_var("PORT", "not-a-port");
        assert_eq!(
            Config::from_env(),
            Err(ConfigError::InvalidPort("not-a-port".to_string()))
        );

        env::set_var("PORT", "70000");
        assert!(Config::from_env().is_err());

        env::remove_var("PORT");
    }
}

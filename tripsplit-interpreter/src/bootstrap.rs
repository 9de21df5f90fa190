use std::env;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tripsplit_domain::{ResidueAssignment, services::UnknownResidueAssignment};

pub const RESIDUE_VAR: &str = "TRIPSPLIT_RESIDUE";
pub const STRICT_VAR: &str = "TRIPSPLIT_STRICT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{RESIDUE_VAR}: {0}")]
    Residue(#[from] UnknownResidueAssignment),
    #[error("{STRICT_VAR} must be true or false (got '{0}')")]
    Strict(String),
}

/// Settings read from the environment, optionally seeded from `.env`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub residue: ResidueAssignment,
    /// Treat an imbalanced ledger as an error instead of a warning.
    pub strict: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let residue = match lookup(RESIDUE_VAR) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => ResidueAssignment::default(),
        };
        let strict = match lookup(STRICT_VAR) {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Strict(value))?,
            None => false,
        };

        Ok(Self { residue, strict })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Some(false),
        "1" | "true" | "yes" | "on" => Some(true),
        _ => None,
    }
}

/// Initialize logging to stderr, filtered by `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

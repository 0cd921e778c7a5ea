//! CLI error types.

use rw_config::ConfigError;
use rw_math::MathError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Math(#[from] MathError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Failed(String),
}

//! Common error types for Tuneline

use thiserror::Error;

/// Common result type for Tuneline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Tuneline crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error, including an unreadable
    /// config file
    #[error("Configuration error: {0}")]
    Config(String),
}

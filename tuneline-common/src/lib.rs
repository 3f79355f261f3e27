//! # Tuneline Common Library
//!
//! Shared code for the Tuneline services:
//! - Error type
//! - Configuration loading (TOML, environment overrides, defaults)
//! - Tag record model and its JSON wire encoding

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{TagFields, TagRecord};

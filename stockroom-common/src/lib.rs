//! # Stockroom Common Library
//!
//! Shared code for the stockroom client:
//! - Error type used by the storage and configuration layers
//! - Bootstrap configuration loading (TOML, environment, root folder)
//! - SQLite initialization and schema
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};

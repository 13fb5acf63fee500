//! # FSQ Common Library
//!
//! Shared code for the FSQ (food safety & quality) services including:
//! - Error type used across crates
//! - TOML bootstrap configuration and path resolution
//! - Logging initialisation
//! - SQLite database bootstrap and migrations
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};

//! # Quire Common Library
//!
//! Shared code for the Quire poem site including:
//! - The poem record and collection model
//! - Configuration loading
//! - Timestamp and id utilities
//! - Persisted preferences

pub mod config;
pub mod error;
pub mod model;
pub mod prefs;
pub mod time;

pub use error::{Error, Result};
pub use model::{Collection, Poem};

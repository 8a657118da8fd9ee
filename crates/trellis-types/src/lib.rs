//! Foundation types for Trellis.
//!
//! This crate holds what every other Trellis crate shares: the error
//! taxonomy and the engine configuration loaded from TOML.

pub mod config;
pub mod error;

pub use config::EngineConfig;
pub use error::{Result, TrellisError};

//! Error types for Trellis.

use std::io;

/// Errors produced at the boundaries of the style engine.
///
/// The cascade itself never fails; these come from parsing CSS text and
/// loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelectorSyntax { selector: String, reason: String },

    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl TrellisError {
    /// Shorthand for building a [`TrellisError::InvalidSelectorSyntax`].
    pub fn selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSelectorSyntax {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TrellisError>;

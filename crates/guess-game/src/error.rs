//! Error types for the guessing game service.
//!
//! Game-logic rejections (out-of-range guesses, guesses without an active
//! game) are not errors: they are reported as data in
//! [`GuessOutcome`](crate::GuessOutcome). This module covers the failures
//! around the game instead: configuration loading, the secret source, player
//! identities and malformed numbers.

use std::path::PathBuf;

/// A specialized `Result` type for guessing game operations.
pub type Result<T> = std::result::Result<T, GameError>;

/// Errors that can occur outside the game rules themselves.
///
/// Messages carry an actionable suggestion where one exists.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your guess.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Secret Source Errors
    // ========================================================================
    /// The random source could not produce a secret.
    #[error("Random source failed: {message}\n\nSuggestion: Retry the request; the source may be temporarily unavailable")]
    RandomSource {
        /// Description of the failure.
        message: String,
    },

    /// The random source produced a secret outside the allowed range.
    #[error("Random source produced {value}, outside the range [{min}, {max}]")]
    SecretOutOfRange {
        /// The value that was drawn.
        value: u8,
        /// Lower bound of the range.
        min: u8,
        /// Upper bound of the range.
        max: u8,
    },

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// A player identity failed validation.
    #[error("Invalid player id '{value}': {reason}")]
    InvalidPlayerId {
        /// The rejected identity.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A number could not be used as input.
    #[error("Invalid number: {message}")]
    InvalidNumber {
        /// Description of the problem.
        message: String,
    },
}

impl GameError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `RandomSource` error.
    #[must_use]
    pub fn random_source(message: impl Into<String>) -> Self {
        Self::RandomSource {
            message: message.into(),
        }
    }

    /// Creates a new `SecretOutOfRange` error.
    #[must_use]
    pub const fn secret_out_of_range(value: u8, min: u8, max: u8) -> Self {
        Self::SecretOutOfRange { value, min, max }
    }

    /// Creates a new `InvalidPlayerId` error.
    #[must_use]
    pub fn invalid_player_id(value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPlayerId {
            value: value.into(),
            reason,
        }
    }

    /// Creates a new `InvalidNumber` error.
    #[must_use]
    pub fn invalid_number(message: impl Into<String>) -> Self {
        Self::InvalidNumber {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is transient and the request may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RandomSource { .. })
    }

    /// Returns `true` if this error is fatal and the process should stop.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. } | Self::ConfigValidationError { .. }
        )
    }

    /// Returns `true` if the error was caused by client input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPlayerId { .. } | Self::InvalidNumber { .. }
        )
    }
}

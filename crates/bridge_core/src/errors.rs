//! Error Types
//!
//! This module defines the error types shared by every scenebridge crate.
//!
//! # Overview
//!
//! The main error type [`BridgeError`] covers:
//! - Configuration loading failures
//! - Parameter conversion failures (see [`ParamError`])
//! - Translator failures for a single host entity
//! - Unsupported mutations (category changes on an existing record)
//!
//! None of these are fatal to a synchronization pass. The sync driver logs
//! them against the offending object and moves on.
//!
//! ```rust,ignore
//! use bridge_core::errors::{BridgeError, Result};
//!
//! fn export() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::category::Category;

/// Failure while converting a host property value into a renderer parameter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    /// The value cannot be represented as the requested renderer type.
    #[error("cannot convert {found} to {expected}")]
    TypeMismatch {
        /// Renderer type the metadata asked for
        expected: &'static str,
        /// Kind of value the host supplied
        found: &'static str,
    },

    /// An array parameter did not have the configured fixed length.
    #[error("array length mismatch: expected {expected}, got {found}")]
    ArrayLength {
        /// Configured `array_size`
        expected: usize,
        /// Length of the supplied value
        found: usize,
    },

    /// A string-encoded array could not be parsed.
    #[error("cannot parse array literal '{0}'")]
    Parse(String),
}

/// The main error type for scenebridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration JSON could not be decoded.
    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Translation Errors
    // ========================================================================
    /// A property could not be converted for the renderer.
    #[error("Parameter '{name}': {source}")]
    Param {
        /// Renderer parameter name
        name: String,
        /// Underlying conversion failure
        #[source]
        source: ParamError,
    },

    /// A translator failed for one host entity.
    #[error("Translator failed for '{name}': {reason}")]
    Translate {
        /// Stable database name of the entity
        name: String,
        /// What went wrong
        reason: String,
    },

    /// The host changed the primitive category of an already exported object.
    #[error("Changing primitive type is not supported ('{name}': {from} -> {to})")]
    UnsupportedTypeChange {
        /// Stable database name of the entity
        name: String,
        /// Category recorded at export time
        from: Category,
        /// Category the host now reports
        to: Category,
    },

    /// A host entity referenced by a notification no longer exists.
    #[error("Host entity not found: {0}")]
    MissingSource(String),

    /// No translator is registered for a category.
    #[error("No translator registered for {0}")]
    MissingTranslator(Category),
}

impl BridgeError {
    /// Shorthand for [`BridgeError::Translate`].
    pub fn translate(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Translate {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a [`ParamError`] with the renderer parameter it belongs to.
    pub fn param(name: impl Into<String>, source: ParamError) -> Self {
        Self::Param {
            name: name.into(),
            source,
        }
    }
}

/// Alias for `Result<T, BridgeError>`.
pub type Result<T> = std::result::Result<T, BridgeError>;

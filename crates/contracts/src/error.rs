//! Layered error definitions
//!
//! Categorized by source: config / page. Undecodable records and per-lap
//! integrity problems are not errors here; they are counted in the engine report.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Page Errors =====
    /// A required page delivered no usable data
    #[error("page '{page}' unavailable: {message}")]
    PageUnavailable { page: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create page unavailable error
    pub fn page_unavailable(page: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PageUnavailable {
            page: page.into(),
            message: message.into(),
        }
    }

    /// Whether this error means a page had no data at all
    pub fn is_page_unavailable(&self) -> bool {
        matches!(self, Self::PageUnavailable { .. })
    }
}

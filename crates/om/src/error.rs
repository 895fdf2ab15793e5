//! `ConfigError`: FDD/FED/module-validation failures (§7). Returned to the
//! caller with a diagnostic; never corrupts already-running server state.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OmError {
    #[error("{0}")]
    ErrorReadingFdd(String),

    #[error("could not open object-model file: {0}")]
    CouldNotOpen(String),

    #[error("xml error: {0}")]
    Xml(String),
}

impl OmError {
    pub fn reading_fdd(msg: impl Into<String>) -> Self {
        Self::ErrorReadingFdd(msg.into())
    }
}

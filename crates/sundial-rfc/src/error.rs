use thiserror::Error;

use crate::rfc::ical::expand::{ConversionError, ExpansionError};
use crate::rfc::ical::parse::ParseError;

/// Errors raised while building calendar values or expanding recurrences.
#[derive(Error, Debug)]
pub enum RfcError {
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Time zone error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Expansion error: {0}")]
    Expansion(#[from] ExpansionError),

    #[error(transparent)]
    CoreError(#[from] sundial_core::error::CoreError),
}

impl RfcError {
    /// Builds a `ValidationError` from any displayable message.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;

//! Mapping error types

use thiserror::Error;

/// A single field could not be mapped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Gear code outside the closed gear table
    #[error("unknown gear code '{code}'")]
    UnknownGearCode { code: String },
}

impl MapError {
    pub fn unknown_gear(code: impl Into<String>) -> Self {
        Self::UnknownGearCode { code: code.into() }
    }

    /// Topic the failed field would have been published on
    pub fn topic(&self) -> &'static str {
        match self {
            Self::UnknownGearCode { .. } => contracts::topics::GEAR,
        }
    }
}

//! Error types for network assembly, lookups and graph algorithms.
//!
//! Every fallible operation in this crate returns [`FeederResult`]. The
//! variants follow the failure classes a caller needs to tell apart:
//! bad input (validation, unresolved references, missing sections), bad
//! topology for an algorithm (structural) and failed lookups.
//!
//! # Example
//!
//! ```ignore
//! use feeder_core::{FeederError, FeederResult, Network};
//!
//! fn first_hop(net: &Network) -> FeederResult<f64> {
//!     let r = feeder_core::rij("b1", "b2", net)?;
//!     r.scalar().ok_or_else(|| FeederError::NotFound("scalar resistance".into()))
//! }
//! ```

use thiserror::Error;

/// Unified error type for feeder model operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeederError {
    /// A required field is missing or mutually exclusive fields are
    /// over/under-specified.
    #[error("Validation error in {entity}: {message}")]
    Validation { entity: String, message: String },

    /// A template, bus or time-series reference could not be resolved.
    #[error("Unresolved reference in {entity}: '{reference}'")]
    UnresolvedReference { entity: String, reference: String },

    /// A graph algorithm met a topology it does not support (e.g. a bus with
    /// more than one upstream neighbor during an upward walk).
    #[error("Structural error at bus '{bus}': {message}")]
    Structural { bus: String, message: String },

    /// Lookup by bus name or bus pair failed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required input section (e.g. `Network` or `Conductor`) is absent.
    #[error("Missing required input: {0}")]
    MissingInput(String),
}

/// Convenience type alias for Results using FeederError.
pub type FeederResult<T> = Result<T, FeederError>;

impl FeederError {
    pub(crate) fn validation(entity: impl Into<String>, message: impl Into<String>) -> Self {
        FeederError::Validation {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unresolved(entity: impl Into<String>, reference: impl Into<String>) -> Self {
        FeederError::UnresolvedReference {
            entity: entity.into(),
            reference: reference.into(),
        }
    }

    pub(crate) fn structural(bus: impl Into<String>, message: impl Into<String>) -> Self {
        FeederError::Structural {
            bus: bus.into(),
            message: message.into(),
        }
    }
}

//! Domain error types.

use thiserror::Error;

/// Errors produced by domain validation.
///
/// Every variant is a client error: the request can be corrected and
/// resubmitted. Seat conflicts are not represented here because uniqueness
/// is a storage-level property, enforced by the store's unique index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A ticket's cargo or seat index falls outside the train's layout.
    #[error("{field} number must be in available range: [1, {max}], got {value}")]
    SeatOutOfRange {
        field: &'static str,
        max: i32,
        value: i32,
    },

    /// An order was submitted with no tickets.
    #[error("an order must contain at least one ticket")]
    EmptyOrder,

    /// A train layout or route field violates its lower bound.
    #[error("{field} must be at least {min}, got {value}")]
    ValueBelowMinimum {
        field: &'static str,
        min: i32,
        value: i32,
    },
}

impl DomainError {
    /// Name of the offending field, for structured error responses.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DomainError::SeatOutOfRange { field, .. }
            | DomainError::ValueBelowMinimum { field, .. } => Some(field),
            DomainError::EmptyOrder => Some("tickets"),
        }
    }
}

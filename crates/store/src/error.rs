//! Store error types.

use common::TripId;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when interacting with the railway store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A ticket for the same (trip, cargo, seat) triple already exists.
    ///
    /// Raised by the storage layer's unique index, so two concurrent
    /// requests for the same seat resolve to exactly one winner.
    #[error("seat {seat} in cargo {cargo} is already taken for trip {trip}")]
    SeatTaken {
        trip: TripId,
        cargo: i32,
        seat: i32,
    },

    /// A unique-name constraint was violated.
    #[error("{entity} named {name:?} already exists")]
    DuplicateName { entity: &'static str, name: String },

    /// Login failed: unknown username or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A domain validation failure (seat range, empty order, layout bounds).
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

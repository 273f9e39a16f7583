//! Domain layer for the railway booking system.
//!
//! This crate provides the persisted entity types together with the two
//! pieces of logic that actually matter for seat inventory:
//! - the capacity calculator ([`Train::capacity`]);
//! - the ticket validator ([`validate_seat`], [`validate_ticket_requests`]).
//!
//! It performs no I/O; the store crate drives these rules inside its
//! transactions.

pub mod catalog;
pub mod error;
pub mod order;
pub mod trip;

pub use catalog::{
    Crew, NewCrew, NewRoute, NewStation, NewTrain, NewTrainType, Route, Station, Train, TrainType,
    validate_route, validate_train_layout,
};
pub use error::DomainError;
pub use order::{Order, Ticket, TicketRequest, validate_seat, validate_ticket_requests};
pub use trip::{NewTrip, Trip};

//! Shared identifier types for the railway booking system.
//!
//! Every persisted entity is keyed by a database-assigned 64-bit id. The
//! newtypes here exist so a `TripId` can never be passed where an `OrderId`
//! is expected.

mod types;

pub use types::{
    CrewId, OrderId, RouteId, StationId, TicketId, TrainId, TrainTypeId, TripId, UserId,
};

//! Persistence layer for the railway booking system.
//!
//! Exposes the [`RailwayStore`] trait with two implementations:
//! - [`PostgresStore`], backed by sqlx/PostgreSQL. Seat uniqueness is a
//!   composite unique index and order creation is a single transaction.
//! - [`InMemoryStore`], used by tests and local development, implementing
//!   the same all-or-nothing semantics under one write lock.

pub mod error;
pub mod identity;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod views;

pub use error::{Result, StoreError};
pub use identity::{NewUser, User};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, NameFilter, Page, PageRequest, RailwayStore, TripFilter,
};
pub use views::{
    OrderView, RouteDetail, RouteSummary, SeatRef, StationView, TicketView, TrainView,
    TripDetail, TripSummary,
};

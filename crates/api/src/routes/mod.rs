//! Route handlers, one module per resource.

pub mod crews;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod route;
pub mod stations;
pub mod train_types;
pub mod trains;
pub mod trips;
pub mod users;

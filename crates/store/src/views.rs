//! Read views assembled by the store.
//!
//! Each view is a pure function of current state; in particular
//! `tickets_available` is always derived from a live ticket count, never
//! stored, so it reflects sales the moment an order commits.

use chrono::{DateTime, Utc};
use common::{OrderId, RouteId, TicketId, TrainId, TripId};
use domain::Station;
use serde::{Deserialize, Serialize};

/// Train with its derived capacity and resolved type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainView {
    pub id: TrainId,
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    pub capacity: i64,
    pub train_type: String,
}

/// Station with its display-only `square` scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationView {
    pub id: common::StationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub square: f64,
}

impl From<Station> for StationView {
    fn from(station: Station) -> Self {
        let square = station.square();
        Self {
            id: station.id,
            name: station.name,
            latitude: station.latitude,
            longitude: station.longitude,
            square,
        }
    }
}

/// Route listing row with station names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub id: RouteId,
    pub source: String,
    pub destination: String,
    pub distance: i32,
}

/// Route with full station detail on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDetail {
    pub id: RouteId,
    pub source: StationView,
    pub destination: StationView,
    pub distance: i32,
}

/// Trip listing row with live availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSummary {
    pub id: TripId,
    pub departure_station: String,
    pub arrival_station: String,
    pub train_name: String,
    pub train_capacity: i64,
    pub tickets_available: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

/// An occupied (cargo, seat) pair on a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatRef {
    pub cargo: i32,
    pub seat: i32,
}

/// Trip detail for seat-map rendering: full route, train and crew data
/// plus the taken seats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDetail {
    pub id: TripId,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub tickets_available: i64,
    /// Sorted by (cargo, seat).
    pub taken_places: Vec<SeatRef>,
    pub route: RouteDetail,
    pub train: TrainView,
    pub crews: Vec<String>,
}

/// A sold ticket with the summary of the trip it is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketView {
    pub id: TicketId,
    pub cargo: i32,
    pub seat: i32,
    pub trip: TripSummary,
}

/// An order with its nested tickets, as returned to the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    /// Ordered by (cargo, seat) within the order.
    pub tickets: Vec<TicketView>,
}

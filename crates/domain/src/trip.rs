//! Scheduled trips.

use chrono::{DateTime, Utc};
use common::{CrewId, RouteId, TrainId, TripId};
use serde::{Deserialize, Serialize};

/// A scheduled run of a train along a route.
///
/// The seat universe of a trip is its train's capacity: every
/// `(cargo, seat)` pair with `cargo in 1..=cargo_num` and
/// `seat in 1..=places_in_cargo`. Arrival is not required to be after
/// departure; the schedule is taken as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub route_id: RouteId,
    pub train_id: TrainId,
    /// Crews assigned to the trip, possibly empty.
    pub crew_ids: Vec<CrewId>,
}

/// Payload for creating or replacing a trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrip {
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub route_id: RouteId,
    pub train_id: TrainId,
    #[serde(default)]
    pub crew_ids: Vec<CrewId>,
}

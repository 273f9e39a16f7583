//! Reference entities: train types, trains, crews, stations and routes.

use common::{CrewId, RouteId, StationId, TrainId, TrainTypeId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A category of train (express, freight, ...). Pure reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainType {
    pub id: TrainTypeId,
    pub name: String,
}

/// Payload for creating or replacing a train type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrainType {
    pub name: String,
}

/// A physical train with its seat layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
    pub id: TrainId,
    pub name: String,
    /// Number of cargo sections (cars), 1-based when addressed by tickets.
    pub cargo_num: i32,
    /// Seats per cargo section, 1-based when addressed by tickets.
    pub places_in_cargo: i32,
    pub train_type_id: TrainTypeId,
}

impl Train {
    /// Total seat count of the train.
    pub fn capacity(&self) -> i64 {
        i64::from(self.cargo_num) * i64::from(self.places_in_cargo)
    }
}

/// Payload for creating or replacing a train.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrain {
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    pub train_type_id: TrainTypeId,
}

/// Checks the train layout lower bounds (both dimensions at least 1).
pub fn validate_train_layout(cargo_num: i32, places_in_cargo: i32) -> Result<(), DomainError> {
    for (value, field) in [(cargo_num, "cargo_num"), (places_in_cargo, "places_in_cargo")] {
        if value < 1 {
            return Err(DomainError::ValueBelowMinimum {
                field,
                min: 1,
                value,
            });
        }
    }
    Ok(())
}

/// A named crew assignable to trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crew {
    pub id: CrewId,
    pub name: String,
}

/// Payload for creating or replacing a crew.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCrew {
    pub name: String,
}

/// A station with its geographic position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Station {
    /// Display-only scalar, the product of the coordinates rounded to two
    /// decimal places. Not physically meaningful.
    pub fn square(&self) -> f64 {
        (self.latitude * self.longitude * 100.0).round() / 100.0
    }
}

/// Payload for creating or replacing a station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A directed connection between two stations.
///
/// Source and destination may coincide; no invariant ties them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub source_id: StationId,
    pub destination_id: StationId,
    /// Length in kilometers, non-negative.
    pub distance: i32,
}

/// Payload for creating or replacing a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoute {
    pub source_id: StationId,
    pub destination_id: StationId,
    pub distance: i32,
}

/// Checks that a route's distance is non-negative.
pub fn validate_route(distance: i32) -> Result<(), DomainError> {
    if distance < 0 {
        return Err(DomainError::ValueBelowMinimum {
            field: "distance",
            min: 0,
            value: distance,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(cargo_num: i32, places_in_cargo: i32) -> Train {
        Train {
            id: TrainId::new(1),
            name: "Intercity 1".to_string(),
            cargo_num,
            places_in_cargo,
            train_type_id: TrainTypeId::new(1),
        }
    }

    #[test]
    fn capacity_is_product_of_layout() {
        assert_eq!(train(5, 20).capacity(), 100);
        assert_eq!(train(1, 1).capacity(), 1);
    }

    #[test]
    fn capacity_does_not_overflow_i32() {
        assert_eq!(train(i32::MAX, 2).capacity(), i64::from(i32::MAX) * 2);
    }

    #[test]
    fn layout_lower_bounds_are_enforced() {
        assert!(validate_train_layout(1, 1).is_ok());
        assert_eq!(
            validate_train_layout(0, 10),
            Err(DomainError::ValueBelowMinimum {
                field: "cargo_num",
                min: 1,
                value: 0,
            })
        );
        assert_eq!(
            validate_train_layout(3, -1),
            Err(DomainError::ValueBelowMinimum {
                field: "places_in_cargo",
                min: 1,
                value: -1,
            })
        );
    }

    #[test]
    fn square_rounds_to_two_decimals() {
        let station = Station {
            id: StationId::new(1),
            name: "Central".to_string(),
            latitude: 50.4501,
            longitude: 30.5234,
        };
        assert_eq!(station.square(), 1539.91);
    }

    #[test]
    fn negative_distance_is_rejected() {
        assert!(validate_route(0).is_ok());
        assert!(validate_route(250).is_ok());
        assert_eq!(
            validate_route(-5),
            Err(DomainError::ValueBelowMinimum {
                field: "distance",
                min: 0,
                value: -5,
            })
        );
    }
}

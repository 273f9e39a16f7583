//! Orders, tickets and the ticket validator.

use chrono::{DateTime, Utc};
use common::{OrderId, TicketId, TripId, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::Train;
use crate::error::DomainError;

/// An owner-scoped bundle of tickets, created atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
}

/// A sold seat on a trip. Immutable once created; only ever written as part
/// of an order transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub cargo: i32,
    pub seat: i32,
    pub trip_id: TripId,
    pub order_id: OrderId,
}

/// A requested seat within an order-creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub cargo: i32,
    pub seat: i32,
    pub trip: TripId,
}

/// Checks that a seat reference fits the train's physical layout.
///
/// Both dimensions are 1-based inclusive ranges. The returned error names
/// the offending field and the valid range. Seat *uniqueness* is not checked
/// here; that is the store's unique index, so the check-then-insert race
/// cannot occur.
pub fn validate_seat(cargo: i32, seat: i32, train: &Train) -> Result<(), DomainError> {
    for (value, field, max) in [
        (cargo, "cargo", train.cargo_num),
        (seat, "seat", train.places_in_cargo),
    ] {
        if !(1..=max).contains(&value) {
            return Err(DomainError::SeatOutOfRange { field, max, value });
        }
    }
    Ok(())
}

/// Checks the order-level shape of a ticket request list.
///
/// An order must contain at least one ticket; this runs before any storage
/// work so an empty order never opens a transaction.
pub fn validate_ticket_requests(requests: &[TicketRequest]) -> Result<(), DomainError> {
    if requests.is_empty() {
        return Err(DomainError::EmptyOrder);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use common::{TrainId, TrainTypeId};

    use super::*;

    fn train() -> Train {
        Train {
            id: TrainId::new(1),
            name: "Night Express".to_string(),
            cargo_num: 5,
            places_in_cargo: 20,
            train_type_id: TrainTypeId::new(1),
        }
    }

    #[test]
    fn seat_within_layout_is_accepted() {
        let train = train();
        assert!(validate_seat(1, 1, &train).is_ok());
        assert!(validate_seat(5, 20, &train).is_ok());
        assert!(validate_seat(3, 7, &train).is_ok());
    }

    #[test]
    fn cargo_out_of_range_names_the_field() {
        let err = validate_seat(6, 1, &train()).unwrap_err();
        assert_eq!(
            err,
            DomainError::SeatOutOfRange {
                field: "cargo",
                max: 5,
                value: 6,
            }
        );
        assert_eq!(err.field(), Some("cargo"));
    }

    #[test]
    fn seat_out_of_range_names_the_field() {
        let err = validate_seat(2, 21, &train()).unwrap_err();
        assert_eq!(
            err,
            DomainError::SeatOutOfRange {
                field: "seat",
                max: 20,
                value: 21,
            }
        );
    }

    #[test]
    fn zero_and_negative_indices_are_rejected() {
        assert!(validate_seat(0, 1, &train()).is_err());
        assert!(validate_seat(1, 0, &train()).is_err());
        assert!(validate_seat(-1, 5, &train()).is_err());
    }

    #[test]
    fn cargo_is_checked_before_seat() {
        // Both dimensions invalid: the cargo error wins, mirroring the
        // field order clients see in responses.
        let err = validate_seat(99, 99, &train()).unwrap_err();
        assert_eq!(err.field(), Some("cargo"));
    }

    #[test]
    fn empty_ticket_list_is_rejected() {
        assert_eq!(
            validate_ticket_requests(&[]),
            Err(DomainError::EmptyOrder)
        );
        let one = [TicketRequest {
            cargo: 1,
            seat: 1,
            trip: TripId::new(1),
        }];
        assert!(validate_ticket_requests(&one).is_ok());
    }
}

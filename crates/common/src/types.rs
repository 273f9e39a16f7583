use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database id.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw id for query binding.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a train type.
    TrainTypeId
);
entity_id!(
    /// Identifier of a train.
    TrainId
);
entity_id!(
    /// Identifier of a crew.
    CrewId
);
entity_id!(
    /// Identifier of a station.
    StationId
);
entity_id!(
    /// Identifier of a route between two stations.
    RouteId
);
entity_id!(
    /// Identifier of a scheduled trip.
    TripId
);
entity_id!(
    /// Identifier of an order.
    OrderId
);
entity_id!(
    /// Identifier of a ticket.
    TicketId
);
entity_id!(
    /// Identifier of a user account, owned by the identity layer.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrips_through_i64() {
        let id = TripId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(TripId::from(i64::from(id)), id);
    }

    #[test]
    fn id_serializes_as_bare_integer() {
        let id = OrderId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn id_display_matches_raw_value() {
        assert_eq!(TrainId::new(15).to_string(), "15");
    }
}

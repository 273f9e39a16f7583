//! Seat-inventory semantics against the in-memory store: capacity and
//! availability projections, range validation, seat uniqueness and
//! all-or-nothing order creation.

use chrono::{TimeZone, Utc};
use common::{TripId, UserId};
use domain::{
    DomainError, NewCrew, NewRoute, NewStation, NewTrain, NewTrainType, NewTrip, TicketRequest,
};
use store::{
    InMemoryStore, NameFilter, NewUser, PageRequest, RailwayStore, StoreError, TripFilter,
};

struct Fixture {
    store: InMemoryStore,
    user: UserId,
    trip: TripId,
}

/// Seeds a user plus one trip on a 5x20 train (capacity 100).
async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let user = store
        .register_user(NewUser {
            username: "alice".to_string(),
            password: "s3cret".to_string(),
        })
        .await
        .unwrap();

    let train_type = store
        .create_train_type(NewTrainType {
            name: "Express".to_string(),
        })
        .await
        .unwrap();
    let train = store
        .create_train(NewTrain {
            name: "Night Express".to_string(),
            cargo_num: 5,
            places_in_cargo: 20,
            train_type_id: train_type.id,
        })
        .await
        .unwrap();

    let kyiv = store
        .create_station(NewStation {
            name: "Kyiv".to_string(),
            latitude: 50.4501,
            longitude: 30.5234,
        })
        .await
        .unwrap();
    let lviv = store
        .create_station(NewStation {
            name: "Lviv".to_string(),
            latitude: 49.8397,
            longitude: 24.0297,
        })
        .await
        .unwrap();
    let route = store
        .create_route(NewRoute {
            source_id: kyiv.id,
            destination_id: lviv.id,
            distance: 540,
        })
        .await
        .unwrap();

    let trip = store
        .create_trip(NewTrip {
            departure_time: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
            arrival_time: Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap(),
            route_id: route.id,
            train_id: train.id,
            crew_ids: vec![],
        })
        .await
        .unwrap();

    Fixture {
        store,
        user: user.id,
        trip: trip.id,
    }
}

fn seat(trip: TripId, cargo: i32, seat: i32) -> TicketRequest {
    TicketRequest { cargo, seat, trip }
}

#[tokio::test]
async fn capacity_and_availability_reflect_sales() {
    let fx = fixture().await;

    let trips = fx.store.list_trips(TripFilter::default()).await.unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].train_capacity, 100);
    assert_eq!(trips[0].tickets_available, 100);

    fx.store
        .create_order(
            fx.user,
            vec![
                seat(fx.trip, 1, 1),
                seat(fx.trip, 1, 2),
                seat(fx.trip, 2, 5),
            ],
        )
        .await
        .unwrap();

    let trips = fx.store.list_trips(TripFilter::default()).await.unwrap();
    assert_eq!(trips[0].tickets_available, 97);

    let detail = fx.store.get_trip(fx.trip).await.unwrap();
    assert_eq!(detail.tickets_available, 97);
    let taken: Vec<(i32, i32)> = detail
        .taken_places
        .iter()
        .map(|s| (s.cargo, s.seat))
        .collect();
    assert_eq!(taken, vec![(1, 1), (1, 2), (2, 5)]);
}

#[tokio::test]
async fn out_of_range_cargo_fails_and_persists_nothing() {
    let fx = fixture().await;

    let err = fx
        .store
        .create_order(fx.user, vec![seat(fx.trip, 6, 1)])
        .await
        .unwrap_err();
    match err {
        StoreError::Validation(DomainError::SeatOutOfRange { field, max, value }) => {
            assert_eq!(field, "cargo");
            assert_eq!(max, 5);
            assert_eq!(value, 6);
        }
        other => panic!("expected range error, got {other:?}"),
    }

    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(fx.store.ticket_count().await, 0);
}

#[tokio::test]
async fn empty_order_is_rejected_before_storage() {
    let fx = fixture().await;

    let err = fx.store.create_order(fx.user, vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(DomainError::EmptyOrder)
    ));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn one_bad_ticket_rolls_back_the_whole_order() {
    let fx = fixture().await;

    let err = fx
        .store
        .create_order(fx.user, vec![seat(fx.trip, 1, 1), seat(fx.trip, 99, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    // The first, valid ticket must not survive the failure.
    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(fx.store.ticket_count().await, 0);

    let trips = fx.store.list_trips(TripFilter::default()).await.unwrap();
    assert_eq!(trips[0].tickets_available, 100);
}

#[tokio::test]
async fn taken_seat_conflicts_and_rolls_back() {
    let fx = fixture().await;

    fx.store
        .create_order(fx.user, vec![seat(fx.trip, 1, 1)])
        .await
        .unwrap();

    let err = fx
        .store
        .create_order(fx.user, vec![seat(fx.trip, 2, 2), seat(fx.trip, 1, 1)])
        .await
        .unwrap_err();
    match err {
        StoreError::SeatTaken { trip, cargo, seat } => {
            assert_eq!(trip, fx.trip);
            assert_eq!((cargo, seat), (1, 1));
        }
        other => panic!("expected seat conflict, got {other:?}"),
    }

    // Only the first order's ticket exists.
    assert_eq!(fx.store.order_count().await, 1);
    assert_eq!(fx.store.ticket_count().await, 1);
}

#[tokio::test]
async fn duplicate_seat_within_one_order_conflicts() {
    let fx = fixture().await;

    let err = fx
        .store
        .create_order(fx.user, vec![seat(fx.trip, 3, 3), seat(fx.trip, 3, 3)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SeatTaken { .. }));
    assert_eq!(fx.store.ticket_count().await, 0);
}

#[tokio::test]
async fn concurrent_requests_for_same_seat_yield_one_winner() {
    let fx = fixture().await;

    let a = {
        let store = fx.store.clone();
        let (user, trip) = (fx.user, fx.trip);
        tokio::spawn(async move { store.create_order(user, vec![seat(trip, 1, 1)]).await })
    };
    let b = {
        let store = fx.store.clone();
        let (user, trip) = (fx.user, fx.trip);
        tokio::spawn(async move { store.create_order(user, vec![seat(trip, 1, 1)]).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let conflict = [a, b].into_iter().find_map(|r| r.err()).unwrap();
    assert!(matches!(conflict, StoreError::SeatTaken { .. }));
    assert_eq!(fx.store.ticket_count().await, 1);
}

#[tokio::test]
async fn orders_are_owner_scoped_newest_first_and_paginated() {
    let fx = fixture().await;
    let bob = fx
        .store
        .register_user(NewUser {
            username: "bob".to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .unwrap();

    let first = fx
        .store
        .create_order(fx.user, vec![seat(fx.trip, 1, 1)])
        .await
        .unwrap();
    let second = fx
        .store
        .create_order(fx.user, vec![seat(fx.trip, 1, 2)])
        .await
        .unwrap();
    fx.store
        .create_order(bob.id, vec![seat(fx.trip, 2, 1)])
        .await
        .unwrap();

    let page = fx
        .store
        .list_orders(fx.user, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let ids: Vec<_> = page.items.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let bob_page = fx
        .store
        .list_orders(bob.id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(bob_page.total, 1);
    assert_ne!(bob_page.items[0].id, first.id);

    let narrow = fx
        .store
        .list_orders(fx.user, PageRequest::new(2, 1))
        .await
        .unwrap();
    assert_eq!(narrow.total, 2);
    assert_eq!(narrow.items.len(), 1);
    assert_eq!(narrow.items[0].id, first.id);
}

#[tokio::test]
async fn order_view_nests_tickets_with_trip_summary() {
    let fx = fixture().await;

    let order = fx
        .store
        .create_order(fx.user, vec![seat(fx.trip, 2, 7), seat(fx.trip, 1, 3)])
        .await
        .unwrap();

    // Tickets come back ordered by (cargo, seat).
    let seats: Vec<_> = order.tickets.iter().map(|t| (t.cargo, t.seat)).collect();
    assert_eq!(seats, vec![(1, 3), (2, 7)]);
    assert_eq!(order.tickets[0].trip.departure_station, "Kyiv");
    assert_eq!(order.tickets[0].trip.arrival_station, "Lviv");
    assert_eq!(order.tickets[0].trip.tickets_available, 98);
}

#[tokio::test]
async fn name_filters_are_case_insensitive_substrings() {
    let fx = fixture().await;

    let trains = fx
        .store
        .list_trains(NameFilter {
            name: Some("EXPR".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(trains.len(), 1);
    assert_eq!(trains[0].capacity, 100);
    assert_eq!(trains[0].train_type, "Express");

    let none = fx
        .store
        .list_trains(NameFilter {
            name: Some("local".to_string()),
        })
        .await
        .unwrap();
    assert!(none.is_empty());

    let stations = fx
        .store
        .list_stations(NameFilter {
            name: Some("yi".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(stations.len(), 1);
    assert_eq!(stations[0].name, "Kyiv");
}

#[tokio::test]
async fn trip_filters_match_route_and_train_exactly() {
    let fx = fixture().await;

    let all = fx.store.list_trips(TripFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    let trip = &all[0];

    let by_unknown_route = fx
        .store
        .list_trips(TripFilter {
            route: Some(common::RouteId::new(999_999)),
            train: None,
        })
        .await
        .unwrap();
    assert!(by_unknown_route.is_empty());

    let detail = fx.store.get_trip(trip.id).await.unwrap();
    let by_train = fx
        .store
        .list_trips(TripFilter {
            route: None,
            train: Some(detail.train.id),
        })
        .await
        .unwrap();
    assert_eq!(by_train.len(), 1);
}

#[tokio::test]
async fn duplicate_names_conflict() {
    let fx = fixture().await;

    let err = fx
        .store
        .create_train_type(NewTrainType {
            name: "Express".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { .. }));

    fx.store
        .create_crew(NewCrew {
            name: "Crew A".to_string(),
        })
        .await
        .unwrap();
    let err = fx
        .store
        .create_crew(NewCrew {
            name: "Crew A".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { .. }));
}

#[tokio::test]
async fn deleting_a_trip_cascades_to_its_tickets() {
    let fx = fixture().await;

    fx.store
        .create_order(fx.user, vec![seat(fx.trip, 1, 1)])
        .await
        .unwrap();
    assert_eq!(fx.store.ticket_count().await, 1);

    fx.store.delete_trip(fx.trip).await.unwrap();
    assert_eq!(fx.store.ticket_count().await, 0);

    let err = fx.store.get_trip(fx.trip).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn unknown_trip_in_order_is_not_found() {
    let fx = fixture().await;

    let err = fx
        .store
        .create_order(fx.user, vec![seat(TripId::new(424_242), 1, 1)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound { entity: "trip", .. }
    ));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn login_issues_token_and_rejects_bad_credentials() {
    let fx = fixture().await;

    let token = fx.store.login("alice", "s3cret").await.unwrap();
    let user = fx.store.user_for_token(&token).await.unwrap().unwrap();
    assert_eq!(user.id, fx.user);

    let err = fx.store.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidCredentials));
    assert!(fx.store.user_for_token("bogus").await.unwrap().is_none());
}

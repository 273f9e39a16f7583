//! PostgreSQL integration tests.
//!
//! These tests use a shared PostgreSQL container for efficiency and are
//! serialized because they truncate shared tables. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{TripId, UserId};
use domain::{
    DomainError, NewRoute, NewStation, NewTrain, NewTrainType, NewTrip, TicketRequest,
};
use serial_test::serial;
use sqlx::{PgPool, Row};
use store::{
    NewUser, PageRequest, PostgresStore, RailwayStore, StoreError, TripFilter,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for schema setup
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Apply the schema using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_railway_schema.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query(
        "TRUNCATE TABLE tickets, orders, trip_crews, trips, routes, stations, \
         crews, trains, train_types, auth_tokens, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

/// Seeds a user plus one trip on a 5x20 train and returns their ids.
async fn seed_trip(store: &PostgresStore) -> (UserId, TripId) {
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

    (user.id, trip.id)
}

fn seat(trip: TripId, cargo: i32, seat: i32) -> TicketRequest {
    TicketRequest { cargo, seat, trip }
}

async fn count_rows(store: &PostgresStore, table: &str) -> i64 {
    let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .fetch_one(store.pool())
        .await
        .unwrap();
    row.try_get("n").unwrap()
}

#[tokio::test]
#[serial]
async fn availability_is_a_live_aggregate() {
    let store = get_test_store().await;
    let (user, trip) = seed_trip(&store).await;

    let trips = store.list_trips(TripFilter::default()).await.unwrap();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].train_capacity, 100);
    assert_eq!(trips[0].tickets_available, 100);

    store
        .create_order(
            user,
            vec![seat(trip, 1, 1), seat(trip, 1, 2), seat(trip, 2, 5)],
        )
        .await
        .unwrap();

    let trips = store.list_trips(TripFilter::default()).await.unwrap();
    assert_eq!(trips[0].tickets_available, 97);

    let detail = store.get_trip(trip).await.unwrap();
    assert_eq!(detail.tickets_available, 97);
    assert_eq!(detail.taken_places.len(), 3);
}

#[tokio::test]
#[serial]
async fn seat_conflict_rolls_back_the_whole_order() {
    let store = get_test_store().await;
    let (user, trip) = seed_trip(&store).await;

    store
        .create_order(user, vec![seat(trip, 1, 1)])
        .await
        .unwrap();

    let err = store
        .create_order(user, vec![seat(trip, 2, 2), seat(trip, 1, 1)])
        .await
        .unwrap_err();
    match err {
        StoreError::SeatTaken { cargo, seat, .. } => assert_eq!((cargo, seat), (1, 1)),
        other => panic!("expected seat conflict, got {other:?}"),
    }

    // Neither the (2, 2) ticket nor the second order row survived.
    assert_eq!(count_rows(&store, "tickets").await, 1);
    assert_eq!(count_rows(&store, "orders").await, 1);
}

#[tokio::test]
#[serial]
async fn range_error_persists_nothing() {
    let store = get_test_store().await;
    let (user, trip) = seed_trip(&store).await;

    let err = store
        .create_order(user, vec![seat(trip, 1, 1), seat(trip, 6, 1)])
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

    assert_eq!(count_rows(&store, "orders").await, 0);
    assert_eq!(count_rows(&store, "tickets").await, 0);
}

#[tokio::test]
#[serial]
async fn empty_order_is_rejected() {
    let store = get_test_store().await;
    let (user, _trip) = seed_trip(&store).await;

    let err = store.create_order(user, vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(DomainError::EmptyOrder)
    ));
    assert_eq!(count_rows(&store, "orders").await, 0);
}

#[tokio::test]
#[serial]
async fn concurrent_requests_for_same_seat_yield_one_winner() {
    let store = get_test_store().await;
    let (user, trip) = seed_trip(&store).await;

    let a = {
        let store = store.clone();
        tokio::spawn(async move { store.create_order(user, vec![seat(trip, 1, 1)]).await })
    };
    let b = {
        let store = store.clone();
        tokio::spawn(async move { store.create_order(user, vec![seat(trip, 1, 1)]).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let conflict = [a, b].into_iter().find_map(|r| r.err()).unwrap();
    assert!(matches!(conflict, StoreError::SeatTaken { .. }));

    assert_eq!(count_rows(&store, "tickets").await, 1);
    assert_eq!(count_rows(&store, "orders").await, 1);
}

#[tokio::test]
#[serial]
async fn orders_are_owner_scoped_and_newest_first() {
    let store = get_test_store().await;
    let (alice, trip) = seed_trip(&store).await;
    let bob = store
        .register_user(NewUser {
            username: "bob".to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .unwrap();

    let first = store
        .create_order(alice, vec![seat(trip, 1, 1)])
        .await
        .unwrap();
    let second = store
        .create_order(alice, vec![seat(trip, 1, 2)])
        .await
        .unwrap();
    store
        .create_order(bob.id, vec![seat(trip, 2, 1)])
        .await
        .unwrap();

    let page = store.list_orders(alice, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 2);
    let ids: Vec<_> = page.items.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    // Bob cannot read Alice's order.
    let err = store.get_order(bob.id, first.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let narrow = store.list_orders(alice, PageRequest::new(2, 1)).await.unwrap();
    assert_eq!(narrow.items.len(), 1);
    assert_eq!(narrow.items[0].id, first.id);
}

#[tokio::test]
#[serial]
async fn order_view_nests_tickets_with_trip_summary() {
    let store = get_test_store().await;
    let (user, trip) = seed_trip(&store).await;

    let order = store
        .create_order(user, vec![seat(trip, 2, 7), seat(trip, 1, 3)])
        .await
        .unwrap();

    let seats: Vec<_> = order.tickets.iter().map(|t| (t.cargo, t.seat)).collect();
    assert_eq!(seats, vec![(1, 3), (2, 7)]);
    assert_eq!(order.tickets[0].trip.departure_station, "Kyiv");
    assert_eq!(order.tickets[0].trip.arrival_station, "Lviv");
    assert_eq!(order.tickets[0].trip.tickets_available, 98);
}

#[tokio::test]
#[serial]
async fn duplicate_names_map_to_conflicts() {
    let store = get_test_store().await;
    seed_trip(&store).await;

    let err = store
        .create_train_type(NewTrainType {
            name: "Express".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateName {
            entity: "train type",
            ..
        }
    ));

    let err = store
        .register_user(NewUser {
            username: "alice".to_string(),
            password: "other".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { entity: "user", .. }));
}

#[tokio::test]
#[serial]
async fn deleting_a_trip_cascades_to_its_tickets() {
    let store = get_test_store().await;
    let (user, trip) = seed_trip(&store).await;

    store
        .create_order(user, vec![seat(trip, 1, 1)])
        .await
        .unwrap();
    assert_eq!(count_rows(&store, "tickets").await, 1);

    store.delete_trip(trip).await.unwrap();
    assert_eq!(count_rows(&store, "tickets").await, 0);

    let err = store.get_trip(trip).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
#[serial]
async fn login_and_token_resolution() {
    let store = get_test_store().await;
    let (user, _trip) = seed_trip(&store).await;

    let token = store.login("alice", "s3cret").await.unwrap();
    let resolved = store.user_for_token(&token).await.unwrap().unwrap();
    assert_eq!(resolved.id, user);
    assert_eq!(resolved.username, "alice");

    let err = store.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidCredentials));
    assert!(store.user_for_token("bogus").await.unwrap().is_none());
}

//! PostgreSQL-backed railway store.
//!
//! Seat uniqueness is the `tickets_trip_cargo_seat_key` composite index;
//! order creation runs in one transaction so a failed ticket rolls back the
//! order row with it. Availability is always a live aggregate, never a
//! stored column.

use std::collections::HashMap;

use async_trait::async_trait;
use common::{CrewId, OrderId, RouteId, StationId, TrainId, TrainTypeId, TripId, UserId};
use domain::{
    Crew, NewCrew, NewRoute, NewStation, NewTrain, NewTrainType, NewTrip, Route, Station,
    TicketRequest, Train, TrainType, Trip, validate_route, validate_seat, validate_ticket_requests,
    validate_train_layout,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::{Result, StoreError};
use crate::identity::{self, NewUser, User};
use crate::store::{NameFilter, Page, PageRequest, RailwayStore, TripFilter};
use crate::views::{
    OrderView, RouteDetail, RouteSummary, SeatRef, TicketView, TrainView, TripDetail, TripSummary,
};

/// PostgreSQL railway store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_station(row: &PgRow) -> Result<Station> {
        Ok(Station {
            id: StationId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        })
    }

    fn row_to_train_view(row: &PgRow) -> Result<TrainView> {
        let cargo_num: i32 = row.try_get("cargo_num")?;
        let places_in_cargo: i32 = row.try_get("places_in_cargo")?;
        Ok(TrainView {
            id: TrainId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            cargo_num,
            places_in_cargo,
            capacity: i64::from(cargo_num) * i64::from(places_in_cargo),
            train_type: row.try_get("train_type")?,
        })
    }

    fn row_to_trip_summary(row: &PgRow) -> Result<TripSummary> {
        Ok(TripSummary {
            id: TripId::new(row.try_get("trip_id")?),
            departure_station: row.try_get("departure_station")?,
            arrival_station: row.try_get("arrival_station")?,
            train_name: row.try_get("train_name")?,
            train_capacity: row.try_get("train_capacity")?,
            tickets_available: row.try_get("tickets_available")?,
            departure_time: row.try_get("departure_time")?,
            arrival_time: row.try_get("arrival_time")?,
        })
    }

    /// Loads the train serving a trip, for ticket validation.
    async fn train_for_trip(
        tx: &mut sqlx::PgConnection,
        trip: TripId,
    ) -> Result<Train> {
        let row = sqlx::query(
            r#"
            SELECT tr.id, tr.name, tr.cargo_num, tr.places_in_cargo, tr.train_type_id
            FROM trips t
            JOIN trains tr ON tr.id = t.train_id
            WHERE t.id = $1
            "#,
        )
        .bind(trip.as_i64())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "trip",
            id: trip.as_i64(),
        })?;

        Ok(Train {
            id: TrainId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            cargo_num: row.try_get("cargo_num")?,
            places_in_cargo: row.try_get("places_in_cargo")?,
            train_type_id: TrainTypeId::new(row.try_get("train_type_id")?),
        })
    }

    /// Loads nested ticket views for a set of orders, keyed by order id.
    async fn ticket_views_for_orders(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<TicketView>>> {
        let rows = sqlx::query(
            r#"
            SELECT k.id, k.cargo, k.seat, k.order_id,
                   t.id AS trip_id, t.departure_time, t.arrival_time,
                   src.name AS departure_station, dst.name AS arrival_station,
                   tr.name AS train_name,
                   (tr.cargo_num::BIGINT * tr.places_in_cargo) AS train_capacity,
                   (tr.cargo_num::BIGINT * tr.places_in_cargo)
                       - (SELECT COUNT(*) FROM tickets k2 WHERE k2.trip_id = t.id)
                       AS tickets_available
            FROM tickets k
            JOIN trips t ON t.id = k.trip_id
            JOIN trains tr ON tr.id = t.train_id
            JOIN routes r ON r.id = t.route_id
            JOIN stations src ON src.id = r.source_id
            JOIN stations dst ON dst.id = r.destination_id
            WHERE k.order_id = ANY($1)
            ORDER BY k.order_id, k.cargo, k.seat
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<TicketView>> = HashMap::new();
        for row in rows {
            let order_id: i64 = row.try_get("order_id")?;
            let view = TicketView {
                id: common::TicketId::new(row.try_get("id")?),
                cargo: row.try_get("cargo")?,
                seat: row.try_get("seat")?,
                trip: Self::row_to_trip_summary(&row)?,
            };
            by_order.entry(order_id).or_default().push(view);
        }
        Ok(by_order)
    }
}

/// Extracts the violated constraint name from a database error, if any.
fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db_err) = err {
        db_err.constraint().map(str::to_string)
    } else {
        None
    }
}

/// Maps a unique-name violation to `DuplicateName`, anything else through.
fn map_name_conflict(err: sqlx::Error, entity: &'static str, name: &str) -> StoreError {
    match violated_constraint(&err) {
        Some(constraint) if constraint.ends_with("_name_key") || constraint == "users_username_key" => {
            StoreError::DuplicateName {
                entity,
                name: name.to_string(),
            }
        }
        _ => StoreError::Database(err),
    }
}

/// Maps a foreign-key violation on a known constraint to `NotFound`.
fn map_fk_violation(
    err: sqlx::Error,
    expectations: &[(&str, &'static str, i64)],
) -> StoreError {
    if let Some(constraint) = violated_constraint(&err) {
        for (fk_name, entity, id) in expectations {
            if constraint == *fk_name {
                return StoreError::NotFound { entity, id: *id };
            }
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl RailwayStore for PostgresStore {
    // -- Train types --

    async fn create_train_type(&self, new: NewTrainType) -> Result<TrainType> {
        let row = sqlx::query("INSERT INTO train_types (name) VALUES ($1) RETURNING id")
            .bind(&new.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_name_conflict(e, "train type", &new.name))?;
        Ok(TrainType {
            id: TrainTypeId::new(row.try_get("id")?),
            name: new.name,
        })
    }

    async fn list_train_types(&self) -> Result<Vec<TrainType>> {
        let rows = sqlx::query("SELECT id, name FROM train_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(TrainType {
                    id: TrainTypeId::new(row.try_get("id")?),
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn get_train_type(&self, id: TrainTypeId) -> Result<TrainType> {
        let row = sqlx::query("SELECT id, name FROM train_types WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "train type",
                id: id.as_i64(),
            })?;
        Ok(TrainType {
            id,
            name: row.try_get("name")?,
        })
    }

    async fn update_train_type(&self, id: TrainTypeId, new: NewTrainType) -> Result<TrainType> {
        let updated = sqlx::query("UPDATE train_types SET name = $1 WHERE id = $2 RETURNING id")
            .bind(&new.name)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_name_conflict(e, "train type", &new.name))?;
        if updated.is_none() {
            return Err(StoreError::NotFound {
                entity: "train type",
                id: id.as_i64(),
            });
        }
        Ok(TrainType { id, name: new.name })
    }

    async fn delete_train_type(&self, id: TrainTypeId) -> Result<()> {
        let result = sqlx::query("DELETE FROM train_types WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "train type",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    // -- Trains --

    async fn create_train(&self, new: NewTrain) -> Result<Train> {
        validate_train_layout(new.cargo_num, new.places_in_cargo)?;
        let row = sqlx::query(
            r#"
            INSERT INTO trains (name, cargo_num, places_in_cargo, train_type_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&new.name)
        .bind(new.cargo_num)
        .bind(new.places_in_cargo)
        .bind(new.train_type_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if violated_constraint(&e).as_deref() == Some("trains_train_type_id_fkey") {
                StoreError::NotFound {
                    entity: "train type",
                    id: new.train_type_id.as_i64(),
                }
            } else {
                map_name_conflict(e, "train", &new.name)
            }
        })?;
        Ok(Train {
            id: TrainId::new(row.try_get("id")?),
            name: new.name,
            cargo_num: new.cargo_num,
            places_in_cargo: new.places_in_cargo,
            train_type_id: new.train_type_id,
        })
    }

    async fn list_trains(&self, filter: NameFilter) -> Result<Vec<TrainView>> {
        let rows = sqlx::query(
            r#"
            SELECT tr.id, tr.name, tr.cargo_num, tr.places_in_cargo, tt.name AS train_type
            FROM trains tr
            JOIN train_types tt ON tt.id = tr.train_type_id
            WHERE $1::TEXT IS NULL OR tr.name ILIKE '%' || $1 || '%'
            ORDER BY tr.name
            "#,
        )
        .bind(filter.name)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_train_view).collect()
    }

    async fn get_train(&self, id: TrainId) -> Result<TrainView> {
        let row = sqlx::query(
            r#"
            SELECT tr.id, tr.name, tr.cargo_num, tr.places_in_cargo, tt.name AS train_type
            FROM trains tr
            JOIN train_types tt ON tt.id = tr.train_type_id
            WHERE tr.id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "train",
            id: id.as_i64(),
        })?;
        Self::row_to_train_view(&row)
    }

    async fn update_train(&self, id: TrainId, new: NewTrain) -> Result<Train> {
        validate_train_layout(new.cargo_num, new.places_in_cargo)?;
        let updated = sqlx::query(
            r#"
            UPDATE trains
            SET name = $1, cargo_num = $2, places_in_cargo = $3, train_type_id = $4
            WHERE id = $5
            RETURNING id
            "#,
        )
        .bind(&new.name)
        .bind(new.cargo_num)
        .bind(new.places_in_cargo)
        .bind(new.train_type_id.as_i64())
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if violated_constraint(&e).as_deref() == Some("trains_train_type_id_fkey") {
                StoreError::NotFound {
                    entity: "train type",
                    id: new.train_type_id.as_i64(),
                }
            } else {
                map_name_conflict(e, "train", &new.name)
            }
        })?;
        if updated.is_none() {
            return Err(StoreError::NotFound {
                entity: "train",
                id: id.as_i64(),
            });
        }
        Ok(Train {
            id,
            name: new.name,
            cargo_num: new.cargo_num,
            places_in_cargo: new.places_in_cargo,
            train_type_id: new.train_type_id,
        })
    }

    async fn delete_train(&self, id: TrainId) -> Result<()> {
        let result = sqlx::query("DELETE FROM trains WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "train",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    // -- Crews --

    async fn create_crew(&self, new: NewCrew) -> Result<Crew> {
        let row = sqlx::query("INSERT INTO crews (name) VALUES ($1) RETURNING id")
            .bind(&new.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_name_conflict(e, "crew", &new.name))?;
        Ok(Crew {
            id: CrewId::new(row.try_get("id")?),
            name: new.name,
        })
    }

    async fn list_crews(&self) -> Result<Vec<Crew>> {
        let rows = sqlx::query("SELECT id, name FROM crews ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(Crew {
                    id: CrewId::new(row.try_get("id")?),
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn get_crew(&self, id: CrewId) -> Result<Crew> {
        let row = sqlx::query("SELECT id, name FROM crews WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "crew",
                id: id.as_i64(),
            })?;
        Ok(Crew {
            id,
            name: row.try_get("name")?,
        })
    }

    async fn update_crew(&self, id: CrewId, new: NewCrew) -> Result<Crew> {
        let updated = sqlx::query("UPDATE crews SET name = $1 WHERE id = $2 RETURNING id")
            .bind(&new.name)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_name_conflict(e, "crew", &new.name))?;
        if updated.is_none() {
            return Err(StoreError::NotFound {
                entity: "crew",
                id: id.as_i64(),
            });
        }
        Ok(Crew { id, name: new.name })
    }

    async fn delete_crew(&self, id: CrewId) -> Result<()> {
        let result = sqlx::query("DELETE FROM crews WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "crew",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    // -- Stations --

    async fn create_station(&self, new: NewStation) -> Result<Station> {
        let row = sqlx::query(
            "INSERT INTO stations (name, latitude, longitude) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&new.name)
        .bind(new.latitude)
        .bind(new.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_name_conflict(e, "station", &new.name))?;
        Ok(Station {
            id: StationId::new(row.try_get("id")?),
            name: new.name,
            latitude: new.latitude,
            longitude: new.longitude,
        })
    }

    async fn list_stations(&self, filter: NameFilter) -> Result<Vec<Station>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, latitude, longitude
            FROM stations
            WHERE $1::TEXT IS NULL OR name ILIKE '%' || $1 || '%'
            ORDER BY name
            "#,
        )
        .bind(filter.name)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_station).collect()
    }

    async fn get_station(&self, id: StationId) -> Result<Station> {
        let row = sqlx::query("SELECT id, name, latitude, longitude FROM stations WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "station",
                id: id.as_i64(),
            })?;
        Self::row_to_station(&row)
    }

    async fn update_station(&self, id: StationId, new: NewStation) -> Result<Station> {
        let updated = sqlx::query(
            r#"
            UPDATE stations SET name = $1, latitude = $2, longitude = $3
            WHERE id = $4
            RETURNING id
            "#,
        )
        .bind(&new.name)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_name_conflict(e, "station", &new.name))?;
        if updated.is_none() {
            return Err(StoreError::NotFound {
                entity: "station",
                id: id.as_i64(),
            });
        }
        Ok(Station {
            id,
            name: new.name,
            latitude: new.latitude,
            longitude: new.longitude,
        })
    }

    async fn delete_station(&self, id: StationId) -> Result<()> {
        let result = sqlx::query("DELETE FROM stations WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "station",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    // -- Routes --

    async fn create_route(&self, new: NewRoute) -> Result<Route> {
        validate_route(new.distance)?;
        let row = sqlx::query(
            r#"
            INSERT INTO routes (source_id, destination_id, distance)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(new.source_id.as_i64())
        .bind(new.destination_id.as_i64())
        .bind(new.distance)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_fk_violation(
                e,
                &[
                    ("routes_source_id_fkey", "station", new.source_id.as_i64()),
                    (
                        "routes_destination_id_fkey",
                        "station",
                        new.destination_id.as_i64(),
                    ),
                ],
            )
        })?;
        Ok(Route {
            id: RouteId::new(row.try_get("id")?),
            source_id: new.source_id,
            destination_id: new.destination_id,
            distance: new.distance,
        })
    }

    async fn list_routes(&self) -> Result<Vec<RouteSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.distance, src.name AS source, dst.name AS destination
            FROM routes r
            JOIN stations src ON src.id = r.source_id
            JOIN stations dst ON dst.id = r.destination_id
            ORDER BY r.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(RouteSummary {
                    id: RouteId::new(row.try_get("id")?),
                    source: row.try_get("source")?,
                    destination: row.try_get("destination")?,
                    distance: row.try_get("distance")?,
                })
            })
            .collect()
    }

    async fn get_route(&self, id: RouteId) -> Result<RouteDetail> {
        let row = sqlx::query(
            r#"
            SELECT r.id, r.distance,
                   src.id AS src_id, src.name AS src_name,
                   src.latitude AS src_lat, src.longitude AS src_lng,
                   dst.id AS dst_id, dst.name AS dst_name,
                   dst.latitude AS dst_lat, dst.longitude AS dst_lng
            FROM routes r
            JOIN stations src ON src.id = r.source_id
            JOIN stations dst ON dst.id = r.destination_id
            WHERE r.id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "route",
            id: id.as_i64(),
        })?;

        let source = Station {
            id: StationId::new(row.try_get("src_id")?),
            name: row.try_get("src_name")?,
            latitude: row.try_get("src_lat")?,
            longitude: row.try_get("src_lng")?,
        };
        let destination = Station {
            id: StationId::new(row.try_get("dst_id")?),
            name: row.try_get("dst_name")?,
            latitude: row.try_get("dst_lat")?,
            longitude: row.try_get("dst_lng")?,
        };
        Ok(RouteDetail {
            id,
            source: source.into(),
            destination: destination.into(),
            distance: row.try_get("distance")?,
        })
    }

    async fn update_route(&self, id: RouteId, new: NewRoute) -> Result<Route> {
        validate_route(new.distance)?;
        let updated = sqlx::query(
            r#"
            UPDATE routes SET source_id = $1, destination_id = $2, distance = $3
            WHERE id = $4
            RETURNING id
            "#,
        )
        .bind(new.source_id.as_i64())
        .bind(new.destination_id.as_i64())
        .bind(new.distance)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_fk_violation(
                e,
                &[
                    ("routes_source_id_fkey", "station", new.source_id.as_i64()),
                    (
                        "routes_destination_id_fkey",
                        "station",
                        new.destination_id.as_i64(),
                    ),
                ],
            )
        })?;
        if updated.is_none() {
            return Err(StoreError::NotFound {
                entity: "route",
                id: id.as_i64(),
            });
        }
        Ok(Route {
            id,
            source_id: new.source_id,
            destination_id: new.destination_id,
            distance: new.distance,
        })
    }

    async fn delete_route(&self, id: RouteId) -> Result<()> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "route",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    // -- Trips --

    async fn create_trip(&self, new: NewTrip) -> Result<Trip> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r#"
            INSERT INTO trips (departure_time, arrival_time, route_id, train_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(new.departure_time)
        .bind(new.arrival_time)
        .bind(new.route_id.as_i64())
        .bind(new.train_id.as_i64())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_fk_violation(
                e,
                &[
                    ("trips_route_id_fkey", "route", new.route_id.as_i64()),
                    ("trips_train_id_fkey", "train", new.train_id.as_i64()),
                ],
            )
        })?;
        let trip_id: i64 = row.try_get("id")?;

        for crew_id in &new.crew_ids {
            sqlx::query("INSERT INTO trip_crews (trip_id, crew_id) VALUES ($1, $2)")
                .bind(trip_id)
                .bind(crew_id.as_i64())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    map_fk_violation(e, &[("trip_crews_crew_id_fkey", "crew", crew_id.as_i64())])
                })?;
        }
        tx.commit().await?;

        Ok(Trip {
            id: TripId::new(trip_id),
            departure_time: new.departure_time,
            arrival_time: new.arrival_time,
            route_id: new.route_id,
            train_id: new.train_id,
            crew_ids: new.crew_ids,
        })
    }

    async fn list_trips(&self, filter: TripFilter) -> Result<Vec<TripSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id AS trip_id, t.departure_time, t.arrival_time,
                   src.name AS departure_station, dst.name AS arrival_station,
                   tr.name AS train_name,
                   (tr.cargo_num::BIGINT * tr.places_in_cargo) AS train_capacity,
                   (tr.cargo_num::BIGINT * tr.places_in_cargo) - COUNT(k.id)
                       AS tickets_available
            FROM trips t
            JOIN trains tr ON tr.id = t.train_id
            JOIN routes r ON r.id = t.route_id
            JOIN stations src ON src.id = r.source_id
            JOIN stations dst ON dst.id = r.destination_id
            LEFT JOIN tickets k ON k.trip_id = t.id
            WHERE ($1::BIGINT IS NULL OR t.route_id = $1)
              AND ($2::BIGINT IS NULL OR t.train_id = $2)
            GROUP BY t.id, src.name, dst.name, tr.name, tr.cargo_num, tr.places_in_cargo
            ORDER BY t.departure_time, t.id
            "#,
        )
        .bind(filter.route.map(|id| id.as_i64()))
        .bind(filter.train.map(|id| id.as_i64()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_trip_summary).collect()
    }

    async fn get_trip(&self, id: TripId) -> Result<TripDetail> {
        let row = sqlx::query(
            r#"
            SELECT t.departure_time, t.arrival_time, t.route_id,
                   tr.id AS train_id, tr.name AS train_name,
                   tr.cargo_num, tr.places_in_cargo,
                   tt.name AS train_type
            FROM trips t
            JOIN trains tr ON tr.id = t.train_id
            JOIN train_types tt ON tt.id = tr.train_type_id
            WHERE t.id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "trip",
            id: id.as_i64(),
        })?;

        let cargo_num: i32 = row.try_get("cargo_num")?;
        let places_in_cargo: i32 = row.try_get("places_in_cargo")?;
        let train = TrainView {
            id: TrainId::new(row.try_get("train_id")?),
            name: row.try_get("train_name")?,
            cargo_num,
            places_in_cargo,
            capacity: i64::from(cargo_num) * i64::from(places_in_cargo),
            train_type: row.try_get("train_type")?,
        };
        let route = self
            .get_route(RouteId::new(row.try_get("route_id")?))
            .await?;

        let crew_rows = sqlx::query(
            r#"
            SELECT c.name FROM trip_crews tc
            JOIN crews c ON c.id = tc.crew_id
            WHERE tc.trip_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        let crews = crew_rows
            .iter()
            .map(|r| Ok(r.try_get::<String, _>("name")?))
            .collect::<Result<Vec<_>>>()?;

        let seat_rows =
            sqlx::query("SELECT cargo, seat FROM tickets WHERE trip_id = $1 ORDER BY cargo, seat")
                .bind(id.as_i64())
                .fetch_all(&self.pool)
                .await?;
        let taken_places = seat_rows
            .iter()
            .map(|r| {
                Ok(SeatRef {
                    cargo: r.try_get("cargo")?,
                    seat: r.try_get("seat")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let tickets_available = train.capacity - taken_places.len() as i64;
        Ok(TripDetail {
            id,
            departure_time: row.try_get("departure_time")?,
            arrival_time: row.try_get("arrival_time")?,
            tickets_available,
            taken_places,
            route,
            train,
            crews,
        })
    }

    async fn update_trip(&self, id: TripId, new: NewTrip) -> Result<Trip> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE trips
            SET departure_time = $1, arrival_time = $2, route_id = $3, train_id = $4
            WHERE id = $5
            RETURNING id
            "#,
        )
        .bind(new.departure_time)
        .bind(new.arrival_time)
        .bind(new.route_id.as_i64())
        .bind(new.train_id.as_i64())
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            map_fk_violation(
                e,
                &[
                    ("trips_route_id_fkey", "route", new.route_id.as_i64()),
                    ("trips_train_id_fkey", "train", new.train_id.as_i64()),
                ],
            )
        })?;
        if updated.is_none() {
            return Err(StoreError::NotFound {
                entity: "trip",
                id: id.as_i64(),
            });
        }

        sqlx::query("DELETE FROM trip_crews WHERE trip_id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;
        for crew_id in &new.crew_ids {
            sqlx::query("INSERT INTO trip_crews (trip_id, crew_id) VALUES ($1, $2)")
                .bind(id.as_i64())
                .bind(crew_id.as_i64())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    map_fk_violation(e, &[("trip_crews_crew_id_fkey", "crew", crew_id.as_i64())])
                })?;
        }
        tx.commit().await?;

        Ok(Trip {
            id,
            departure_time: new.departure_time,
            arrival_time: new.arrival_time,
            route_id: new.route_id,
            train_id: new.train_id,
            crew_ids: new.crew_ids,
        })
    }

    async fn delete_trip(&self, id: TripId) -> Result<()> {
        let result = sqlx::query("DELETE FROM trips WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "trip",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    // -- Orders --

    async fn create_order(
        &self,
        owner: UserId,
        tickets: Vec<TicketRequest>,
    ) -> Result<OrderView> {
        validate_ticket_requests(&tickets)?;

        let mut tx = self.pool.begin().await?;

        let order_row = sqlx::query(
            "INSERT INTO orders (user_id) VALUES ($1) RETURNING id, created_at",
        )
        .bind(owner.as_i64())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_fk_violation(e, &[("orders_user_id_fkey", "user", owner.as_i64())])
        })?;
        let order_id: i64 = order_row.try_get("id")?;

        // One train lookup per distinct trip in the request.
        let mut trains: HashMap<i64, Train> = HashMap::new();
        for request in &tickets {
            if !trains.contains_key(&request.trip.as_i64()) {
                let train = Self::train_for_trip(&mut tx, request.trip).await?;
                trains.insert(request.trip.as_i64(), train);
            }
            let train = &trains[&request.trip.as_i64()];
            validate_seat(request.cargo, request.seat, train)?;

            sqlx::query("INSERT INTO tickets (cargo, seat, trip_id, order_id) VALUES ($1, $2, $3, $4)")
                .bind(request.cargo)
                .bind(request.seat)
                .bind(request.trip.as_i64())
                .bind(order_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if violated_constraint(&e).as_deref() == Some("tickets_trip_cargo_seat_key") {
                        StoreError::SeatTaken {
                            trip: request.trip,
                            cargo: request.cargo,
                            seat: request.seat,
                        }
                    } else {
                        map_fk_violation(
                            e,
                            &[("tickets_trip_id_fkey", "trip", request.trip.as_i64())],
                        )
                    }
                })?;
        }

        tx.commit().await?;
        tracing::info!(order_id, owner = %owner, tickets = tickets.len(), "order created");

        self.get_order(owner, OrderId::new(order_id)).await
    }

    async fn list_orders(&self, owner: UserId, page: PageRequest) -> Result<Page<OrderView>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(owner.as_i64())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, created_at FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner.as_i64())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let order_ids: Vec<i64> = rows
            .iter()
            .map(|row| Ok(row.try_get::<i64, _>("id")?))
            .collect::<Result<Vec<_>>>()?;
        let mut tickets_by_order = self.ticket_views_for_orders(&order_ids).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            items.push(OrderView {
                id: OrderId::new(id),
                created_at: row.try_get("created_at")?,
                tickets: tickets_by_order.remove(&id).unwrap_or_default(),
            });
        }

        Ok(Page {
            items,
            page: page.page(),
            page_size: page.page_size(),
            total,
        })
    }

    async fn get_order(&self, owner: UserId, id: OrderId) -> Result<OrderView> {
        let row = sqlx::query("SELECT id, created_at FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id.as_i64())
            .bind(owner.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "order",
                id: id.as_i64(),
            })?;

        let mut tickets_by_order = self.ticket_views_for_orders(&[id.as_i64()]).await?;
        Ok(OrderView {
            id,
            created_at: row.try_get("created_at")?,
            tickets: tickets_by_order.remove(&id.as_i64()).unwrap_or_default(),
        })
    }

    // -- Identity --

    async fn register_user(&self, new: NewUser) -> Result<User> {
        let password_hash = identity::hash_password(&new.password);
        let row = sqlx::query(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(&new.username)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_name_conflict(e, "user", &new.username))?;
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            username: new.username,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::InvalidCredentials)?;

        let stored: String = row.try_get("password_hash")?;
        if !identity::verify_password(password, &stored) {
            return Err(StoreError::InvalidCredentials);
        }

        let token = identity::generate_token();
        sqlx::query("INSERT INTO auth_tokens (token, user_id) VALUES ($1, $2)")
            .bind(&token)
            .bind(row.try_get::<i64, _>("id")?)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.username
            FROM auth_tokens at
            JOIN users u ON u.id = at.user_id
            WHERE at.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| {
            Ok(User {
                id: UserId::new(row.try_get("id")?),
                username: row.try_get("username")?,
            })
        })
        .transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let row = sqlx::query("SELECT id, username FROM users WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "user",
                id: id.as_i64(),
            })?;
        Ok(User {
            id,
            username: row.try_get("username")?,
        })
    }

    async fn update_user(&self, id: UserId, new: NewUser) -> Result<User> {
        let password_hash = identity::hash_password(&new.password);
        let updated = sqlx::query(
            "UPDATE users SET username = $1, password_hash = $2 WHERE id = $3 RETURNING id",
        )
        .bind(&new.username)
        .bind(&password_hash)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_name_conflict(e, "user", &new.username))?;
        if updated.is_none() {
            return Err(StoreError::NotFound {
                entity: "user",
                id: id.as_i64(),
            });
        }
        Ok(User {
            id,
            username: new.username,
        })
    }
}

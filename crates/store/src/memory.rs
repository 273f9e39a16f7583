//! In-memory railway store for tests and local development.
//!
//! All state sits behind a single `RwLock`, so every operation — in
//! particular order creation — is atomic with respect to readers, matching
//! the transactional guarantees of the PostgreSQL implementation. Cascade
//! deletes mirror the schema's `ON DELETE CASCADE` edges.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CrewId, OrderId, RouteId, StationId, TicketId, TrainId, TrainTypeId, TripId, UserId};
use domain::{
    Crew, NewCrew, NewRoute, NewStation, NewTrain, NewTrainType, NewTrip, Order, Route, Station,
    Ticket, TicketRequest, Train, TrainType, Trip, validate_route, validate_seat,
    validate_ticket_requests, validate_train_layout,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::identity::{self, NewUser, User};
use crate::store::{NameFilter, Page, PageRequest, RailwayStore, TripFilter};
use crate::views::{
    OrderView, RouteDetail, RouteSummary, SeatRef, TicketView, TrainView, TripDetail, TripSummary,
};

struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct Inner {
    train_types: BTreeMap<i64, TrainType>,
    trains: BTreeMap<i64, Train>,
    crews: BTreeMap<i64, Crew>,
    stations: BTreeMap<i64, Station>,
    routes: BTreeMap<i64, Route>,
    trips: BTreeMap<i64, Trip>,
    orders: BTreeMap<i64, Order>,
    tickets: BTreeMap<i64, Ticket>,
    users: BTreeMap<i64, StoredUser>,
    tokens: HashMap<String, i64>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_unique_name<'a>(
        &self,
        names: impl Iterator<Item = (i64, &'a str)>,
        entity: &'static str,
        name: &str,
        exclude: Option<i64>,
    ) -> Result<()> {
        for (id, existing) in names {
            if Some(id) != exclude && existing == name {
                return Err(StoreError::DuplicateName {
                    entity,
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn ticket_count(&self, trip: TripId) -> i64 {
        self.tickets.values().filter(|t| t.trip_id == trip).count() as i64
    }

    fn train_view(&self, train: &Train) -> Result<TrainView> {
        let train_type = self.train_types.get(&train.train_type_id.as_i64()).ok_or(
            StoreError::NotFound {
                entity: "train type",
                id: train.train_type_id.as_i64(),
            },
        )?;
        Ok(TrainView {
            id: train.id,
            name: train.name.clone(),
            cargo_num: train.cargo_num,
            places_in_cargo: train.places_in_cargo,
            capacity: train.capacity(),
            train_type: train_type.name.clone(),
        })
    }

    fn route_detail(&self, route: &Route) -> Result<RouteDetail> {
        let station = |id: StationId| {
            self.stations
                .get(&id.as_i64())
                .cloned()
                .ok_or(StoreError::NotFound {
                    entity: "station",
                    id: id.as_i64(),
                })
        };
        Ok(RouteDetail {
            id: route.id,
            source: station(route.source_id)?.into(),
            destination: station(route.destination_id)?.into(),
            distance: route.distance,
        })
    }

    fn trip_summary(&self, trip: &Trip) -> Result<TripSummary> {
        let train = self
            .trains
            .get(&trip.train_id.as_i64())
            .ok_or(StoreError::NotFound {
                entity: "train",
                id: trip.train_id.as_i64(),
            })?;
        let route = self
            .routes
            .get(&trip.route_id.as_i64())
            .ok_or(StoreError::NotFound {
                entity: "route",
                id: trip.route_id.as_i64(),
            })?;
        let detail = self.route_detail(route)?;
        let capacity = train.capacity();
        Ok(TripSummary {
            id: trip.id,
            departure_station: detail.source.name,
            arrival_station: detail.destination.name,
            train_name: train.name.clone(),
            train_capacity: capacity,
            tickets_available: capacity - self.ticket_count(trip.id),
            departure_time: trip.departure_time,
            arrival_time: trip.arrival_time,
        })
    }

    fn order_view(&self, order: &Order) -> Result<OrderView> {
        let mut tickets: Vec<&Ticket> = self
            .tickets
            .values()
            .filter(|t| t.order_id == order.id)
            .collect();
        tickets.sort_by_key(|t| (t.cargo, t.seat));

        let mut views = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let trip = self
                .trips
                .get(&ticket.trip_id.as_i64())
                .ok_or(StoreError::NotFound {
                    entity: "trip",
                    id: ticket.trip_id.as_i64(),
                })?;
            views.push(TicketView {
                id: ticket.id,
                cargo: ticket.cargo,
                seat: ticket.seat,
                trip: self.trip_summary(trip)?,
            });
        }
        Ok(OrderView {
            id: order.id,
            created_at: order.created_at,
            tickets: views,
        })
    }

    // Cascade edges, mirroring the schema's ON DELETE CASCADE.

    fn cascade_delete_trip(&mut self, id: TripId) {
        self.tickets.retain(|_, t| t.trip_id != id);
        self.trips.remove(&id.as_i64());
    }

    fn cascade_delete_train(&mut self, id: TrainId) {
        let trips: Vec<TripId> = self
            .trips
            .values()
            .filter(|t| t.train_id == id)
            .map(|t| t.id)
            .collect();
        for trip in trips {
            self.cascade_delete_trip(trip);
        }
        self.trains.remove(&id.as_i64());
    }

    fn cascade_delete_route(&mut self, id: RouteId) {
        let trips: Vec<TripId> = self
            .trips
            .values()
            .filter(|t| t.route_id == id)
            .map(|t| t.id)
            .collect();
        for trip in trips {
            self.cascade_delete_trip(trip);
        }
        self.routes.remove(&id.as_i64());
    }
}

/// In-memory store implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of persisted tickets, for atomicity assertions in tests.
    pub async fn ticket_count(&self) -> usize {
        self.inner.read().await.tickets.len()
    }

    /// Total number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }
}

#[async_trait]
impl RailwayStore for InMemoryStore {
    // -- Train types --

    async fn create_train_type(&self, new: NewTrainType) -> Result<TrainType> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_name(
            inner.train_types.values().map(|t| (t.id.as_i64(), t.name.as_str())),
            "train type",
            &new.name,
            None,
        )?;
        let id = inner.next_id();
        let train_type = TrainType {
            id: TrainTypeId::new(id),
            name: new.name,
        };
        inner.train_types.insert(id, train_type.clone());
        Ok(train_type)
    }

    async fn list_train_types(&self) -> Result<Vec<TrainType>> {
        let inner = self.inner.read().await;
        let mut items: Vec<TrainType> = inner.train_types.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_train_type(&self, id: TrainTypeId) -> Result<TrainType> {
        let inner = self.inner.read().await;
        inner
            .train_types
            .get(&id.as_i64())
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "train type",
                id: id.as_i64(),
            })
    }

    async fn update_train_type(&self, id: TrainTypeId, new: NewTrainType) -> Result<TrainType> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_name(
            inner.train_types.values().map(|t| (t.id.as_i64(), t.name.as_str())),
            "train type",
            &new.name,
            Some(id.as_i64()),
        )?;
        let entry = inner
            .train_types
            .get_mut(&id.as_i64())
            .ok_or(StoreError::NotFound {
                entity: "train type",
                id: id.as_i64(),
            })?;
        entry.name = new.name;
        Ok(entry.clone())
    }

    async fn delete_train_type(&self, id: TrainTypeId) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.train_types.remove(&id.as_i64()).is_none() {
            return Err(StoreError::NotFound {
                entity: "train type",
                id: id.as_i64(),
            });
        }
        let trains: Vec<TrainId> = inner
            .trains
            .values()
            .filter(|t| t.train_type_id == id)
            .map(|t| t.id)
            .collect();
        for train in trains {
            inner.cascade_delete_train(train);
        }
        Ok(())
    }

    // -- Trains --

    async fn create_train(&self, new: NewTrain) -> Result<Train> {
        validate_train_layout(new.cargo_num, new.places_in_cargo)?;
        let mut inner = self.inner.write().await;
        if !inner.train_types.contains_key(&new.train_type_id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "train type",
                id: new.train_type_id.as_i64(),
            });
        }
        inner.ensure_unique_name(
            inner.trains.values().map(|t| (t.id.as_i64(), t.name.as_str())),
            "train",
            &new.name,
            None,
        )?;
        let id = inner.next_id();
        let train = Train {
            id: TrainId::new(id),
            name: new.name,
            cargo_num: new.cargo_num,
            places_in_cargo: new.places_in_cargo,
            train_type_id: new.train_type_id,
        };
        inner.trains.insert(id, train.clone());
        Ok(train)
    }

    async fn list_trains(&self, filter: NameFilter) -> Result<Vec<TrainView>> {
        let inner = self.inner.read().await;
        let mut views = Vec::new();
        for train in inner.trains.values() {
            if filter.matches(&train.name) {
                views.push(inner.train_view(train)?);
            }
        }
        views.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(views)
    }

    async fn get_train(&self, id: TrainId) -> Result<TrainView> {
        let inner = self.inner.read().await;
        let train = inner.trains.get(&id.as_i64()).ok_or(StoreError::NotFound {
            entity: "train",
            id: id.as_i64(),
        })?;
        inner.train_view(train)
    }

    async fn update_train(&self, id: TrainId, new: NewTrain) -> Result<Train> {
        validate_train_layout(new.cargo_num, new.places_in_cargo)?;
        let mut inner = self.inner.write().await;
        if !inner.trains.contains_key(&id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "train",
                id: id.as_i64(),
            });
        }
        if !inner.train_types.contains_key(&new.train_type_id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "train type",
                id: new.train_type_id.as_i64(),
            });
        }
        inner.ensure_unique_name(
            inner.trains.values().map(|t| (t.id.as_i64(), t.name.as_str())),
            "train",
            &new.name,
            Some(id.as_i64()),
        )?;
        let train = Train {
            id,
            name: new.name,
            cargo_num: new.cargo_num,
            places_in_cargo: new.places_in_cargo,
            train_type_id: new.train_type_id,
        };
        inner.trains.insert(id.as_i64(), train.clone());
        Ok(train)
    }

    async fn delete_train(&self, id: TrainId) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.trains.contains_key(&id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "train",
                id: id.as_i64(),
            });
        }
        inner.cascade_delete_train(id);
        Ok(())
    }

    // -- Crews --

    async fn create_crew(&self, new: NewCrew) -> Result<Crew> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_name(
            inner.crews.values().map(|c| (c.id.as_i64(), c.name.as_str())),
            "crew",
            &new.name,
            None,
        )?;
        let id = inner.next_id();
        let crew = Crew {
            id: CrewId::new(id),
            name: new.name,
        };
        inner.crews.insert(id, crew.clone());
        Ok(crew)
    }

    async fn list_crews(&self) -> Result<Vec<Crew>> {
        let inner = self.inner.read().await;
        let mut items: Vec<Crew> = inner.crews.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_crew(&self, id: CrewId) -> Result<Crew> {
        let inner = self.inner.read().await;
        inner
            .crews
            .get(&id.as_i64())
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "crew",
                id: id.as_i64(),
            })
    }

    async fn update_crew(&self, id: CrewId, new: NewCrew) -> Result<Crew> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_name(
            inner.crews.values().map(|c| (c.id.as_i64(), c.name.as_str())),
            "crew",
            &new.name,
            Some(id.as_i64()),
        )?;
        let entry = inner.crews.get_mut(&id.as_i64()).ok_or(StoreError::NotFound {
            entity: "crew",
            id: id.as_i64(),
        })?;
        entry.name = new.name;
        Ok(entry.clone())
    }

    async fn delete_crew(&self, id: CrewId) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.crews.remove(&id.as_i64()).is_none() {
            return Err(StoreError::NotFound {
                entity: "crew",
                id: id.as_i64(),
            });
        }
        for trip in inner.trips.values_mut() {
            trip.crew_ids.retain(|c| *c != id);
        }
        Ok(())
    }

    // -- Stations --

    async fn create_station(&self, new: NewStation) -> Result<Station> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_name(
            inner.stations.values().map(|s| (s.id.as_i64(), s.name.as_str())),
            "station",
            &new.name,
            None,
        )?;
        let id = inner.next_id();
        let station = Station {
            id: StationId::new(id),
            name: new.name,
            latitude: new.latitude,
            longitude: new.longitude,
        };
        inner.stations.insert(id, station.clone());
        Ok(station)
    }

    async fn list_stations(&self, filter: NameFilter) -> Result<Vec<Station>> {
        let inner = self.inner.read().await;
        let mut items: Vec<Station> = inner
            .stations
            .values()
            .filter(|s| filter.matches(&s.name))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_station(&self, id: StationId) -> Result<Station> {
        let inner = self.inner.read().await;
        inner
            .stations
            .get(&id.as_i64())
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "station",
                id: id.as_i64(),
            })
    }

    async fn update_station(&self, id: StationId, new: NewStation) -> Result<Station> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_name(
            inner.stations.values().map(|s| (s.id.as_i64(), s.name.as_str())),
            "station",
            &new.name,
            Some(id.as_i64()),
        )?;
        if !inner.stations.contains_key(&id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "station",
                id: id.as_i64(),
            });
        }
        let station = Station {
            id,
            name: new.name,
            latitude: new.latitude,
            longitude: new.longitude,
        };
        inner.stations.insert(id.as_i64(), station.clone());
        Ok(station)
    }

    async fn delete_station(&self, id: StationId) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.stations.remove(&id.as_i64()).is_none() {
            return Err(StoreError::NotFound {
                entity: "station",
                id: id.as_i64(),
            });
        }
        let routes: Vec<RouteId> = inner
            .routes
            .values()
            .filter(|r| r.source_id == id || r.destination_id == id)
            .map(|r| r.id)
            .collect();
        for route in routes {
            inner.cascade_delete_route(route);
        }
        Ok(())
    }

    // -- Routes --

    async fn create_route(&self, new: NewRoute) -> Result<Route> {
        validate_route(new.distance)?;
        let mut inner = self.inner.write().await;
        for station in [new.source_id, new.destination_id] {
            if !inner.stations.contains_key(&station.as_i64()) {
                return Err(StoreError::NotFound {
                    entity: "station",
                    id: station.as_i64(),
                });
            }
        }
        let id = inner.next_id();
        let route = Route {
            id: RouteId::new(id),
            source_id: new.source_id,
            destination_id: new.destination_id,
            distance: new.distance,
        };
        inner.routes.insert(id, route.clone());
        Ok(route)
    }

    async fn list_routes(&self) -> Result<Vec<RouteSummary>> {
        let inner = self.inner.read().await;
        let mut items = Vec::new();
        for route in inner.routes.values() {
            let detail = inner.route_detail(route)?;
            items.push(RouteSummary {
                id: route.id,
                source: detail.source.name,
                destination: detail.destination.name,
                distance: route.distance,
            });
        }
        Ok(items)
    }

    async fn get_route(&self, id: RouteId) -> Result<RouteDetail> {
        let inner = self.inner.read().await;
        let route = inner.routes.get(&id.as_i64()).ok_or(StoreError::NotFound {
            entity: "route",
            id: id.as_i64(),
        })?;
        inner.route_detail(route)
    }

    async fn update_route(&self, id: RouteId, new: NewRoute) -> Result<Route> {
        validate_route(new.distance)?;
        let mut inner = self.inner.write().await;
        if !inner.routes.contains_key(&id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "route",
                id: id.as_i64(),
            });
        }
        for station in [new.source_id, new.destination_id] {
            if !inner.stations.contains_key(&station.as_i64()) {
                return Err(StoreError::NotFound {
                    entity: "station",
                    id: station.as_i64(),
                });
            }
        }
        let route = Route {
            id,
            source_id: new.source_id,
            destination_id: new.destination_id,
            distance: new.distance,
        };
        inner.routes.insert(id.as_i64(), route.clone());
        Ok(route)
    }

    async fn delete_route(&self, id: RouteId) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.routes.contains_key(&id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "route",
                id: id.as_i64(),
            });
        }
        inner.cascade_delete_route(id);
        Ok(())
    }

    // -- Trips --

    async fn create_trip(&self, new: NewTrip) -> Result<Trip> {
        let mut inner = self.inner.write().await;
        if !inner.routes.contains_key(&new.route_id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "route",
                id: new.route_id.as_i64(),
            });
        }
        if !inner.trains.contains_key(&new.train_id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "train",
                id: new.train_id.as_i64(),
            });
        }
        for crew in &new.crew_ids {
            if !inner.crews.contains_key(&crew.as_i64()) {
                return Err(StoreError::NotFound {
                    entity: "crew",
                    id: crew.as_i64(),
                });
            }
        }
        let id = inner.next_id();
        let trip = Trip {
            id: TripId::new(id),
            departure_time: new.departure_time,
            arrival_time: new.arrival_time,
            route_id: new.route_id,
            train_id: new.train_id,
            crew_ids: new.crew_ids,
        };
        inner.trips.insert(id, trip.clone());
        Ok(trip)
    }

    async fn list_trips(&self, filter: TripFilter) -> Result<Vec<TripSummary>> {
        let inner = self.inner.read().await;
        let mut summaries = Vec::new();
        for trip in inner.trips.values() {
            if let Some(route) = filter.route
                && trip.route_id != route
            {
                continue;
            }
            if let Some(train) = filter.train
                && trip.train_id != train
            {
                continue;
            }
            summaries.push(inner.trip_summary(trip)?);
        }
        summaries.sort_by_key(|s| (s.departure_time, s.id));
        Ok(summaries)
    }

    async fn get_trip(&self, id: TripId) -> Result<TripDetail> {
        let inner = self.inner.read().await;
        let trip = inner.trips.get(&id.as_i64()).ok_or(StoreError::NotFound {
            entity: "trip",
            id: id.as_i64(),
        })?;
        let train = inner
            .trains
            .get(&trip.train_id.as_i64())
            .ok_or(StoreError::NotFound {
                entity: "train",
                id: trip.train_id.as_i64(),
            })?;
        let route = inner
            .routes
            .get(&trip.route_id.as_i64())
            .ok_or(StoreError::NotFound {
                entity: "route",
                id: trip.route_id.as_i64(),
            })?;

        let mut taken_places: Vec<SeatRef> = inner
            .tickets
            .values()
            .filter(|t| t.trip_id == id)
            .map(|t| SeatRef {
                cargo: t.cargo,
                seat: t.seat,
            })
            .collect();
        taken_places.sort();

        let mut crews: Vec<String> = trip
            .crew_ids
            .iter()
            .filter_map(|c| inner.crews.get(&c.as_i64()).map(|c| c.name.clone()))
            .collect();
        crews.sort();

        let train_view = inner.train_view(train)?;
        let tickets_available = train_view.capacity - taken_places.len() as i64;
        Ok(TripDetail {
            id,
            departure_time: trip.departure_time,
            arrival_time: trip.arrival_time,
            tickets_available,
            taken_places,
            route: inner.route_detail(route)?,
            train: train_view,
            crews,
        })
    }

    async fn update_trip(&self, id: TripId, new: NewTrip) -> Result<Trip> {
        let mut inner = self.inner.write().await;
        if !inner.trips.contains_key(&id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "trip",
                id: id.as_i64(),
            });
        }
        if !inner.routes.contains_key(&new.route_id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "route",
                id: new.route_id.as_i64(),
            });
        }
        if !inner.trains.contains_key(&new.train_id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "train",
                id: new.train_id.as_i64(),
            });
        }
        for crew in &new.crew_ids {
            if !inner.crews.contains_key(&crew.as_i64()) {
                return Err(StoreError::NotFound {
                    entity: "crew",
                    id: crew.as_i64(),
                });
            }
        }
        let trip = Trip {
            id,
            departure_time: new.departure_time,
            arrival_time: new.arrival_time,
            route_id: new.route_id,
            train_id: new.train_id,
            crew_ids: new.crew_ids,
        };
        inner.trips.insert(id.as_i64(), trip.clone());
        Ok(trip)
    }

    async fn delete_trip(&self, id: TripId) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.trips.contains_key(&id.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "trip",
                id: id.as_i64(),
            });
        }
        inner.cascade_delete_trip(id);
        Ok(())
    }

    // -- Orders --

    async fn create_order(
        &self,
        owner: UserId,
        tickets: Vec<TicketRequest>,
    ) -> Result<OrderView> {
        validate_ticket_requests(&tickets)?;

        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&owner.as_i64()) {
            return Err(StoreError::NotFound {
                entity: "user",
                id: owner.as_i64(),
            });
        }

        // Validate everything up front so nothing is inserted on failure,
        // mirroring the transactional rollback of the PostgreSQL store.
        let mut requested: HashSet<(i64, i32, i32)> = HashSet::new();
        for request in &tickets {
            let trip = inner
                .trips
                .get(&request.trip.as_i64())
                .ok_or(StoreError::NotFound {
                    entity: "trip",
                    id: request.trip.as_i64(),
                })?;
            let train = inner
                .trains
                .get(&trip.train_id.as_i64())
                .ok_or(StoreError::NotFound {
                    entity: "train",
                    id: trip.train_id.as_i64(),
                })?;
            validate_seat(request.cargo, request.seat, train)?;

            let key = (request.trip.as_i64(), request.cargo, request.seat);
            let already_sold = inner.tickets.values().any(|t| {
                t.trip_id == request.trip && t.cargo == request.cargo && t.seat == request.seat
            });
            if already_sold || !requested.insert(key) {
                return Err(StoreError::SeatTaken {
                    trip: request.trip,
                    cargo: request.cargo,
                    seat: request.seat,
                });
            }
        }

        let order_id = inner.next_id();
        let order = Order {
            id: OrderId::new(order_id),
            created_at: Utc::now(),
            user_id: owner,
        };
        inner.orders.insert(order_id, order.clone());
        for request in &tickets {
            let ticket_id = inner.next_id();
            inner.tickets.insert(
                ticket_id,
                Ticket {
                    id: TicketId::new(ticket_id),
                    cargo: request.cargo,
                    seat: request.seat,
                    trip_id: request.trip,
                    order_id: order.id,
                },
            );
        }

        tracing::info!(order_id, owner = %owner, tickets = tickets.len(), "order created");
        inner.order_view(&order)
    }

    async fn list_orders(&self, owner: UserId, page: PageRequest) -> Result<Page<OrderView>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<&Order> = inner
            .orders
            .values()
            .filter(|o| o.user_id == owner)
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_i64().cmp(&a.id.as_i64()))
        });

        let total = orders.len() as i64;
        let start = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = orders
            .into_iter()
            .skip(start)
            .take(page.page_size() as usize)
            .map(|order| inner.order_view(order))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page: page.page(),
            page_size: page.page_size(),
            total,
        })
    }

    async fn get_order(&self, owner: UserId, id: OrderId) -> Result<OrderView> {
        let inner = self.inner.read().await;
        let order = inner
            .orders
            .get(&id.as_i64())
            .filter(|o| o.user_id == owner)
            .ok_or(StoreError::NotFound {
                entity: "order",
                id: id.as_i64(),
            })?;
        inner.order_view(order)
    }

    // -- Identity --

    async fn register_user(&self, new: NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_name(
            inner
                .users
                .values()
                .map(|u| (u.user.id.as_i64(), u.user.username.as_str())),
            "user",
            &new.username,
            None,
        )?;
        let id = inner.next_id();
        let user = User {
            id: UserId::new(id),
            username: new.username,
        };
        inner.users.insert(
            id,
            StoredUser {
                user: user.clone(),
                password_hash: identity::hash_password(&new.password),
            },
        );
        Ok(user)
    }

    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let mut inner = self.inner.write().await;
        let user_id = inner
            .users
            .values()
            .find(|u| u.user.username == username)
            .filter(|u| identity::verify_password(password, &u.password_hash))
            .map(|u| u.user.id.as_i64())
            .ok_or(StoreError::InvalidCredentials)?;
        let token = identity::generate_token();
        inner.tokens.insert(token.clone(), user_id);
        Ok(token)
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tokens
            .get(token)
            .and_then(|id| inner.users.get(id))
            .map(|u| u.user.clone()))
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id.as_i64())
            .map(|u| u.user.clone())
            .ok_or(StoreError::NotFound {
                entity: "user",
                id: id.as_i64(),
            })
    }

    async fn update_user(&self, id: UserId, new: NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;
        inner.ensure_unique_name(
            inner
                .users
                .values()
                .map(|u| (u.user.id.as_i64(), u.user.username.as_str())),
            "user",
            &new.username,
            Some(id.as_i64()),
        )?;
        let entry = inner.users.get_mut(&id.as_i64()).ok_or(StoreError::NotFound {
            entity: "user",
            id: id.as_i64(),
        })?;
        entry.user.username = new.username;
        entry.password_hash = identity::hash_password(&new.password);
        Ok(entry.user.clone())
    }
}

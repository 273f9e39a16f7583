//! The `RailwayStore` trait: entity CRUD, the order transaction and the
//! read projections, behind one seam so the HTTP layer can run against
//! PostgreSQL or the in-memory store interchangeably.

use async_trait::async_trait;
use common::{CrewId, OrderId, RouteId, StationId, TrainId, TrainTypeId, TripId, UserId};
use domain::{
    Crew, NewCrew, NewRoute, NewStation, NewTrain, NewTrainType, NewTrip, Route, Station,
    TicketRequest, Train, TrainType, Trip,
};
use serde::Serialize;

use crate::identity::{NewUser, User};
use crate::views::{OrderView, RouteDetail, RouteSummary, TrainView, TripDetail, TripSummary};
use crate::Result;

/// Case-insensitive substring filter on an entity's name.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    pub name: Option<String>,
}

impl NameFilter {
    /// Returns true if `candidate` passes the filter.
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.name {
            Some(needle) => candidate.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// Exact-match filter for trip listings.
#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    pub route: Option<RouteId>,
    pub train: Option<TrainId>,
}

/// Default page size for order listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Upper bound a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A 1-based page request with a clamped page size.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Builds a request, clamping the page to at least 1 and the size to
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// A bounded, ordered page of results with the total row count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

/// Storage seam for the booking system.
///
/// Both implementations guarantee the same semantics:
/// - names of train types, trains, crews, stations and usernames are unique;
/// - seat uniqueness per trip is enforced atomically at insertion;
/// - `create_order` is all-or-nothing: any ticket failure leaves no trace
///   of the order.
#[async_trait]
pub trait RailwayStore: Send + Sync {
    // -- Train types --

    async fn create_train_type(&self, new: NewTrainType) -> Result<TrainType>;
    async fn list_train_types(&self) -> Result<Vec<TrainType>>;
    async fn get_train_type(&self, id: TrainTypeId) -> Result<TrainType>;
    async fn update_train_type(&self, id: TrainTypeId, new: NewTrainType) -> Result<TrainType>;
    async fn delete_train_type(&self, id: TrainTypeId) -> Result<()>;

    // -- Trains --

    async fn create_train(&self, new: NewTrain) -> Result<Train>;
    /// Listed with type name and capacity resolved; name-filterable.
    async fn list_trains(&self, filter: NameFilter) -> Result<Vec<TrainView>>;
    async fn get_train(&self, id: TrainId) -> Result<TrainView>;
    async fn update_train(&self, id: TrainId, new: NewTrain) -> Result<Train>;
    async fn delete_train(&self, id: TrainId) -> Result<()>;

    // -- Crews --

    async fn create_crew(&self, new: NewCrew) -> Result<Crew>;
    async fn list_crews(&self) -> Result<Vec<Crew>>;
    async fn get_crew(&self, id: CrewId) -> Result<Crew>;
    async fn update_crew(&self, id: CrewId, new: NewCrew) -> Result<Crew>;
    async fn delete_crew(&self, id: CrewId) -> Result<()>;

    // -- Stations --

    async fn create_station(&self, new: NewStation) -> Result<Station>;
    async fn list_stations(&self, filter: NameFilter) -> Result<Vec<Station>>;
    async fn get_station(&self, id: StationId) -> Result<Station>;
    async fn update_station(&self, id: StationId, new: NewStation) -> Result<Station>;
    async fn delete_station(&self, id: StationId) -> Result<()>;

    // -- Routes --

    async fn create_route(&self, new: NewRoute) -> Result<Route>;
    async fn list_routes(&self) -> Result<Vec<RouteSummary>>;
    async fn get_route(&self, id: RouteId) -> Result<RouteDetail>;
    async fn update_route(&self, id: RouteId, new: NewRoute) -> Result<Route>;
    async fn delete_route(&self, id: RouteId) -> Result<()>;

    // -- Trips --

    async fn create_trip(&self, new: NewTrip) -> Result<Trip>;
    /// Listing rows carry live `tickets_available`, computed at query time.
    async fn list_trips(&self, filter: TripFilter) -> Result<Vec<TripSummary>>;
    async fn get_trip(&self, id: TripId) -> Result<TripDetail>;
    async fn update_trip(&self, id: TripId, new: NewTrip) -> Result<Trip>;
    async fn delete_trip(&self, id: TripId) -> Result<()>;

    // -- Orders --

    /// Atomically creates an order with all requested tickets.
    ///
    /// Validates each request against the trip's train layout, then inserts;
    /// any range error, unknown trip or seat conflict rolls the whole
    /// transaction back, including the order row itself.
    async fn create_order(
        &self,
        owner: UserId,
        tickets: Vec<TicketRequest>,
    ) -> Result<OrderView>;

    /// Owner-scoped order history, newest first.
    async fn list_orders(&self, owner: UserId, page: PageRequest) -> Result<Page<OrderView>>;

    /// Single order lookup, still owner-scoped.
    async fn get_order(&self, owner: UserId, id: OrderId) -> Result<OrderView>;

    // -- Identity --

    async fn register_user(&self, new: NewUser) -> Result<User>;
    /// Verifies credentials and issues a fresh bearer token.
    async fn login(&self, username: &str, password: &str) -> Result<String>;
    /// Resolves a bearer token to its user, if the token is known.
    async fn user_for_token(&self, token: &str) -> Result<Option<User>>;
    async fn get_user(&self, id: UserId) -> Result<User>;
    async fn update_user(&self, id: UserId, new: NewUser) -> Result<User>;
}

use chrono::NaiveDate;
use serenity::async_trait;
use thiserror::Error;

use crate::models::event::{CalendarEvent, CreatedEvent, EventChanges, NewEvent};

/// Upper bound on records pulled for client-side search and date filtering.
pub const SEARCH_FETCH_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_RESULTS: usize = 10;

/// Backend failure, shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// CRUD over events keyed by opaque backend ids.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn create_event(&self, event: &NewEvent) -> GatewayResult<CreatedEvent>;

    /// Upcoming events, in backend order.
    async fn list_events(&self, max_results: usize) -> GatewayResult<Vec<CalendarEvent>>;

    /// Any non-cancelled events, used for client-side filtering.
    async fn fetch_events(&self, limit: usize) -> GatewayResult<Vec<CalendarEvent>>;

    /// Returns the event link when the backend provides one.
    async fn update_event(&self, id: &str, changes: &EventChanges) -> GatewayResult<String>;

    async fn delete_event(&self, id: &str) -> GatewayResult<()>;
}

pub async fn search_events<G: CalendarGateway + ?Sized>(
    gateway: &G,
    query: &str,
    max_results: usize,
) -> GatewayResult<Vec<CalendarEvent>> {
    let events = gateway.fetch_events(SEARCH_FETCH_LIMIT).await?;
    Ok(events
        .into_iter()
        .filter(|event| event.matches(query))
        .take(max_results)
        .collect())
}

pub async fn events_for_date<G: CalendarGateway + ?Sized>(
    gateway: &G,
    date: NaiveDate,
) -> GatewayResult<Vec<CalendarEvent>> {
    let events = gateway.fetch_events(SEARCH_FETCH_LIMIT).await?;
    Ok(events
        .into_iter()
        .filter(|event| event.start_date() == Some(date))
        .collect())
}

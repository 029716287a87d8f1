use pulse_domain::id::EventId;
use pulse_domain::pagination::RecentWindow;

use crate::domain::repository::EventRepository;
use crate::domain::types::EventView;
use crate::error::EventsServiceError;

/// Most recent events, newest first, at most 50.
pub struct RecentEventsUseCase<E>
where
    E: EventRepository,
{
    pub events: E,
}

impl<E> RecentEventsUseCase<E>
where
    E: EventRepository,
{
    pub async fn execute(
        &self,
        window: RecentWindow,
    ) -> Result<Vec<EventView>, EventsServiceError> {
        let events = self.events.list_recent(window.clamped()).await?;
        Ok(events.into_iter().map(EventView::from).collect())
    }
}

pub struct GetEventUseCase<E>
where
    E: EventRepository,
{
    pub events: E,
}

impl<E> GetEventUseCase<E>
where
    E: EventRepository,
{
    pub async fn execute(&self, event_id: &EventId) -> Result<EventView, EventsServiceError> {
        self.events
            .find_by_event_id(event_id)
            .await?
            .map(EventView::from)
            .ok_or(EventsServiceError::EventNotFound)
    }
}

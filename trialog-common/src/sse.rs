//! Server-Sent Events (SSE) utilities
//!
//! Bridges the in-process EventBus onto an axum SSE response so the
//! dashboard can recompute on every store mutation.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::events::EventBus;

/// Create an SSE stream that relays every bus event to the client
///
/// Each TrialogEvent becomes one SSE message whose event name is the
/// variant name and whose data is the serialized event. A heartbeat
/// keep-alive comment is sent every 15 seconds.
pub fn event_bus_sse_stream(
    bus: Arc<EventBus>,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "New SSE client connected to {} events ({} subscribers)",
        service_name,
        bus.subscriber_count() + 1
    );

    let rx = bus.subscribe();
    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => Event::default()
                .event(event.event_type())
                .json_data(&event)
                .ok()
                .map(Ok),
            Err(e) => {
                // Lagged receiver; drop the gap and keep streaming
                warn!("SSE client lagged: {:?}", e);
                None
            }
        }
    });

    let stream = async_stream::stream! {
        // Initial connected status before any domain events
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        futures::pin_mut!(events);
        while let Some(item) = events.next().await {
            yield item;
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

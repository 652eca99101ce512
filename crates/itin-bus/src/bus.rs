//! Per-itinerary multi-subscriber broadcast channel.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use itin_model::ItineraryId;

use crate::event::BusEvent;

const DEFAULT_BUFFER: usize = 64;
const DEFAULT_IDLE_WINDOW: Duration = Duration::from_secs(5 * 60);

struct Channel {
    sender: broadcast::Sender<BusEvent>,
    last_publish_epoch_ms: AtomicI64,
}

/// A live subscription. Dropping it unsubscribes (the broadcast receiver
/// is reclaimed and `receiver_count` drops accordingly).
pub struct Subscription {
    itinerary_id: ItineraryId,
    receiver: broadcast::Receiver<BusEvent>,
    lossy: bool,
}

impl Subscription {
    /// Receive the next event. Returns `None` if the channel was closed
    /// (all senders dropped, which does not happen while the `EventBus`
    /// itself is alive). Marks the subscription lossy the first time a
    /// lagged receiver skips buffered events.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    self.lossy = true;
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    #[must_use]
    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    #[must_use]
    pub fn itinerary_id(&self) -> &ItineraryId {
        &self.itinerary_id
    }
}

/// Per-itinerary pub/sub bus. Best-effort, non-blocking, in-order per
/// publisher; slow subscribers drop oldest buffered events rather than
/// back-pressuring publishers.
pub struct EventBus {
    channels: DashMap<ItineraryId, Arc<Channel>>,
    buffer: usize,
    idle_window: Duration,
    started_at: Instant,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_BUFFER, DEFAULT_IDLE_WINDOW)
    }

    #[must_use]
    pub fn with_config(buffer: usize, idle_window: Duration) -> Self {
        Self {
            channels: DashMap::new(),
            buffer,
            idle_window,
            started_at: Instant::now(),
        }
    }

    fn channel_for(&self, id: &ItineraryId) -> Arc<Channel> {
        self.channels
            .entry(id.clone())
            .or_insert_with(|| {
                let (sender, _) = broadcast::channel(self.buffer);
                Arc::new(Channel { sender, last_publish_epoch_ms: AtomicI64::new(0) })
            })
            .clone()
    }

    /// Subscribe to all events for one itinerary. Creates the channel
    /// lazily if this is the first subscriber or publisher.
    pub fn subscribe(&self, id: &ItineraryId) -> Subscription {
        let channel = self.channel_for(id);
        Subscription { itinerary_id: id.clone(), receiver: channel.sender.subscribe(), lossy: false }
    }

    /// Publish an event. Non-blocking: if there are no subscribers this is
    /// a no-op (broadcast::send fails silently in that case, matching
    /// "best-effort" semantics).
    pub fn publish(&self, event: BusEvent) {
        let id = event.itinerary_id().clone();
        let channel = self.channel_for(&id);
        let now_ms = self.started_at.elapsed().as_millis() as i64;
        channel.last_publish_epoch_ms.store(now_ms, Ordering::Relaxed);
        let _ = channel.sender.send(event);
    }

    /// Sweep channels with no subscribers that have been idle (no
    /// publications) for longer than the configured idle window.
    pub fn reap_idle(&self) {
        let now_ms = self.started_at.elapsed().as_millis() as i64;
        let idle_ms = self.idle_window.as_millis() as i64;
        self.channels.retain(|_, channel| {
            let has_subscribers = channel.sender.receiver_count() > 0;
            let last = channel.last_publish_epoch_ms.load(Ordering::Relaxed);
            has_subscribers || now_ms.saturating_sub(last) < idle_ms
        });
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AgentEvent, AgentEventStatus, AgentKind, BusEvent};

    fn agent_event(id: &ItineraryId) -> BusEvent {
        BusEvent::Agent(AgentEvent {
            agent_id: "a1".to_string(),
            agent_kind: AgentKind::Skeleton,
            status: AgentEventStatus::Running,
            progress: 50,
            message: None,
            step: None,
            timestamp: 0,
            itinerary_id: id.clone(),
        })
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let id = ItineraryId::from_string("trip-1");
        let mut sub = bus.subscribe(&id);
        bus.publish(agent_event(&id));
        let received = sub.recv().await.unwrap();
        assert_eq!(received.itinerary_id(), &id);
    }

    #[tokio::test]
    async fn late_subscriber_does_not_see_past_events() {
        let bus = EventBus::new();
        let id = ItineraryId::from_string("trip-1");
        bus.publish(agent_event(&id));
        let mut sub = bus.subscribe(&id);
        bus.publish(agent_event(&id));
        // only the second publish should be visible
        let received = sub.recv().await.unwrap();
        assert_eq!(received.itinerary_id(), &id);
        assert!(tokio::time::timeout(Duration::from_millis(20), sub.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn slow_subscriber_becomes_lossy_without_blocking_publisher() {
        let bus = EventBus::with_config(2, DEFAULT_IDLE_WINDOW);
        let id = ItineraryId::from_string("trip-1");
        let mut sub = bus.subscribe(&id);
        for _ in 0..10 {
            bus.publish(agent_event(&id));
        }
        // publisher never blocked (loop above completed); subscriber can
        // still drain what remains and will observe a lag.
        let mut saw_lag = false;
        while let Some(_event) = sub.recv().await {
            if sub.is_lossy() {
                saw_lag = true;
                break;
            }
        }
        assert!(saw_lag);
    }

    #[tokio::test]
    async fn reap_idle_removes_unsubscribed_channels_past_window() {
        let bus = EventBus::with_config(DEFAULT_BUFFER, Duration::from_millis(0));
        let id = ItineraryId::from_string("trip-1");
        {
            let _sub = bus.subscribe(&id);
            bus.publish(agent_event(&id));
        }
        // subscriber dropped, idle window is zero
        tokio::time::sleep(Duration::from_millis(5)).await;
        bus.reap_idle();
        assert_eq!(bus.channel_count(), 0);
    }
}

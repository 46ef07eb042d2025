//! Bounded per-kind host event channels.
//!
//! Each [`HostEventKind`] gets its own bounded channel, so a slow consumer of
//! one kind applies backpressure to the runtime without interleaving with
//! other kinds. Publishing waits for capacity. A kind whose receiver is gone
//! is logged once and discarded from then on.

use std::collections::HashMap;

use cubelink_client::{HostEvent, HostEventKind};
use tokio::sync::mpsc;

/// Create a bus with `capacity` slots per event kind.
#[must_use]
pub fn event_bus(capacity: usize) -> (EventBus, EventStreams) {
    let mut senders = HashMap::new();
    let mut receivers = HashMap::new();
    for kind in HostEventKind::ALL {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        senders.insert(kind, tx);
        receivers.insert(kind, rx);
    }
    (EventBus { senders }, EventStreams { receivers })
}

/// Publishing side, owned by the runtime.
#[derive(Debug)]
pub struct EventBus {
    senders: HashMap<HostEventKind, mpsc::Sender<HostEvent>>,
}

impl EventBus {
    /// Publish one event, waiting for capacity on its channel.
    pub async fn publish(&mut self, event: HostEvent) {
        let kind = event.kind();
        let Some(sender) = self.senders.get(&kind) else {
            tracing::trace!(?kind, "event kind discarded");
            return;
        };
        if sender.send(event).await.is_err() {
            tracing::warn!(?kind, "event receiver dropped, discarding this kind");
            self.senders.remove(&kind);
        }
    }

    /// True while someone still listens for `kind`.
    #[must_use]
    pub fn is_open(&self, kind: HostEventKind) -> bool {
        self.senders.contains_key(&kind)
    }
}

/// Receiving side, handed to the host.
///
/// Take the receiver for every kind the host consumes. Receivers never taken
/// are dropped with this value, which discards their kind.
#[derive(Debug)]
pub struct EventStreams {
    receivers: HashMap<HostEventKind, mpsc::Receiver<HostEvent>>,
}

impl EventStreams {
    /// Take the receiver for one kind. `None` if already taken.
    pub fn take(&mut self, kind: HostEventKind) -> Option<mpsc::Receiver<HostEvent>> {
        self.receivers.remove(&kind)
    }

    /// Take every remaining receiver.
    pub fn take_all(&mut self) -> Vec<(HostEventKind, mpsc::Receiver<HostEvent>)> {
        HostEventKind::ALL
            .into_iter()
            .filter_map(|kind| self.receivers.remove(&kind).map(|rx| (kind, rx)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cubelink_client::LinkState;

    use super::*;

    #[tokio::test]
    async fn events_route_by_kind() {
        let (mut bus, mut streams) = event_bus(4);
        let mut battery = streams.take(HostEventKind::Battery).unwrap();
        let mut link = streams.take(HostEventKind::LinkState).unwrap();

        bus.publish(HostEvent::Battery { level: 80 }).await;
        bus.publish(HostEvent::LinkState(LinkState::Connected)).await;

        assert_eq!(battery.recv().await, Some(HostEvent::Battery { level: 80 }));
        assert_eq!(link.recv().await, Some(HostEvent::LinkState(LinkState::Connected)));
        assert!(streams.take(HostEventKind::Battery).is_none());
    }

    #[tokio::test]
    async fn dropped_receiver_discards_kind() {
        let (mut bus, mut streams) = event_bus(4);
        drop(streams.take(HostEventKind::Battery));

        bus.publish(HostEvent::Battery { level: 10 }).await;
        assert!(!bus.is_open(HostEventKind::Battery));
        bus.publish(HostEvent::Battery { level: 11 }).await;
        assert!(bus.is_open(HostEventKind::Move));
    }

    #[tokio::test(start_paused = true)]
    async fn full_channel_applies_backpressure() {
        let (mut bus, mut streams) = event_bus(1);
        let mut battery = streams.take(HostEventKind::Battery).unwrap();

        bus.publish(HostEvent::Battery { level: 1 }).await;
        let blocked =
            tokio::time::timeout(Duration::from_secs(1), bus.publish(HostEvent::Battery { level: 2 }))
                .await;
        assert!(blocked.is_err());

        assert_eq!(battery.recv().await, Some(HostEvent::Battery { level: 1 }));
        bus.publish(HostEvent::Battery { level: 3 }).await;
        assert_eq!(battery.recv().await, Some(HostEvent::Battery { level: 3 }));
    }
}

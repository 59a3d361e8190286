use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Per-lobby SSE hubs, created lazily on first subscription.
pub struct LobbyHubs {
    hubs: DashMap<Uuid, SseHub>,
    capacity: usize,
}

impl LobbyHubs {
    /// Build an empty registry whose hubs buffer `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to the hub of `lobby_id`, creating it if needed.
    pub fn subscribe(&self, lobby_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(lobby_id)
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Send `event` to every subscriber of `lobby_id`. No-op when nobody listens.
    pub fn broadcast(&self, lobby_id: Uuid, event: ServerEvent) {
        if let Some(hub) = self.hubs.get(&lobby_id) {
            hub.broadcast(event);
        }
    }

    /// Drop the hub of `lobby_id` once its last subscriber went away.
    pub fn release(&self, lobby_id: Uuid) {
        self.hubs
            .remove_if(&lobby_id, |_, hub| hub.receiver_count() == 0);
    }

    /// Remove the hub unconditionally, ending every open stream.
    pub fn close(&self, lobby_id: Uuid) {
        self.hubs.remove(&lobby_id);
    }

    /// Number of lobbies currently holding a hub.
    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> ServerEvent {
        ServerEvent {
            event: Some(name.into()),
            data: "{}".into(),
        }
    }

    #[tokio::test]
    async fn events_reach_only_their_lobby() {
        let hubs = LobbyHubs::new(4);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut rx_first = hubs.subscribe(first);
        let mut rx_second = hubs.subscribe(second);

        hubs.broadcast(first, event("lobby.updated"));

        let received = rx_first.recv().await.unwrap();
        assert_eq!(received.event.as_deref(), Some("lobby.updated"));
        assert!(rx_second.try_recv().is_err());
    }

    #[test]
    fn release_keeps_hubs_with_listeners() {
        let hubs = LobbyHubs::new(4);
        let lobby = Uuid::new_v4();
        let rx = hubs.subscribe(lobby);

        hubs.release(lobby);
        assert_eq!(hubs.len(), 1);

        drop(rx);
        hubs.release(lobby);
        assert!(hubs.is_empty());
    }

    #[tokio::test]
    async fn close_ends_open_streams() {
        let hubs = LobbyHubs::new(4);
        let lobby = Uuid::new_v4();
        let mut rx = hubs.subscribe(lobby);

        hubs.close(lobby);

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}

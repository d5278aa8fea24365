//! The broadcast hub: fan-out of typed events to every live
//! subscriber.
//!
//! Mutation handlers and the simulation loops never talk to
//! connections directly. They enqueue [`Event`]s onto one FIFO mpsc
//! channel; the hub's own task ([`run_hub`]) consumes it and delivers
//! each event in order. Per-entity ordering is preserved (one queue)
//! while delivery latency is decoupled from mutation latency.
//!
//! Delivery is best-effort in two tiers:
//!
//! 1. **In-process listeners** via a `tokio::sync::broadcast` channel —
//!    a lagged or dropped listener is isolated by the channel itself
//!    and never blocks anyone else.
//! 2. **Network connections** — the event is serialized once and the
//!    text frame pushed to every registered connection's outbound
//!    queue. Any connection whose queue is gone is pruned from the
//!    registry on the spot.

use std::collections::BTreeMap;
use std::sync::Arc;

use menagerie_types::{ConnectionId, Event, UserId};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

/// Capacity of the in-process listener channel. A listener that falls
/// further behind than this skips ahead to the newest event.
const LISTENER_CAPACITY: usize = 256;

/// Live subscriber registry: outbound frame queues keyed by connection,
/// plus the owning-user index used by targeted sends.
#[derive(Debug, Default)]
struct Registry {
    connections: BTreeMap<ConnectionId, UnboundedSender<String>>,
    users: BTreeMap<UserId, ConnectionId>,
}

/// Fan-out hub over all live subscribers.
#[derive(Debug)]
pub struct Hub {
    registry: RwLock<Registry>,
    listeners: broadcast::Sender<Event>,
}

impl Hub {
    /// Create a hub with an empty registry.
    pub fn new() -> Self {
        let (listeners, _) = broadcast::channel(LISTENER_CAPACITY);
        Self {
            registry: RwLock::new(Registry::default()),
            listeners,
        }
    }

    /// Register a new connection for `user_id`.
    ///
    /// Returns the connection identifier and the receiving end of the
    /// connection's outbound frame queue; the transport task forwards
    /// those frames to the socket.
    pub async fn register(&self, user_id: UserId) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::new();

        let mut registry = self.registry.write().await;
        registry.connections.insert(connection_id, tx);
        registry.users.insert(user_id, connection_id);

        debug!(%connection_id, %user_id, "Subscriber registered");
        (connection_id, rx)
    }

    /// Remove a connection (transport-level disconnect).
    pub async fn unregister(&self, connection_id: ConnectionId, user_id: UserId) {
        let mut registry = self.registry.write().await;
        let _ = registry.connections.remove(&connection_id);
        // Only drop the user mapping if it still points at this
        // connection; a reconnect may already have replaced it.
        if registry.users.get(&user_id) == Some(&connection_id) {
            let _ = registry.users.remove(&user_id);
        }
        debug!(%connection_id, %user_id, "Subscriber unregistered");
    }

    /// Subscribe as an in-process listener.
    ///
    /// Listeners receive every broadcast event before network delivery
    /// starts. The channel isolates failures: one slow listener lags
    /// and skips, it never blocks the others.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.listeners.subscribe()
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }

    /// Deliver one event to every live subscriber.
    ///
    /// In-process listeners first, then every network connection; any
    /// connection that fails delivery is pruned from the registry.
    pub async fn broadcast(&self, event: &Event) {
        // send only errs when no listener is subscribed, which is fine.
        let _ = self.listeners.send(event.clone());

        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "Failed to serialize broadcast event");
                return;
            }
        };

        let mut registry = self.registry.write().await;
        let dead: Vec<ConnectionId> = registry
            .connections
            .iter()
            .filter(|(_, tx)| tx.send(frame.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();

        for connection_id in dead {
            let _ = registry.connections.remove(&connection_id);
            registry.users.retain(|_, conn| *conn != connection_id);
            debug!(%connection_id, "Pruned dead subscriber");
        }
    }

    /// Deliver one event to exactly the connection mapped to `user_id`,
    /// pruning it on failure. No-op when the user has no connection.
    pub async fn send_to_user(&self, user_id: UserId, event: &Event) {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "Failed to serialize targeted event");
                return;
            }
        };

        let mut registry = self.registry.write().await;
        let Some(connection_id) = registry.users.get(&user_id).copied() else {
            return;
        };
        let delivered = registry
            .connections
            .get(&connection_id)
            .is_some_and(|tx| tx.send(frame).is_ok());
        if !delivered {
            let _ = registry.connections.remove(&connection_id);
            let _ = registry.users.remove(&user_id);
            debug!(%connection_id, %user_id, "Pruned dead subscriber on targeted send");
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the hub's delivery task: consume the FIFO event queue until
/// every sender is gone.
pub async fn run_hub(hub: Arc<Hub>, mut events: UnboundedReceiver<Event>) {
    while let Some(event) = events.recv().await {
        hub.broadcast(&event).await;
    }
    debug!("Event queue closed; hub task exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use menagerie_types::PetId;

    use super::*;

    fn stats_event() -> Event {
        Event::PetRemoved { id: PetId::new() }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let hub = Hub::new();
        let (_, mut rx_a) = hub.register(UserId::new()).await;
        let (_, mut rx_b) = hub.register(UserId::new()).await;

        let event = stats_event();
        hub.broadcast(&event).await;

        let frame_a = rx_a.recv().await.unwrap();
        let frame_b = rx_b.recv().await.unwrap();
        assert_eq!(frame_a, frame_b);
        let parsed: Event = serde_json::from_str(&frame_a).unwrap();
        assert_eq!(parsed, event);
    }

    #[tokio::test]
    async fn dead_connections_are_pruned() {
        let hub = Hub::new();
        let (_, rx_dead) = hub.register(UserId::new()).await;
        let (_, mut rx_live) = hub.register(UserId::new()).await;
        drop(rx_dead);

        hub.broadcast(&stats_event()).await;
        assert_eq!(hub.connection_count().await, 1);
        assert!(rx_live.recv().await.is_some());
    }

    #[tokio::test]
    async fn listeners_receive_before_connections_and_in_isolation() {
        let hub = Hub::new();
        let mut listener = hub.subscribe();
        // A second listener dropped immediately: must not disturb the
        // first one.
        drop(hub.subscribe());

        let event = stats_event();
        hub.broadcast(&event).await;
        assert_eq!(listener.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn send_to_user_targets_one_connection() {
        let hub = Hub::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let (_, mut rx_alice) = hub.register(alice).await;
        let (_, mut rx_bob) = hub.register(bob).await;

        hub.send_to_user(alice, &stats_event()).await;
        assert!(rx_alice.recv().await.is_some());
        assert!(rx_bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_user_prunes_on_failure() {
        let hub = Hub::new();
        let alice = UserId::new();
        let (_, rx) = hub.register(alice).await;
        drop(rx);

        hub.send_to_user(alice, &stats_event()).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn unregister_keeps_newer_mapping_for_same_user() {
        let hub = Hub::new();
        let alice = UserId::new();
        let (old_conn, _old_rx) = hub.register(alice).await;
        let (_new_conn, mut new_rx) = hub.register(alice).await;

        // The stale disconnect of the old connection must not unmap the
        // fresh one.
        hub.unregister(old_conn, alice).await;
        hub.send_to_user(alice, &stats_event()).await;
        assert!(new_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn run_hub_drains_the_queue_in_order() {
        let hub = Arc::new(Hub::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_hub(Arc::clone(&hub), rx));

        let (_, mut frames) = hub.register(UserId::new()).await;
        let first = PetId::new();
        let second = PetId::new();
        tx.send(Event::PetRemoved { id: first }).unwrap();
        tx.send(Event::PetRemoved { id: second }).unwrap();
        drop(tx);
        task.await.unwrap();

        let frame: Event = serde_json::from_str(&frames.recv().await.unwrap()).unwrap();
        assert_eq!(frame, Event::PetRemoved { id: first });
        let frame: Event = serde_json::from_str(&frames.recv().await.unwrap()).unwrap();
        assert_eq!(frame, Event::PetRemoved { id: second });
    }
}

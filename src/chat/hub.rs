//! Chat broadcast hub
//!
//! A single task owns the client table. Clients register, unregister and
//! broadcast by sending commands to it; nothing else touches the table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Per-client outbound queue capacity
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

enum HubCommand {
    Register {
        id: u64,
        queue: mpsc::Sender<String>,
    },
    Unregister(u64),
    Broadcast(String),
    Count(oneshot::Sender<usize>),
}

/// Cloneable handle to a running hub
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
    next_client_id: Arc<AtomicU64>,
    queue_capacity: usize,
}

impl HubHandle {
    /// Register a client; returns its id and the queue its write pump drains
    pub fn register(&self) -> (u64, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (queue, rx) = mpsc::channel(self.queue_capacity);
        let _ = self.commands.send(HubCommand::Register { id, queue });
        (id, rx)
    }

    /// Remove a client and close its queue
    pub fn unregister(&self, id: u64) {
        let _ = self.commands.send(HubCommand::Unregister(id));
    }

    /// Send a message to every registered client
    pub fn broadcast(&self, message: String) {
        let _ = self.commands.send(HubCommand::Broadcast(message));
    }

    /// Number of registered clients, or `None` if the hub has stopped
    pub async fn client_count(&self) -> Option<usize> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(HubCommand::Count(tx)).ok()?;
        rx.await.ok()
    }
}

impl std::fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

/// Hub run loop state
pub struct Hub {
    name: String,
    commands: mpsc::UnboundedReceiver<HubCommand>,
    clients: HashMap<u64, mpsc::Sender<String>>,
}

impl Hub {
    /// Create a hub and its handle
    pub fn new(name: impl Into<String>) -> (Self, HubHandle) {
        Self::with_capacity(name, CLIENT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(name: impl Into<String>, queue_capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Self {
            name: name.into(),
            commands: rx,
            clients: HashMap::new(),
        };
        let handle = HubHandle {
            commands: tx,
            next_client_id: Arc::new(AtomicU64::new(1)),
            queue_capacity: queue_capacity.max(1),
        };
        (hub, handle)
    }

    /// Start the run loop on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process commands until every handle is dropped
    pub async fn run(mut self) {
        tracing::debug!(hub = %self.name, "Chat hub started");

        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register { id, queue } => {
                    self.clients.insert(id, queue);
                    tracing::debug!(hub = %self.name, client = id, clients = self.clients.len(), "Chat client registered");
                }
                HubCommand::Unregister(id) => {
                    if self.clients.remove(&id).is_some() {
                        tracing::debug!(hub = %self.name, client = id, "Chat client unregistered");
                    }
                }
                HubCommand::Broadcast(message) => self.broadcast(message),
                HubCommand::Count(reply) => {
                    let _ = reply.send(self.clients.len());
                }
            }
        }

        tracing::debug!(hub = %self.name, "Chat hub stopped");
    }

    fn broadcast(&mut self, message: String) {
        let name = &self.name;
        // Slow or vanished clients are dropped rather than waited for
        self.clients.retain(|id, queue| match queue.try_send(message.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(hub = %name, client = *id, "Dropping unresponsive chat client");
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let (hub, handle) = Hub::new("room-a");
        hub.spawn();

        let (_a, mut rx_a) = handle.register();
        let (_b, mut rx_b) = handle.register();
        handle.broadcast("hello".into());

        assert_eq!(rx_a.recv().await.as_deref(), Some("hello"));
        assert_eq!(rx_b.recv().await.as_deref(), Some("hello"));
        assert_eq!(handle.client_count().await, Some(2));
    }

    #[tokio::test]
    async fn test_unregister_closes_queue() {
        let (hub, handle) = Hub::new("room-a");
        hub.spawn();

        let (id, mut rx) = handle.register();
        handle.unregister(id);

        assert_eq!(rx.recv().await, None);
        assert_eq!(handle.client_count().await, Some(0));
    }

    #[tokio::test]
    async fn test_full_client_dropped() {
        let (hub, handle) = Hub::with_capacity("room-a", 1);
        hub.spawn();

        let (_slow, mut slow_rx) = handle.register();
        let (_fast, mut fast_rx) = handle.register();

        handle.broadcast("one".into());
        assert_eq!(fast_rx.recv().await.as_deref(), Some("one"));

        // The slow client never drained "one"
        handle.broadcast("two".into());
        assert_eq!(fast_rx.recv().await.as_deref(), Some("two"));
        assert_eq!(handle.client_count().await, Some(1));

        assert_eq!(slow_rx.recv().await.as_deref(), Some("one"));
        assert_eq!(slow_rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_hub_stops_without_handles() {
        let (hub, handle) = Hub::new("room-a");
        let task = hub.spawn();

        drop(handle);
        task.await.unwrap();
    }
}

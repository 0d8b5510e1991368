//! In-process notification hub for live wagering progress updates.
//!
//! A process-wide registry mapping player id to bounded delivery queues,
//! one per subscriber. Publishing is a non-blocking fan-out: a full queue
//! drops that subscriber's update rather than stalling the publisher, so
//! delivery is best-effort, at most once per slot. Subscriptions are RAII
//! handles; dropping one unregisters its queue.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::models::WageringUpdate;

/// Capacity of each subscriber's delivery queue.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 10;

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<Uuid, Vec<(u64, mpsc::Sender<WageringUpdate>)>>,
}

/// Publish/subscribe registry for per-player wagering updates.
///
/// Cheap to clone; clones share the same registry. Many publishers may
/// notify concurrently under the read lock; subscribe and unsubscribe take
/// the write lock.
#[derive(Clone, Default)]
pub struct NotificationHub {
    inner: Arc<RwLock<Registry>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new bounded queue for the player and return its handle.
    pub fn subscribe(&self, player_id: Uuid) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        let mut registry = self.write();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .subscribers
            .entry(player_id)
            .or_default()
            .push((id, tx));

        Subscription {
            registry: Arc::clone(&self.inner),
            player_id,
            id,
            rx,
        }
    }

    /// Fan the update out to every queue registered for the player.
    ///
    /// Never blocks: a full queue simply misses this update.
    pub fn notify(&self, player_id: Uuid, update: WageringUpdate) {
        let registry = self.read();
        if let Some(queues) = registry.subscribers.get(&player_id) {
            for (_, tx) in queues {
                let _ = tx.try_send(update.clone());
            }
        }
    }

    /// Number of queues currently registered for the player.
    pub fn subscriber_count(&self, player_id: Uuid) -> usize {
        self.read()
            .subscribers
            .get(&player_id)
            .map_or(0, |queues| queues.len())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to one subscriber queue; unregisters itself on drop.
pub struct Subscription {
    registry: Arc<RwLock<Registry>>,
    player_id: Uuid,
    id: u64,
    rx: mpsc::Receiver<WageringUpdate>,
}

impl Subscription {
    /// Receive the next update, waiting until one arrives.
    ///
    /// Returns `None` once the hub side of the queue is gone.
    pub async fn recv(&mut self) -> Option<WageringUpdate> {
        self.rx.recv().await
    }

    /// Receive the next update without waiting.
    pub fn try_recv(&mut self) -> Result<WageringUpdate, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        let now_empty = match registry.subscribers.get_mut(&self.player_id) {
            Some(queues) => {
                queues.retain(|(id, _)| *id != self.id);
                queues.is_empty()
            }
            None => false,
        };
        if now_empty {
            registry.subscribers.remove(&self.player_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn update(player_id: Uuid, completed: bool) -> WageringUpdate {
        WageringUpdate {
            player_bonus_id: Uuid::new_v4(),
            player_id,
            wagering_completed: dec!(500),
            wagering_required: dec!(1000),
            percentage_complete: 50.0,
            completed,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_to_all_player_subscribers() {
        let hub = NotificationHub::new();
        let player = Uuid::new_v4();
        let mut sub_a = hub.subscribe(player);
        let mut sub_b = hub.subscribe(player);
        let mut other = hub.subscribe(Uuid::new_v4());

        hub.notify(player, update(player, false));

        assert!(sub_a.try_recv().is_ok());
        assert!(sub_b.try_recv().is_ok());
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_drops_updates_without_blocking() {
        let hub = NotificationHub::new();
        let player = Uuid::new_v4();
        let mut sub = hub.subscribe(player);

        for _ in 0..SUBSCRIBER_QUEUE_CAPACITY + 5 {
            hub.notify(player, update(player, false));
        }

        let mut received = 0;
        while sub.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_QUEUE_CAPACITY);
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters_queue() {
        let hub = NotificationHub::new();
        let player = Uuid::new_v4();

        let sub_a = hub.subscribe(player);
        let sub_b = hub.subscribe(player);
        assert_eq!(hub.subscriber_count(player), 2);

        drop(sub_a);
        assert_eq!(hub.subscriber_count(player), 1);
        drop(sub_b);
        assert_eq!(hub.subscriber_count(player), 0);
    }

    #[tokio::test]
    async fn recv_waits_for_published_update() {
        let hub = NotificationHub::new();
        let player = Uuid::new_v4();
        let mut sub = hub.subscribe(player);

        let publisher = hub.clone();
        tokio::spawn(async move {
            publisher.notify(player, update(player, true));
        });

        let received = sub.recv().await.expect("hub dropped");
        assert!(received.completed);
        assert_eq!(received.player_id, player);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock, broadcast};
use uuid::Uuid;

use parlor_types::events::ChatEvent;

/// The single global chat room: explicit membership plus a broadcast
/// channel fanning events out to every joined connection.
#[derive(Clone)]
pub struct ChatRoom {
    inner: Arc<RoomInner>,
}

struct RoomInner {
    broadcast_tx: broadcast::Sender<ChatEvent>,

    /// Joined connections: connection id -> account id. Entries are removed
    /// on disconnect; a connection that never joined is never in here.
    members: RwLock<HashMap<Uuid, Uuid>>,

    /// Serializes the persist-then-broadcast step of the send pipeline so
    /// events fan out in the order their persistence completed.
    send_lock: Mutex<()>,
}

impl ChatRoom {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(RoomInner {
                broadcast_tx,
                members: RwLock::new(HashMap::new()),
                send_lock: Mutex::new(()),
            }),
        }
    }

    /// Admit a connection to the room. Returns the receiver carrying all
    /// events broadcast from this point on.
    pub async fn join(&self, conn_id: Uuid, account_id: Uuid) -> broadcast::Receiver<ChatEvent> {
        self.inner.members.write().await.insert(conn_id, account_id);
        self.inner.broadcast_tx.subscribe()
    }

    pub async fn leave(&self, conn_id: Uuid) {
        self.inner.members.write().await.remove(&conn_id);
    }

    pub async fn is_member(&self, conn_id: Uuid) -> bool {
        self.inner.members.read().await.contains_key(&conn_id)
    }

    pub async fn member_count(&self) -> usize {
        self.inner.members.read().await.len()
    }

    /// Fan an event out to every joined connection.
    pub fn broadcast(&self, event: ChatEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Hold this across persist + broadcast of a message.
    pub async fn lock_sends(&self) -> MutexGuard<'_, ()> {
        self.inner.send_lock.lock().await
    }
}

impl Default for ChatRoom {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use parlor_db::Database;
use parlor_types::ban::ban_active;
use parlor_types::events::{ChatCommand, ChatEvent};
use parlor_types::models::Account;

use crate::filter::WordFilter;
use crate::room::ChatRoom;

/// How many persisted messages are replayed to a freshly joined client.
const REPLAY_LIMIT: u32 = 50;

/// Drive a single WebSocket connection through the chat pipeline.
///
/// The connection starts unauthenticated. A `join-chat` command naming an
/// existing, non-banned account admits it to the room; `send-message` is
/// ignored until then. Refusals are silent: the transport never learns
/// whether it was the account, a ban, or the command that failed.
pub async fn handle_socket(
    socket: WebSocket,
    room: ChatRoom,
    db: Arc<Database>,
    filter: Arc<WordFilter>,
) {
    let conn_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();

    // All outbound frames funnel through one channel so the writer owns
    // the sink while replay and broadcast forwarding race freely.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ChatEvent>();
    let write_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut joined: Option<Account> = None;
    let mut forward_task: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ChatCommand>(&text) {
                Ok(ChatCommand::Join { account_id }) => {
                    if joined.is_some() {
                        continue;
                    }
                    let Some(account) = resolve_join(&db, account_id).await else {
                        debug!("connection {} refused for account {}", conn_id, account_id);
                        continue;
                    };
                    let rx = room.join(conn_id, account_id).await;
                    info!("{} ({}) joined the chat room", account.username, account_id);

                    for event in replay_history(&db).await {
                        let _ = out_tx.send(event);
                    }
                    forward_task = Some(tokio::spawn(forward_broadcasts(rx, out_tx.clone())));
                    joined = Some(account);
                }
                Ok(ChatCommand::Send { message }) => {
                    let Some(account) = &joined else {
                        continue;
                    };
                    process_send(&db, &room, &filter, account.id, &message).await;
                }
                Err(e) => {
                    warn!(
                        "connection {} bad command: {} -- raw: {}",
                        conn_id,
                        e,
                        &text[..text.len().min(200)]
                    );
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    if let Some(task) = forward_task {
        task.abort();
    }
    write_task.abort();
    room.leave(conn_id).await;
    if let Some(account) = joined {
        info!("{} ({}) left the chat room", account.username, account.id);
    }
}

/// Relay room broadcasts into this connection's outbound channel.
async fn forward_broadcasts(
    mut rx: broadcast::Receiver<ChatEvent>,
    out_tx: mpsc::UnboundedSender<ChatEvent>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if out_tx.send(event).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("broadcast receiver lagged by {} messages", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Check whether `account_id` may enter the room: the account must exist
/// and its ban must not be in effect. `None` means refuse (silently).
pub(crate) async fn resolve_join(db: &Arc<Database>, account_id: Uuid) -> Option<Account> {
    let account = fetch_account(db, account_id).await?;
    if ban_active(&account, Utc::now()) {
        return None;
    }
    Some(account)
}

/// The send path: re-fetch the account, re-check the ban, filter, persist,
/// broadcast. Returns the broadcast event, or `None` when the message was
/// dropped. A ban applied after join takes effect here, on the very next
/// send.
pub(crate) async fn process_send(
    db: &Arc<Database>,
    room: &ChatRoom,
    filter: &WordFilter,
    account_id: Uuid,
    text: &str,
) -> Option<ChatEvent> {
    let account = fetch_account(db, account_id).await?;
    if ban_active(&account, Utc::now()) {
        debug!("dropping message from banned account {}", account_id);
        return None;
    }

    let filtered = filter.apply(text);
    let id = Uuid::new_v4();
    let now = Utc::now();

    let event = ChatEvent::NewMessage {
        username: account.username,
        message: filtered,
        timestamp: now,
    };

    // The lock spans persist + broadcast: events fan out in the order
    // their persistence completed.
    let _ordering = room.lock_sends().await;

    let persist_db = db.clone();
    let persist_event = event.clone();
    let persisted = tokio::task::spawn_blocking(move || {
        let ChatEvent::NewMessage { username, message, .. } = &persist_event;
        persist_db.insert_chat_message(&id.to_string(), username, message, now)
    })
    .await;
    match persisted {
        Ok(Ok(())) => {
            room.broadcast(event.clone());
            Some(event)
        }
        Ok(Err(e)) => {
            warn!("failed to persist chat message: {}", e);
            None
        }
        Err(e) => {
            warn!("spawn_blocking join error: {}", e);
            None
        }
    }
}

async fn fetch_account(db: &Arc<Database>, account_id: Uuid) -> Option<Account> {
    let db = db.clone();
    let row = tokio::task::spawn_blocking(move || db.get_account_by_id(&account_id.to_string()))
        .await
        .map_err(|e| warn!("spawn_blocking join error: {}", e))
        .ok()?
        .map_err(|e| warn!("account lookup failed: {}", e))
        .ok()??;
    row.into_account()
        .map_err(|e| warn!("corrupt account row: {}", e))
        .ok()
}

/// Recent history, oldest first, for replay to a joining client.
async fn replay_history(db: &Arc<Database>) -> Vec<ChatEvent> {
    let db = db.clone();
    let rows = tokio::task::spawn_blocking(move || db.recent_chat_messages(REPLAY_LIMIT)).await;
    let rows = match rows {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => {
            warn!("failed to load chat history: {}", e);
            return Vec::new();
        }
        Err(e) => {
            warn!("spawn_blocking join error: {}", e);
            return Vec::new();
        }
    };
    rows.into_iter()
        .rev()
        .filter_map(|row| match row.into_message() {
            Ok(msg) => Some(ChatEvent::NewMessage {
                username: msg.username,
                message: msg.message,
                timestamp: msg.timestamp,
            }),
            Err(e) => {
                warn!("skipping corrupt chat message: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use parlor_db::queries::NewAccount;
    use tokio::sync::broadcast::error::TryRecvError;

    fn test_db_with_account(username: &str) -> (Arc<Database>, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        db.create_account(&NewAccount {
            id: &id.to_string(),
            username,
            email: &format!("{username}@example.com"),
            password_hash: "digest",
            coins: 100,
            admin_level: 0,
        })
        .unwrap();
        (Arc::new(db), id)
    }

    #[tokio::test]
    async fn join_refused_for_unknown_account() {
        let (db, _) = test_db_with_account("ana");
        assert!(resolve_join(&db, Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn join_refused_while_ban_active() {
        let (db, id) = test_db_with_account("ana");
        db.set_ban(&id.to_string(), "spam", Some(Utc::now() + Duration::hours(1)))
            .unwrap();
        assert!(resolve_join(&db, id).await.is_none());

        // An expired ban no longer blocks the door.
        db.set_ban(&id.to_string(), "spam", Some(Utc::now() - Duration::hours(1)))
            .unwrap();
        assert!(resolve_join(&db, id).await.is_some());
    }

    #[tokio::test]
    async fn send_persists_filters_and_broadcasts() {
        let (db, id) = test_db_with_account("ana");
        let room = ChatRoom::new();
        let filter = WordFilter::new(["darn"]);
        let mut rx = room.join(Uuid::new_v4(), id).await;

        let event = process_send(&db, &room, &filter, id, "well darn it").await;
        let Some(ChatEvent::NewMessage { message, username, .. }) = event else {
            panic!("message was dropped");
        };
        assert_eq!(username, "ana");
        assert_eq!(message, "well **** it");

        // Broadcast carries the filtered text, and only that.
        let ChatEvent::NewMessage { message, .. } = rx.recv().await.unwrap();
        assert_eq!(message, "well **** it");

        // Persisted post-filter as well.
        let rows = db.recent_chat_messages(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "well **** it");
    }

    #[tokio::test]
    async fn ban_after_join_drops_next_send() {
        let (db, id) = test_db_with_account("ana");
        let room = ChatRoom::new();
        let filter = WordFilter::new(Vec::<String>::new());
        let mut rx = room.join(Uuid::new_v4(), id).await;

        assert!(process_send(&db, &room, &filter, id, "first").await.is_some());
        let _ = rx.recv().await.unwrap();

        db.set_ban(&id.to_string(), "spam", Some(Utc::now() + Duration::hours(1)))
            .unwrap();

        assert!(process_send(&db, &room, &filter, id, "second").await.is_none());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        let rows = db.recent_chat_messages(10).unwrap();
        assert_eq!(rows.len(), 1, "dropped message must not be persisted");
    }

    #[tokio::test]
    async fn replay_returns_oldest_first() {
        let (db, id) = test_db_with_account("ana");
        let room = ChatRoom::new();
        let filter = WordFilter::new(Vec::<String>::new());

        for text in ["one", "two", "three"] {
            process_send(&db, &room, &filter, id, text).await.unwrap();
        }

        let history = replay_history(&db).await;
        let texts: Vec<_> = history
            .iter()
            .map(|ChatEvent::NewMessage { message, .. }| message.as_str())
            .collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }
}

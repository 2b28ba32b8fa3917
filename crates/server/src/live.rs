// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Live change streaming for operator consoles.
//!
//! Every committed store change is turned into a [`LiveEvent`] and broadcast
//! to connected WebSocket clients. Events are informational only: clients
//! still read authoritative data over HTTP, and no commands are accepted on
//! the socket.

use axum::{
    extract::{
        State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use chrono::Utc;
use despacho::collections::{
    ARCHIVE, CONFIG, COUNTERS, NOVEDADES, ORDERS, ROLLOVER_STATE_KEY, SYSTEM, UNITS,
};
use despacho_domain::RolloverState;
use despacho_store::{ChangeKind, DocumentChange, Subscription};
use futures::{SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

/// Maximum number of events to buffer in the broadcast channel.
/// If clients cannot keep up, older events will be dropped.
const EVENT_BUFFER_SIZE: usize = 100;

/// Live event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    OrderCreated { order_id: String },
    OrderUpdated { order_id: String },
    /// The order left the open table (archived by a rollover or purge).
    OrderRemoved { order_id: String },
    CountersChanged { date: String },
    NovedadesChanged { unit: String },
    UnitChanged { unit: String },
    ConfigChanged { key: String },
    /// The rollover state advanced; consoles should refresh their status.
    RolloverCompleted { last_rollover_date: Option<String> },
    ArchiveWritten { date: String },
    /// Connection confirmation (sent on initial connect).
    Connected {
        /// Server timestamp (RFC 3339).
        timestamp: String,
    },
}

impl LiveEvent {
    /// Maps a store change to the event consoles care about, if any.
    #[must_use]
    pub fn from_change(change: &DocumentChange) -> Option<Self> {
        let key: String = change.key.clone();
        let event: Self = match change.collection.as_str() {
            ORDERS => match change.kind {
                ChangeKind::Created => Self::OrderCreated { order_id: key },
                ChangeKind::Updated => Self::OrderUpdated { order_id: key },
                ChangeKind::Deleted => Self::OrderRemoved { order_id: key },
            },
            COUNTERS => Self::CountersChanged { date: key },
            NOVEDADES => Self::NovedadesChanged { unit: key },
            UNITS => Self::UnitChanged { unit: key },
            CONFIG => Self::ConfigChanged { key },
            ARCHIVE => Self::ArchiveWritten { date: key },
            SYSTEM if key == ROLLOVER_STATE_KEY => {
                let state: RolloverState = change
                    .document()
                    .and_then(|doc| doc.decode().ok())
                    .unwrap_or_default();
                Self::RolloverCompleted {
                    last_rollover_date: state.last_rollover_date.map(|d| d.to_string()),
                }
            }
            _ => return None,
        };
        Some(event)
    }
}

/// Broadcaster for live events.
#[derive(Clone)]
pub struct LiveEventBroadcaster {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveEventBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { tx }
    }

    /// Broadcasts an event to all connected clients.
    ///
    /// If no clients are connected, the event is silently dropped.
    pub fn broadcast(&self, event: &LiveEvent) {
        match self.tx.send(event.clone()) {
            Ok(count) => {
                debug!(?event, receivers = count, "Broadcast live event");
            }
            Err(_) => {
                debug!(?event, "No receivers for live event");
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Default for LiveEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards store changes to the broadcaster until `shutdown` changes or the
/// store feed closes.
pub async fn forward_store_changes(
    mut subscription: Subscription,
    broadcaster: Arc<LiveEventBroadcaster>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            change = subscription.recv() => {
                let Some(change) = change else {
                    warn!("Store change feed closed");
                    break;
                };
                if let Some(event) = LiveEvent::from_change(&change) {
                    broadcaster.broadcast(&event);
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Live change forwarding stopped");
}

/// Upgrades the connection and streams live events.
pub async fn live_events_handler(
    ws: WebSocketUpgrade,
    AxumState(broadcaster): AxumState<Arc<LiveEventBroadcaster>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

async fn handle_socket(socket: WebSocket, broadcaster: Arc<LiveEventBroadcaster>) {
    info!("Client connected to live event stream");

    let (mut sender, mut receiver) = socket.split();
    let mut rx: broadcast::Receiver<LiveEvent> = broadcaster.subscribe();

    let connected_event: LiveEvent = LiveEvent::Connected {
        timestamp: Utc::now().to_rfc3339(),
    };

    if let Ok(json) = serde_json::to_string(&connected_event)
        && sender.send(Message::Text(json.into())).await.is_err()
    {
        warn!("Failed to send connection confirmation");
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let event: LiveEvent = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Live client lagging; events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(?e, "Failed to serialize live event");
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    warn!("Received unexpected message from client, ignoring");
                }
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => {
                    error!(?e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!("Receive task completed");
            send_task.abort();
        }
    }

    info!("Client disconnected from live event stream");
}

#[cfg(test)]
mod tests {
    use super::*;
    use despacho_store::{DocumentStore, MemoryStore, SubscriptionFilter};
    use serde_json::json;

    fn change(collection: &str, key: &str, kind: ChangeKind) -> DocumentChange {
        DocumentChange {
            collection: collection.to_string(),
            key: key.to_string(),
            kind,
            revision: 1,
            body: (kind != ChangeKind::Deleted).then(|| json!({})),
        }
    }

    #[test]
    fn test_broadcast_with_receiver() {
        let broadcaster = LiveEventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(&LiveEvent::CountersChanged {
            date: String::from("2024-03-10"),
        });

        match rx.try_recv() {
            Ok(LiveEvent::CountersChanged { date }) => assert_eq!(date, "2024-03-10"),
            other => panic!("Expected CountersChanged, got {other:?}"),
        }
    }

    #[test]
    fn test_broadcast_no_receivers() {
        let broadcaster = LiveEventBroadcaster::new();
        broadcaster.broadcast(&LiveEvent::ConfigChanged {
            key: String::from("novedades"),
        });
    }

    #[test]
    fn test_order_changes_map_by_kind() {
        assert_eq!(
            LiveEvent::from_change(&change(ORDERS, "o1", ChangeKind::Created)),
            Some(LiveEvent::OrderCreated {
                order_id: String::from("o1")
            })
        );
        assert_eq!(
            LiveEvent::from_change(&change(ORDERS, "o1", ChangeKind::Deleted)),
            Some(LiveEvent::OrderRemoved {
                order_id: String::from("o1")
            })
        );
    }

    #[test]
    fn test_rollover_state_change_carries_date() {
        let mut state_change = change(SYSTEM, ROLLOVER_STATE_KEY, ChangeKind::Updated);
        state_change.body = Some(json!({ "last_rollover_date": "2024-03-10" }));

        assert_eq!(
            LiveEvent::from_change(&state_change),
            Some(LiveEvent::RolloverCompleted {
                last_rollover_date: Some(String::from("2024-03-10"))
            })
        );
    }

    #[test]
    fn test_audit_changes_are_not_streamed() {
        assert_eq!(
            LiveEvent::from_change(&change("audit", "k", ChangeKind::Created)),
            None
        );
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json: String = serde_json::to_string(&LiveEvent::NovedadesChanged {
            unit: String::from("14"),
        })
        .unwrap();

        assert_eq!(json, r#"{"type":"novedades_changed","unit":"14"}"#);
    }

    #[tokio::test]
    async fn test_store_changes_are_forwarded() {
        let store = MemoryStore::new();
        let broadcaster = Arc::new(LiveEventBroadcaster::new());
        let mut rx = broadcaster.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let forwarder = tokio::spawn(forward_store_changes(
            store.subscribe(SubscriptionFilter::all()),
            broadcaster.clone(),
            shutdown_rx,
        ));

        store.set(UNITS, "14", json!({ "number": 14 }), false).unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            LiveEvent::UnitChanged {
                unit: String::from("14")
            }
        );
        shutdown_tx.send(true).unwrap();
        forwarder.await.unwrap();
    }
}

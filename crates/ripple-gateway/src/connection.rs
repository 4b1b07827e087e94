use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use ripple_types::api::Claims;
use ripple_types::events::{GatewayCommand, GatewayEvent};

use crate::hub::ChangeHub;

/// Heartbeat interval: server sends a Ping every 15 seconds.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a client gets to send Identify before the socket is dropped.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single WebSocket connection: Identify handshake, then a loop
/// relaying Subscribe/Unsubscribe commands to the hub and refresh signals
/// back to the client. All of this connection's subscriptions are torn down
/// when the socket closes; a client that reconnects starts from scratch.
pub async fn handle_connection(socket: WebSocket, hub: ChangeHub, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    let (user_id, name) = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} ({}) connected to gateway", name, user_id);

    let ready = GatewayEvent::Ready {
        user_id,
        name: name.clone(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    // One channel per connection; the hub multiplexes every subscription of
    // this connection onto it.
    let (tx, mut rx) = mpsc::unbounded_channel::<crate::hub::Notification>();
    let mut subscription_ids: Vec<Uuid> = Vec::new();

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            Some(notification) = rx.recv() => {
                let event = GatewayEvent::Change {
                    subscription_id: notification.subscription_id,
                    table: notification.table,
                    op: notification.op,
                };
                if send_event(&mut sender, &event).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let command: GatewayCommand = match serde_json::from_str(&text) {
                            Ok(c) => c,
                            Err(e) => {
                                warn!("Bad gateway command from {}: {}", user_id, e);
                                continue;
                            }
                        };

                        match command {
                            GatewayCommand::Subscribe { table, filter } => {
                                let id = hub.subscribe(table, filter, tx.clone()).await;
                                subscription_ids.push(id);

                                let ack = GatewayEvent::Subscribed {
                                    subscription_id: id,
                                    table,
                                };
                                if send_event(&mut sender, &ack).await.is_err() {
                                    break;
                                }
                            }
                            GatewayCommand::Unsubscribe { subscription_id } => {
                                hub.unsubscribe(subscription_id).await;
                                subscription_ids.retain(|id| *id != subscription_id);
                            }
                            GatewayCommand::Identify { .. } => {
                                // Already identified; ignore
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", user_id, e);
                        break;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.unsubscribe_all(&subscription_ids).await;
    info!("{} ({}) disconnected from gateway", name, user_id);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}

/// Wait for an Identify command carrying a valid JWT.
async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<(Uuid, String)> {
    let deadline = tokio::time::sleep(IDENTIFY_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return None,

            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return None,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => return None,
                };

                let command: GatewayCommand = serde_json::from_str(&text).ok()?;
                let GatewayCommand::Identify { token } = command else {
                    // Anything else before Identify is a protocol violation
                    return None;
                };

                let token_data = decode::<Claims>(
                    &token,
                    &DecodingKey::from_secret(jwt_secret.as_bytes()),
                    &Validation::default(),
                )
                .ok()?;

                return Some((token_data.claims.sub, token_data.claims.name));
            }
        }
    }
}

//! Per-socket read/write pump bridging an `actix_ws` session to the `Hub`
//! (spec §4.5/§4.6). Grounded on the teacher's `hosting::Casino::bridge`,
//! which runs the same `tokio::select!` over a `MessageStream` and an
//! outbound channel; generalized here to attach/detach through
//! `SessionRegistry` instead of handing the whole bridge to a `Client`
//! player actor.
//!
//! A connection with no URL token starts out with no `SessionId` at all
//! (spec §6: "Absence → anonymous connection awaiting `set_name`"); it
//! gains one the moment a valid `set_name` arrives. A connection presenting
//! an unknown token gets `error{"Invalid or expired token"}` and then falls
//! back to that same anonymous, awaiting-name state rather than silently
//! minting a session the client never asked for.

use crate::error::ErrorKind;
use crate::hub::Hub;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{validate_name, SessionId};
use actix_ws::{Message, MessageStream, Session};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

pub async fn run(
    hub: Arc<Hub>,
    mut session: Session,
    mut stream: MessageStream,
    reconnect_token: Option<String>,
) {
    let bound = hub.config.connection_queue_bound;
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(bound);
    let kill = Arc::new(Notify::new());

    let mut session_id: Option<SessionId> = match reconnect_token.as_deref() {
        Some(token) => match hub.sessions.restore(token) {
            Ok(id) => {
                hub.sessions.attach(id, outbound_tx.clone(), kill.clone());
                let name = hub.sessions.name(id).unwrap_or_default();
                if send(&mut session, ServerMessage::SessionRestored { name })
                    .await
                    .is_err()
                {
                    return;
                }
                hub.replay_snapshot(id).await;
                Some(id)
            }
            Err(_) => {
                if send(
                    &mut session,
                    ServerMessage::Error {
                        message: ErrorKind::InvalidToken.to_string(),
                    },
                )
                .await
                .is_err()
                {
                    return;
                }
                None
            }
        },
        None => None,
    };

    loop {
        let has_session = session_id.is_some();
        tokio::select! {
            _ = kill.notified(), if has_session => break,
            outbound = outbound_rx.recv(), if has_session => {
                match outbound {
                    Some(message) => {
                        if send(&mut session, message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let alive = handle_text(&hub, &mut session, &mut session_id, &outbound_tx, &kill, &text).await;
                        if !alive {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    if let Some(id) = session_id {
        hub.sessions.detach(id, &kill);
    }
    let _ = session.close(None).await;
}

/// Handles one decoded inbound frame. Returns `false` if the connection
/// should close (a write back to this socket itself failed).
async fn handle_text(
    hub: &Arc<Hub>,
    session: &mut Session,
    session_id: &mut Option<SessionId>,
    outbound_tx: &mpsc::Sender<ServerMessage>,
    kill: &Arc<Notify>,
    text: &str,
) -> bool {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(_) => {
            return send(
                session,
                ServerMessage::Error {
                    message: ErrorKind::MalformedMessage.to_string(),
                },
            )
            .await
            .is_ok();
        }
    };

    match (session_id.is_some(), message) {
        (false, ClientMessage::SetName { name }) => match validate_name(&name) {
            Ok(name) => {
                let (id, token) = hub.sessions.create_session(name.clone());
                hub.sessions.attach(id, outbound_tx.clone(), kill.clone());
                *session_id = Some(id);
                if send(
                    session,
                    ServerMessage::SessionCreated {
                        token: token.encode(),
                        name,
                    },
                )
                .await
                .is_err()
                {
                    return false;
                }
                hub.replay_snapshot(id).await;
                true
            }
            Err(kind) => send(
                session,
                ServerMessage::Error {
                    message: kind.to_string(),
                },
            )
            .await
            .is_ok(),
        },
        (false, _) => send(
            session,
            ServerMessage::Error {
                message: "set a name before doing anything else".to_string(),
            },
        )
        .await
        .is_ok(),
        (true, message) => {
            hub.dispatch(session_id.expect("checked above"), message).await;
            true
        }
    }
}

async fn send(session: &mut Session, message: ServerMessage) -> Result<(), ()> {
    let text = serde_json::to_string(&message).map_err(|_| ())?;
    session.text(text).await.map_err(|_| ())
}

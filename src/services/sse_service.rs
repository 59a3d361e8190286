use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::sse::{HANDSHAKE, Handshake, ServerEvent},
    error::ServiceError,
    services::lobby_service,
    state::SharedState,
};

/// Subscribe to the event stream of an existing lobby.
pub async fn subscribe_lobby(
    state: &SharedState,
    lobby_id: Uuid,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    lobby_service::load_lobby(state, lobby_id).await?;
    Ok(state.lobby_hubs().subscribe(lobby_id))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// releasing the lobby hub once the client disconnects.
pub fn to_sse_stream(
    state: SharedState,
    lobby_id: Uuid,
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let degraded = state.is_degraded().await;
        if let Some(handshake) = handshake_event(lobby_id, degraded) {
            if tx.send(Ok(handshake)).await.is_err() {
                drop(receiver);
                state.lobby_hubs().release(lobby_id);
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        // Clients re-sync on the next update.
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        drop(receiver);
        state.lobby_hubs().release(lobby_id);
        info!(%lobby_id, "lobby SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn handshake_event(lobby_id: Uuid, degraded: bool) -> Option<Event> {
    let payload = Handshake {
        lobby_id,
        message: "subscribed to lobby events".into(),
        degraded,
    };
    ServerEvent::json(Some(HANDSHAKE.to_string()), &payload)
        .ok()
        .map(to_event)
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use tokio::sync::broadcast::error::RecvError;

use super::prelude::*;
use crate::hub::HubEvent;

/// `/ws/{mode}/{kind}`
pub(crate) async fn socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((mode, kind)): Path<(String, String)>,
) -> Result<Response, IssuesError> {
    let endpoint = Endpoint::new(mode.parse()?, kind.parse()?);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, endpoint)))
}

async fn close(socket: &mut WebSocket, code: u16) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(""),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

async fn handle_socket(mut socket: WebSocket, state: AppState, endpoint: Endpoint) {
    // subscribe first so the scenario's opening lines can't slip past
    let mut events = state.hub.subscribe();
    let _session = state.hub.connect(endpoint);
    info!("WebSocket connection established: {endpoint}");
    state.service(endpoint.mode).start_pending(endpoint).await;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(reason))) => {
                        debug!("received close on {endpoint}: {reason:?}");
                        let _ = socket.send(Message::Close(reason)).await;
                        break;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = socket.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Text(text))) => {
                        info!("Received message on {endpoint}: {}", text.as_str());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!("WebSocket on {endpoint} failed: {err}");
                        break;
                    }
                    None => break,
                }
            }
            event = events.recv() => {
                match event {
                    Ok(HubEvent::Message { endpoint: target, text }) if target == endpoint => {
                        if let Err(err) = socket.send(Message::Text(text.into())).await {
                            warn!("WebSocket send failed on {endpoint}: {err}");
                            close(&mut socket, close_code::ERROR).await;
                            break;
                        }
                    }
                    Ok(HubEvent::Message { .. }) => {}
                    Ok(HubEvent::CloseAll) => {
                        close(&mut socket, close_code::NORMAL).await;
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("WebSocket on {endpoint} fell behind, skipped {skipped} messages");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("WebSocket connection closed: {endpoint}");
}

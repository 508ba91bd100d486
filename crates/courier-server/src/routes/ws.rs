use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};

use crate::hub::{ClientMessage, ConnectionId, ServerMessage};
use crate::state::AppState;

/// GET /ws: upgrade to a live order-update feed.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, app))
}

async fn client_session(socket: WebSocket, app: AppState) {
    let (conn, mut outbound) = app.hub.register();
    tracing::debug!(conn, "websocket connected");
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(conn, error = %e, "could not encode message");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => {
                handle_client_text(&app, conn, text.as_str());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    app.hub.unregister(conn);
    writer.abort();
    tracing::debug!(conn, "websocket closed");
}

/// Apply one client frame. A subscribe is answered with the current order
/// snapshot when the order exists; returns whether a snapshot was sent.
pub fn handle_client_text(app: &AppState, conn: ConnectionId, text: &str) -> bool {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SubscribeToOrder { order_id }) => {
            app.hub.subscribe(conn, &order_id);
            tracing::debug!(conn, order_id = %order_id, "subscribed");
            match app.orders.get(&order_id) {
                Some(order) => app.hub.send_to(conn, ServerMessage::OrderUpdate { order }),
                None => false,
            }
        }
        Err(e) => {
            tracing::warn!(conn, error = %e, "ignoring client message");
            false
        }
    }
}

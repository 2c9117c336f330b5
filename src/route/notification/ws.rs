use axum::{
	extract::{
		ws::{Message, WebSocket, WebSocketUpgrade},
		State,
	},
	response::IntoResponse,
};

use crate::{
	extract::Session,
	realtime::{Hub, Subscription},
};

use super::model::Notification;

/// Upgrades to a WebSocket that receives the authenticated user's new
/// notifications as JSON text frames.
pub async fn connect(
	State(hub): State<Hub<Notification>>,
	session: Session,
	ws: WebSocketUpgrade,
) -> impl IntoResponse {
	let user = session.user.id;

	ws.on_upgrade(move |socket| forward(socket, hub.subscribe(user)))
}

async fn forward(mut socket: WebSocket, mut subscription: Subscription<Notification>) {
	loop {
		tokio::select! {
			event = subscription.recv() => {
				let Some(event) = event else {
					break;
				};

				let text = match serde_json::to_string(&event) {
					Ok(text) => text,
					Err(error) => {
						tracing::error!(%error, "failed to serialize notification");
						continue;
					}
				};

				if socket.send(Message::Text(text)).await.is_err() {
					break;
				}
			}
			message = socket.recv() => match message {
				Some(Ok(Message::Close(..)) | Err(..)) | None => break,
				Some(Ok(..)) => {}
			},
		}
	}
}

use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::{http::StatusCode, routing::get};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;
pub mod ws;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("not_recipient")]
	NotRecipient(Uuid),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/mark-read", post_with(mark_all_read, mark_all_read_docs))
		.api_route("/:user_id", get_with(list_notifications, list_notifications_docs))
		.route("/ws", get(ws::connect))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::NotRecipient(..) => StatusCode::FORBIDDEN,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string())
			.content("Notifications can only be read by their recipient.");
		let Self::NotRecipient(user) = self;

		message.detail("user", user.to_string()).into_vec()
	}
}

/// Whether another page of notifications may exist. A full page is taken
/// to mean there is more, so the last page can turn out to be empty.
pub fn has_more(returned: usize, limit: i64) -> bool {
	i64::try_from(returned).is_ok_and(|returned| returned == limit)
}

/// Records a notification and pushes it to the recipient if they are connected.
///
/// Self-actions are ignored. Failures are logged rather than returned, since
/// the action that caused the notification has already taken place.
pub async fn notify(state: &AppState, event: model::NewNotification) {
	if event.recipient == event.actor.id {
		return;
	}

	let message = event.kind.message(
		&event.actor.username,
		event.post.as_ref().map(|post| post.title.as_str()),
	);

	let result = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
		r#"
			INSERT INTO notification (user_id, actor_id, kind, post_id, message)
			VALUES ($1, $2, $3, $4, $5)
			RETURNING id, created_at
		"#,
	)
	.bind(event.recipient)
	.bind(event.actor.id)
	.bind(event.kind)
	.bind(event.post.as_ref().map(|post| post.id))
	.bind(&message)
	.fetch_one(&state.database)
	.await;

	let (id, created_at) = match result {
		Ok(row) => row,
		Err(error) => {
			tracing::error!(
				%error,
				recipient = %event.recipient,
				kind = ?event.kind,
				"failed to create notification"
			);
			return;
		}
	};

	let delivered = state.notifications.publish(
		event.recipient,
		model::Notification {
			id,
			kind: event.kind,
			message,
			is_read: false,
			created_at,
			actor: event.actor,
			post: event.post,
		},
	);

	tracing::debug!(notification = %id, delivered, "notification created");
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[test]
	fn test_has_more() {
		assert!(super::has_more(20, 20));
		assert!(!super::has_more(19, 20));
		assert!(!super::has_more(0, 20));
	}

	#[sqlx::test]
	async fn test_notification_feed(pool: Database) {
		let app = app(pool);

		let jane = register(&app, "jane").await;
		let jane_id = jane["userId"].as_str().unwrap().to_string();

		let post = app
			.post("/posts")
			.json(&json!({ "title": "Hello" }))
			.await
			.json::<Value>();
		let post_id = post["id"].as_str().unwrap().to_string();

		// self-actions never notify
		app.post(&format!("/posts/{post_id}/like")).await;

		register(&app, "john").await;

		app.post(&format!("/posts/{post_id}/like")).await;
		app.post(&format!("/posts/{post_id}/like")).await;
		app.post(&format!("/posts/{post_id}/comments"))
			.json(&json!({ "content": "Nice post" }))
			.await;
		app.post("/follows")
			.json(&json!({ "followedId": jane_id }))
			.await;

		// only the recipient can read the feed
		let response = app.get(&format!("/notifications/{jane_id}")).await;

		assert_eq!(response.status_code(), 403);

		login(&app, "jane").await;

		let body = app
			.get(&format!("/notifications/{jane_id}"))
			.add_query_param("limit", 2)
			.await
			.json::<Value>();

		let notifications = body["notifications"].as_array().unwrap();

		assert_eq!(notifications.len(), 2);
		assert_eq!(body["hasMore"], true);
		assert_eq!(body["unreadCount"], 3);
		assert_eq!(notifications[0]["type"], "follow");
		assert_eq!(notifications[0]["actor"]["username"], "john");
		assert_eq!(notifications[1]["type"], "comment");
		assert_eq!(notifications[1]["post"]["title"], "Hello");

		let cursor = notifications[1]["createdAt"].as_str().unwrap().to_string();

		let body = app
			.get(&format!("/notifications/{jane_id}"))
			.add_query_param("limit", 2)
			.add_query_param("cursor", cursor)
			.await
			.json::<Value>();

		assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
		assert_eq!(body["notifications"][0]["type"], "like");
		assert_eq!(body["hasMore"], false);

		let body = app
			.post("/notifications/mark-read")
			.await
			.json::<Value>();

		assert_eq!(body["updated"], 3);

		let body = app
			.get(&format!("/notifications/{jane_id}"))
			.await
			.json::<Value>();

		assert_eq!(body["unreadCount"], 0);
		assert_eq!(body["notifications"][0]["isRead"], true);
	}
}

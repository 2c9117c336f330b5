use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Path, Query, Session},
	openapi::tag,
	Database,
};

use super::{model, Error, RouteError};

/// List notifications
/// Returns the authenticated user's notifications, newest first, along with
/// their unread count. Pass the `createdAt` of the last notification as
/// `cursor` to continue with older ones.
#[route(tag = tag::NOTIFICATION)]
pub async fn list_notifications(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::UserPath>,
	Query(input): Query<model::FeedInput>,
) -> Result<Json<model::NotificationFeed>, RouteError> {
	if path.user_id != session.user.id {
		return Err(Error::NotRecipient(path.user_id).into());
	}

	let notifications = sqlx::query_as::<_, model::NotificationRow>(
		r#"
			SELECT
				notification.id, notification.kind, notification.message,
				notification.is_read, notification.created_at,
				actor.id AS actor_id, actor.username AS actor_username,
				post.id AS post_id, post.title AS post_title
			FROM notification
			INNER JOIN "user" AS actor ON actor.id = notification.actor_id
			LEFT JOIN post ON post.id = notification.post_id
			WHERE notification.user_id = $1
				AND ($2::timestamptz IS NULL OR notification.created_at < $2)
			ORDER BY notification.created_at DESC, notification.id DESC
			LIMIT $3
		"#,
	)
	.bind(session.user.id)
	.bind(input.cursor)
	.bind(input.limit)
	.fetch_all(&database)
	.await?;

	let unread_count = sqlx::query_scalar::<_, i64>(
		"SELECT COUNT(*) FROM notification WHERE user_id = $1 AND NOT is_read",
	)
	.bind(session.user.id)
	.fetch_one(&database)
	.await?;

	Ok(Json(model::NotificationFeed {
		has_more: super::has_more(notifications.len(), input.limit),
		notifications: notifications
			.into_iter()
			.map(model::Notification::from)
			.collect(),
		unread_count,
	}))
}

/// Mark all read
/// Marks every unread notification of the authenticated user as read.
#[route(tag = tag::NOTIFICATION)]
pub async fn mark_all_read(
	State(database): State<Database>,
	session: Session,
) -> Result<Json<model::MarkReadResponse>, RouteError> {
	let result = sqlx::query(
		"UPDATE notification SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
	)
	.bind(session.user.id)
	.execute(&database)
	.await?;

	Ok(Json(model::MarkReadResponse {
		updated: result.rows_affected(),
	}))
}

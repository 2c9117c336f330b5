use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::route::model::UserSummary;

#[inline]
fn twenty() -> i64 {
	20
}

/// What happened to cause a notification.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, sqlx::Type,
)]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
	Like,
	Comment,
	Follow,
	Save,
}

impl NotificationKind {
	/// Renders the human-readable message stored with a notification.
	pub fn message(self, actor: &str, post_title: Option<&str>) -> String {
		let post = post_title.map_or_else(|| "your post".to_string(), |title| format!("your post \"{title}\""));

		match self {
			Self::Like => format!("{actor} liked {post}"),
			Self::Comment => format!("{actor} commented on {post}"),
			Self::Save => format!("{actor} saved {post}"),
			Self::Follow => format!("{actor} started following you"),
		}
	}
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PostSummary {
	pub id: Uuid,
	pub title: String,
}

/// A single notification, as delivered to its recipient.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
	pub id: Uuid,
	#[serde(rename = "type")]
	pub kind: NotificationKind,
	pub message: String,
	pub is_read: bool,
	pub created_at: DateTime<Utc>,
	/// The user whose action caused the notification.
	pub actor: UserSummary,
	/// The post the action was taken on. Absent for follows, and once the
	/// post has been deleted.
	pub post: Option<PostSummary>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct NotificationRow {
	pub id: Uuid,
	pub kind: NotificationKind,
	pub message: String,
	pub is_read: bool,
	pub created_at: DateTime<Utc>,
	pub actor_id: Uuid,
	pub actor_username: String,
	pub post_id: Option<Uuid>,
	pub post_title: Option<String>,
}

impl From<NotificationRow> for Notification {
	fn from(row: NotificationRow) -> Self {
		Self {
			id: row.id,
			kind: row.kind,
			message: row.message,
			is_read: row.is_read,
			created_at: row.created_at,
			actor: UserSummary {
				id: row.actor_id,
				username: row.actor_username,
			},
			post: row
				.post_id
				.zip(row.post_title)
				.map(|(id, title)| PostSummary { id, title }),
		}
	}
}

/// A notification that is about to be created.
#[derive(Debug)]
pub struct NewNotification {
	pub recipient: Uuid,
	pub actor: UserSummary,
	pub kind: NotificationKind,
	pub post: Option<PostSummary>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UserPath {
	pub user_id: Uuid,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct FeedInput {
	/// Only notifications created strictly before this time are returned.
	pub cursor: Option<DateTime<Utc>>,
	/// The maximum number of notifications to return.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "twenty")]
	pub limit: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
	pub notifications: Vec<Notification>,
	/// Whether a full page was returned. The next page may still be empty.
	pub has_more: bool,
	pub unread_count: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MarkReadResponse {
	/// The number of notifications that were flipped to read.
	pub updated: u64,
}

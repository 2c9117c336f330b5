use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

/// The public profile of a user.
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
	pub id: Uuid,
	pub username: String,
	pub created_at: DateTime<Utc>,
	/// The number of posts authored by the user.
	pub post_count: i64,
	pub follower_count: i64,
	pub following_count: i64,
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::route::model::UserSummary;

/// The longest comment that may be posted, in characters.
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// A sparse map of post ids to a count. Posts that are absent have a count of zero.
pub type CountMap = HashMap<Uuid, i64>;

/// Like and comment counts of every post.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Counts {
	pub likes: CountMap,
	pub comments: CountMap,
}

impl Counts {
	/// Builds both maps from `(is_like, post, count)` rows.
	pub fn from_rows(rows: impl IntoIterator<Item = (bool, Uuid, i64)>) -> Self {
		let mut counts = Self::default();

		for (is_like, post, count) in rows {
			let map = if is_like {
				&mut counts.likes
			} else {
				&mut counts.comments
			};

			map.insert(post, count);
		}

		counts
	}
}

/// The posts a user has liked and saved.
#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct ViewerState {
	pub liked: Vec<Uuid>,
	pub saved: Vec<Uuid>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
	/// The number of likes on the post after the request.
	pub likes: i64,
	/// Whether the post was already liked, in which case nothing changed.
	pub already_liked: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UnlikeResponse {
	pub likes: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SaveResponse {
	pub saved: bool,
}

fn validate_comment(content: &str) -> Result<(), ValidationError> {
	let content = content.trim();

	if content.is_empty() {
		return Err(ValidationError::new("empty_comment"));
	}

	if content.chars().count() > MAX_COMMENT_LENGTH {
		return Err(ValidationError::new("comment_too_long"));
	}

	Ok(())
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CommentInput {
	/// The comment text. Surrounding whitespace is removed.
	#[validate(custom(function = "validate_comment"))]
	pub content: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
	pub id: Uuid,
	pub post_id: Uuid,
	pub content: String,
	pub created_at: DateTime<Utc>,
	pub author: UserSummary,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CommentRow {
	pub id: Uuid,
	pub post_id: Uuid,
	pub content: String,
	pub created_at: DateTime<Utc>,
	pub author_id: Uuid,
	pub author_username: String,
}

impl From<CommentRow> for Comment {
	fn from(row: CommentRow) -> Self {
		Self {
			id: row.id,
			post_id: row.post_id,
			content: row.content,
			created_at: row.created_at,
			author: UserSummary {
				id: row.author_id,
				username: row.author_username,
			},
		}
	}
}

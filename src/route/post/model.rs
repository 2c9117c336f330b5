use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::route::model::UserSummary;

pub use super::feed::{AppliedFilters, FeedQuery, Pagination};

/// The longest tag that may be attached to a post.
pub const MAX_TAG_LENGTH: usize = 32;

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
	if tags
		.iter()
		.any(|tag| tag.trim().is_empty() || tag.trim().chars().count() > MAX_TAG_LENGTH)
	{
		return Err(ValidationError::new("invalid_tag"));
	}

	Ok(())
}

/// Trims tags and removes duplicates, keeping the first occurrence of each.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
	let mut normalized: Vec<String> = Vec::with_capacity(tags.len());

	for tag in tags {
		let tag = tag.trim();

		if !normalized.iter().any(|seen| seen.eq_ignore_ascii_case(tag)) {
			normalized.push(tag.to_string());
		}
	}

	normalized
}

/// A single post, as stored.
#[model]
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
	/// The unique identifier of the post.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The user that created the post.
	#[serde(skip_deserializing)]
	pub user_id: Uuid,
	/// The title of the post.
	#[validate(length(min = 1, max = 200))]
	pub title: String,
	/// The rich text content of the post.
	#[serde(default)]
	#[validate(length(max = 100000))]
	pub content: String,
	/// Tags, in the order given by the author.
	#[serde(default)]
	#[validate(length(max = 20), custom(function = "validate_tags"))]
	pub tags: Vec<String>,
	/// Image URLs, in upload order.
	#[serde(skip_deserializing)]
	pub images: Vec<String>,
	/// The publication time of the post.
	#[serde(skip_deserializing)]
	pub published_at: DateTime<Utc>,
	/// Whether the post is shown in the feed.
	#[serde(skip_deserializing)]
	pub is_published: bool,
}

/// A post as shown to readers, with its author and engagement counts.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	pub images: Vec<String>,
	pub tags: Vec<String>,
	pub published_at: DateTime<Utc>,
	pub author: UserSummary,
	/// The number of likes on the post.
	pub likes: i64,
	/// The number of comments on the post.
	pub comments: i64,
}

/// A row of the annotated post projection.
#[derive(Debug, sqlx::FromRow)]
pub struct PostRow {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	pub images: Vec<String>,
	pub tags: Vec<String>,
	pub published_at: DateTime<Utc>,
	pub author_id: Uuid,
	pub author_username: String,
	pub likes: i64,
	pub comments: i64,
}

impl From<PostRow> for PostView {
	fn from(row: PostRow) -> Self {
		Self {
			id: row.id,
			title: row.title,
			content: row.content,
			images: row.images,
			tags: row.tags,
			published_at: row.published_at,
			author: UserSummary {
				id: row.author_id,
				username: row.author_username,
			},
			likes: row.likes,
			comments: row.comments,
		}
	}
}

/// The parts of a post needed to check ownership and describe it elsewhere.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRef {
	pub id: Uuid,
	pub user_id: Uuid,
	pub title: String,
}

/// A page of the feed.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
	pub posts: Vec<PostView>,
	pub pagination: Pagination,
	pub applied_filters: AppliedFilters,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
	/// Every image URL of the post after the upload.
	pub images: Vec<String>,
	/// The number of images that could not be stored.
	pub failed: usize,
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::*;

	#[test]
	fn test_normalize_tags() {
		let tags = normalize_tags(vec![
			" rust ".into(),
			"Web".into(),
			"rust".into(),
			"web".into(),
		]);

		assert_eq!(tags, vec!["rust", "Web"]);
	}

	#[test]
	fn test_create_post_validation() {
		let post = CreatePost {
			title: "Hello".into(),
			content: "<p>world</p>".into(),
			tags: vec!["intro".into()],
		};

		assert!(post.validate().is_ok());

		let post = CreatePost {
			title: String::new(),
			content: String::new(),
			tags: vec!["   ".into()],
		};

		let errors = post.validate().unwrap_err();
		let fields = errors.field_errors();

		assert!(fields.contains_key("title"));
		assert!(fields.contains_key("tags"));
	}

	#[test]
	fn test_update_post_skips_absent_fields() {
		let update = UpdatePost {
			title: None,
			content: None,
			tags: Some(vec!["a".repeat(MAX_TAG_LENGTH + 1)]),
		};

		let errors = update.validate().unwrap_err();

		assert!(errors.field_errors().contains_key("tags"));
	}
}

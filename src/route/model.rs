use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

#[inline]
fn ten() -> i64 {
	10
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct Paginate {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1))]
	#[serde(default = "one")]
	pub page: i64,
	/// The number of items to return per page.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "ten")]
	pub limit: i64,
}

impl Paginate {
	/// Pages far past the end saturate instead of overflowing.
	pub fn offset(&self) -> i64 {
		(self.page - 1).saturating_mul(self.limit)
	}

	pub fn limit(&self) -> i64 {
		self.limit
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	pub id: Uuid,
}

/// The public view of a user, embedded in other responses.
#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct UserSummary {
	pub id: Uuid,
	pub username: String,
}

/// A plain acknowledgement with a human-readable message.
#[derive(Debug, Serialize, JsonSchema)]
pub struct MessageResponse {
	pub message: String,
}

impl MessageResponse {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

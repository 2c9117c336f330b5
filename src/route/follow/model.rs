use aide::{gen::GenContext, openapi::Operation, OperationOutput};
use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::extract::Json;

#[derive(Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowInput {
	/// The user to follow or unfollow.
	pub followed_id: Uuid,
}

/// The raw parameters of a follow check. Malformed ids are not an error,
/// they simply never follow anyone.
#[derive(Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInput {
	pub follower_id: Option<String>,
	pub followed_id: Option<String>,
}

impl CheckInput {
	/// Both ids, if both are present and well-formed.
	pub fn ids(&self) -> Option<(Uuid, Uuid)> {
		let parse = |id: &Option<String>| id.as_deref().and_then(|id| Uuid::parse_str(id.trim()).ok());

		Some((parse(&self.follower_id)?, parse(&self.followed_id)?))
	}
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
	pub is_following: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FollowResponse {
	pub message: String,
	/// Whether the follow edge exists after the request.
	pub following: bool,
}

/// The result of a follow request: `201 Created` for a new edge and
/// `200 OK` for one that already existed.
#[derive(Debug)]
pub struct Followed {
	pub created: bool,
}

impl IntoResponse for Followed {
	fn into_response(self) -> Response {
		let (status, message) = if self.created {
			(StatusCode::CREATED, "Followed successfully")
		} else {
			(StatusCode::OK, "Already following")
		};

		(
			status,
			Json(FollowResponse {
				message: message.into(),
				following: true,
			}),
		)
			.into_response()
	}
}

impl OperationOutput for Followed {
	type Inner = FollowResponse;

	fn operation_response(
		ctx: &mut GenContext,
		operation: &mut Operation,
	) -> Option<aide::openapi::Response> {
		axum_jsonschema::Json::<FollowResponse>::operation_response(ctx, operation)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_check_input_ids() {
		let follower = Uuid::new_v4();
		let followed = Uuid::new_v4();

		let input = CheckInput {
			follower_id: Some(follower.to_string()),
			followed_id: Some(followed.to_string()),
		};

		assert_eq!(input.ids(), Some((follower, followed)));

		let input = CheckInput {
			follower_id: Some("not-a-uuid".into()),
			followed_id: Some(followed.to_string()),
		};

		assert_eq!(input.ids(), None);

		let input = CheckInput {
			follower_id: None,
			followed_id: Some(followed.to_string()),
		};

		assert_eq!(input.ids(), None);
	}

	#[test]
	fn test_followed_status() {
		assert_eq!(
			Followed { created: true }.into_response().status(),
			StatusCode::CREATED
		);
		assert_eq!(
			Followed { created: false }.into_response().status(),
			StatusCode::OK
		);
	}
}

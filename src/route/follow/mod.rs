use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, route::model::UserSummary, AppState, Database};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("cannot_follow_self")]
	CannotFollowSelf,
	#[error("unknown_user")]
	UnknownUser(Uuid),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			post_with(follow_user, follow_user_docs).delete_with(unfollow_user, unfollow_user_docs),
		)
		.api_route("/check", get_with(check_follow, check_follow_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::CannotFollowSelf => StatusCode::BAD_REQUEST,
			Self::UnknownUser(..) => StatusCode::NOT_FOUND,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string());

		match self {
			Self::CannotFollowSelf => message
				.content("You cannot follow yourself.")
				.field("followedId"),
			Self::UnknownUser(user) => message
				.content("The user you requested does not exist.")
				.detail("user", user.to_string()),
		}
		.into_vec()
	}
}

pub async fn is_following(
	database: &Database,
	follower: Uuid,
	followed: Uuid,
) -> Result<bool, sqlx::Error> {
	sqlx::query_scalar::<_, bool>(
		"SELECT EXISTS (SELECT 1 FROM follow WHERE follower_id = $1 AND followed_id = $2)",
	)
	.bind(follower)
	.bind(followed)
	.fetch_one(database)
	.await
}

/// The users followed by `user`, most recently followed first.
pub async fn list_followed(database: &Database, user: Uuid) -> Result<Vec<UserSummary>, sqlx::Error> {
	sqlx::query_as::<_, UserSummary>(
		r#"
			SELECT "user".id, "user".username FROM follow
			INNER JOIN "user" ON "user".id = follow.followed_id
			WHERE follow.follower_id = $1
			ORDER BY follow.created_at DESC
		"#,
	)
	.bind(user)
	.fetch_all(database)
	.await
}

/// The users following `user`, most recent first.
pub async fn list_followers(
	database: &Database,
	user: Uuid,
) -> Result<Vec<UserSummary>, sqlx::Error> {
	sqlx::query_as::<_, UserSummary>(
		r#"
			SELECT "user".id, "user".username FROM follow
			INNER JOIN "user" ON "user".id = follow.follower_id
			WHERE follow.followed_id = $1
			ORDER BY follow.created_at DESC
		"#,
	)
	.bind(user)
	.fetch_all(database)
	.await
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	async fn test_follow_graph(pool: Database) {
		let app = app(pool);

		let jane = register(&app, "jane").await;
		let jane_id = jane["userId"].as_str().unwrap().to_string();

		let john = register(&app, "john").await;
		let john_id = john["userId"].as_str().unwrap().to_string();

		let response = app
			.post("/follows")
			.json(&json!({ "followedId": jane_id }))
			.await;

		assert_eq!(response.status_code(), 201);
		assert_eq!(response.json::<Value>()["message"], "Followed successfully");

		let response = app
			.post("/follows")
			.json(&json!({ "followedId": jane_id }))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>()["message"], "Already following");

		let body = app
			.get("/follows/check")
			.add_query_param("followerId", &john_id)
			.add_query_param("followedId", &jane_id)
			.await
			.json::<Value>();

		assert_eq!(body["isFollowing"], true);

		let following = app
			.get(&format!("/users/{john_id}/following"))
			.await
			.json::<Value>();

		assert_eq!(following, json!([{ "id": jane_id, "username": "jane" }]));

		let followers = app
			.get(&format!("/users/{jane_id}/followers"))
			.await
			.json::<Value>();

		assert_eq!(followers[0]["username"], "john");

		let response = app
			.delete("/follows")
			.json(&json!({ "followedId": jane_id }))
			.await;

		assert_eq!(response.status_code(), 200);

		// unfollowing twice is fine
		let response = app
			.delete("/follows")
			.json(&json!({ "followedId": jane_id }))
			.await;

		assert_eq!(response.status_code(), 200);

		let body = app
			.get("/follows/check")
			.add_query_param("followerId", &john_id)
			.add_query_param("followedId", &jane_id)
			.await
			.json::<Value>();

		assert_eq!(body["isFollowing"], false);
	}

	#[sqlx::test]
	async fn test_follow_errors(pool: Database) {
		let app = app(pool);

		let jane = register(&app, "jane").await;
		let jane_id = jane["userId"].as_str().unwrap().to_string();

		let response = app
			.post("/follows")
			.json(&json!({ "followedId": jane_id }))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(
			response.json::<Value>()["errors"][0]["code"],
			"cannot_follow_self"
		);

		let response = app
			.post("/follows")
			.json(&json!({ "followedId": Uuid::nil() }))
			.await;

		assert_eq!(response.status_code(), 404);

		let response = app
			.post("/follows")
			.json(&json!({ "followedId": "not-a-uuid" }))
			.await;

		assert_eq!(response.status_code(), 400);

		let body = app
			.get("/follows/check")
			.add_query_param("followerId", "abc")
			.add_query_param("followedId", "def")
			.await
			.json::<Value>();

		assert_eq!(body["isFollowing"], false);
	}
}

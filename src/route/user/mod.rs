use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("unknown_user")]
	UnknownUser(Uuid),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/:id", get_with(get_profile, get_profile_docs))
		.api_route("/:id/posts", get_with(get_user_posts, get_user_posts_docs))
		.api_route("/:id/following", get_with(get_following, get_following_docs))
		.api_route("/:id/followers", get_with(get_followers, get_followers_docs))
		.api_route("/:id/liked", get_with(get_liked, get_liked_docs))
		.api_route("/:id/saved", get_with(get_saved, get_saved_docs))
		.api_route("/:id/saved-posts", get_with(get_saved_posts, get_saved_posts_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownUser(..) => StatusCode::NOT_FOUND,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string())
			.content("The user you requested does not exist.");
		let Self::UnknownUser(user) = self;

		message.detail("user", user.to_string()).into_vec()
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	async fn test_profile(pool: Database) {
		let app = app(pool);

		let jane = register(&app, "jane").await;
		let jane_id = jane["userId"].as_str().unwrap().to_string();

		let post = app
			.post("/posts")
			.json(&json!({ "title": "Hello" }))
			.await
			.json::<Value>();
		let post_id = post["id"].as_str().unwrap().to_string();

		register(&app, "john").await;

		app.post("/follows")
			.json(&json!({ "followedId": jane_id }))
			.await;
		app.post(&format!("/posts/{post_id}/save")).await;

		let profile = app.get(&format!("/users/{jane_id}")).await.json::<Value>();

		assert_eq!(profile["username"], "jane");
		assert_eq!(profile["postCount"], 1);
		assert_eq!(profile["followerCount"], 1);
		assert_eq!(profile["followingCount"], 0);

		let posts = app
			.get(&format!("/users/{jane_id}/posts"))
			.await
			.json::<Value>();

		assert_eq!(posts[0]["id"], post_id);

		let john = app.get("/auth/me").await.json::<Value>();
		let john_id = john["id"].as_str().unwrap();

		let saved = app
			.get(&format!("/users/{john_id}/saved-posts"))
			.await
			.json::<Value>();

		assert_eq!(saved.as_array().unwrap().len(), 1);
		assert_eq!(saved[0]["author"]["username"], "jane");

		let saved = app
			.get(&format!("/users/{john_id}/saved"))
			.await
			.json::<Value>();

		assert_eq!(saved, json!([post_id]));

		let response = app.get(&format!("/users/{}", Uuid::nil())).await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(response.json::<Value>()["errors"][0]["code"], "unknown_user");
	}

	#[sqlx::test]
	async fn test_posts_past_the_end(pool: Database) {
		let app = app(pool);

		let jane = register(&app, "jane").await;
		let jane_id = jane["userId"].as_str().unwrap().to_string();

		let post = app
			.post("/posts")
			.json(&json!({ "title": "Hello" }))
			.await
			.json::<Value>();
		let post_id = post["id"].as_str().unwrap().to_string();

		let response = app
			.get(&format!("/users/{jane_id}/posts"))
			.add_query_param("page", i64::MAX)
			.add_query_param("limit", 100)
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>(), json!([]));

		let response = app
			.get(&format!("/posts/{post_id}/comments"))
			.add_query_param("page", i64::MAX)
			.add_query_param("limit", 100)
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>(), json!([]));
	}
}

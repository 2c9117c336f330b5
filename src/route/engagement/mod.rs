use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState, Database};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("unknown_post")]
	UnknownPost(Uuid),
	#[error("already_saved")]
	AlreadySaved(Uuid),
}

pub type RouteError = error::RouteError<Error>;

/// Routes nested under `/posts`, next to the post routes themselves.
pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/likes-count", get_with(get_like_counts, get_like_counts_docs))
		.api_route(
			"/comments-count",
			get_with(get_comment_counts, get_comment_counts_docs),
		)
		.api_route("/viewer-state", get_with(get_viewer_state, get_viewer_state_docs))
		.api_route(
			"/:id/like",
			post_with(like_post, like_post_docs).delete_with(unlike_post, unlike_post_docs),
		)
		.api_route(
			"/:id/save",
			post_with(save_post, save_post_docs).delete_with(unsave_post, unsave_post_docs),
		)
		.api_route(
			"/:id/comments",
			get_with(list_comments, list_comments_docs)
				.post_with(create_comment, create_comment_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::AlreadySaved(..) => StatusCode::CONFLICT,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let content = match self {
			Self::UnknownPost(..) => "The post you requested does not exist.",
			Self::AlreadySaved(..) => "You have already saved this post.",
		};

		let message = error::Message::new(self.to_string()).content(content);
		let (Self::UnknownPost(post) | Self::AlreadySaved(post)) = self;

		message.detail("post", post.to_string()).into_vec()
	}
}

/// Counts likes and comments of every post in a single round trip.
pub async fn aggregate_counts(database: &Database) -> Result<model::Counts, sqlx::Error> {
	let rows = sqlx::query_as::<_, (bool, Uuid, i64)>(
		r#"
			SELECT TRUE, post_id, COUNT(*) FROM post_like GROUP BY post_id
			UNION ALL
			SELECT FALSE, post_id, COUNT(*) FROM comment GROUP BY post_id
		"#,
	)
	.fetch_all(database)
	.await?;

	Ok(model::Counts::from_rows(rows))
}

/// The posts liked and saved by `user`, most recent first. Anonymous
/// viewers have liked and saved nothing.
pub async fn viewer_state(
	database: &Database,
	user: Option<Uuid>,
) -> Result<model::ViewerState, sqlx::Error> {
	let Some(user) = user else {
		return Ok(model::ViewerState::default());
	};

	let liked = sqlx::query_scalar::<_, Uuid>(
		"SELECT post_id FROM post_like WHERE user_id = $1 ORDER BY created_at DESC",
	)
	.bind(user)
	.fetch_all(database)
	.await?;

	let saved = sqlx::query_scalar::<_, Uuid>(
		"SELECT post_id FROM saved_post WHERE user_id = $1 ORDER BY created_at DESC",
	)
	.bind(user)
	.fetch_all(database)
	.await?;

	Ok(model::ViewerState { liked, saved })
}

/// Interprets the result of an `ON CONFLICT DO NOTHING ... RETURNING` insert
/// keyed on a post. `None` means the row already existed, which is also what
/// a unique violation from a concurrent insert means.
fn inserted<T>(result: Result<Option<T>, sqlx::Error>, post: Uuid) -> Result<Option<T>, RouteError> {
	match result {
		Ok(row) => Ok(row),
		Err(sqlx::Error::Database(error)) if error.is_unique_violation() => Ok(None),
		Err(sqlx::Error::Database(error)) if error.is_foreign_key_violation() => {
			Err(Error::UnknownPost(post).into())
		}
		Err(error) => Err(error.into()),
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	async fn create_post(app: &TestServer) -> String {
		let post = app
			.post("/posts")
			.json(&json!({ "title": "Hello" }))
			.await
			.json::<Value>();

		post["id"].as_str().unwrap().to_string()
	}

	#[sqlx::test]
	async fn test_like_is_idempotent(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		let post = create_post(&app).await;

		let body = app.post(&format!("/posts/{post}/like")).await.json::<Value>();

		assert_eq!(body, json!({ "likes": 1, "alreadyLiked": false }));

		let body = app.post(&format!("/posts/{post}/like")).await.json::<Value>();

		assert_eq!(body, json!({ "likes": 1, "alreadyLiked": true }));

		let counts = app.get("/posts/likes-count").await.json::<Value>();

		assert_eq!(counts[&post], 1);

		let body = app.delete(&format!("/posts/{post}/like")).await.json::<Value>();

		assert_eq!(body, json!({ "likes": 0 }));

		// unliking twice is fine
		let response = app.delete(&format!("/posts/{post}/like")).await;

		assert_eq!(response.status_code(), 200);

		let counts = app.get("/posts/likes-count").await.json::<Value>();

		assert!(counts.get(&post).is_none());

		let response = app.post(&format!("/posts/{}/like", Uuid::nil())).await;

		assert_eq!(response.status_code(), 404);
	}

	#[sqlx::test]
	async fn test_save_conflicts(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		let post = create_post(&app).await;

		let response = app.post(&format!("/posts/{post}/save")).await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>(), json!({ "saved": true }));

		let response = app.post(&format!("/posts/{post}/save")).await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(response.json::<Value>()["errors"][0]["code"], "already_saved");

		let state = app.get("/posts/viewer-state").await.json::<Value>();

		assert_eq!(state["saved"], json!([post]));
		assert_eq!(state["liked"], json!([]));

		app.delete(&format!("/posts/{post}/save")).await;

		let state = app.get("/posts/viewer-state").await.json::<Value>();

		assert_eq!(state["saved"], json!([]));
	}

	#[sqlx::test]
	async fn test_comments(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		let post = create_post(&app).await;

		let response = app
			.post(&format!("/posts/{post}/comments"))
			.json(&json!({ "content": "   " }))
			.await;

		assert_eq!(response.status_code(), 400);

		let response = app
			.post(&format!("/posts/{post}/comments"))
			.json(&json!({ "content": "  First!  " }))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>()["content"], "First!");

		let comments = app
			.get(&format!("/posts/{post}/comments"))
			.await
			.json::<Value>();

		assert_eq!(comments[0]["author"]["username"], "jane");

		let counts = app.get("/posts/comments-count").await.json::<Value>();

		assert_eq!(counts[&post], 1);
	}

	#[sqlx::test]
	async fn test_anonymous_viewer_state(pool: Database) {
		let app = app(pool);

		let state = app.get("/posts/viewer-state").await.json::<Value>();

		assert_eq!(state, json!({ "liked": [], "saved": [] }));
	}
}

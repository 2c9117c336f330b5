use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{error, route::model::Paginate, AppState, Database};

pub mod feed;
pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	#[error("unknown_post")]
	UnknownPost(Uuid),
	#[error("not_author")]
	NotAuthor(Uuid),
	#[error("no_images")]
	NoImages,
	#[error("unsupported_image")]
	UnsupportedImage(String),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(get_feed, get_feed_docs).post_with(create_post, create_post_docs),
		)
		.api_route(
			"/:id",
			get_with(get_post, get_post_docs)
				.put_with(update_post, update_post_docs)
				.delete_with(delete_post, delete_post_docs),
		)
		.api_route("/:id/images", post_with(upload_images, upload_images_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::NotAuthor(..) => StatusCode::FORBIDDEN,
			Self::NoImages | Self::UnsupportedImage(..) => StatusCode::BAD_REQUEST,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let content = match self {
			Self::UnknownPost(..) => "The post you requested does not exist.",
			Self::NotAuthor(..) => "Only the author of the post can do this.",
			Self::NoImages => "The request did not contain any images.",
			Self::UnsupportedImage(..) => "Only png, jpg, gif and webp images are accepted.",
		};

		let message = error::Message::new(self.to_string()).content(content);

		match self {
			Self::UnknownPost(post) | Self::NotAuthor(post) => {
				message.detail("post", post.to_string())
			}
			Self::NoImages => message.field("images"),
			Self::UnsupportedImage(extension) => {
				message.field("images").detail("extension", extension)
			}
		}
		.into_vec()
	}
}

/// Fetches a single post with its author and counts.
pub async fn fetch_post(
	database: &Database,
	id: Uuid,
) -> Result<Option<model::PostView>, sqlx::Error> {
	let mut builder = QueryBuilder::new("");

	feed::push_select(&mut builder);
	builder.push(" WHERE post.id = ").push_bind(id);

	let post = builder
		.build_query_as::<model::PostRow>()
		.fetch_optional(database)
		.await?;

	Ok(post.map(model::PostView::from))
}

/// Fetches a page of an author's posts, newest first.
pub async fn fetch_by_author(
	database: &Database,
	author: Uuid,
	paginate: &Paginate,
) -> Result<Vec<model::PostView>, sqlx::Error> {
	let mut builder = QueryBuilder::new("");

	feed::push_select(&mut builder);
	builder
		.push(" WHERE post.user_id = ")
		.push_bind(author)
		.push(" ORDER BY published_at DESC, id DESC LIMIT ")
		.push_bind(paginate.limit())
		.push(" OFFSET ")
		.push_bind(paginate.offset());

	let posts = builder
		.build_query_as::<model::PostRow>()
		.fetch_all(database)
		.await?;

	Ok(posts.into_iter().map(model::PostView::from).collect())
}

/// Fetches every post saved by `user`, most recently saved first.
pub async fn fetch_saved(
	database: &Database,
	user: Uuid,
) -> Result<Vec<model::PostView>, sqlx::Error> {
	let mut builder = QueryBuilder::new("");

	feed::push_select(&mut builder);
	builder
		.push(" INNER JOIN saved_post ON saved_post.post_id = post.id WHERE saved_post.user_id = ")
		.push_bind(user)
		.push(" ORDER BY saved_post.created_at DESC, post.id DESC");

	let posts = builder
		.build_query_as::<model::PostRow>()
		.fetch_all(database)
		.await?;

	Ok(posts.into_iter().map(model::PostView::from).collect())
}

pub async fn find_post_ref(
	database: &Database,
	id: Uuid,
) -> Result<Option<model::PostRef>, sqlx::Error> {
	sqlx::query_as::<_, model::PostRef>("SELECT id, user_id, title FROM post WHERE id = $1")
		.bind(id)
		.fetch_optional(database)
		.await
}

/// Finds a post that `user` is allowed to modify.
pub async fn find_own_post(
	database: &Database,
	id: Uuid,
	user: Uuid,
) -> Result<model::PostRef, RouteError> {
	let post = find_post_ref(database, id)
		.await?
		.ok_or(Error::UnknownPost(id))?;

	if post.user_id != user {
		return Err(Error::NotAuthor(id).into());
	}

	Ok(post)
}

#[cfg(test)]
mod test {
	use crate::test::*;

	async fn create_post(app: &TestServer, title: &str, tags: &[&str]) -> Value {
		let response = app
			.post("/posts")
			.json(&json!({
				"title": title,
				"content": format!("<p>{title}</p>"),
				"tags": tags,
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		response.json::<Value>()
	}

	#[sqlx::test]
	async fn test_feed_pagination(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		for n in 0..7 {
			create_post(&app, &format!("Post {n}"), &[]).await;
		}

		let response = app.get("/posts").await;
		let body = response.json::<Value>();

		assert_eq!(body["posts"].as_array().unwrap().len(), 6);
		assert_eq!(body["pagination"]["totalPages"], 2);
		assert_eq!(body["pagination"]["totalPosts"], 7);
		assert_eq!(body["pagination"]["hasNextPage"], true);

		// newest first
		assert_eq!(body["posts"][0]["title"], "Post 6");

		let body = app
			.get("/posts")
			.add_query_param("page", 2)
			.await
			.json::<Value>();

		assert_eq!(body["posts"].as_array().unwrap().len(), 1);
		assert_eq!(body["pagination"]["hasNextPage"], false);

		let body = app
			.get("/posts")
			.add_query_param("page", 9)
			.await
			.json::<Value>();

		assert_eq!(body["posts"], json!([]));
		assert_eq!(body["pagination"]["hasNextPage"], false);
	}

	#[sqlx::test]
	async fn test_feed_filters(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;
		create_post(&app, "Learning Rust", &["rust", "beginner"]).await;
		create_post(&app, "100% coverage", &["testing"]).await;
		create_post(&app, "Cooking pasta", &["food"]).await;

		let body = app
			.get("/posts")
			.add_query_param("search", "RUST")
			.await
			.json::<Value>();

		assert_eq!(body["pagination"]["totalPosts"], 1);
		assert_eq!(body["posts"][0]["title"], "Learning Rust");

		// wildcards in search text match literally
		let body = app
			.get("/posts")
			.add_query_param("search", "%")
			.await
			.json::<Value>();

		assert_eq!(body["pagination"]["totalPosts"], 1);
		assert_eq!(body["posts"][0]["title"], "100% coverage");

		let body = app
			.get("/posts")
			.add_query_param("tagFilter", "foo")
			.await
			.json::<Value>();

		assert_eq!(body["posts"][0]["title"], "Cooking pasta");

		let body = app
			.get("/posts")
			.add_query_param("authorFilter", "JA")
			.await
			.json::<Value>();

		assert_eq!(body["pagination"]["totalPosts"], 3);
		assert_eq!(body["appliedFilters"]["authorFilter"], "JA");

		let body = app
			.get("/posts")
			.add_query_param("authorFilter", "nobody")
			.await
			.json::<Value>();

		assert_eq!(body["posts"], json!([]));
		assert_eq!(body["pagination"]["totalPosts"], 0);

		let body = app
			.get("/posts")
			.add_query_param("sortBy", "title")
			.add_query_param("sortOrder", "asc")
			.add_query_param("dateFilter", "today")
			.await
			.json::<Value>();

		assert_eq!(body["posts"][0]["title"], "100% coverage");
		assert_eq!(body["appliedFilters"]["sortBy"], "title");
		assert_eq!(body["appliedFilters"]["dateFilter"], "today");

		let response = app
			.get("/posts")
			.add_query_param("limit", 101)
			.await;

		assert_eq!(response.status_code(), 400);
	}

	#[sqlx::test]
	async fn test_feed_sorted_by_engagement(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		let mut ids = Vec::new();

		for n in 0..3 {
			let post = create_post(&app, &format!("Post {n}"), &[]).await;
			ids.push(post["id"].as_str().unwrap().to_string());
		}

		register(&app, "john").await;

		app.post(&format!("/posts/{}/like", ids[1])).await;
		app.post(&format!("/posts/{}/like", ids[2])).await;

		for _ in 0..2 {
			app.post(&format!("/posts/{}/comments", ids[0]))
				.json(&json!({ "content": "First!" }))
				.await;
		}

		register(&app, "bob").await;

		app.post(&format!("/posts/{}/like", ids[1])).await;
		app.post(&format!("/posts/{}/comments", ids[2]))
			.json(&json!({ "content": "Agreed" }))
			.await;

		let order = |body: &Value, field: &str| {
			body["posts"]
				.as_array()
				.unwrap()
				.iter()
				.map(|post| {
					(
						post["id"].as_str().unwrap().to_string(),
						post[field].as_i64().unwrap(),
					)
				})
				.collect::<Vec<_>>()
		};

		let body = app
			.get("/posts")
			.add_query_param("sortBy", "likes")
			.await
			.json::<Value>();

		assert_eq!(
			order(&body, "likes"),
			vec![(ids[1].clone(), 2), (ids[2].clone(), 1), (ids[0].clone(), 0)]
		);

		let body = app
			.get("/posts")
			.add_query_param("sortBy", "likes")
			.add_query_param("sortOrder", "asc")
			.await
			.json::<Value>();

		assert_eq!(
			order(&body, "likes"),
			vec![(ids[0].clone(), 0), (ids[2].clone(), 1), (ids[1].clone(), 2)]
		);

		let body = app
			.get("/posts")
			.add_query_param("sortBy", "comments")
			.await
			.json::<Value>();

		assert_eq!(
			order(&body, "comments"),
			vec![(ids[0].clone(), 2), (ids[2].clone(), 1), (ids[1].clone(), 0)]
		);
	}

	#[sqlx::test]
	async fn test_only_author_can_modify(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		let post = create_post(&app, "Mine", &["a"]).await;
		let id = post["id"].as_str().unwrap();

		register(&app, "john").await;

		let response = app
			.put(&format!("/posts/{id}"))
			.json(&json!({ "title": "Stolen" }))
			.await;

		assert_eq!(response.status_code(), 403);
		assert_eq!(response.json::<Value>()["errors"][0]["code"], "not_author");

		let response = app.delete(&format!("/posts/{id}")).await;

		assert_eq!(response.status_code(), 403);

		let response = app.get(&format!("/posts/{}", Uuid::nil())).await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(response.json::<Value>()["errors"][0]["code"], "unknown_post");
	}

	#[sqlx::test]
	async fn test_update_and_delete(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		let post = create_post(&app, "Draft", &["a"]).await;
		let id = post["id"].as_str().unwrap();

		let response = app
			.put(&format!("/posts/{id}"))
			.json(&json!({ "title": "Final" }))
			.await;

		assert_eq!(response.status_code(), 200);

		let body = response.json::<Value>();

		assert_eq!(body["title"], "Final");
		assert_eq!(body["tags"], json!(["a"]));

		app.post(&format!("/posts/{id}/like")).await;
		app.post(&format!("/posts/{id}/comments"))
			.json(&json!({ "content": "nice" }))
			.await;

		let response = app.delete(&format!("/posts/{id}")).await;

		assert_eq!(response.status_code(), 204);

		let response = app.get(&format!("/posts/{id}")).await;

		assert_eq!(response.status_code(), 404);

		let counts = app.get("/posts/likes-count").await.json::<Value>();

		assert_eq!(counts, json!({}));
	}
}

use aide::axum::IntoApiResponse;
use axum::{extract::State, http::StatusCode};
use macros::route;

use crate::{
	extract::{ImageUpload, Json, Path, Query, Session},
	openapi::tag,
	route::model::IdInput,
	storage, AppState, Database,
};

use super::{model, Error, RouteError};

/// Get feed
/// Returns a page of published posts, optionally searched, filtered by tag,
/// author or publication date, and sorted by recency, title, likes or comments.
#[route(tag = tag::POST)]
pub async fn get_feed(
	State(database): State<Database>,
	Query(query): Query<model::FeedQuery>,
) -> Result<Json<model::FeedPage>, RouteError> {
	Ok(Json(super::feed::fetch_feed(&database, &query).await?))
}

/// Create post
/// Creates a new post authored by the authenticated user.
#[route(tag = tag::POST)]
pub async fn create_post(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::CreatePost>,
) -> Result<Json<model::PostView>, RouteError> {
	let post = sqlx::query_as::<_, model::Post>(
		r#"
			INSERT INTO post (user_id, title, content, tags) VALUES ($1, $2, $3, $4)
			RETURNING *
		"#,
	)
	.bind(session.user.id)
	.bind(&input.title)
	.bind(&input.content)
	.bind(model::normalize_tags(input.tags))
	.fetch_one(&database)
	.await?;

	tracing::info!(post = %post.id, user = %session.user.id, tags = ?post.tags, "post created");

	let view = super::fetch_post(&database, post.id)
		.await?
		.ok_or(Error::UnknownPost(post.id))?;

	Ok(Json(view))
}

/// Get single post
/// Returns a single post by its unique id, with its author and counts.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
) -> Result<Json<model::PostView>, RouteError> {
	let post = super::fetch_post(&database, path.id).await?;

	Ok(Json(post.ok_or(Error::UnknownPost(path.id))?))
}

/// Update post
/// Updates an existing post. Only the author may do this, and absent fields
/// are left unchanged.
#[route(tag = tag::POST)]
pub async fn update_post(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<IdInput>,
	Json(input): Json<model::UpdatePost>,
) -> Result<Json<model::PostView>, RouteError> {
	super::find_own_post(&database, path.id, session.user.id).await?;

	sqlx::query(
		r#"
			UPDATE post
			SET title = COALESCE($1, title),
				content = COALESCE($2, content),
				tags = COALESCE($3, tags)
			WHERE id = $4
		"#,
	)
	.bind(input.title)
	.bind(input.content)
	.bind(input.tags.map(model::normalize_tags))
	.bind(path.id)
	.execute(&database)
	.await?;

	let post = super::fetch_post(&database, path.id)
		.await?
		.ok_or(Error::UnknownPost(path.id))?;

	Ok(Json(post))
}

/// Delete post
/// Deletes a post along with its likes, comments, saves and images.
/// Only the author may do this.
#[route(tag = tag::POST, response(status = 204, description = "Deleted successfully."))]
pub async fn delete_post(
	State(state): State<AppState>,
	session: Session,
	Path(path): Path<IdInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	super::find_own_post(&state.database, path.id, session.user.id).await?;

	let images = sqlx::query_scalar::<_, Vec<String>>(
		r#"
			DELETE FROM post WHERE id = $1
			RETURNING images
		"#,
	)
	.bind(path.id)
	.fetch_optional(&state.database)
	.await?
	.ok_or(Error::UnknownPost(path.id))?;

	for url in &images {
		if let Err(error) = state.images.delete(url).await {
			tracing::error!(%error, url, post = %path.id, "failed to delete post image");
		}
	}

	tracing::info!(post = %path.id, user = %session.user.id, "post deleted");

	Ok(StatusCode::NO_CONTENT)
}

/// Upload images
/// Uploads up to five images (`images` fields of a multipart body) to a post.
/// Images that cannot be stored are skipped, and the post keeps every image
/// that was stored.
#[route(tag = tag::POST)]
pub async fn upload_images(
	State(state): State<AppState>,
	session: Session,
	Path(path): Path<IdInput>,
	ImageUpload(images): ImageUpload,
) -> Result<Json<model::ImageUploadResponse>, RouteError> {
	super::find_own_post(&state.database, path.id, session.user.id).await?;

	if images.is_empty() {
		return Err(Error::NoImages.into());
	}

	for image in &images {
		storage::normalize_extension(&image.extension)
			.map_err(|_| Error::UnsupportedImage(image.extension.clone()))?;
	}

	let mut stored = Vec::with_capacity(images.len());
	let mut last_error = None;

	for image in &images {
		match state.images.put(&image.bytes, &image.extension).await {
			Ok(url) => stored.push(url),
			Err(error) => {
				tracing::error!(%error, post = %path.id, "failed to store post image");
				last_error = Some(error);
			}
		}
	}

	if let (true, Some(error)) = (stored.is_empty(), last_error) {
		return Err(error.into());
	}

	let all = sqlx::query_scalar::<_, Vec<String>>(
		r#"
			UPDATE post SET images = images || $1 WHERE id = $2
			RETURNING images
		"#,
	)
	.bind(&stored)
	.bind(path.id)
	.fetch_optional(&state.database)
	.await?;

	let Some(all) = all else {
		// The post was deleted while its images were being stored.
		for url in &stored {
			if let Err(error) = state.images.delete(url).await {
				tracing::error!(%error, url, "failed to delete orphaned image");
			}
		}

		return Err(Error::UnknownPost(path.id).into());
	};

	Ok(Json(model::ImageUploadResponse {
		images: all,
		failed: images.len() - stored.len(),
	}))
}

use axum::extract::State;
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{Json, Path, Query},
	openapi::tag,
	route::{
		engagement,
		follow,
		model::{IdInput, Paginate, UserSummary},
		post::{self, model::PostView},
	},
	Database,
};

use super::{model, Error, RouteError};

async fn ensure_exists(database: &Database, id: Uuid) -> Result<(), RouteError> {
	let exists = sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS (SELECT 1 FROM "user" WHERE id = $1)"#)
		.bind(id)
		.fetch_one(database)
		.await?;

	if exists {
		Ok(())
	} else {
		Err(Error::UnknownUser(id).into())
	}
}

/// Get profile
/// Returns the public profile of a user, with post and follow counts.
#[route(tag = tag::USER)]
pub async fn get_profile(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
) -> Result<Json<model::Profile>, RouteError> {
	let profile = sqlx::query_as::<_, model::Profile>(
		r#"
			SELECT
				"user".id, "user".username, "user".created_at,
				(SELECT COUNT(*) FROM post WHERE post.user_id = "user".id) AS post_count,
				(SELECT COUNT(*) FROM follow WHERE follow.followed_id = "user".id) AS follower_count,
				(SELECT COUNT(*) FROM follow WHERE follow.follower_id = "user".id) AS following_count
			FROM "user"
			WHERE "user".id = $1
		"#,
	)
	.bind(path.id)
	.fetch_optional(&database)
	.await?;

	Ok(Json(profile.ok_or(Error::UnknownUser(path.id))?))
}

/// Get user posts
/// Returns a page of posts authored by a user, newest first.
#[route(tag = tag::USER)]
pub async fn get_user_posts(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Vec<PostView>>, RouteError> {
	ensure_exists(&database, path.id).await?;

	Ok(Json(post::fetch_by_author(&database, path.id, &paginate).await?))
}

/// Get followed users
/// Returns the users that a user follows, most recently followed first.
#[route(tag = tag::USER)]
pub async fn get_following(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
) -> Result<Json<Vec<UserSummary>>, RouteError> {
	ensure_exists(&database, path.id).await?;

	Ok(Json(follow::list_followed(&database, path.id).await?))
}

/// Get followers
/// Returns the users that follow a user, most recent first.
#[route(tag = tag::USER)]
pub async fn get_followers(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
) -> Result<Json<Vec<UserSummary>>, RouteError> {
	ensure_exists(&database, path.id).await?;

	Ok(Json(follow::list_followers(&database, path.id).await?))
}

/// Get liked post ids
/// Returns the ids of the posts a user has liked, most recent first.
#[route(tag = tag::USER)]
pub async fn get_liked(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
) -> Result<Json<Vec<Uuid>>, RouteError> {
	ensure_exists(&database, path.id).await?;

	let state = engagement::viewer_state(&database, Some(path.id)).await?;

	Ok(Json(state.liked))
}

/// Get saved post ids
/// Returns the ids of the posts a user has saved, most recent first.
#[route(tag = tag::USER)]
pub async fn get_saved(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
) -> Result<Json<Vec<Uuid>>, RouteError> {
	ensure_exists(&database, path.id).await?;

	let state = engagement::viewer_state(&database, Some(path.id)).await?;

	Ok(Json(state.saved))
}

/// Get saved posts
/// Returns every post a user has saved, each exactly once, most recently
/// saved first.
#[route(tag = tag::USER)]
pub async fn get_saved_posts(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
) -> Result<Json<Vec<PostView>>, RouteError> {
	ensure_exists(&database, path.id).await?;

	Ok(Json(post::fetch_saved(&database, path.id).await?))
}

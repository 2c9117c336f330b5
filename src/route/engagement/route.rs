use axum::extract::State;
use chrono::{DateTime, Utc};
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{Json, Path, Query, Session, Viewer},
	openapi::tag,
	route::{
		model::{IdInput, Paginate, UserSummary},
		notification::{
			self,
			model::{NewNotification, NotificationKind, PostSummary},
		},
		post::{self, model::PostRef},
	},
	AppState, Database,
};

use super::{model, Error, RouteError};

async fn find_post(database: &Database, id: Uuid) -> Result<PostRef, RouteError> {
	Ok(post::find_post_ref(database, id)
		.await?
		.ok_or(Error::UnknownPost(id))?)
}

async fn count_likes(database: &Database, post: Uuid) -> Result<i64, sqlx::Error> {
	sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_like WHERE post_id = $1")
		.bind(post)
		.fetch_one(database)
		.await
}

/// Notifies the author of `post` about an action taken by `actor`.
async fn notify_author(state: &AppState, actor: &Session, post: PostRef, kind: NotificationKind) {
	notification::notify(
		state,
		NewNotification {
			recipient: post.user_id,
			actor: UserSummary {
				id: actor.user.id,
				username: actor.user.username.clone(),
			},
			kind,
			post: Some(PostSummary {
				id: post.id,
				title: post.title,
			}),
		},
	)
	.await;
}

/// Get like counts
/// Returns the number of likes of every post that has at least one.
/// Posts that are absent have no likes.
#[route(tag = tag::ENGAGEMENT)]
pub async fn get_like_counts(
	State(database): State<Database>,
) -> Result<Json<model::CountMap>, RouteError> {
	Ok(Json(super::aggregate_counts(&database).await?.likes))
}

/// Get comment counts
/// Returns the number of comments of every post that has at least one.
/// Posts that are absent have no comments.
#[route(tag = tag::ENGAGEMENT)]
pub async fn get_comment_counts(
	State(database): State<Database>,
) -> Result<Json<model::CountMap>, RouteError> {
	Ok(Json(super::aggregate_counts(&database).await?.comments))
}

/// Get viewer state
/// Returns the ids of the posts liked and saved by the caller. Both are
/// empty when not logged in.
#[route(tag = tag::ENGAGEMENT)]
pub async fn get_viewer_state(
	State(database): State<Database>,
	viewer: Viewer,
) -> Result<Json<model::ViewerState>, RouteError> {
	Ok(Json(super::viewer_state(&database, viewer.user_id()).await?))
}

/// Like post
/// Likes a post. Liking a post twice changes nothing, and reports that it
/// was already liked.
#[route(tag = tag::ENGAGEMENT)]
pub async fn like_post(
	State(state): State<AppState>,
	session: Session,
	Path(path): Path<IdInput>,
) -> Result<Json<model::LikeResponse>, RouteError> {
	let post = find_post(&state.database, path.id).await?;

	let result = sqlx::query_scalar::<_, Uuid>(
		r#"
			INSERT INTO post_like (post_id, user_id) VALUES ($1, $2)
			ON CONFLICT (post_id, user_id) DO NOTHING
			RETURNING id
		"#,
	)
	.bind(post.id)
	.bind(session.user.id)
	.fetch_optional(&state.database)
	.await;

	let already_liked = super::inserted(result, post.id)?.is_none();
	let likes = count_likes(&state.database, post.id).await?;

	if !already_liked {
		notify_author(&state, &session, post, NotificationKind::Like).await;
	}

	Ok(Json(model::LikeResponse {
		likes,
		already_liked,
	}))
}

/// Unlike post
/// Removes a like from a post. Unliking a post that is not liked changes nothing.
#[route(tag = tag::ENGAGEMENT)]
pub async fn unlike_post(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<IdInput>,
) -> Result<Json<model::UnlikeResponse>, RouteError> {
	sqlx::query("DELETE FROM post_like WHERE post_id = $1 AND user_id = $2")
		.bind(path.id)
		.bind(session.user.id)
		.execute(&database)
		.await?;

	Ok(Json(model::UnlikeResponse {
		likes: count_likes(&database, path.id).await?,
	}))
}

/// Save post
/// Saves a post for later. Saving a post twice is a conflict.
#[route(tag = tag::ENGAGEMENT)]
pub async fn save_post(
	State(state): State<AppState>,
	session: Session,
	Path(path): Path<IdInput>,
) -> Result<Json<model::SaveResponse>, RouteError> {
	let post = find_post(&state.database, path.id).await?;

	let result = sqlx::query_scalar::<_, Uuid>(
		r#"
			INSERT INTO saved_post (post_id, user_id) VALUES ($1, $2)
			ON CONFLICT (post_id, user_id) DO NOTHING
			RETURNING id
		"#,
	)
	.bind(post.id)
	.bind(session.user.id)
	.fetch_optional(&state.database)
	.await;

	if super::inserted(result, post.id)?.is_none() {
		return Err(Error::AlreadySaved(post.id).into());
	}

	notify_author(&state, &session, post, NotificationKind::Save).await;

	Ok(Json(model::SaveResponse { saved: true }))
}

/// Unsave post
/// Removes a post from the saved posts. Unsaving a post that is not saved
/// changes nothing.
#[route(tag = tag::ENGAGEMENT)]
pub async fn unsave_post(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<IdInput>,
) -> Result<Json<model::SaveResponse>, RouteError> {
	sqlx::query("DELETE FROM saved_post WHERE post_id = $1 AND user_id = $2")
		.bind(path.id)
		.bind(session.user.id)
		.execute(&database)
		.await?;

	Ok(Json(model::SaveResponse { saved: false }))
}

/// List comments
/// Returns a page of comments on a post, newest first.
#[route(tag = tag::ENGAGEMENT)]
pub async fn list_comments(
	State(database): State<Database>,
	Path(path): Path<IdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Vec<model::Comment>>, RouteError> {
	find_post(&database, path.id).await?;

	let comments = sqlx::query_as::<_, model::CommentRow>(
		r#"
			SELECT
				comment.id, comment.post_id, comment.content, comment.created_at,
				"user".id AS author_id, "user".username AS author_username
			FROM comment
			INNER JOIN "user" ON "user".id = comment.user_id
			WHERE comment.post_id = $1
			ORDER BY comment.created_at DESC, comment.id DESC
			LIMIT $2 OFFSET $3
		"#,
	)
	.bind(path.id)
	.bind(paginate.limit())
	.bind(paginate.offset())
	.fetch_all(&database)
	.await?;

	Ok(Json(comments.into_iter().map(model::Comment::from).collect()))
}

/// Create comment
/// Comments on a post as the authenticated user.
#[route(tag = tag::ENGAGEMENT)]
pub async fn create_comment(
	State(state): State<AppState>,
	session: Session,
	Path(path): Path<IdInput>,
	Json(input): Json<model::CommentInput>,
) -> Result<Json<model::Comment>, RouteError> {
	let post = find_post(&state.database, path.id).await?;
	let content = input.content.trim().to_string();

	let result = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
		r#"
			INSERT INTO comment (post_id, user_id, content) VALUES ($1, $2, $3)
			RETURNING id, created_at
		"#,
	)
	.bind(post.id)
	.bind(session.user.id)
	.bind(&content)
	.fetch_optional(&state.database)
	.await;

	let (id, created_at) = super::inserted(result, post.id)?.ok_or(Error::UnknownPost(post.id))?;

	let comment = model::Comment {
		id,
		post_id: post.id,
		content,
		created_at,
		author: UserSummary {
			id: session.user.id,
			username: session.user.username.clone(),
		},
	};

	notify_author(&state, &session, post, NotificationKind::Comment).await;

	Ok(Json(comment))
}

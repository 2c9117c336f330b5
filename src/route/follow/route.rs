use axum::extract::State;
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{Json, Query, Session},
	openapi::tag,
	route::{
		model::{MessageResponse, UserSummary},
		notification::{
			self,
			model::{NewNotification, NotificationKind},
		},
	},
	AppState, Database,
};

use super::{model, Error, RouteError};

/// Follow user
/// Follows a user as the authenticated user. Following a user twice is not
/// an error, but only the first request creates the follow.
#[route(
	tag = tag::FOLLOW,
	response(status = 201, description = "Followed successfully.", shape = "Json<model::FollowResponse>"),
	response(status = 200, description = "Already following.", shape = "Json<model::FollowResponse>")
)]
pub async fn follow_user(
	State(state): State<AppState>,
	session: Session,
	Json(input): Json<model::FollowInput>,
) -> Result<model::Followed, RouteError> {
	let followed = input.followed_id;

	if followed == session.user.id {
		return Err(Error::CannotFollowSelf.into());
	}

	sqlx::query_as::<_, UserSummary>(r#"SELECT id, username FROM "user" WHERE id = $1"#)
		.bind(followed)
		.fetch_optional(&state.database)
		.await?
		.ok_or(Error::UnknownUser(followed))?;

	let result = sqlx::query_scalar::<_, Uuid>(
		r#"
			INSERT INTO follow (follower_id, followed_id) VALUES ($1, $2)
			ON CONFLICT (follower_id, followed_id) DO NOTHING
			RETURNING id
		"#,
	)
	.bind(session.user.id)
	.bind(followed)
	.fetch_optional(&state.database)
	.await;

	let created = match result {
		Ok(row) => row.is_some(),
		Err(sqlx::Error::Database(error)) if error.is_unique_violation() => false,
		Err(sqlx::Error::Database(error)) if error.is_foreign_key_violation() => {
			return Err(Error::UnknownUser(followed).into());
		}
		Err(error) => return Err(error.into()),
	};

	if created {
		tracing::info!(follower = %session.user.id, followed = %followed, "user followed");

		notification::notify(
			&state,
			NewNotification {
				recipient: followed,
				actor: UserSummary {
					id: session.user.id,
					username: session.user.username.clone(),
				},
				kind: NotificationKind::Follow,
				post: None,
			},
		)
		.await;
	}

	Ok(model::Followed { created })
}

/// Unfollow user
/// Unfollows a user as the authenticated user. Unfollowing a user that is not
/// followed changes nothing.
#[route(tag = tag::FOLLOW)]
pub async fn unfollow_user(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::FollowInput>,
) -> Result<Json<MessageResponse>, RouteError> {
	sqlx::query("DELETE FROM follow WHERE follower_id = $1 AND followed_id = $2")
		.bind(session.user.id)
		.bind(input.followed_id)
		.execute(&database)
		.await?;

	Ok(Json(MessageResponse::new("Unfollowed successfully")))
}

/// Check follow
/// Returns whether one user follows another. Missing or malformed ids are
/// reported as not following.
#[route(tag = tag::FOLLOW)]
pub async fn check_follow(
	State(database): State<Database>,
	Query(input): Query<model::CheckInput>,
) -> Result<Json<model::CheckResponse>, RouteError> {
	let Some((follower, followed)) = input.ids() else {
		return Ok(Json(model::CheckResponse {
			is_following: false,
		}));
	};

	Ok(Json(model::CheckResponse {
		is_following: super::is_following(&database, follower, followed).await?,
	}))
}

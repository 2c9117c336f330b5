use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};
use uuid::Uuid;

use crate::{
	error::{AppError, RouteError},
	openapi::SECURITY_SCHEME_SESSION,
	route::auth,
	session, Database,
};

/// Extracts the session and related user from the request.
///
/// If it does not exist, a [`auth::Error::NoSessionCookie`] is returned.
/// If the session is invalid, a [`auth::Error::InvalidSessionCookie`] is returned.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub id: Uuid,
	pub user: auth::model::User,
}

/// The caller of an endpoint that can be used anonymously.
///
/// Contains the session when a valid session cookie is present. A missing
/// or stale cookie yields an anonymous viewer instead of an error.
#[derive(Debug)]
pub struct Viewer(pub Option<Session>);

impl Viewer {
	pub fn user_id(&self) -> Option<Uuid> {
		self.0.as_ref().map(|session| session.user.id)
	}
}

/// Reads the session id from the request cookies.
fn session_cookie(parts: &request::Parts) -> Option<Result<Uuid, uuid::Error>> {
	parts
		.headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == session::COOKIE_NAME)
		.map(|cookie| Uuid::parse_str(cookie.value()))
}

async fn find_session(
	database: &Database,
	session_id: Uuid,
) -> Result<Option<Session>, sqlx::Error> {
	let user = sqlx::query_as::<_, auth::model::User>(
		r#"
			SELECT "user".* FROM "user"
			INNER JOIN session ON session.user_id = "user".id
			WHERE session.id = $1
		"#,
	)
	.bind(session_id)
	.fetch_optional(database)
	.await?;

	Ok(user.map(|user| Session {
		id: session_id,
		user,
	}))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let session_id = session_cookie(parts)
			.ok_or(auth::Error::NoSessionCookie)?
			.map_err(|_| auth::Error::InvalidSessionCookie)?;

		let database = Database::from_ref(state);
		let session = find_session(&database, session_id).await?;

		Ok(session.ok_or(auth::Error::InvalidSessionCookie)?)
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Viewer
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let Some(Ok(session_id)) = session_cookie(parts) else {
			return Ok(Self(None));
		};

		let database = Database::from_ref(state);

		Ok(Self(find_session(&database, session_id).await?))
	}
}

impl OperationInput for Session {
	/// Adds a session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}

impl OperationInput for Viewer {
	/// The session cookie is optional, which `OpenAPI` expresses as an
	/// empty requirement next to the cookie one.
	fn operation_input(ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		Session::operation_input(ctx, operation);
		operation.security.push(Default::default());
	}
}

use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid email or password")]
	InvalidEmailOrPassword,
	#[error("password hashing error")]
	Argon(argon2::Error),
	#[error("no session cookie")]
	NoSessionCookie,
	#[error("invalid session cookie")]
	InvalidSessionCookie,
	#[error("username already taken")]
	UsernameTaken,
	#[error("email already taken")]
	EmailTaken,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/login", post_with(login, login_docs))
		.api_route("/logout", get_with(logout, logout_docs))
		.api_route("/register", post_with(register, register_docs))
		.api_route("/me", get_with(get_me, get_me_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidEmailOrPassword | Self::NoSessionCookie | Self::InvalidSessionCookie => {
				StatusCode::UNAUTHORIZED
			}
			Self::Argon(..) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::UsernameTaken | Self::EmailTaken => StatusCode::CONFLICT,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let code = match self {
			Self::InvalidEmailOrPassword => "invalid_credentials",
			Self::Argon(..) => return error::Message::new("internal_error").into_vec(),
			Self::NoSessionCookie => "unauthenticated",
			Self::InvalidSessionCookie => "invalid_session",
			Self::UsernameTaken => "username_taken",
			Self::EmailTaken => "email_taken",
		};

		let message = error::Message::new(code).content(self.to_string());

		match self {
			Self::UsernameTaken => message.field("username"),
			Self::EmailTaken => message.field("email"),
			_ => message,
		}
		.into_vec()
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	async fn test_signup_flow(pool: Database) {
		let app = app(pool);

		let response = app
			.post("/auth/register")
			.json(&json!({
				"email": "john@smith.com",
				"username": "john",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		assert!(response
			.header("set-cookie")
			.to_str()
			.unwrap()
			.contains("session="));

		let response = app
			.post("/auth/login")
			.json(&json!({
				"email": "john@smith.com",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		let response = app.get("/auth/me").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>()["username"], "john");

		let response = app.get("/auth/logout").await;

		assert_eq!(response.status_code(), 204);

		let response = app.get("/auth/me").await;

		assert_eq!(response.status_code(), 401);
	}

	#[sqlx::test]
	async fn test_duplicate_registration(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		let response = app
			.post("/auth/register")
			.json(&json!({
				"email": "jane@example.com",
				"username": "jane2",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(response.json::<Value>()["errors"][0]["code"], "email_taken");
	}

	#[sqlx::test]
	async fn test_wrong_password(pool: Database) {
		let app = app(pool);

		register(&app, "jane").await;

		let response = app
			.post("/auth/login")
			.json(&json!({
				"email": "jane@example.com",
				"password": "not the password",
			}))
			.await;

		assert_eq!(response.status_code(), 401);
		assert_eq!(
			response.json::<Value>()["errors"][0]["code"],
			"invalid_credentials"
		);
	}
}

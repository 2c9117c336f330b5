use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username.chars().any(|c| !c.is_alphanumeric()) {
		return Err(ValidationError::new("username_not_alphanumeric"));
	}

	Ok(())
}

/// A single user.
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
	/// The unique identifier of the user.
	pub id: Uuid,
	/// The user's primary email address, used for logging in.
	#[serde(skip)]
	#[allow(dead_code)]
	pub email: String,
	/// The hashed password.
	#[serde(skip)]
	pub password: Vec<u8>,
	/// The username that is displayed to the public.
	pub username: String,
	/// The creation time of the user.
	pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	/// The session id.
	#[serde(rename = "sessionId")]
	pub id: Uuid,
	/// The user that owns the session.
	pub user_id: Uuid,
	/// The creation time of the session.
	pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct RegisterInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
	/// The username that is displayed to the public.
	#[validate(length(min = 3, max = 16), custom(function = "validate_username"))]
	pub username: String,
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::RegisterInput;

	fn input(username: &str) -> RegisterInput {
		RegisterInput {
			email: "jane@example.com".into(),
			password: "correct horse".into(),
			username: username.into(),
		}
	}

	#[test]
	fn test_username_rules() {
		assert!(input("jane").validate().is_ok());
		assert!(input("jane doe").validate().is_err());
		assert!(input("jd").validate().is_err());
		assert!(input("a_really_long_username").validate().is_err());
	}
}

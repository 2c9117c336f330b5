use std::borrow::Cow;

use aide::{gen::GenContext, openapi::Operation, OperationOutput};
use axum::{
	body::Body,
	extract::rejection::{PathRejection, QueryRejection},
	extract::multipart::{MultipartError, MultipartRejection},
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use axum_jsonschema::JsonSchemaRejection;
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

use crate::storage;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message presented to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A machine-readable error code, such as `unknown_post`.
	pub code: Cow<'a, str>,
	/// A human-readable description of the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<Cow<'a, str>>,
	/// The input field that caused the error, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	/// Additional structured information about the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl<'a> Message<'a> {
	pub fn new(code: impl Into<Cow<'a, str>>) -> Self {
		Self {
			code: code.into(),
			content: None,
			field: None,
			details: None,
		}
	}

	pub fn content(mut self, content: impl Into<Cow<'a, str>>) -> Self {
		self.content = Some(content.into());
		self
	}

	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<Message<'static>>,
}

/// Describes how a route-specific error is presented to the client.
pub trait ErrorShape: std::fmt::Debug {
	fn status(&self) -> StatusCode;
	fn into_errors(self) -> Vec<Message<'static>>;
}

/// Errors shared by every route.
///
/// The Display implementation is never sent to the client, so it can
/// contain sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0:?}")]
	Json(JsonSchemaRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("multipart error: {0}")]
	Multipart(#[from] MultipartRejection),
	#[error("multipart field error: {0}")]
	MultipartField(#[from] MultipartError),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("storage error: {0}")]
	Storage(#[from] storage::Error),
	#[error("rate limited: {0:?}")]
	RateLimit(GovernorError),
}

impl From<JsonSchemaRejection> for AppError {
	fn from(error: JsonSchemaRejection) -> Self {
		Self::Json(error)
	}
}

impl From<GovernorError> for AppError {
	fn from(error: GovernorError) -> Self {
		Self::RateLimit(error)
	}
}

impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..)
			| Self::Json(..)
			| Self::Query(..)
			| Self::Path(..)
			| Self::Multipart(..)
			| Self::MultipartField(..) => StatusCode::BAD_REQUEST,
			Self::RateLimit(..) => StatusCode::TOO_MANY_REQUESTS,
			Self::Database(..) | Self::Storage(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn into_errors(self) -> Vec<Message<'static>> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					let field = field.to_string();

					errors.iter().map(move |error| {
						let mut message = Message::new(error.code.to_string()).field(field.clone());

						if let Some(content) = &error.message {
							message = message.content(content.to_string());
						}

						if !error.params.is_empty() {
							message.details = Some(
								error
									.params
									.iter()
									.filter(|(key, _)| *key != "value")
									.map(|(key, value)| (key.to_string(), value.clone()))
									.collect(),
							);
						}

						message
					})
				})
				.collect(),
			Self::Json(..) => Message::new("invalid_body")
				.content("The request body is not valid JSON for this endpoint.")
				.into_vec(),
			Self::Query(error) => Message::new("invalid_query")
				.content(error.body_text())
				.into_vec(),
			Self::Path(error) => Message::new("invalid_path")
				.content(error.body_text())
				.into_vec(),
			Self::Multipart(error) => Message::new("invalid_multipart")
				.content(error.body_text())
				.into_vec(),
			Self::MultipartField(error) => Message::new("invalid_multipart")
				.content(error.body_text())
				.into_vec(),
			Self::RateLimit(error) => {
				let message = Message::new("rate_limited").content("Too many requests.");

				match error {
					GovernorError::TooManyRequests { wait_time, .. } => {
						message.detail("wait_time", wait_time).into_vec()
					}
					_ => message.into_vec(),
				}
			}
			Self::Database(..) | Self::Storage(..) => Message::new("internal_error").into_vec(),
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}

		respond(status, self.into_errors())
	}
}

/// An error returned from a route, either one shared by all routes
/// or one specific to the route's module.
#[derive(Debug)]
pub enum RouteError<T> {
	App(AppError),
	Route(T),
}

impl<T: ErrorShape> From<T> for RouteError<T> {
	fn from(error: T) -> Self {
		Self::Route(error)
	}
}

impl<T> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T> From<sqlx::Error> for RouteError<T> {
	fn from(error: sqlx::Error) -> Self {
		Self::App(AppError::Database(error))
	}
}

impl<T> From<storage::Error> for RouteError<T> {
	fn from(error: storage::Error) -> Self {
		Self::App(AppError::Storage(error))
	}
}

impl<T> From<validator::ValidationErrors> for RouteError<T> {
	fn from(error: validator::ValidationErrors) -> Self {
		Self::App(AppError::Validation(error))
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => {
				let status = error.status();

				if status.is_server_error() {
					tracing::error!(?error, "request failed");
				}

				respond(status, error.into_errors())
			}
		}
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = ErrorResponse;

	fn operation_response(
		ctx: &mut GenContext,
		operation: &mut Operation,
	) -> Option<aide::openapi::Response> {
		axum_jsonschema::Json::<ErrorResponse>::operation_response(ctx, operation)
	}
}

fn respond(status: StatusCode, errors: Vec<Message<'static>>) -> Response<Body> {
	(
		status,
		Json(ErrorResponse {
			success: false,
			errors,
		}),
	)
		.into_response()
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_message_builder() {
		let message = Message::new("unknown_post")
			.content("The post does not exist.")
			.detail("post", "abc");

		let value = serde_json::to_value(&message).unwrap();

		assert_eq!(value["code"], "unknown_post");
		assert_eq!(value["content"], "The post does not exist.");
		assert_eq!(value["details"]["post"], "abc");
		assert!(value.get("field").is_none());
	}

	#[test]
	fn test_database_error_is_generic() {
		let error = AppError::Database(sqlx::Error::RowNotFound);

		assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);

		let errors = error.into_errors();

		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].code, "internal_error");
		assert!(errors[0].content.is_none());
	}
}

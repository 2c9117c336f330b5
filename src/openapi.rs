use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json, session};

pub const SECURITY_SCHEME_SESSION: &str = "Session";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const USER: &str = "User";
	pub const POST: &str = "Post";
	pub const ENGAGEMENT: &str = "Engagement";
	pub const FOLLOW: &str = "Follow";
	pub const NOTIFICATION: &str = "Notification";
}

fn describe_tag(name: &str, description: &str) -> Tag {
	Tag {
		name: name.into(),
		description: Some(description.into()),
		..Default::default()
	}
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Social Blog API")
		.summary("Posts, likes, comments, follows and notifications")
		.description(include_str!("../README.md"))
		.tag(describe_tag(tag::AUTH, "Registration and sessions"))
		.tag(describe_tag(tag::USER, "Public user profiles"))
		.tag(describe_tag(tag::POST, "Post management and the searchable feed"))
		.tag(describe_tag(tag::ENGAGEMENT, "Likes, comments and saved posts"))
		.tag(describe_tag(tag::FOLLOW, "The follow graph"))
		.tag(describe_tag(tag::NOTIFICATION, "Notification feed"))
		.security_scheme(
			SECURITY_SCHEME_SESSION,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Cookie,
				name: session::COOKIE_NAME.into(),
				description: Some("A user session cookie".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse {
				success: false,
				errors: error::Message::new("unknown_post")
					.content("The post you requested does not exist.")
					.detail("post", "00000000-0000-0000-0000-000000000000")
					.into_vec(),
			})
		})
}

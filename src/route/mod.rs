use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{
	body::Body,
	http::{header, HeaderName, Method, Request},
	Extension, Router,
};
use governor::middleware::StateInformationMiddleware;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfig, key_extractor::PeerIpKeyExtractor, GovernorLayer};
use tower_http::{
	compression::CompressionLayer,
	cors::{AllowOrigin, CorsLayer},
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	services::ServeDir,
	trace::TraceLayer,
};

use crate::{config::Config, openapi, AppState};

pub mod auth;
pub mod docs;
pub mod engagement;
pub mod follow;
pub mod model;
pub mod notification;
pub mod post;
pub mod user;

pub type RateLimit = Arc<GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>>;

/// Per-IP rate limits. `secure` applies to authentication, `default` to everything.
#[derive(Clone)]
pub struct RateLimits {
	pub default: RateLimit,
	pub secure: RateLimit,
}

const REQUEST_ID: &str = "x-request-id";

/// Builds the application router, including the API documentation and the
/// uploaded images.
///
/// Rate limits need the peer address, so when they are given the router must
/// be served with [`Router::into_make_service_with_connect_info`].
pub fn app(state: AppState, config: &Config, limits: Option<RateLimits>) -> Router {
	let mut api = OpenApi::default();

	let auth = match &limits {
		Some(limits) => auth::routes().layer(GovernorLayer {
			config: limits.secure.clone(),
		}),
		None => auth::routes(),
	};

	let router = ApiRouter::new()
		.nest("/auth", auth)
		.nest("/users", user::routes())
		.nest("/posts", post::routes().merge(engagement::routes()))
		.nest("/follows", follow::routes())
		.nest("/notifications", notification::routes())
		.nest_api_service("/docs", docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.with_state(state);

	let uploads = ServeDir::new(&config.upload_dir);
	let prefix = config.upload_url_prefix.trim_end_matches('/');

	let router = if prefix.is_empty() {
		router.fallback_service(uploads)
	} else {
		router.nest_service(prefix, uploads)
	};

	let router = match limits {
		Some(limits) => router.layer(GovernorLayer {
			config: limits.default,
		}),
		None => router,
	};

	router.layer(
		ServiceBuilder::new()
			.layer(SetRequestIdLayer::new(
				HeaderName::from_static(REQUEST_ID),
				MakeRequestUuid,
			))
			.layer(
				TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
					let request_id = request
						.headers()
						.get(REQUEST_ID)
						.and_then(|value| value.to_str().ok())
						.unwrap_or_default();

					tracing::info_span!(
						"request",
						method = %request.method(),
						uri = %request.uri(),
						request_id,
					)
				}),
			)
			.layer(PropagateRequestIdLayer::new(HeaderName::from_static(
				REQUEST_ID,
			)))
			.layer(
				CorsLayer::new()
					.allow_origin(AllowOrigin::mirror_request())
					.allow_credentials(true)
					.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
					.allow_headers([header::CONTENT_TYPE]),
			)
			.layer(CompressionLayer::new()),
	)
}

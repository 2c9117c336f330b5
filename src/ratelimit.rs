use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{clock::QuantaInstant, middleware::RateLimitingMiddleware};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::KeyExtractor,
	GovernorError,
};

use crate::{
	error::AppError,
	route::{RateLimit, RateLimits},
};

/// How often limiter state of idle clients is discarded.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// The limits applied to the whole API.
pub fn default() -> Option<RateLimit> {
	GovernorConfigBuilder::default()
		.per_second(10)
		.burst_size(50)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
}

/// The stricter limits applied to logging in and registering.
pub fn secure() -> Option<RateLimit> {
	GovernorConfigBuilder::default()
		.per_second(2)
		.burst_size(5)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
}

/// Builds both limits and starts discarding stale limiter state in the background.
pub fn limits() -> Option<RateLimits> {
	let limits = RateLimits {
		default: default()?,
		secure: secure()?,
	};

	cleanup_old_limits(&[&limits.default, &limits.secure]);

	Some(limits)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}

pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();

	std::thread::spawn(move || loop {
		std::thread::sleep(CLEANUP_INTERVAL);

		for limiter in &limiters {
			tracing::debug!(size = limiter.len(), "rate limiting storage size");

			limiter.retain_recent();
		}
	});
}

#[cfg(test)]
mod test {
	#[test]
	fn test_limits_are_valid() {
		assert!(super::default().is_some());
		assert!(super::secure().is_some());
	}
}

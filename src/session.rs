use uuid::Uuid;

pub const COOKIE_NAME: &str = "session";

/// How long a session cookie is kept by the browser.
pub const MAX_AGE: cookie::time::Duration = cookie::time::Duration::DAY;

/// Creates a session cookie that expires after [`MAX_AGE`].
pub fn create_cookie(session_id: Uuid) -> cookie::Cookie<'static> {
	cookie::Cookie::build((COOKIE_NAME, session_id.to_string()))
		.secure(!cfg!(debug_assertions))
		.http_only(true)
		.same_site(cookie::SameSite::Lax)
		.path("/")
		.max_age(MAX_AGE)
		.into()
}

/// Creates an empty session cookie used to invalidate a previous one.
pub fn clear_cookie() -> cookie::Cookie<'static> {
	cookie::Cookie::build(COOKIE_NAME)
		.http_only(true)
		.path("/")
		.max_age(cookie::time::Duration::ZERO)
		.into()
}

#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod openapi;
mod ratelimit;
mod realtime;
mod route;
mod session;
mod storage;
mod trace;

use std::{net::SocketAddr, sync::Arc};

use argon2::Argon2;

use crate::{
	config::Config,
	realtime::Hub,
	route::notification::model::Notification,
	storage::{LocalImageStore, SharedImageStore},
};

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub type AppState = State;

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as a database connection pool, a hash configuration (if it's expensive to create),
/// or a cache client.
///
/// For dependencies only used by a single handler, you can combine states instead.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub images: SharedImageStore,
	pub notifications: Hub<Notification>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let config = Config::from_env()?;
	let _guard = trace::init_tracing_subscriber(config.otlp_endpoint.as_deref())?;

	let database = Database::connect(&config.database_url).await?;

	sqlx::migrate!().run(&database).await?;

	let images = LocalImageStore::new(&config.upload_dir, &config.upload_url_prefix);

	tokio::fs::create_dir_all(images.root()).await?;

	let state = State {
		database,
		hasher: Argon2::default(),
		images: Arc::new(images),
		notifications: Hub::default(),
	};

	let limits = ratelimit::limits();

	if limits.is_none() {
		tracing::warn!("rate limits could not be configured, serving without them");
	}

	let app = route::app(state, &config, limits);
	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!(address = %listener.local_addr()?, "listening");

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await?;

	Ok(())
}

use std::{env, net::IpAddr, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} is invalid: {value:?}")]
	Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
	pub database_url: String,
	pub host: IpAddr,
	pub port: u16,
	/// Directory that uploaded images are written to.
	pub upload_dir: PathBuf,
	/// Public URL prefix that uploaded images are served under.
	pub upload_url_prefix: String,
	/// When set, traces and metrics are exported over OTLP.
	pub otlp_endpoint: Option<String>,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();

		Self::from_lookup(|name| env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
		let or_default =
			|name: &'static str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

		let host = or_default("HOST", "127.0.0.1");
		let port = or_default("PORT", "3000");
		let upload_url_prefix = or_default("UPLOAD_URL_PREFIX", "/uploads");

		// Routes can only be mounted at absolute paths.
		if !upload_url_prefix.starts_with('/') {
			return Err(ConfigError::Invalid {
				name: "UPLOAD_URL_PREFIX",
				value: upload_url_prefix,
			});
		}

		Ok(Self {
			database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
			host: host.parse().map_err(|_| ConfigError::Invalid {
				name: "HOST",
				value: host.clone(),
			})?,
			port: port.parse().map_err(|_| ConfigError::Invalid {
				name: "PORT",
				value: port.clone(),
			})?,
			upload_dir: or_default("UPLOAD_DIR", "uploads").into(),
			upload_url_prefix,
			otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|value| !value.is_empty()),
		})
	}
}

#[cfg(test)]
mod test {
	use std::collections::HashMap;

	use super::*;

	fn config(vars: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
		let vars = vars
			.iter()
			.map(|(key, value)| (*key, value.to_string()))
			.collect::<HashMap<_, _>>();

		Config::from_lookup(|name| vars.get(name).cloned())
	}

	#[test]
	fn test_defaults() {
		let config = config(&[("DATABASE_URL", "postgres://localhost/blog")]).unwrap();

		assert_eq!(config.port, 3000);
		assert_eq!(config.host.to_string(), "127.0.0.1");
		assert_eq!(config.upload_dir, PathBuf::from("uploads"));
		assert_eq!(config.upload_url_prefix, "/uploads");
		assert!(config.otlp_endpoint.is_none());
	}

	#[test]
	fn test_missing_database_url() {
		assert!(matches!(
			config(&[]),
			Err(ConfigError::Missing("DATABASE_URL"))
		));
	}

	#[test]
	fn test_relative_upload_prefix() {
		let result = config(&[
			("DATABASE_URL", "postgres://localhost/blog"),
			("UPLOAD_URL_PREFIX", "uploads"),
		]);

		assert!(matches!(
			result,
			Err(ConfigError::Invalid {
				name: "UPLOAD_URL_PREFIX",
				..
			})
		));
	}

	#[test]
	fn test_invalid_port() {
		let result = config(&[
			("DATABASE_URL", "postgres://localhost/blog"),
			("PORT", "eighty"),
		]);

		assert!(matches!(
			result,
			Err(ConfigError::Invalid { name: "PORT", .. })
		));
	}
}

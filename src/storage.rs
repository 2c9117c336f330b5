use std::{
	io,
	path::{Path, PathBuf},
	sync::Arc,
};

use axum::async_trait;
use uuid::Uuid;

/// Image extensions that may be stored.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unsupported image extension {0:?}")]
	UnsupportedExtension(String),
	#[error("io error: {0}")]
	Io(#[from] io::Error),
}

/// A durable store for post images.
///
/// Only URLs are kept on posts, so the store is responsible for mapping
/// between a URL and the underlying bytes.
#[async_trait]
pub trait ImageStore: Send + Sync {
	/// Stores the image and returns its public URL.
	async fn put(&self, bytes: &[u8], extension: &str) -> Result<String, Error>;

	/// Deletes the image behind `url`. Unknown URLs are ignored.
	async fn delete(&self, url: &str) -> Result<(), Error>;
}

pub type SharedImageStore = Arc<dyn ImageStore>;

/// Stores images as files in a local directory, served under `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
	root: PathBuf,
	url_prefix: String,
}

impl LocalImageStore {
	pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
		Self {
			root: root.into(),
			url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Resolves a URL produced by [`LocalImageStore::put`] back to its file.
	///
	/// Returns `None` for URLs outside of the prefix or with path components,
	/// so a crafted URL cannot reach files outside of the root.
	fn path_of(&self, url: &str) -> Option<PathBuf> {
		let name = url.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;

		if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
			return None;
		}

		Some(self.root.join(name))
	}
}

/// Normalizes an extension, rejecting anything that is not an allowed image type.
pub fn normalize_extension(extension: &str) -> Result<String, Error> {
	let extension = extension.trim_start_matches('.').to_ascii_lowercase();

	if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
		Ok(extension)
	} else {
		Err(Error::UnsupportedExtension(extension))
	}
}

#[async_trait]
impl ImageStore for LocalImageStore {
	async fn put(&self, bytes: &[u8], extension: &str) -> Result<String, Error> {
		let extension = normalize_extension(extension)?;
		let name = format!("{}.{extension}", Uuid::new_v4());

		tokio::fs::create_dir_all(&self.root).await?;
		tokio::fs::write(self.root.join(&name), bytes).await?;

		Ok(format!("{}/{name}", self.url_prefix))
	}

	async fn delete(&self, url: &str) -> Result<(), Error> {
		let Some(path) = self.path_of(url) else {
			tracing::debug!(url, "ignoring delete of foreign image url");
			return Ok(());
		};

		match tokio::fs::remove_file(path).await {
			Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error.into()),
			_ => Ok(()),
		}
	}
}

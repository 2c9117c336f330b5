use aide::OperationInput;
use axum::{
	async_trait,
	body::Bytes,
	extract::{FromRequest, Multipart, Request},
};

use crate::error::AppError;

/// The maximum number of images accepted in a single upload.
pub const MAX_IMAGES: usize = 5;

/// A single image read from a multipart body.
#[derive(Debug)]
pub struct UploadedImage {
	/// The extension taken from the uploaded file name, such as `png`.
	pub extension: String,
	pub bytes: Bytes,
}

/// Extractor for a `multipart/form-data` body with one or more `images` fields.
///
/// Fields with other names are skipped, and at most [`MAX_IMAGES`] images are kept.
#[derive(Debug)]
pub struct ImageUpload(pub Vec<UploadedImage>);

#[async_trait]
impl<S> FromRequest<S> for ImageUpload
where
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let mut multipart = Multipart::from_request(req, state).await?;
		let mut images = Vec::new();

		while let Some(field) = multipart.next_field().await? {
			if field.name() != Some("images") {
				continue;
			}

			let extension = field
				.file_name()
				.and_then(|name| name.rsplit_once('.'))
				.map(|(_, extension)| extension.to_string())
				.unwrap_or_default();

			images.push(UploadedImage {
				extension,
				bytes: field.bytes().await?,
			});

			if images.len() == MAX_IMAGES {
				break;
			}
		}

		Ok(Self(images))
	}
}

/// The multipart body is described in the route documentation instead.
impl OperationInput for ImageUpload {}

//! Object-storage operations for post thumbnails.

use bytes::Bytes;
use reqwest::{header, Method};

use super::error::classify;
use super::{Backend, BackendError};

/// Bucket holding post thumbnails.
pub const POST_IMAGES_BUCKET: &str = "post-images";

/// Upload size cap, enforced before any network call.
pub const MAX_THUMBNAIL_BYTES: usize = 5 * 1024 * 1024;

/// Rejections produced by [`validate_thumbnail`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ThumbnailError {
    #[error("Please select a valid image file")]
    NotAnImage,
    #[error("Image size must be less than 5MB")]
    TooLarge,
}

/// Check an upload candidate before it goes anywhere near the network:
/// the file must be an image (by declared content type, or by extension
/// when the declared type is missing or generic) and under the size cap.
/// Returns the content type to upload with.
pub fn validate_thumbnail(
    file_name: &str,
    content_type: Option<&str>,
    len: usize,
) -> Result<String, ThumbnailError> {
    let resolved = match content_type {
        Some(ct) if ct.starts_with("image/") => ct.to_string(),
        Some("application/octet-stream") | None => {
            let guessed = mime_guess::from_path(file_name).first_or_octet_stream();
            if guessed.type_() != mime_guess::mime::IMAGE {
                return Err(ThumbnailError::NotAnImage);
            }
            guessed.essence_str().to_string()
        }
        Some(_) => return Err(ThumbnailError::NotAnImage),
    };

    if len > MAX_THUMBNAIL_BYTES {
        return Err(ThumbnailError::TooLarge);
    }

    Ok(resolved)
}

impl Backend {
    /// Upload an object into the post-images bucket.
    pub async fn upload_post_image(
        &self,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), BackendError> {
        let url =
            self.endpoint(&format!("storage/v1/object/{}/{}", POST_IMAGES_BUCKET, path))?;
        let response = self
            .request(Method::POST, url)
            .await
            .header(header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }
        Ok(())
    }

    /// Public URL for an object in the post-images bucket.
    pub fn public_image_url(&self, path: &str) -> Result<String, BackendError> {
        let url = self.endpoint(&format!(
            "storage/v1/object/public/{}/{}",
            POST_IMAGES_BUCKET, path
        ))?;
        Ok(url.to_string())
    }
}

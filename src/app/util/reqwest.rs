use std::time::Duration;

use bytes::Bytes;
use reqwest::header;

use crate::app::models::worker_error::WorkerError;

pub const MAX_IMAGE_FETCH_BYTES: usize = 8 * 1024 * 1024;

lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build http client");
}

/// Fetches caller-supplied image bytes (init image, mask, upscale source).
/// The payload must come back with an image content type and stay under
/// `MAX_IMAGE_FETCH_BYTES`.
pub async fn get_image_bytes(url: &str) -> Result<Bytes, WorkerError> {
    match CLIENT.get(url).send().await {
        Ok(res) => {
            if !res.status().is_success() {
                return Err(WorkerError::UpstreamFetch(format!(
                    "Failed to download image, status code: {}.",
                    res.status()
                )));
            }

            let content_type = res
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("")
                .to_string();

            if !content_type.starts_with("image/") {
                return Err(WorkerError::UpstreamFetch(format!(
                    "Url does not point to an image (Content-Type: {}).",
                    content_type
                )));
            }

            match res.bytes().await {
                Ok(bytes) => {
                    if bytes.len() > MAX_IMAGE_FETCH_BYTES {
                        return Err(WorkerError::UpstreamFetch(format!(
                            "Image size ({} bytes) exceeds maximum allowed size ({} bytes).",
                            bytes.len(),
                            MAX_IMAGE_FETCH_BYTES
                        )));
                    }

                    Ok(bytes)
                }
                Err(e) => {
                    tracing::error!(%e);
                    Err(WorkerError::UpstreamFetch(
                        "Failed to get bytes from response.".to_string(),
                    ))
                }
            }
        }
        Err(e) => {
            tracing::error!(%e);
            Err(WorkerError::UpstreamFetch(
                "Failed to get url response.".to_string(),
            ))
        }
    }
}

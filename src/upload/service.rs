use std::{io::Cursor, time::Instant};

use futures::future::try_join_all;
use image::{
    codecs::{jpeg::JpegEncoder, webp::WebPEncoder},
    DynamicImage, ImageFormat,
};
use reqwest::Url;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};

use crate::{app::models::worker_error::WorkerError, generate::enums::output_format::OutputFormat};

use super::models::{upload_task::UploadTask, uploaded_image_result::UploadedImageResult};

lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::new();
}

struct UploadAttemptError {
    retryable: bool,
    message: String,
}

/// Encodes, uploads and resolves every output concurrently. Results come back
/// in task order; the first failed task fails the batch.
pub async fn upload_images(
    tasks: Vec<UploadTask>,
) -> Result<Vec<UploadedImageResult>, WorkerError> {
    let start = Instant::now();
    let num_tasks = tasks.len();

    let results = try_join_all(tasks.into_iter().map(convert_and_upload_image)).await?;

    tracing::info!(
        "uploaded {} image(s) in: {}ms",
        num_tasks,
        start.elapsed().as_millis()
    );

    Ok(results)
}

async fn convert_and_upload_image(task: UploadTask) -> Result<UploadedImageResult, WorkerError> {
    let start = Instant::now();

    let bytes = encode_image(&task.image, task.target_extension, task.target_quality)?;
    let content_type = task.target_extension.content_type();

    put_image(&task.signed_url, &content_type, bytes).await?;

    let image_url = extract_storage_url(&task.signed_url)?;
    tracing::info!(
        "uploaded image to {} in: {}ms",
        image_url,
        start.elapsed().as_millis()
    );

    Ok(UploadedImageResult { image_url })
}

pub fn encode_image(
    image: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, WorkerError> {
    let mut bytes: Vec<u8> = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);

    let result = match format {
        // jpeg has no alpha channel
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
            image.to_rgb8().write_with_encoder(encoder)
        }
        OutputFormat::Png => image.write_to(&mut cursor, ImageFormat::Png),
        // the webp encoder is lossless, quality does not apply
        OutputFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut cursor);
            image.to_rgba8().write_with_encoder(encoder)
        }
    };

    match result {
        Ok(_) => Ok(bytes),
        Err(e) => {
            tracing::error!(%e);
            Err(WorkerError::Upload(format!(
                "Failed to encode image as {}.",
                format.extension()
            )))
        }
    }
}

/// PUTs the encoded bytes to the signed url, retrying up to twice with
/// exponential backoff (1s, 2s) on transport errors and retryable statuses.
async fn put_image(
    signed_url: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<(), WorkerError> {
    let strategy = ExponentialBackoff::from_millis(2).factor(500).take(2);

    let result = RetryIf::spawn(
        strategy,
        || async {
            match CLIENT
                .put(signed_url)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes.clone())
                .send()
                .await
            {
                Ok(res) => {
                    let status = res.status();

                    if status.is_success() {
                        Ok(())
                    } else {
                        Err(UploadAttemptError {
                            retryable: is_retryable_status(status.as_u16()),
                            message: format!("Upload failed with status code: {}.", status),
                        })
                    }
                }
                Err(e) => {
                    tracing::error!(%e);
                    Err(UploadAttemptError {
                        retryable: true,
                        message: "Failed to send upload request.".to_string(),
                    })
                }
            }
        },
        |e: &UploadAttemptError| e.retryable,
    )
    .await;

    result.map_err(|e| WorkerError::Upload(e.message))
}

/// Signed-url providers hand out 430 for an expired or consumed url; retrying
/// those can never succeed. Everything else in 4xx/5xx gets another attempt.
pub fn is_retryable_status(code: u16) -> bool {
    (400..=599).contains(&code) && code != 430
}

/// Strips the query signature from a signed url and keeps only its object
/// path, as a canonical `s3://` location.
pub fn extract_storage_url(signed_url: &str) -> Result<String, WorkerError> {
    match Url::parse(signed_url) {
        Ok(url) => Ok(format!("s3://{}", url.path().trim_start_matches('/'))),
        Err(e) => {
            tracing::error!(%e);
            Err(WorkerError::Upload("Invalid signed url.".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use axum::{http::StatusCode, routing::put, Router};

    use super::*;

    async fn spawn_server(app: Router) -> String {
        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);

        format!("http://{}", addr)
    }

    fn counting_route(
        counter: Arc<AtomicUsize>,
        failures: usize,
        failure_status: StatusCode,
    ) -> Router {
        Router::new().route(
            "/object",
            put(move || async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);

                if attempt < failures {
                    failure_status
                } else {
                    StatusCode::OK
                }
            }),
        )
    }

    fn task(signed_url: String) -> UploadTask {
        UploadTask {
            image: DynamicImage::new_rgb8(8, 8),
            signed_url,
            target_extension: OutputFormat::Png,
            target_quality: 90,
        }
    }

    #[test]
    fn extracts_the_object_path_from_a_signed_url() {
        let url = "https://bucket.host.com/outputs/img.jpeg?X-Amz-Signature=abc&X-Amz-Expires=60";

        assert_eq!(
            extract_storage_url(url).unwrap(),
            "s3://outputs/img.jpeg".to_string()
        );
    }

    #[test]
    fn rejects_an_unparseable_signed_url() {
        assert!(matches!(
            extract_storage_url("not a url"),
            Err(WorkerError::Upload(_))
        ));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(404));
        assert!(!is_retryable_status(430));
        assert!(!is_retryable_status(200));
        assert!(!is_retryable_status(302));
    }

    #[test]
    fn encodes_each_output_format() {
        let image = DynamicImage::new_rgb8(8, 8);

        let jpeg = encode_image(&image, OutputFormat::Jpeg, 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let png = encode_image(&image, OutputFormat::Png, 90).unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);

        let webp = encode_image(&image, OutputFormat::Webp, 90).unwrap();
        assert_eq!(&webp[..4], b"RIFF");
    }

    #[tokio::test]
    async fn upload_retries_until_the_service_recovers() {
        let counter = Arc::new(AtomicUsize::new(0));
        let url = spawn_server(counting_route(
            counter.clone(),
            2,
            StatusCode::SERVICE_UNAVAILABLE,
        ))
        .await;

        let results = upload_images(vec![task(format!("{}/object?sig=1", url))])
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(results[0].image_url, "s3://object");
    }

    #[tokio::test]
    async fn upload_fails_after_three_attempts() {
        let counter = Arc::new(AtomicUsize::new(0));
        let url = spawn_server(counting_route(
            counter.clone(),
            3,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
        .await;

        let result = upload_images(vec![task(format!("{}/object?sig=1", url))]).await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(WorkerError::Upload(_))));
    }

    #[tokio::test]
    async fn upload_does_not_retry_an_expired_signed_url() {
        let counter = Arc::new(AtomicUsize::new(0));
        let url = spawn_server(counting_route(
            counter.clone(),
            3,
            StatusCode::from_u16(430).unwrap(),
        ))
        .await;

        let result = upload_images(vec![task(format!("{}/object?sig=1", url))]).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(WorkerError::Upload(_))));
    }

    #[tokio::test]
    async fn uploads_preserve_task_order() {
        let app = Router::new()
            .route(
                "/slow",
                put(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    StatusCode::OK
                }),
            )
            .route("/fast", put(|| async { StatusCode::OK }));
        let url = spawn_server(app).await;

        let results = upload_images(vec![
            task(format!("{}/slow?sig=1", url)),
            task(format!("{}/fast?sig=2", url)),
        ])
        .await
        .unwrap();

        assert_eq!(results[0].image_url, "s3://slow");
        assert_eq!(results[1].image_url, "s3://fast");
    }
}

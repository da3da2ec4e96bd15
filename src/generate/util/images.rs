use image::{imageops::FilterType, DynamicImage, GenericImageView};

use crate::app::{models::worker_error::WorkerError, util::reqwest::get_image_bytes};

pub async fn download_image(url: &str) -> Result<DynamicImage, WorkerError> {
    let bytes = get_image_bytes(url).await?;

    match image::load_from_memory(&bytes) {
        Ok(image) => Ok(image),
        Err(e) => {
            tracing::error!(%e);
            Err(WorkerError::UpstreamFetch(
                "Could not decode image.".to_string(),
            ))
        }
    }
}

/// Downloads an init or mask image and cover-fits it to the requested output
/// size. Images that already match are passed through untouched.
pub async fn download_and_fit_image(
    url: &str,
    width: u32,
    height: u32,
) -> Result<DynamicImage, WorkerError> {
    let image = download_image(url).await?;

    if image.width() == width && image.height() == height {
        return Ok(image);
    }

    Ok(image.resize_to_fill(width, height, FilterType::Lanczos3))
}

/// Center-crops outputs wider or taller than requested down to exactly the
/// requested size. Smaller images pass through unchanged; nothing is ever
/// upscaled here.
pub fn crop_images(images: Vec<DynamicImage>, width: u32, height: u32) -> Vec<DynamicImage> {
    let mut cropped_images = Vec::with_capacity(images.len());

    for image in images {
        let (old_width, old_height) = image.dimensions();

        if old_width < width || old_height < height {
            cropped_images.push(image);
        } else {
            let left = (old_width - width) / 2;
            let top = (old_height - height) / 2;

            cropped_images.push(image.crop_imm(left, top, width, height));
        }
    }

    cropped_images
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use axum::{
        http::header,
        routing::get,
        Router,
    };
    use image::ImageFormat;

    use super::*;

    async fn spawn_server(app: Router) -> String {
        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);

        format!("http://{}", addr)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        bytes
    }

    fn image_route(bytes: Vec<u8>, content_type: &'static str) -> Router {
        Router::new().route(
            "/image",
            get(move || async move { ([(header::CONTENT_TYPE, content_type)], bytes) }),
        )
    }

    #[test]
    fn crop_is_a_noop_for_correctly_sized_images() {
        let images = vec![DynamicImage::new_rgb8(512, 512)];
        let cropped = crop_images(images, 512, 512);

        assert_eq!(cropped[0].dimensions(), (512, 512));
    }

    #[test]
    fn crop_centers_larger_images() {
        let images = vec![DynamicImage::new_rgb8(768, 640)];
        let cropped = crop_images(images, 512, 512);

        assert_eq!(cropped[0].dimensions(), (512, 512));
    }

    #[test]
    fn crop_never_enlarges_smaller_images() {
        let images = vec![DynamicImage::new_rgb8(256, 256)];
        let cropped = crop_images(images, 512, 512);

        assert_eq!(cropped[0].dimensions(), (256, 256));
    }

    #[test]
    fn crop_preserves_order() {
        let images = vec![
            DynamicImage::new_rgb8(600, 600),
            DynamicImage::new_rgb8(100, 100),
            DynamicImage::new_rgb8(512, 512),
        ];
        let cropped = crop_images(images, 512, 512);

        assert_eq!(cropped[0].dimensions(), (512, 512));
        assert_eq!(cropped[1].dimensions(), (100, 100));
        assert_eq!(cropped[2].dimensions(), (512, 512));
    }

    #[tokio::test]
    async fn download_and_fit_passes_matching_images_through() {
        let url = spawn_server(image_route(png_bytes(512, 512), "image/png")).await;
        let image = download_and_fit_image(&format!("{}/image", url), 512, 512)
            .await
            .unwrap();

        assert_eq!(image.dimensions(), (512, 512));
    }

    #[tokio::test]
    async fn download_and_fit_covers_mismatched_images() {
        let url = spawn_server(image_route(png_bytes(1024, 768), "image/png")).await;
        let image = download_and_fit_image(&format!("{}/image", url), 512, 512)
            .await
            .unwrap();

        assert_eq!(image.dimensions(), (512, 512));
    }

    #[tokio::test]
    async fn download_rejects_non_image_content_types() {
        let url = spawn_server(image_route(b"not an image".to_vec(), "text/html")).await;
        let result = download_image(&format!("{}/image", url)).await;

        assert!(matches!(result, Err(WorkerError::UpstreamFetch(_))));
    }

    #[tokio::test]
    async fn download_rejects_oversized_payloads() {
        let url = spawn_server(image_route(
            vec![0u8; crate::app::util::reqwest::MAX_IMAGE_FETCH_BYTES + 1],
            "image/png",
        ))
        .await;
        let result = download_image(&format!("{}/image", url)).await;

        assert!(matches!(result, Err(WorkerError::UpstreamFetch(_))));
    }
}

use std::time::Instant;

use image::DynamicImage;

use crate::{
    app::models::worker_error::WorkerError,
    generate::{dtos::generate_dto::GenerateDto, util::images::download_image},
    pipelines::{
        capability::UpscaleCapability,
        models::{model_config::ModelConfig, pipeline_bundle::PipelineBundle},
    },
};

/// Fetches the source image and runs it through the loaded upscaler. The
/// source is sent as-is; sizing is the upscaler's business.
pub async fn upscale(
    dto: &GenerateDto,
    bundle: &PipelineBundle,
    model: &ModelConfig,
) -> Result<Vec<DynamicImage>, WorkerError> {
    let Some(capability) = &bundle.upscale else {
        return Err(WorkerError::Configuration(
            "No upscale pipeline loaded.".to_string(),
        ));
    };

    let Some(image_to_upscale) = &dto.image_to_upscale else {
        return Err(WorkerError::Configuration(
            "No image to upscale.".to_string(),
        ));
    };

    let start = Instant::now();
    let image = download_image(image_to_upscale).await?;
    tracing::info!("downloaded source image in: {}ms", start.elapsed().as_millis());

    let start = Instant::now();
    let upscaled_image = capability.upscale(&image).await?;

    tracing::info!(
        "upscale | {} | 1 image(s) | {}ms",
        model.name,
        start.elapsed().as_millis()
    );

    Ok(vec![upscaled_image])
}

#[cfg(test)]
mod tests {
    use std::{
        io::Cursor,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use axum::{http::header, routing::get, Router};
    use image::{GenericImageView, ImageFormat};

    use crate::{
        generate::enums::output_format::OutputFormat,
        pipelines::{
            capability::UpscaleCapability,
            models::model_config::WorkerModel,
            schedulers::SchedulerConfig,
        },
    };

    use super::*;

    #[derive(Default)]
    struct RecordingUpscaler {
        calls: Mutex<Vec<(u32, u32)>>,
    }

    #[async_trait]
    impl UpscaleCapability for RecordingUpscaler {
        async fn upscale(&self, image: &DynamicImage) -> Result<DynamicImage, WorkerError> {
            self.calls.lock().unwrap().push(image.dimensions());
            Ok(DynamicImage::new_rgb8(image.width() * 4, image.height() * 4))
        }
    }

    fn upscale_bundle(capability: Arc<RecordingUpscaler>) -> PipelineBundle {
        PipelineBundle {
            text2img: None,
            img2img: None,
            inpaint: None,
            prior: None,
            refiner: None,
            upscale: Some(capability),
            scheduler_config: SchedulerConfig::fresh("K_LMS"),
        }
    }

    fn upscale_dto(image_to_upscale: Option<String>) -> GenerateDto {
        GenerateDto {
            prompt: "".to_string(),
            negative_prompt: None,
            prompt_prefix: None,
            negative_prompt_prefix: None,
            width: 512,
            height: 512,
            num_outputs: 1,
            num_inference_steps: 30,
            guidance_scale: 7.5,
            seed: None,
            scheduler: None,
            init_image_url: None,
            mask_image_url: None,
            prompt_strength: None,
            signed_urls: vec!["https://bucket.host/a?sig=1".to_string()],
            output_image_extension: OutputFormat::Jpeg,
            output_image_quality: 90,
            image_to_upscale,
        }
    }

    fn aura_sr_model() -> ModelConfig {
        ModelConfig::for_model(WorkerModel::AURA_SR).unwrap()
    }

    async fn spawn_png_server(width: u32, height: u32) -> String {
        let mut bytes: Vec<u8> = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let app = Router::new().route(
            "/image.png",
            get(move || async move { ([(header::CONTENT_TYPE, "image/png")], bytes) }),
        );
        let server = axum::Server::bind(&"127.0.0.1:0".parse().unwrap())
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);

        format!("http://{}/image.png", addr)
    }

    #[tokio::test]
    async fn upscales_the_source_image_without_resizing_it_first() {
        let capability = Arc::new(RecordingUpscaler::default());
        let bundle = upscale_bundle(capability.clone());
        let dto = upscale_dto(Some(spawn_png_server(300, 200).await));

        let images = upscale(&dto, &bundle, &aura_sr_model()).await.unwrap();

        assert_eq!(capability.calls.lock().unwrap()[0], (300, 200));
        assert_eq!(images[0].dimensions(), (1200, 800));
    }

    #[tokio::test]
    async fn fails_without_an_upscale_pipeline() {
        let mut bundle = upscale_bundle(Arc::new(RecordingUpscaler::default()));
        bundle.upscale = None;
        let dto = upscale_dto(Some("https://images.host/source.png".to_string()));

        let result = upscale(&dto, &bundle, &aura_sr_model()).await;

        assert_eq!(
            result.unwrap_err(),
            WorkerError::Configuration("No upscale pipeline loaded.".to_string())
        );
    }
}

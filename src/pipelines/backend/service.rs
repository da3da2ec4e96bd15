use std::{io::Cursor, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use reqwest::header;
use serde::Serialize;

use crate::{
    app::models::worker_error::WorkerError,
    pipelines::{
        capability::{ImageCapability, PriorCapability, UpscaleCapability},
        models::inference_spec::{
            Embedding, InferenceOutput, InferenceSpec, Latent, PriorEmbeddings,
            PriorInterpolateSpec, PriorSpec,
        },
    },
};

use super::{
    models::input_spec::{InputSpec, PriorInputSpec, PriorInterpolateInputSpec, UpscaleInputSpec},
    structs::inference_response::{
        InferenceResponse, PriorEmbedResponse, PriorInterpolateResponse, UpscaleResponse,
    },
};

/// Client for the opaque inference sidecar. One instance per process, shared
/// by every capability endpoint of the bundle.
pub struct InferenceClient {
    pub api_url: String,
    pub api_secret: Option<String>,
    client: reqwest::Client,
}

impl InferenceClient {
    pub fn new(api_url: String, api_secret: Option<String>) -> Self {
        Self {
            api_url,
            api_secret,
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: Serialize>(&self, route: &str, input: &T) -> Result<String, WorkerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("Content-Type", "application/json".parse().unwrap());

        if let Some(secret) = &self.api_secret {
            match format!("Bearer {}", secret).parse() {
                Ok(value) => {
                    headers.insert("Authorization", value);
                }
                Err(_) => {
                    return Err(WorkerError::Configuration(
                        "Invalid inference api secret.".to_string(),
                    ))
                }
            }
        }

        let result = self
            .client
            .post([&self.api_url, route].concat())
            .headers(headers)
            .json(input)
            .send()
            .await;

        match result {
            Ok(res) => {
                let status = res.status();

                match res.text().await {
                    Ok(text) => {
                        if !status.is_success() {
                            tracing::error!(%text);
                            return Err(WorkerError::Inference(format!(
                                "Inference api returned status code {}.",
                                status
                            )));
                        }

                        Ok(text)
                    }
                    Err(e) => {
                        tracing::error!(%e);
                        Err(WorkerError::Inference(
                            "Failed to read inference api response.".to_string(),
                        ))
                    }
                }
            }
            Err(e) => {
                tracing::error!(%e);
                Err(WorkerError::Inference(
                    "Failed to reach inference api.".to_string(),
                ))
            }
        }
    }
}

fn encode_png(image: &DynamicImage) -> Result<String, WorkerError> {
    let mut bytes: Vec<u8> = Vec::new();

    match image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png) {
        Ok(_) => Ok(base64::encode(bytes)),
        Err(e) => {
            tracing::error!(%e);
            Err(WorkerError::Inference(
                "Could not encode image payload.".to_string(),
            ))
        }
    }
}

fn decode_image(encoded: &str) -> Result<DynamicImage, WorkerError> {
    match base64::decode(encoded) {
        Ok(bytes) => match image::load_from_memory(&bytes) {
            Ok(image) => Ok(image),
            Err(e) => {
                tracing::error!(%e);
                Err(WorkerError::Inference(
                    "Could not decode image from inference api.".to_string(),
                ))
            }
        },
        Err(e) => {
            tracing::error!(%e);
            Err(WorkerError::Inference(
                "Could not decode image from inference api.".to_string(),
            ))
        }
    }
}

pub struct ImageEndpoint {
    client: Arc<InferenceClient>,
    route: &'static str,
}

impl ImageEndpoint {
    pub fn new(client: Arc<InferenceClient>, route: &'static str) -> Self {
        Self { client, route }
    }
}

#[async_trait]
impl ImageCapability for ImageEndpoint {
    async fn generate(&self, spec: &InferenceSpec) -> Result<InferenceOutput, WorkerError> {
        let init_image = match &spec.init_image {
            Some(image) => Some(encode_png(image)?),
            None => None,
        };
        let mask_image = match &spec.mask_image {
            Some(image) => Some(encode_png(image)?),
            None => None,
        };

        let input = InputSpec {
            prompt: spec.prompt.clone(),
            negative_prompt: spec.negative_prompt.clone(),
            width: spec.width,
            height: spec.height,
            num_inference_steps: spec.num_inference_steps,
            guidance_scale: spec.guidance_scale,
            seed: spec.seed,
            scheduler: spec.scheduler.clone(),
            init_image,
            mask_image,
            strength: spec.strength,
            image_embeds: spec.image_embeds.as_ref().map(|embeds| embeds.0.clone()),
            negative_image_embeds: spec
                .negative_image_embeds
                .as_ref()
                .map(|embeds| embeds.0.clone()),
            latent: spec.latent.as_ref().map(|latent| base64::encode(&latent.0)),
            output_latent: spec.output_latent,
        };

        let text = self.client.post(self.route, &input).await?;

        match serde_json::from_str::<InferenceResponse>(&text) {
            Ok(res) => {
                if let Some(latent) = res.latent {
                    match base64::decode(&latent) {
                        Ok(bytes) => Ok(InferenceOutput::Latent(Latent(Bytes::from(bytes)))),
                        Err(e) => {
                            tracing::error!(%e);
                            Err(WorkerError::Inference(
                                "Could not decode latent payload.".to_string(),
                            ))
                        }
                    }
                } else if let Some(image) = res.image {
                    Ok(InferenceOutput::Image(decode_image(&image)?))
                } else {
                    Err(WorkerError::Inference(
                        "Inference api returned no image.".to_string(),
                    ))
                }
            }
            Err(_) => {
                tracing::error!(%text);
                Err(WorkerError::Inference(
                    "Unexpected inference api response.".to_string(),
                ))
            }
        }
    }
}

pub struct PriorEndpoint {
    client: Arc<InferenceClient>,
}

impl PriorEndpoint {
    pub fn new(client: Arc<InferenceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriorCapability for PriorEndpoint {
    async fn embed(&self, spec: &PriorSpec) -> Result<Embedding, WorkerError> {
        let input = PriorInputSpec {
            prompt: spec.prompt.to_string(),
            num_inference_steps: spec.num_inference_steps,
            guidance_scale: spec.guidance_scale,
            seed: spec.seed,
        };

        let text = self.client.post("/prior", &input).await?;

        match serde_json::from_str::<PriorEmbedResponse>(&text) {
            Ok(res) => Ok(Embedding(res.image_embeds)),
            Err(_) => {
                tracing::error!(%text);
                Err(WorkerError::Inference(
                    "Unexpected prior response.".to_string(),
                ))
            }
        }
    }

    async fn interpolate(
        &self,
        spec: &PriorInterpolateSpec,
    ) -> Result<PriorEmbeddings, WorkerError> {
        let input = PriorInterpolateInputSpec {
            prompt: spec.prompt.to_string(),
            negative_prompt: spec.negative_prompt.clone(),
            image: encode_png(&spec.image)?,
            weights: spec.weights,
            num_inference_steps: spec.num_inference_steps,
            guidance_scale: spec.guidance_scale,
            seed: spec.seed,
        };

        let text = self.client.post("/prior/interpolate", &input).await?;

        match serde_json::from_str::<PriorInterpolateResponse>(&text) {
            Ok(res) => Ok(PriorEmbeddings {
                image_embeds: Embedding(res.image_embeds),
                negative_image_embeds: Embedding(res.negative_image_embeds),
            }),
            Err(_) => {
                tracing::error!(%text);
                Err(WorkerError::Inference(
                    "Unexpected prior response.".to_string(),
                ))
            }
        }
    }
}

pub struct UpscaleEndpoint {
    client: Arc<InferenceClient>,
}

impl UpscaleEndpoint {
    pub fn new(client: Arc<InferenceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UpscaleCapability for UpscaleEndpoint {
    async fn upscale(&self, image: &DynamicImage) -> Result<DynamicImage, WorkerError> {
        let input = UpscaleInputSpec {
            image: encode_png(image)?,
        };

        let text = self.client.post("/upscale", &input).await?;

        match serde_json::from_str::<UpscaleResponse>(&text) {
            Ok(res) => decode_image(&res.image),
            Err(_) => {
                tracing::error!(%text);
                Err(WorkerError::Inference(
                    "Unexpected upscale response.".to_string(),
                ))
            }
        }
    }
}

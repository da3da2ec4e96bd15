use serde::Serialize;

use crate::pipelines::schedulers::SchedulerConfig;

/// Wire shape of one generation call against the inference api. Image
/// payloads travel as base64 png.
#[derive(Debug, Serialize)]
pub struct InputSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_embeds: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_image_embeds: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latent: Option<String>,
    pub output_latent: bool,
}

#[derive(Debug, Serialize)]
pub struct PriorInputSpec {
    pub prompt: String,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: u64,
}

#[derive(Debug, Serialize)]
pub struct PriorInterpolateInputSpec {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub image: String,
    pub weights: (f32, f32),
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: u64,
}

#[derive(Debug, Serialize)]
pub struct UpscaleInputSpec {
    pub image: String,
}

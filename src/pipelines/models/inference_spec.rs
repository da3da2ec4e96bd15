use bytes::Bytes;
use image::DynamicImage;

use crate::pipelines::schedulers::SchedulerConfig;

/// An opaque intermediate (non-finalized) representation returned by a
/// capability when a refinement pass follows. The worker never inspects it.
#[derive(Debug, Clone)]
pub struct Latent(pub Bytes);

/// A prompt or image embedding produced by a prior capability.
#[derive(Debug, Clone)]
pub struct Embedding(pub Vec<f32>);

#[derive(Debug, Clone)]
pub enum InferenceOutput {
    Image(DynamicImage),
    Latent(Latent),
}

/// One backend call of the main generation loop. Built per output index so
/// every call carries its own deterministic seed.
#[derive(Debug, Clone, Default)]
pub struct InferenceSpec {
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: u64,
    pub scheduler: Option<SchedulerConfig>,
    pub init_image: Option<DynamicImage>,
    pub mask_image: Option<DynamicImage>,
    pub strength: Option<f32>,
    pub image_embeds: Option<Embedding>,
    pub negative_image_embeds: Option<Embedding>,
    pub latent: Option<Latent>,
    pub output_latent: bool,
}

#[derive(Debug, Clone)]
pub struct PriorSpec {
    pub prompt: String,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: u64,
}

/// Interpolates between a text embedding and an image embedding, weighted by
/// `(prompt_strength, 1 - prompt_strength)`.
#[derive(Debug, Clone)]
pub struct PriorInterpolateSpec {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub image: DynamicImage,
    pub weights: (f32, f32),
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct PriorEmbeddings {
    pub image_embeds: Embedding,
    pub negative_image_embeds: Embedding,
}

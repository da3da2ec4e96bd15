use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct InferenceResponse {
    pub image: Option<String>,
    pub latent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PriorEmbedResponse {
    pub image_embeds: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct PriorInterpolateResponse {
    pub image_embeds: Vec<f32>,
    pub negative_image_embeds: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct UpscaleResponse {
    pub image: String,
}

use async_trait::async_trait;
use image::DynamicImage;

use crate::app::models::worker_error::WorkerError;

use super::models::inference_spec::{
    Embedding, InferenceOutput, InferenceSpec, PriorEmbeddings, PriorInterpolateSpec, PriorSpec,
};

/// One named inference operation exposed by the backend (text2img, img2img,
/// inpaint, refine). The backend itself is an external collaborator; these
/// traits are the only seam the worker sees.
#[async_trait]
pub trait ImageCapability: Send + Sync {
    async fn generate(&self, spec: &InferenceSpec) -> Result<InferenceOutput, WorkerError>;
}

#[async_trait]
pub trait PriorCapability: Send + Sync {
    async fn embed(&self, spec: &PriorSpec) -> Result<Embedding, WorkerError>;

    async fn interpolate(
        &self,
        spec: &PriorInterpolateSpec,
    ) -> Result<PriorEmbeddings, WorkerError>;
}

#[async_trait]
pub trait UpscaleCapability: Send + Sync {
    async fn upscale(&self, image: &DynamicImage) -> Result<DynamicImage, WorkerError>;
}

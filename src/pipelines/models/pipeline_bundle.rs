use std::sync::Arc;

use crate::pipelines::{
    backend::service::{ImageEndpoint, InferenceClient, PriorEndpoint, UpscaleEndpoint},
    capability::{ImageCapability, PriorCapability, UpscaleCapability},
    schedulers::{self, SchedulerConfig},
};

use super::model_config::ModelConfig;

/// The set of capabilities loaded for one model. Constructed once at process
/// start and shared read-only across requests; scheduler overrides are
/// resolved per call, never written back here.
pub struct PipelineBundle {
    pub text2img: Option<Arc<dyn ImageCapability>>,
    pub img2img: Option<Arc<dyn ImageCapability>>,
    pub inpaint: Option<Arc<dyn ImageCapability>>,
    pub prior: Option<Arc<dyn PriorCapability>>,
    pub refiner: Option<Arc<dyn ImageCapability>>,
    pub upscale: Option<Arc<dyn UpscaleCapability>>,
    pub scheduler_config: SchedulerConfig,
}

impl PipelineBundle {
    pub fn from_model(model: &ModelConfig, client: &Arc<InferenceClient>) -> Self {
        let capabilities = model.capabilities;

        Self {
            text2img: capabilities.text2img.then(|| {
                Arc::new(ImageEndpoint::new(client.clone(), "/text2img"))
                    as Arc<dyn ImageCapability>
            }),
            img2img: capabilities.img2img.then(|| {
                Arc::new(ImageEndpoint::new(client.clone(), "/img2img"))
                    as Arc<dyn ImageCapability>
            }),
            inpaint: capabilities.inpaint.then(|| {
                Arc::new(ImageEndpoint::new(client.clone(), "/inpaint"))
                    as Arc<dyn ImageCapability>
            }),
            prior: capabilities.prior.then(|| {
                Arc::new(PriorEndpoint::new(client.clone())) as Arc<dyn PriorCapability>
            }),
            refiner: capabilities.refiner.then(|| {
                Arc::new(ImageEndpoint::new(client.clone(), "/refine"))
                    as Arc<dyn ImageCapability>
            }),
            upscale: capabilities.upscale.then(|| {
                Arc::new(UpscaleEndpoint::new(client.clone())) as Arc<dyn UpscaleCapability>
            }),
            scheduler_config: SchedulerConfig::fresh(schedulers::default_for(
                model.scheduler_family,
            )),
        }
    }
}

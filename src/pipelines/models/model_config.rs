use crate::pipelines::schedulers::SchedulerFamily;

#[non_exhaustive]
pub struct WorkerModel;

impl WorkerModel {
    pub const STABLE_DIFFUSION_1_5: &'static str = "stable_diffusion_1_5";
    pub const OPENJOURNEY: &'static str = "openjourney";
    pub const SDXL: &'static str = "sdxl";
    pub const KANDINSKY_2_2: &'static str = "kandinsky_2_2";
    pub const FLUX_1: &'static str = "flux_1";
    pub const AURA_SR: &'static str = "aura_sr";
}

/// Which optional capabilities the model loads at startup. `text2img` is the
/// primary capability for every generation model; only the upscaler goes
/// without it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelCapabilities {
    pub text2img: bool,
    pub img2img: bool,
    pub inpaint: bool,
    pub prior: bool,
    pub refiner: bool,
    pub upscale: bool,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: &'static str,
    pub default_prompt_prefix: Option<&'static str>,
    pub default_negative_prompt_prefix: Option<&'static str>,
    pub scheduler_family: SchedulerFamily,
    // Some models ship with a scheduler that must not be overridden.
    pub dont_set_scheduler: bool,
    pub capabilities: ModelCapabilities,
}

impl ModelConfig {
    pub fn for_model(name: &str) -> Option<ModelConfig> {
        match name {
            WorkerModel::STABLE_DIFFUSION_1_5 => Some(ModelConfig {
                name: WorkerModel::STABLE_DIFFUSION_1_5,
                default_prompt_prefix: None,
                default_negative_prompt_prefix: None,
                scheduler_family: SchedulerFamily::StableDiffusion,
                dont_set_scheduler: false,
                capabilities: ModelCapabilities {
                    text2img: true,
                    img2img: true,
                    inpaint: true,
                    ..Default::default()
                },
            }),
            WorkerModel::OPENJOURNEY => Some(ModelConfig {
                name: WorkerModel::OPENJOURNEY,
                default_prompt_prefix: Some("mdjrny-v4 style"),
                default_negative_prompt_prefix: None,
                scheduler_family: SchedulerFamily::StableDiffusion,
                dont_set_scheduler: false,
                capabilities: ModelCapabilities {
                    text2img: true,
                    img2img: true,
                    ..Default::default()
                },
            }),
            WorkerModel::SDXL => Some(ModelConfig {
                name: WorkerModel::SDXL,
                default_prompt_prefix: None,
                default_negative_prompt_prefix: None,
                scheduler_family: SchedulerFamily::StableDiffusion,
                dont_set_scheduler: false,
                capabilities: ModelCapabilities {
                    text2img: true,
                    img2img: true,
                    refiner: true,
                    ..Default::default()
                },
            }),
            WorkerModel::KANDINSKY_2_2 => Some(ModelConfig {
                name: WorkerModel::KANDINSKY_2_2,
                default_prompt_prefix: None,
                default_negative_prompt_prefix: Some("overexposed"),
                scheduler_family: SchedulerFamily::Kandinsky22,
                dont_set_scheduler: false,
                capabilities: ModelCapabilities {
                    text2img: true,
                    inpaint: true,
                    prior: true,
                    ..Default::default()
                },
            }),
            WorkerModel::FLUX_1 => Some(ModelConfig {
                name: WorkerModel::FLUX_1,
                default_prompt_prefix: None,
                default_negative_prompt_prefix: None,
                scheduler_family: SchedulerFamily::StableDiffusion,
                dont_set_scheduler: true,
                capabilities: ModelCapabilities {
                    text2img: true,
                    ..Default::default()
                },
            }),
            WorkerModel::AURA_SR => Some(ModelConfig {
                name: WorkerModel::AURA_SR,
                default_prompt_prefix: None,
                default_negative_prompt_prefix: None,
                scheduler_family: SchedulerFamily::StableDiffusion,
                dont_set_scheduler: true,
                capabilities: ModelCapabilities {
                    upscale: true,
                    ..Default::default()
                },
            }),
            _ => None,
        }
    }
}

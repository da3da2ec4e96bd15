use std::time::Instant;

use rand::{rngs::OsRng, Rng};

use crate::{
    app::models::worker_error::WorkerError,
    pipelines::{
        capability::{ImageCapability, PriorCapability},
        models::{
            inference_spec::{InferenceOutput, InferenceSpec, PriorInterpolateSpec, PriorSpec},
            model_config::ModelConfig,
            pipeline_bundle::PipelineBundle,
        },
        schedulers,
    },
};

use super::{
    dtos::generate_dto::GenerateDto,
    enums::generation_mode::GenerationMode,
    errors::GenerateWorkerError,
    models::seeded_output::SeededOutput,
    util::images::{crop_images, download_and_fit_image},
};

pub const PRIOR_STEPS: u32 = 25;
pub const PRIOR_GUIDANCE_SCALE: f32 = 4.0;

// Inpainting ignores the request's prompt strength.
const INPAINT_STRENGTH: f32 = 0.99;

/// Picks the generation topology for a request. First matching rule wins:
/// inpaint beats img2img beats text2img.
pub fn select_mode(dto: &GenerateDto, bundle: &PipelineBundle) -> GenerationMode {
    if dto.mask_image_url.is_some() && dto.init_image_url.is_some() && bundle.inpaint.is_some() {
        GenerationMode::Inpaint
    } else if dto.init_image_url.is_some()
        && dto.prompt_strength.is_some()
        && bundle.img2img.is_some()
    {
        GenerationMode::Img2Img
    } else {
        GenerationMode::Text2Img
    }
}

/// An explicit request prefix wins over the model default; absent both, the
/// prompt is unchanged.
pub fn compose_prompt(
    prompt: &str,
    prompt_prefix: Option<&str>,
    default_prompt_prefix: Option<&str>,
) -> String {
    match prompt_prefix.or(default_prompt_prefix) {
        Some(prefix) => format!("{} {}", prefix, prompt),
        None => prompt.to_string(),
    }
}

pub fn compose_negative_prompt(
    negative_prompt: Option<&str>,
    negative_prompt_prefix: Option<&str>,
    default_negative_prompt_prefix: Option<&str>,
) -> Option<String> {
    match negative_prompt_prefix.or(default_negative_prompt_prefix) {
        Some(prefix) => match negative_prompt {
            Some(negative_prompt) if !negative_prompt.is_empty() => {
                Some(format!("{} {}", prefix, negative_prompt))
            }
            _ => Some(prefix.to_string()),
        },
        None => negative_prompt.map(|negative_prompt| negative_prompt.to_string()),
    }
}

/// Half the main step count, rounded up to the next multiple of 5.
pub fn refiner_steps(num_inference_steps: u32) -> u32 {
    let half_steps = num_inference_steps / 2;

    half_steps + (5 - half_steps % 5)
}

/// Runs the full generation loop for one request: mode selection, prompt
/// composition, per-output seeding, optional prior topology, optional
/// refinement pass, and center-cropping. Returns exactly `num_outputs`
/// images in request order or fails the request as a whole.
pub async fn generate(
    dto: &GenerateDto,
    bundle: &PipelineBundle,
    model: &ModelConfig,
) -> Result<Vec<SeededOutput>, WorkerError> {
    let inference_start = Instant::now();

    let seed = match dto.seed {
        Some(seed) => seed,
        None => {
            let seed = OsRng.gen_range(0..(1u64 << 24));
            tracing::info!("using seed: {}", seed);
            seed
        }
    };

    let prompt = compose_prompt(
        &dto.prompt,
        dto.prompt_prefix.as_deref(),
        model.default_prompt_prefix,
    );
    let negative_prompt = compose_negative_prompt(
        dto.negative_prompt.as_deref(),
        dto.negative_prompt_prefix.as_deref(),
        model.default_negative_prompt_prefix,
    );

    let mode = select_mode(dto, bundle);

    let capability = match mode {
        GenerationMode::Inpaint => bundle.inpaint.clone(),
        GenerationMode::Img2Img => bundle.img2img.clone(),
        GenerationMode::Text2Img => bundle.text2img.clone(),
    };
    let Some(capability) = capability else {
        return Err(GenerateWorkerError::NoPipelineSelected.value());
    };

    let mut init_image = None;
    let mut mask_image = None;
    let mut strength = None;

    if mode == GenerationMode::Inpaint {
        if let (Some(init_image_url), Some(mask_image_url)) =
            (&dto.init_image_url, &dto.mask_image_url)
        {
            let start = Instant::now();
            init_image = Some(download_and_fit_image(init_image_url, dto.width, dto.height).await?);
            mask_image = Some(download_and_fit_image(mask_image_url, dto.width, dto.height).await?);
            strength = Some(INPAINT_STRENGTH);
            tracing::info!(
                "downloaded and cropped init and mask images in: {}ms",
                start.elapsed().as_millis()
            );
        }
    } else if mode == GenerationMode::Img2Img {
        if let Some(init_image_url) = &dto.init_image_url {
            let start = Instant::now();
            init_image = Some(download_and_fit_image(init_image_url, dto.width, dto.height).await?);
            strength = dto.prompt_strength;
            tracing::info!(
                "downloaded and cropped init image in: {}ms",
                start.elapsed().as_millis()
            );
        }
    }

    // Without an img2img capability, an init image reaches the model through
    // the prior instead, interpolated against the prompt.
    let interpolate_source = match (&bundle.prior, &dto.init_image_url, dto.prompt_strength) {
        (Some(_), Some(init_image_url), Some(_)) if mode == GenerationMode::Text2Img => {
            Some(download_and_fit_image(init_image_url, dto.width, dto.height).await?)
        }
        _ => None,
    };

    let scheduler = if model.dont_set_scheduler {
        None
    } else {
        let name = dto
            .scheduler
            .as_deref()
            .unwrap_or(schedulers::default_for(model.scheduler_family));

        Some(schedulers::resolve(
            model.scheduler_family,
            name,
            &bundle.scheduler_config,
        )?)
    };

    let output_latent = bundle.refiner.is_some();
    let num_outputs = dto.num_outputs as usize;
    let mut outputs: Vec<InferenceOutput> = Vec::with_capacity(num_outputs);

    for i in 0..num_outputs {
        let output_seed = seed + i as u64;

        let (image_embeds, negative_image_embeds) = match &bundle.prior {
            Some(prior) => {
                if let (Some(source), Some(prompt_strength)) =
                    (&interpolate_source, dto.prompt_strength)
                {
                    let prior_out = prior
                        .interpolate(&PriorInterpolateSpec {
                            prompt: prompt.to_string(),
                            negative_prompt: negative_prompt.clone(),
                            image: source.clone(),
                            weights: (prompt_strength, 1.0 - prompt_strength),
                            num_inference_steps: PRIOR_STEPS,
                            guidance_scale: PRIOR_GUIDANCE_SCALE,
                            seed: output_seed,
                        })
                        .await?;

                    (
                        Some(prior_out.image_embeds),
                        Some(prior_out.negative_image_embeds),
                    )
                } else {
                    let image_embeds = prior
                        .embed(&PriorSpec {
                            prompt: prompt.to_string(),
                            num_inference_steps: PRIOR_STEPS,
                            guidance_scale: PRIOR_GUIDANCE_SCALE,
                            seed: output_seed,
                        })
                        .await?;
                    let negative_image_embeds = prior
                        .embed(&PriorSpec {
                            prompt: negative_prompt.clone().unwrap_or_default(),
                            num_inference_steps: PRIOR_STEPS,
                            guidance_scale: PRIOR_GUIDANCE_SCALE,
                            seed: output_seed,
                        })
                        .await?;

                    (Some(image_embeds), Some(negative_image_embeds))
                }
            }
            None => (None, None),
        };

        let spec = InferenceSpec {
            prompt: if image_embeds.is_some() {
                None
            } else {
                Some(prompt.to_string())
            },
            negative_prompt: negative_prompt.clone(),
            width: (mode == GenerationMode::Text2Img).then_some(dto.width),
            height: (mode == GenerationMode::Text2Img).then_some(dto.height),
            num_inference_steps: dto.num_inference_steps,
            guidance_scale: dto.guidance_scale,
            seed: output_seed,
            scheduler: scheduler.clone(),
            init_image: init_image.clone(),
            mask_image: mask_image.clone(),
            strength,
            image_embeds,
            negative_image_embeds,
            latent: None,
            output_latent,
        };

        outputs.push(capability.generate(&spec).await?);
    }

    if let Some(refiner) = &bundle.refiner {
        let num_refiner_steps = refiner_steps(dto.num_inference_steps);
        let start = Instant::now();

        for i in 0..outputs.len() {
            let output_seed = seed + i as u64;

            let mut spec = InferenceSpec {
                prompt: Some(prompt.to_string()),
                negative_prompt: negative_prompt.clone(),
                num_inference_steps: num_refiner_steps,
                guidance_scale: dto.guidance_scale,
                seed: output_seed,
                ..Default::default()
            };
            match &outputs[i] {
                InferenceOutput::Latent(latent) => spec.latent = Some(latent.clone()),
                InferenceOutput::Image(image) => spec.init_image = Some(image.clone()),
            }

            match refiner.generate(&spec).await? {
                InferenceOutput::Image(image) => outputs[i] = InferenceOutput::Image(image),
                InferenceOutput::Latent(_) => {
                    return Err(WorkerError::Inference(
                        "Refiner returned no image.".to_string(),
                    ))
                }
            }
        }

        tracing::info!(
            "refined {} image(s) in: {}ms",
            outputs.len(),
            start.elapsed().as_millis()
        );
    }

    let mut images = Vec::with_capacity(outputs.len());
    for output in outputs {
        match output {
            InferenceOutput::Image(image) => images.push(image),
            InferenceOutput::Latent(_) => {
                return Err(WorkerError::Inference(
                    "Backend returned an intermediate result without a refiner loaded.".to_string(),
                ))
            }
        }
    }

    let images = crop_images(images, dto.width, dto.height);

    tracing::info!(
        "inference | {} | {} image(s) | {}ms",
        model.name,
        num_outputs,
        inference_start.elapsed().as_millis()
    );

    Ok(images
        .into_iter()
        .enumerate()
        .map(|(i, image)| SeededOutput {
            image,
            seed: seed + i as u64,
        })
        .collect())
}

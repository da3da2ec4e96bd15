use image::DynamicImage;

/// One generated image tagged with the deterministic seed that produced it.
#[derive(Debug, Clone)]
pub struct SeededOutput {
    pub image: DynamicImage,
    pub seed: u64,
}

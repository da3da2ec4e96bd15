use image::DynamicImage;

use crate::generate::enums::output_format::OutputFormat;

/// One output image paired with the signed url it must land at.
pub struct UploadTask {
    pub image: DynamicImage,
    pub signed_url: String,
    pub target_extension: OutputFormat,
    pub target_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImageResult {
    pub image_url: String,
}

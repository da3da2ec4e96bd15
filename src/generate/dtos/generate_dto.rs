use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::generate::enums::output_format::OutputFormat;

/// A prediction request, already normalized by serde defaults. Everything
/// cross-field (mask requires init, prompt strength iff init, enough signed
/// urls) is enforced here so the dispatch engine never sees an inconsistent
/// request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_generate_dto", skip_on_field_errors = false))]
pub struct GenerateDto {
    #[serde(default)]
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub prompt_prefix: Option<String>,
    pub negative_prompt_prefix: Option<String>,
    #[validate(custom = "validate_size")]
    #[serde(default = "default_size")]
    pub width: u32,
    #[validate(custom = "validate_size")]
    #[serde(default = "default_size")]
    pub height: u32,
    #[validate(range(min = 1, max = 4, message = "num_outputs must be between 1 and 4."))]
    #[serde(default = "default_num_outputs")]
    pub num_outputs: u8,
    #[validate(range(
        min = 1,
        max = 500,
        message = "num_inference_steps must be between 1 and 500."
    ))]
    #[serde(default = "default_num_inference_steps")]
    pub num_inference_steps: u32,
    #[validate(range(
        min = 1.0,
        max = 20.0,
        message = "guidance_scale must be between 1 and 20."
    ))]
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    #[validate(range(max = 4294967295, message = "seed must fit in 32 bits."))]
    pub seed: Option<u64>,
    pub scheduler: Option<String>,
    pub init_image_url: Option<String>,
    pub mask_image_url: Option<String>,
    #[validate(range(
        min = 0.0,
        max = 1.0,
        message = "prompt_strength must be between 0 and 1."
    ))]
    pub prompt_strength: Option<f32>,
    #[serde(default)]
    pub signed_urls: Vec<String>,
    #[serde(default)]
    pub output_image_extension: OutputFormat,
    #[validate(range(
        min = 1,
        max = 100,
        message = "output_image_quality must be between 1 and 100."
    ))]
    #[serde(default = "default_output_image_quality")]
    pub output_image_quality: u8,
    pub image_to_upscale: Option<String>,
}

fn default_size() -> u32 {
    512
}

fn default_num_outputs() -> u8 {
    1
}

fn default_num_inference_steps() -> u32 {
    30
}

fn default_guidance_scale() -> f32 {
    7.5
}

fn default_output_image_quality() -> u8 {
    90
}

fn validate_size(value: u32) -> Result<(), ValidationError> {
    if !(256..=1536).contains(&value) || value % 8 != 0 {
        return Err(ValidationError::new("size_not_allowed"));
    }

    Ok(())
}

fn validate_generate_dto(dto: &GenerateDto) -> Result<(), ValidationError> {
    // upscale requests carry no prompt
    if dto.image_to_upscale.is_none() && dto.prompt.is_empty() {
        return Err(ValidationError::new("prompt_required_for_generation"));
    }

    if dto.mask_image_url.is_some() && dto.init_image_url.is_none() {
        return Err(ValidationError::new("mask_image_url_requires_init_image_url"));
    }

    if dto.prompt_strength.is_some() && dto.init_image_url.is_none() {
        return Err(ValidationError::new(
            "prompt_strength_forbidden_without_init_image_url",
        ));
    }

    if dto.init_image_url.is_some() && dto.prompt_strength.is_none() {
        return Err(ValidationError::new(
            "prompt_strength_required_with_init_image_url",
        ));
    }

    if dto.image_to_upscale.is_some() {
        if dto.signed_urls.is_empty() {
            return Err(ValidationError::new("not_enough_signed_urls"));
        }
    } else if dto.signed_urls.len() < dto.num_outputs as usize {
        return Err(ValidationError::new("not_enough_signed_urls"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn valid_dto() -> GenerateDto {
        GenerateDto {
            prompt: "a cat".to_string(),
            negative_prompt: None,
            prompt_prefix: None,
            negative_prompt_prefix: None,
            width: 512,
            height: 512,
            num_outputs: 2,
            num_inference_steps: 30,
            guidance_scale: 7.5,
            seed: Some(42),
            scheduler: None,
            init_image_url: None,
            mask_image_url: None,
            prompt_strength: None,
            signed_urls: vec![
                "https://bucket.host/a?sig=1".to_string(),
                "https://bucket.host/b?sig=2".to_string(),
            ],
            output_image_extension: OutputFormat::Jpeg,
            output_image_quality: 90,
            image_to_upscale: None,
        }
    }

    #[test]
    fn accepts_a_valid_request() {
        assert!(valid_dto().validate().is_ok());
    }

    #[test]
    fn accepts_an_upscale_request_without_a_prompt() {
        let mut dto = valid_dto();
        dto.prompt = "".to_string();
        dto.num_outputs = 1;
        dto.image_to_upscale = Some("https://images.host/source.png".to_string());

        assert!(dto.validate().is_ok());
    }

    #[test]
    fn rejects_an_empty_prompt_for_generation() {
        let mut dto = valid_dto();
        dto.prompt = "".to_string();

        assert!(dto.validate().is_err());
    }

    #[test]
    fn rejects_mask_without_init_image() {
        let mut dto = valid_dto();
        dto.mask_image_url = Some("https://images.host/mask.png".to_string());

        assert!(dto.validate().is_err());
    }

    #[test]
    fn rejects_prompt_strength_without_init_image() {
        let mut dto = valid_dto();
        dto.prompt_strength = Some(0.5);

        assert!(dto.validate().is_err());
    }

    #[test]
    fn requires_prompt_strength_with_init_image() {
        let mut dto = valid_dto();
        dto.init_image_url = Some("https://images.host/init.png".to_string());

        assert!(dto.validate().is_err());

        dto.prompt_strength = Some(0.5);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn requires_one_signed_url_per_output() {
        let mut dto = valid_dto();
        dto.num_outputs = 3;

        assert!(dto.validate().is_err());
    }

    #[test]
    fn rejects_sizes_outside_the_allowed_list() {
        let mut dto = valid_dto();
        dto.width = 300;

        assert!(dto.validate().is_err());

        dto.width = 2048;
        assert!(dto.validate().is_err());
    }

    #[test]
    fn parses_defaults_and_jpg_alias() {
        let dto: GenerateDto = serde_json::from_str(
            r#"{ "prompt": "a cat", "signed_urls": ["https://bucket.host/a?sig=1"], "output_image_extension": "jpg" }"#,
        )
        .unwrap();

        assert_eq!(dto.width, 512);
        assert_eq!(dto.height, 512);
        assert_eq!(dto.num_outputs, 1);
        assert_eq!(dto.num_inference_steps, 30);
        assert_eq!(dto.output_image_extension, OutputFormat::Jpeg);
        assert!(dto.validate().is_ok());
    }
}

pub mod inference_spec;
pub mod model_config;
pub mod pipeline_bundle;

pub mod generation_mode;
pub mod output_format;

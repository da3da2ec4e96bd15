use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Envy {
    pub port: Option<u16>,

    pub model_name: String,

    pub inference_api_url: String,
    pub inference_api_secret: Option<String>,
}

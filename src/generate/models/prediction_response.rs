use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub output: PredictionOutput,
    pub input: Value,
    pub metadata: PredictionMetadata,
}

#[derive(Debug, Serialize)]
pub struct PredictionOutput {
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictionMetadata {
    pub worker_version: String,
}

#[derive(Debug, Serialize)]
pub struct PredictionError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PredictionErrorResponse {
    pub error: PredictionError,
    pub input: Value,
    pub metadata: PredictionMetadata,
}

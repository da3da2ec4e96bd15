use axum::http::StatusCode;

/// Everything that can abort an in-flight prediction. All variants are fatal
/// for the request as a whole; only the upload PUT retries locally before
/// surfacing `Upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    Configuration(String),
    UpstreamFetch(String),
    Inference(String),
    Upload(String),
}

impl WorkerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::UpstreamFetch(_) => "upstream_fetch_error",
            Self::Inference(_) => "inference_error",
            Self::Upload(_) => "upload_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(message) => message,
            Self::UpstreamFetch(message) => message,
            Self::Inference(message) => message,
            Self::Upload(message) => message,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UpstreamFetch(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

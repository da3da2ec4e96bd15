pub mod api_error;
pub mod json_from_request;
pub mod worker_error;

pub mod inference_response;

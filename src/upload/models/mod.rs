pub mod upload_task;
pub mod uploaded_image_result;

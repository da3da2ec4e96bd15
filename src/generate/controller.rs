use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use validator::Validate;

use crate::{
    app::models::json_from_request::JsonFromRequest,
    pipelines::schedulers,
    upload::{models::upload_task::UploadTask, service as upload_service},
    upscale, AppState, WORKER_VERSION,
};

use super::{
    dtos::generate_dto::GenerateDto,
    models::prediction_response::{
        PredictionError, PredictionErrorResponse, PredictionMetadata, PredictionOutput,
        PredictionResponse,
    },
    service,
};

pub async fn predict(
    State(state): State<AppState>,
    JsonFromRequest(dto): JsonFromRequest<GenerateDto>,
) -> Response {
    let id = uuid::Uuid::new_v4();
    let input = serde_json::to_value(&dto).unwrap_or(Value::Null);

    tracing::info!("prediction {} received for {}", id, state.model.name);

    if let Err(e) = dto.validate() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "validation_error",
            &e.to_string(),
            &input,
        );
    }

    if let Some(scheduler) = &dto.scheduler {
        if !schedulers::is_valid(state.model.scheduler_family, scheduler) {
            return error_response(
                StatusCode::BAD_REQUEST,
                "validation_error",
                &format!("\"{}\" is not in the list of schedulers.", scheduler),
                &input,
            );
        }
    }

    // The lock scope ends before uploads start so the accelerator frees up
    // while the outputs are in flight.
    let generated = {
        let _lock = state.inference_lock.lock().await;

        if dto.image_to_upscale.is_some() {
            upscale::service::upscale(&dto, &state.bundle, &state.model).await
        } else {
            service::generate(&dto, &state.bundle, &state.model)
                .await
                .map(|outputs| {
                    outputs
                        .into_iter()
                        .map(|output| {
                            tracing::debug!("prediction {} output seed: {}", id, output.seed);
                            output.image
                        })
                        .collect::<Vec<_>>()
                })
        }
    };

    let images = match generated {
        Ok(images) => images,
        Err(e) => {
            tracing::error!("prediction {} failed: {}", id, e.message());
            return error_response(e.status(), e.code(), e.message(), &input);
        }
    };

    let tasks = images
        .into_iter()
        .zip(dto.signed_urls.iter())
        .map(|(image, signed_url)| UploadTask {
            image,
            signed_url: signed_url.to_string(),
            target_extension: dto.output_image_extension,
            target_quality: dto.output_image_quality,
        })
        .collect();

    match upload_service::upload_images(tasks).await {
        Ok(results) => {
            tracing::info!("prediction {} completed", id);

            let response = PredictionResponse {
                output: PredictionOutput {
                    images: results.into_iter().map(|result| result.image_url).collect(),
                },
                input,
                metadata: PredictionMetadata {
                    worker_version: WORKER_VERSION.to_string(),
                },
            };

            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("prediction {} failed: {}", id, e.message());
            error_response(e.status(), e.code(), e.message(), &input)
        }
    }
}

fn error_response(status: StatusCode, code: &str, message: &str, input: &Value) -> Response {
    let response = PredictionErrorResponse {
        error: PredictionError {
            code: code.to_string(),
            message: message.to_string(),
        },
        input: input.clone(),
        metadata: PredictionMetadata {
            worker_version: WORKER_VERSION.to_string(),
        },
    };

    (status, Json(response)).into_response()
}

use std::{env, net::SocketAddr, sync::Arc};

#[macro_use]
extern crate lazy_static;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{
    app::env::Envy,
    pipelines::{
        backend::service::InferenceClient,
        models::{model_config::ModelConfig, pipeline_bundle::PipelineBundle},
    },
};

mod app;
mod generate;
mod pipelines;
mod upload;
mod upscale;

pub const WORKER_VERSION: &str = "v1.0.0";

#[derive(Clone)]
pub struct AppState {
    pub bundle: Arc<PipelineBundle>,
    pub model: Arc<ModelConfig>,
    // One generation occupies the accelerator for its full duration.
    pub inference_lock: Arc<Mutex<()>>,
}

#[tokio::main]
async fn main() {
    // tracing
    tracing_subscriber::fmt::init();

    // environment
    let app_env = env::var("APP_ENV").unwrap_or("development".to_string());
    let _ = dotenvy::from_filename(format!(".env.{}", app_env));
    let envy = match envy::from_env::<Envy>() {
        Ok(config) => config,
        Err(e) => panic!("{:#?}", e),
    };

    // properties
    let port = envy.port.to_owned().unwrap_or(3000);

    let model = match ModelConfig::for_model(&envy.model_name) {
        Some(model) => model,
        None => panic!("unknown model: {}", envy.model_name),
    };

    let client = Arc::new(InferenceClient::new(
        envy.inference_api_url.to_string(),
        envy.inference_api_secret.clone(),
    ));
    let bundle = PipelineBundle::from_model(&model, &client);

    println!("loaded pipeline bundle for {}", model.name);

    let state = AppState {
        bundle: Arc::new(bundle),
        model: Arc::new(model),
        inference_lock: Arc::new(Mutex::new(())),
    };

    // app
    let app = Router::new()
        .route("/", get(app::controller::get_root))
        .route("/predictions", post(generate::controller::predict))
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}

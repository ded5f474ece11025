//! HTTP serving layer.
//!
//! Thin glue over the pipeline and the model registry: `GET /train` runs a
//! full training pipeline and returns the pushed model path, `POST
//! /predict` serves single predictions from the latest registry bundle.
//! Handlers map exactly two conditions to client errors (missing input →
//! 400, missing model → 404); everything else surfaces as a 500 with the
//! error string.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::domain::Value;
use crate::ml::SavedModel;
use crate::pipeline::TrainingPipeline;
use crate::settings::Settings;
use crate::store::SqliteStore;

/// Shared handler state.
pub struct AppState {
    pub settings: Settings,
}

/// Body accepted by `POST /predict`.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub features: Vec<serde_json::Value>,
}

/// Build the application router.
pub fn router(settings: Settings) -> Router {
    let state = Arc::new(AppState { settings });
    Router::new()
        .route("/train", get(train_handler))
        .route("/predict", post(predict_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(settings: Settings, address: &str) -> anyhow::Result<()> {
    let app = router(settings);
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(%address, "serving");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn train_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let settings = state.settings.clone();

    // The pipeline is strictly blocking; keep it off the async workers.
    let outcome = tokio::task::spawn_blocking(move || run_training(&settings)).await;

    match outcome {
        Ok(Ok(model_path)) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": "training pipeline completed successfully",
                "model_path": model_path,
            })),
        ),
        Ok(Err(message)) => {
            error!(%message, "training run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
        }
        Err(join_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": join_err.to_string() })),
        ),
    }
}

fn run_training(settings: &Settings) -> Result<String, String> {
    let store_path = settings.require_store().map_err(|e| e.to_string())?;
    let store = SqliteStore::open(store_path).map_err(|e| e.to_string())?;

    let pipeline = TrainingPipeline::new(settings.clone());
    let report = pipeline.run(&store).map_err(|e| e.to_string())?;

    let model_path = report
        .pusher
        .map(|p| p.registry_path.display().to_string())
        .unwrap_or_default();
    Ok(model_path)
}

async fn predict_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PredictRequest>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let request = body.map(|Json(r)| r);
    let (status, payload) = predict_response(&state.settings, request);
    (status, Json(payload))
}

/// The `/predict` decision tree, separated from the axum plumbing.
pub fn predict_response(
    settings: &Settings,
    request: Option<PredictRequest>,
) -> (StatusCode, serde_json::Value) {
    let Some(request) = request else {
        return (
            StatusCode::BAD_REQUEST,
            json!({ "error": "no input data provided" }),
        );
    };
    if request.features.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            json!({ "error": "no features provided" }),
        );
    }

    let registry = settings.registry_path();
    if !registry.exists() {
        return (
            StatusCode::NOT_FOUND,
            json!({ "error": "model not found; train a model first via /train" }),
        );
    }

    let result = SavedModel::load(&registry).and_then(|bundle| {
        let row: Vec<Value> = request.features.iter().map(json_to_cell).collect();
        bundle.predict_row(&row)
    });

    match result {
        Ok(prediction) => (
            StatusCode::OK,
            json!({ "status": "success", "prediction": prediction }),
        ),
        Err(e) => {
            error!(error = %e, "prediction failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            )
        }
    }
}

fn json_to_cell(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_without_model(dir: &TempDir) -> Settings {
        Settings {
            artifact_root: dir.path().to_path_buf(),
            store_path: dir.path().join("store.db"),
            schema_path: dir.path().join("schema.yaml"),
            registry_root: dir.path().join("saved_models"),
            ..Settings::from_env()
        }
    }

    #[test]
    fn test_missing_body_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let settings = settings_without_model(&dir);

        let (status, body) = predict_response(&settings, None);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("no input"));
    }

    #[test]
    fn test_empty_features_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let settings = settings_without_model(&dir);

        let (status, _) = predict_response(
            &settings,
            Some(PredictRequest { features: vec![] }),
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_predict_before_any_train_is_not_found() {
        let dir = TempDir::new().unwrap();
        let settings = settings_without_model(&dir);

        let (status, body) = predict_response(
            &settings,
            Some(PredictRequest {
                features: vec![json!(1.0), json!("tcp")],
            }),
        );
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("model not found"));
    }

    #[test]
    fn test_json_to_cell_conversions() {
        assert_eq!(json_to_cell(&json!(1.5)), Value::Number(1.5));
        assert_eq!(json_to_cell(&json!("tcp")), Value::Text("tcp".into()));
        assert_eq!(json_to_cell(&json!(true)), Value::Number(1.0));
        assert_eq!(json_to_cell(&json!(null)), Value::Null);
    }
}

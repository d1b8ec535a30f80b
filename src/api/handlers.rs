// src/api/handlers.rs - Fitness project endpoints
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::extract::AppJson;
use super::state::AppState;
use crate::error::AnalysisResult;
use crate::models::{
    predict_exercise_intensity, predict_meal_plan, ExerciseIntensityRequest, IntensityLevel, MealPlan,
    MealPlanRequest,
};
use crate::pipeline::{ArtifactSet, ComparisonPipeline};
use crate::scratch::ScratchDir;
use crate::storage::{download_to_file, object_key};

const UPLOAD_PREFIX: &str = "sport-analysis";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn get_meal_plan(
    State(state): State<AppState>,
    AppJson(request): AppJson<MealPlanRequest>,
) -> ApiResult<Json<MealPlan>> {
    let plan = predict_meal_plan(state.meal_plan_model.as_ref(), &state.recipes, &request)?;
    info!(
        "Meal plan: {} kcal over {} meals, {} suggestions",
        plan.total_calories,
        request.number_of_meals,
        plan.suggested.len()
    );
    Ok(Json(plan))
}

pub async fn get_exercise_intensity(
    State(state): State<AppState>,
    AppJson(request): AppJson<ExerciseIntensityRequest>,
) -> ApiResult<Json<Vec<IntensityLevel>>> {
    Ok(Json(predict_exercise_intensity(state.exercise_model.as_ref(), &request)))
}

#[derive(Debug, Deserialize)]
pub struct SportAnalysisRequest {
    pub correct_video: String,
    pub incorrect_video: String,
}

#[derive(Debug, Serialize)]
pub struct SportAnalysisResponse {
    pub correct_video: String,
    pub wrong_video: String,
    pub angle_comparison_video: String,
    pub final_graph: String,
    pub similarity: f64,
}

/// Download both videos, compare them and publish the artifacts.
/// The request's scratch directory is removed on every exit path.
pub async fn sport_analysis(
    State(state): State<AppState>,
    AppJson(request): AppJson<SportAnalysisRequest>,
) -> ApiResult<Json<SportAnalysisResponse>> {
    if request.correct_video.trim().is_empty() || request.incorrect_video.trim().is_empty() {
        return Err(ApiError::validation("correct_video and incorrect_video are required"));
    }

    let request_id = Uuid::new_v4().to_string();
    let scratch = ScratchDir::create(&state.config.work_root)?;
    info!("Sport analysis {} in {}", request_id, scratch.path().display());

    let correct_path = download_to_file(
        &state.http,
        &request.correct_video,
        &scratch.path().join("correct_video.mp4"),
    )
    .await?;
    let wrong_path = download_to_file(
        &state.http,
        &request.incorrect_video,
        &scratch.path().join("incorrect_video.mp4"),
    )
    .await?;

    let output_dir = scratch.path().to_path_buf();
    let analysis = state.config.analysis.clone();
    let backend = state.video_backend.clone();
    let detector_factory = state.detector_factory.clone();

    let artifacts = tokio::task::spawn_blocking(move || -> AnalysisResult<ArtifactSet> {
        let detector = detector_factory()?;
        ComparisonPipeline::new(analysis, backend, detector).run(&correct_path, &wrong_path, &output_dir)
    })
    .await
    .map_err(|e| ApiError::internal(format!("analysis task failed: {}", e)))??;

    let upload = |path: &std::path::Path| {
        let key = object_key(UPLOAD_PREFIX, &request_id, path);
        let uploader = Arc::clone(&state.uploader);
        let path = path.to_path_buf();
        async move { uploader.upload_file(&path, &key).await }
    };

    let response = SportAnalysisResponse {
        correct_video: upload(&artifacts.correct_pose_video).await?,
        wrong_video: upload(&artifacts.wrong_pose_video).await?,
        angle_comparison_video: upload(&artifacts.angle_comparison_video).await?,
        final_graph: upload(&artifacts.final_graph).await?,
        similarity: artifacts.similarity_percentage,
    };

    info!("Sport analysis {} done: {:.2}% similar", request_id, response.similarity);
    drop(scratch);
    Ok(Json(response))
}

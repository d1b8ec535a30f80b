// src/api/state.rs - Shared handler state
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::AnalysisResult;
use crate::models::{LinearModel, RecipeCatalog, Regressor};
use crate::pose_bridge::{MediaPipeBridge, PoseDetector};
use crate::storage::{ArtifactUploader, S3Uploader};
use crate::video::{FfmpegBackend, VideoBackend};

/// Creates a pose detector for one analysis run.
pub type DetectorFactory = Arc<dyn Fn() -> AnalysisResult<Box<dyn PoseDetector + Send>> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub meal_plan_model: Arc<dyn Regressor>,
    pub exercise_model: Arc<dyn Regressor>,
    pub recipes: Arc<RecipeCatalog>,
    pub uploader: Arc<dyn ArtifactUploader>,
    pub http: reqwest::Client,
    pub video_backend: Arc<dyn VideoBackend>,
    pub detector_factory: DetectorFactory,
}

impl AppState {
    /// Load models and recipes from disk and set up the external clients.
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        let meal_plan_model = LinearModel::load(&config.meal_plan_model).context("loading meal plan model")?;
        let exercise_model = LinearModel::load(&config.exercise_model).context("loading exercise intensity model")?;
        let recipes = RecipeCatalog::from_path(&config.recipes_csv).context("loading recipes")?;
        let uploader = S3Uploader::from_config(&config).await;

        std::fs::create_dir_all(&config.work_root)
            .with_context(|| format!("creating work root {}", config.work_root.display()))?;
        info!("Scratch directories under {}", config.work_root.display());

        let video_backend = Arc::new(FfmpegBackend::new(
            config.analysis.ffmpeg_bin.clone(),
            config.analysis.ffprobe_bin.clone(),
        ));

        let helper = config.pose_helper.clone();
        let analysis = config.analysis.clone();
        let detector_factory: DetectorFactory = Arc::new(move || -> AnalysisResult<Box<dyn PoseDetector + Send>> {
            let bridge = MediaPipeBridge::spawn(&helper, &analysis)?;
            Ok(Box::new(bridge))
        });

        Ok(Self {
            config: Arc::new(config),
            meal_plan_model: Arc::new(meal_plan_model),
            exercise_model: Arc::new(exercise_model),
            recipes: Arc::new(recipes),
            uploader: Arc::new(uploader),
            http: reqwest::Client::new(),
            video_backend,
            detector_factory,
        })
    }
}

// src/config.rs - Pipeline tunables and server configuration
use std::path::PathBuf;

/// Which arm the elbow angle is measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmSide {
    Left,
    Right,
}

impl ArmSide {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(ArmSide::Left),
            "right" => Some(ArmSide::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub output_fps: u32,
    pub chart_width: u32,
    pub chart_height: u32,
    pub max_angle: f64,
    pub arm_side: ArmSide,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_fps: 15,
            // 12x6 inches at 100 dpi
            chart_width: 1200,
            chart_height: 600,
            max_angle: 180.0,
            arm_side: ArmSide::Left,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by `FORM_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_fps: env_parse("FORM_OUTPUT_FPS").unwrap_or(defaults.output_fps),
            chart_width: env_parse("FORM_CHART_WIDTH").unwrap_or(defaults.chart_width),
            chart_height: env_parse("FORM_CHART_HEIGHT").unwrap_or(defaults.chart_height),
            max_angle: defaults.max_angle,
            arm_side: std::env::var("FORM_ARM_SIDE")
                .ok()
                .and_then(|s| ArmSide::parse(&s))
                .unwrap_or(defaults.arm_side),
            min_detection_confidence: env_parse("FORM_MIN_DETECTION_CONFIDENCE")
                .unwrap_or(defaults.min_detection_confidence),
            min_tracking_confidence: env_parse("FORM_MIN_TRACKING_CONFIDENCE")
                .unwrap_or(defaults.min_tracking_confidence),
            ffmpeg_bin: std::env::var("FORM_FFMPEG").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: std::env::var("FORM_FFPROBE").unwrap_or(defaults.ffprobe_bin),
        }
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Root under which every request gets its own scratch directory
    pub work_root: PathBuf,
    /// Command line of the pose helper process, whitespace separated
    pub pose_helper: Vec<String>,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    /// Static credentials; the default AWS provider chain is used when unset
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    /// Base of the public URLs returned for uploaded artifacts
    pub public_base_url: String,
    pub meal_plan_model: PathBuf,
    pub exercise_model: PathBuf,
    pub recipes_csv: PathBuf,
    pub cors_origins: Vec<String>,
    pub analysis: AnalysisConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let s3_bucket =
            std::env::var("S3_BUCKET").unwrap_or_else(|_| "fitness-project-artifacts".to_string());
        let public_base_url = std::env::var("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.amazonaws.com", s3_bucket));

        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("API_PORT").unwrap_or(8000),
            work_root: std::env::var("WORK_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_work_root()),
            pose_helper: std::env::var("POSE_HELPER_CMD")
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|_| vec!["pose-helper".to_string()]),
            s3_bucket,
            s3_region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            s3_endpoint: std::env::var("S3_ENDPOINT_URL").ok(),
            s3_access_key_id: std::env::var("S3_ACCESS_KEY_ID").ok(),
            s3_secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").ok(),
            public_base_url,
            meal_plan_model: std::env::var("MEAL_PLAN_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/meal_plan_prediction_model.json")),
            exercise_model: std::env::var("EXERCISE_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/exercise_intensity_model.json")),
            recipes_csv: std::env::var("RECIPES_CSV")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("recipes.csv")),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            analysis: AnalysisConfig::from_env(),
        }
    }
}

/// Platform cache directory, or the system temp dir when none exists.
pub fn default_work_root() -> PathBuf {
    directories::ProjectDirs::from("com", "fitness-project", "form_compare")
        .map(|dirs| dirs.cache_dir().join("scratch"))
        .unwrap_or_else(|| std::env::temp_dir().join("form_compare"))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

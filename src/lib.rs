// src/lib.rs
pub mod api;
pub mod chart;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod overlay;
pub mod pipeline;
pub mod pose_bridge;
pub mod raster;
pub mod render;
pub mod scratch;
pub mod similarity;
pub mod storage;
pub mod tracking;
pub mod video;

pub use config::{AnalysisConfig, ArmSide, ServiceConfig};
pub use error::{AnalysisError, AnalysisResult};
pub use pipeline::{ArtifactSet, ComparisonPipeline};
pub use pose_bridge::{MediaPipeBridge, PoseDetector, PoseLandmarks};
pub use similarity::{cosine_similarity, similarity_percentage};
pub use tracking::{AngleExtractor, ArmAngleTrack};
pub use video::{FfmpegBackend, FrameSource, VideoBackend};

// src/pipeline.rs - Correct vs. wrong technique comparison, end to end
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::pose_bridge::PoseDetector;
use crate::render::{ComparisonRenderer, RenderedArtifacts};
use crate::scratch::StagingDir;
use crate::similarity::similarity_percentage;
use crate::tracking::AngleExtractor;
use crate::video::VideoBackend;

/// Per-tick chart images live here until the animation is encoded.
pub const STAGING_DIR: &str = "temp_frames";

/// Everything one comparison produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSet {
    pub correct_pose_video: PathBuf,
    pub wrong_pose_video: PathBuf,
    pub angle_comparison_video: PathBuf,
    pub final_graph: PathBuf,
    pub similarity_percentage: f64,
}

impl ArtifactSet {
    fn new(rendered: RenderedArtifacts, similarity_percentage: f64) -> Self {
        Self {
            correct_pose_video: rendered.correct_pose_video,
            wrong_pose_video: rendered.wrong_pose_video,
            angle_comparison_video: rendered.angle_comparison_video,
            final_graph: rendered.final_graph,
            similarity_percentage,
        }
    }

    pub fn similarity(&self) -> f64 {
        self.similarity_percentage / 100.0
    }

    pub fn files(&self) -> [&Path; 4] {
        [
            &self.correct_pose_video,
            &self.wrong_pose_video,
            &self.angle_comparison_video,
            &self.final_graph,
        ]
    }
}

/// Linear pipeline: extract(correct) -> extract(wrong) -> score -> render.
/// Each stage completes before the next one starts.
pub struct ComparisonPipeline<B: VideoBackend, D: PoseDetector> {
    config: AnalysisConfig,
    backend: B,
    detector: D,
}

impl<B: VideoBackend, D: PoseDetector> ComparisonPipeline<B, D> {
    pub fn new(config: AnalysisConfig, backend: B, detector: D) -> Self {
        Self {
            config,
            backend,
            detector,
        }
    }

    /// Run the comparison writing into `output_dir`. On failure the
    /// artifacts this run started writing are removed; files left by an
    /// earlier run are only replaced once this run gets to them.
    pub fn run(&mut self, correct_video: &Path, wrong_video: &Path, output_dir: &Path) -> AnalysisResult<ArtifactSet> {
        fs::create_dir_all(output_dir).map_err(|e| AnalysisError::filesystem(output_dir, e))?;
        let staging = StagingDir::create(output_dir.join(STAGING_DIR))?;

        let result = self.run_stages(correct_video, wrong_video, output_dir, &staging);
        drop(staging);

        match result {
            Ok(artifacts) => {
                info!("Analysis complete, outputs saved to {}", output_dir.display());
                info!("Movement similarity: {:.2}%", artifacts.similarity_percentage);
                Ok(artifacts)
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                Err(e)
            }
        }
    }

    fn run_stages(
        &mut self,
        correct_video: &Path,
        wrong_video: &Path,
        output_dir: &Path,
        staging: &StagingDir,
    ) -> AnalysisResult<ArtifactSet> {
        let side = self.config.arm_side;

        info!("Processing correct technique video");
        let correct = AngleExtractor::new(&mut self.detector, side).extract_video(&self.backend, correct_video)?;

        info!("Processing wrong technique video");
        let wrong = AngleExtractor::new(&mut self.detector, side).extract_video(&self.backend, wrong_video)?;

        let similarity = similarity_percentage(&correct.angles, &wrong.angles);
        info!("Calculated similarity: {:.2}%", similarity);

        let rendered = ComparisonRenderer::new(&self.config, &self.backend)
            .render(&correct, &wrong, similarity, output_dir, staging)?;

        Ok(ArtifactSet::new(rendered, similarity))
    }
}

// src/render.rs - Pose videos, animated angle comparison and final chart
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{info, warn};

use crate::chart::AngleChart;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::scratch::StagingDir;
use crate::tracking::ArmAngleTrack;
use crate::video::{self, frame_file_name, VideoBackend};

pub const CORRECT_POSE_VIDEO: &str = "correct_pose_analysis.mp4";
pub const WRONG_POSE_VIDEO: &str = "wrong_pose_analysis.mp4";
pub const ANGLE_COMPARISON_VIDEO: &str = "angle_comparison.mp4";
pub const FINAL_GRAPH: &str = "final_comparison_graph.png";

const POSE_STAGING: &str = "pose_frames";
const FALLBACK_DIMENSIONS: (u32, u32) = (640, 480);

/// Paths of everything the renderer wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifacts {
    pub correct_pose_video: PathBuf,
    pub wrong_pose_video: PathBuf,
    pub angle_comparison_video: PathBuf,
    pub final_graph: PathBuf,
}

impl RenderedArtifacts {
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            correct_pose_video: output_dir.join(CORRECT_POSE_VIDEO),
            wrong_pose_video: output_dir.join(WRONG_POSE_VIDEO),
            angle_comparison_video: output_dir.join(ANGLE_COMPARISON_VIDEO),
            final_graph: output_dir.join(FINAL_GRAPH),
        }
    }

    pub fn paths(&self) -> [&Path; 4] {
        [
            &self.correct_pose_video,
            &self.wrong_pose_video,
            &self.angle_comparison_video,
            &self.final_graph,
        ]
    }
}

pub struct ComparisonRenderer<'a> {
    config: &'a AnalysisConfig,
    backend: &'a dyn VideoBackend,
}

impl<'a> ComparisonRenderer<'a> {
    pub fn new(config: &'a AnalysisConfig, backend: &'a dyn VideoBackend) -> Self {
        Self { config, backend }
    }

    /// Write all artifacts into `output_dir`. Per-tick chart images go
    /// through `staging`, which is emptied once the animation is encoded.
    ///
    /// On failure the artifacts this call started writing are removed.
    /// Files from an earlier run that this call never reached stay put.
    pub fn render(
        &self,
        correct: &ArmAngleTrack,
        wrong: &ArmAngleTrack,
        similarity_percentage: f64,
        output_dir: &Path,
        staging: &StagingDir,
    ) -> AnalysisResult<RenderedArtifacts> {
        let artifacts = RenderedArtifacts::in_dir(output_dir);
        let mut touched = Vec::new();

        match self.write_all(correct, wrong, similarity_percentage, output_dir, staging, &artifacts, &mut touched) {
            Ok(()) => Ok(artifacts),
            Err(e) => {
                remove_touched(&touched);
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_all<'p>(
        &self,
        correct: &ArmAngleTrack,
        wrong: &ArmAngleTrack,
        similarity_percentage: f64,
        output_dir: &Path,
        staging: &StagingDir,
        artifacts: &'p RenderedArtifacts,
        touched: &mut Vec<&'p Path>,
    ) -> AnalysisResult<()> {
        info!("Creating pose analysis videos");
        touched.push(&artifacts.correct_pose_video);
        self.write_pose_video(correct, output_dir, &artifacts.correct_pose_video)?;
        touched.push(&artifacts.wrong_pose_video);
        self.write_pose_video(wrong, output_dir, &artifacts.wrong_pose_video)?;

        info!("Creating angle comparison animation");
        touched.push(&artifacts.angle_comparison_video);
        self.write_animation(correct, wrong, similarity_percentage, staging, &artifacts.angle_comparison_video)?;

        let final_chart = AngleChart {
            title: "Final Arm Angle Comparison",
            ..self.chart(&correct.angles, &wrong.angles, x_axis_max(correct, wrong), similarity_percentage)
        };
        touched.push(&artifacts.final_graph);
        save_png(&final_chart.render()?, &artifacts.final_graph)?;
        info!("Wrote {}", artifacts.final_graph.display());

        Ok(())
    }

    fn write_pose_video(&self, track: &ArmAngleTrack, output_dir: &Path, output: &Path) -> AnalysisResult<()> {
        let staging = StagingDir::create(output_dir.join(POSE_STAGING))?;

        if track.frames.is_empty() {
            // no detections: a single blank frame keeps the artifact set complete
            let (w, h) = match track.dimensions {
                (0, _) | (_, 0) => FALLBACK_DIMENSIONS,
                dims => dims,
            };
            let placeholder = [RgbImage::new(w, h)];
            return video::write_video(self.backend, &placeholder, &staging, self.config.output_fps, output);
        }

        video::write_video(self.backend, &track.frames, &staging, self.config.output_fps, output)
    }

    fn write_animation(
        &self,
        correct: &ArmAngleTrack,
        wrong: &ArmAngleTrack,
        similarity_percentage: f64,
        staging: &StagingDir,
        output: &Path,
    ) -> AnalysisResult<()> {
        let max_frames = correct.angles.len().max(wrong.angles.len());
        let ticks = max_frames.max(1);
        let x_max = x_axis_max(correct, wrong);

        for tick in 0..ticks {
            let chart = self.chart(
                revealed(&correct.angles, tick),
                revealed(&wrong.angles, tick),
                x_max,
                similarity_percentage,
            );
            save_png(&chart.render()?, &staging.path().join(frame_file_name(tick)))?;
        }

        self.backend
            .encode_sequence(staging.path(), self.config.output_fps, output)?;
        staging.clear()?;
        info!("Wrote {} ({} ticks)", output.display(), ticks);
        Ok(())
    }

    fn chart<'c>(
        &self,
        correct: &'c [f64],
        wrong: &'c [f64],
        x_max: f64,
        similarity_percentage: f64,
    ) -> AngleChart<'c> {
        AngleChart {
            title: "Arm Angle Comparison",
            correct,
            wrong,
            x_max,
            y_max: self.config.max_angle,
            similarity_percentage,
            width: self.config.chart_width,
            height: self.config.chart_height,
        }
    }
}

/// Samples shown at animation tick `tick`: everything up to and including it.
pub fn revealed(angles: &[f64], tick: usize) -> &[f64] {
    // A sequence that already ended keeps its whole curve on screen for the
    // remaining ticks instead of dropping out of the chart.
    &angles[..angles.len().min(tick + 1)]
}

fn remove_touched(paths: &[&Path]) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial artifact {}: {}", path.display(), e),
        }
    }
}

fn x_axis_max(correct: &ArmAngleTrack, wrong: &ArmAngleTrack) -> f64 {
    correct.angles.len().max(wrong.angles.len()).max(1) as f64
}

fn save_png(image: &RgbImage, path: &Path) -> AnalysisResult<()> {
    image
        .save(path)
        .map_err(|e| AnalysisError::encode(path, e.to_string()))
}

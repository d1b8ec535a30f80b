// src/bin/compare.rs - Compare two technique videos locally
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use form_compare::config::default_work_root;
use form_compare::scratch::ScratchDir;
use form_compare::{logging, AnalysisConfig, ComparisonPipeline, FfmpegBackend, MediaPipeBridge};

#[derive(Parser)]
#[command(
    name = "compare",
    about = "Compare the elbow angle of a correct and a wrong technique video"
)]
struct CompareArgs {
    /// Video of the correct technique
    correct: PathBuf,

    /// Video of the wrong technique
    wrong: PathBuf,

    /// Where to write the artifacts (default: a fresh scratch directory)
    output_dir: Option<PathBuf>,

    /// Keep the scratch directory when no output directory is given.
    /// Without it the printed paths are gone once the command exits.
    #[arg(long)]
    keep: bool,

    /// Pose helper command line
    #[arg(long, env = "POSE_HELPER_CMD", default_value = "pose-helper")]
    pose_helper: String,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = CompareArgs::parse();
    let config = AnalysisConfig::from_env();

    let helper: Vec<String> = args.pose_helper.split_whitespace().map(str::to_string).collect();
    let detector = MediaPipeBridge::spawn(&helper, &config).context("starting pose helper")?;
    let backend = FfmpegBackend::new(config.ffmpeg_bin.clone(), config.ffprobe_bin.clone());

    let (output_dir, scratch) = match args.output_dir.clone() {
        Some(dir) => (dir, None),
        None => {
            let scratch = ScratchDir::create(default_work_root()).context("creating scratch directory")?;
            (scratch.path().to_path_buf(), Some(scratch))
        }
    };

    let artifacts = ComparisonPipeline::new(config, backend, detector)
        .run(&args.correct, &args.wrong, &output_dir)
        .context("comparison failed")?;

    println!("{}", serde_json::to_string_pretty(&artifacts)?);

    if let Some(scratch) = scratch {
        if let Some(kept) = finish_scratch(scratch, args.keep) {
            info!("Kept outputs in {}", kept.display());
        }
    }
    Ok(())
}

/// Keep or discard the scratch output directory. Returns where the outputs
/// live when they were kept.
fn finish_scratch(scratch: ScratchDir, keep: bool) -> Option<PathBuf> {
    if keep {
        return Some(scratch.keep());
    }
    warn!(
        "Removing {} and the artifacts listed above; pass --keep or an output directory to retain them",
        scratch.path().display()
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn scratch_with_artifact(root: &Path) -> (ScratchDir, PathBuf) {
        let scratch = ScratchDir::create(root).unwrap();
        let artifact = scratch.path().join("final_comparison_graph.png");
        std::fs::write(&artifact, b"png").unwrap();
        (scratch, artifact)
    }

    #[test]
    fn keep_retains_the_printed_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let (scratch, artifact) = scratch_with_artifact(root.path());

        let kept = finish_scratch(scratch, true).unwrap();
        assert!(artifact.starts_with(&kept));
        assert!(artifact.is_file());
    }

    #[test]
    fn without_keep_the_scratch_outputs_are_removed() {
        let root = tempfile::tempdir().unwrap();
        let (scratch, artifact) = scratch_with_artifact(root.path());

        assert!(finish_scratch(scratch, false).is_none());
        assert!(!artifact.exists());
    }
}

// tests/common/mod.rs - Scripted videos and a detector that reads them
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

use form_compare::pose_bridge::Landmark;
use form_compare::tracking::{LEFT_ELBOW, LEFT_SHOULDER, LEFT_WRIST};
use form_compare::video::MemoryFrameSource;
use form_compare::{AnalysisError, AnalysisResult, FrameSource, PoseDetector, PoseLandmarks, VideoBackend};

const WIDTH: u32 = 48;
const HEIGHT: u32 = 32;

/// A "video" is a text file with one line per frame: an elbow angle in whole
/// degrees, or `-` for a frame without a person. The angle travels to the
/// detector in the first pixel of the frame.
pub struct ScriptBackend {
    pub fail_encoding: Option<&'static str>,
}

impl ScriptBackend {
    pub fn new() -> Self {
        Self { fail_encoding: None }
    }
}

impl VideoBackend for ScriptBackend {
    fn open(&self, path: &Path) -> AnalysisResult<Box<dyn FrameSource>> {
        let script = fs::read_to_string(path).map_err(|e| AnalysisError::decode(path, e.to_string()))?;
        let frames = script
            .lines()
            .map(|line| {
                let mut frame = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([40, 40, 40]));
                let marker = match line.trim().parse::<u8>() {
                    Ok(angle) => Rgb([255, angle, 0]),
                    Err(_) => Rgb([0, 0, 0]),
                };
                frame.put_pixel(0, 0, marker);
                frame
            })
            .collect();
        Ok(Box::new(MemoryFrameSource::new(frames)))
    }

    fn encode_sequence(&self, frames_dir: &Path, fps: u32, output: &Path) -> AnalysisResult<()> {
        if Some(output.file_name().and_then(|n| n.to_str()).unwrap_or_default()) == self.fail_encoding {
            return Err(AnalysisError::encode(output, "encoder crashed"));
        }
        let frames = fs::read_dir(frames_dir).map_err(|e| AnalysisError::filesystem(frames_dir, e))?.count();
        fs::write(output, format!("{} frames at {} fps", frames, fps))
            .map_err(|e| AnalysisError::filesystem(output, e))
    }
}

/// Puts the left arm at the angle stored in the frame marker.
pub struct MarkerDetector;

impl PoseDetector for MarkerDetector {
    fn detect_pose(&mut self, frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>> {
        let Rgb([flag, angle, _]) = *frame.get_pixel(0, 0);
        if flag != 255 {
            return Ok(None);
        }

        let theta = (angle as f64).to_radians();
        let mut points = vec![Landmark::new(0.5, 0.9); 33];
        points[LEFT_ELBOW] = Landmark::new(0.5, 0.5);
        points[LEFT_SHOULDER] = Landmark::new(0.5, 0.3);
        points[LEFT_WRIST] = Landmark::new(0.5 + 0.2 * theta.sin(), 0.5 - 0.2 * theta.cos());
        Ok(Some(PoseLandmarks::new(points)))
    }
}

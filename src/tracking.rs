// src/tracking.rs - Per-frame elbow angle extraction
use std::path::Path;

use image::RgbImage;
use nalgebra::Point2;
use tracing::{debug, info};

use crate::config::ArmSide;
use crate::error::AnalysisResult;
use crate::overlay;
use crate::pose_bridge::{PoseDetector, PoseLandmarks};
use crate::video::{FrameSource, VideoBackend};

// BlazePose landmark indices
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;

/// Skeleton edges drawn on annotated frames.
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1), (1, 2), (2, 3), (3, 7), (0, 4), (4, 5), (5, 6), (6, 8), (9, 10),
    (11, 12), (11, 13), (13, 15), (15, 17), (15, 19), (15, 21), (17, 19),
    (12, 14), (14, 16), (16, 18), (16, 20), (16, 22), (18, 20),
    (11, 23), (12, 24), (23, 24), (23, 25), (24, 26), (25, 27), (26, 28),
    (27, 29), (28, 30), (29, 31), (30, 32), (27, 31), (28, 32),
];

/// Angle at `b` between the rays towards `a` and `c`, in degrees within [0, 180].
pub fn calculate_angle(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    let ba = a - b;
    let bc = c - b;

    let radians = bc.y.atan2(bc.x) - ba.y.atan2(ba.x);
    let angle = radians.to_degrees().abs();

    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmJoints {
    pub shoulder: Point2<f64>,
    pub elbow: Point2<f64>,
    pub wrist: Point2<f64>,
}

impl ArmJoints {
    pub fn from_pose(pose: &PoseLandmarks, side: ArmSide) -> Option<Self> {
        let (shoulder, elbow, wrist) = match side {
            ArmSide::Left => (LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST),
            ArmSide::Right => (RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST),
        };

        Some(Self {
            shoulder: pose.get(shoulder)?.point(),
            elbow: pose.get(elbow)?.point(),
            wrist: pose.get(wrist)?.point(),
        })
    }

    pub fn angle(&self) -> f64 {
        calculate_angle(self.shoulder, self.elbow, self.wrist)
    }
}

/// Output of one pass over a video.
///
/// `angles` and `frames` always have the same length: a frame contributes to
/// both or to neither.
#[derive(Debug, Clone, Default)]
pub struct ArmAngleTrack {
    pub angles: Vec<f64>,
    pub frames: Vec<RgbImage>,
    pub frames_decoded: usize,
    pub dimensions: (u32, u32),
}

impl ArmAngleTrack {
    pub fn detected(&self) -> usize {
        self.angles.len()
    }
}

pub struct AngleExtractor<'a, D: PoseDetector + ?Sized> {
    detector: &'a mut D,
    side: ArmSide,
}

impl<'a, D: PoseDetector + ?Sized> AngleExtractor<'a, D> {
    pub fn new(detector: &'a mut D, side: ArmSide) -> Self {
        Self { detector, side }
    }

    pub fn extract_video(
        &mut self,
        backend: &dyn VideoBackend,
        path: &Path,
    ) -> AnalysisResult<ArmAngleTrack> {
        info!("Extracting arm angles from {}", path.display());
        let mut source = backend.open(path)?;
        let track = self.extract(source.as_mut())?;
        info!(
            "Detected a pose in {}/{} frames of {}",
            track.detected(),
            track.frames_decoded,
            path.display()
        );
        Ok(track)
    }

    /// Single sequential pass; frames without the measured arm are skipped.
    pub fn extract(&mut self, source: &mut dyn FrameSource) -> AnalysisResult<ArmAngleTrack> {
        let mut track = ArmAngleTrack {
            dimensions: source.dimensions(),
            ..Default::default()
        };

        while let Some(frame) = source.next_frame()? {
            track.frames_decoded += 1;

            let Some(pose) = self.detector.detect_pose(&frame)? else {
                continue;
            };
            let Some(joints) = ArmJoints::from_pose(&pose, self.side) else {
                debug!("Frame {}: pose without {:?} arm", track.frames_decoded, self.side);
                continue;
            };

            let angle = joints.angle();
            let annotated = overlay::annotate_frame(&frame, &pose, &joints, angle)?;
            track.angles.push(angle);
            track.frames.push(annotated);
        }

        Ok(track)
    }
}

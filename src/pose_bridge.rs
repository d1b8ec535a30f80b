// src/pose_bridge.rs - Pose landmark detection behind a capability interface
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};

/// One detected body joint. `x`/`y` are normalized to the frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }

    pub fn point(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseLandmarks {
    pub points: Vec<Landmark>,
}

impl PoseLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Anything that can find a body pose in a frame.
///
/// `Ok(None)` means the frame was processed but no person was found.
pub trait PoseDetector {
    fn detect_pose(&mut self, frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>>;
}

impl<D: PoseDetector + ?Sized> PoseDetector for Box<D> {
    fn detect_pose(&mut self, frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>> {
        (**self).detect_pose(frame)
    }
}

impl<D: PoseDetector + ?Sized> PoseDetector for &mut D {
    fn detect_pose(&mut self, frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>> {
        (**self).detect_pose(frame)
    }
}

#[derive(Serialize)]
struct FrameHeader {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct HelperReply {
    landmarks: Option<Vec<Vec<f64>>>,
}

/// Bridge to a MediaPipe pose helper running as a child process.
///
/// Per frame a JSON header line `{"width":W,"height":H}` is written followed
/// by `W*H*3` raw RGB bytes. The helper answers with a single JSON line,
/// `{"landmarks":[[x,y,z,visibility],...]}` or `{"landmarks":null}`.
pub struct MediaPipeBridge {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    frames_sent: u64,
}

impl MediaPipeBridge {
    pub fn spawn(command: &[String], config: &AnalysisConfig) -> AnalysisResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| AnalysisError::detector("empty pose helper command"))?;

        info!("Starting pose helper: {}", command.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .arg("--min-detection-confidence")
            .arg(config.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(config.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| AnalysisError::detector(format!("cannot start {}: {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnalysisError::detector("pose helper stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::detector("pose helper stdout unavailable"))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            frames_sent: 0,
        })
    }

    fn send_frame(&mut self, frame: &RgbImage) -> std::io::Result<()> {
        let header = serde_json::to_string(&FrameHeader {
            width: frame.width(),
            height: frame.height(),
        })?;
        writeln!(self.stdin, "{}", header)?;
        self.stdin.write_all(frame.as_raw())?;
        self.stdin.flush()
    }
}

impl PoseDetector for MediaPipeBridge {
    fn detect_pose(&mut self, frame: &RgbImage) -> AnalysisResult<Option<PoseLandmarks>> {
        self.send_frame(frame)
            .map_err(|e| AnalysisError::detector(format!("writing frame: {}", e)))?;
        self.frames_sent += 1;

        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| AnalysisError::detector(format!("reading reply: {}", e)))?;
        if read == 0 {
            return Err(AnalysisError::detector(format!(
                "helper exited after {} frames",
                self.frames_sent
            )));
        }

        parse_reply(line.trim())
    }
}

impl Drop for MediaPipeBridge {
    fn drop(&mut self) {
        debug!("Stopping pose helper after {} frames", self.frames_sent);
        if let Err(e) = self.child.kill() {
            warn!("Failed to stop pose helper: {}", e);
        }
        let _ = self.child.wait();
    }
}

fn parse_reply(line: &str) -> AnalysisResult<Option<PoseLandmarks>> {
    let reply: HelperReply = serde_json::from_str(line)
        .map_err(|e| AnalysisError::detector(format!("malformed reply {:?}: {}", line, e)))?;

    let Some(raw) = reply.landmarks else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }

    let points = raw
        .iter()
        .map(|values| match values.as_slice() {
            [x, y] => Ok(Landmark::new(*x, *y)),
            [x, y, z] => Ok(Landmark {
                x: *x,
                y: *y,
                z: *z,
                visibility: 1.0,
            }),
            [x, y, z, visibility, ..] => Ok(Landmark {
                x: *x,
                y: *y,
                z: *z,
                visibility: *visibility,
            }),
            _ => Err(AnalysisError::detector(format!(
                "landmark needs at least two coordinates, got {:?}",
                values
            ))),
        })
        .collect::<AnalysisResult<Vec<_>>>()?;

    Ok(Some(PoseLandmarks::new(points)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reply_means_no_pose() {
        assert_eq!(parse_reply(r#"{"landmarks":null}"#).unwrap(), None);
        assert_eq!(parse_reply(r#"{"landmarks":[]}"#).unwrap(), None);
    }

    #[test]
    fn reply_with_landmarks_is_parsed() {
        let pose = parse_reply(r#"{"landmarks":[[0.1,0.2,0.3,0.9],[0.4,0.5]]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(pose.len(), 2);
        assert_eq!(pose.get(0).unwrap().visibility, 0.9);
        assert_eq!(pose.get(1).unwrap().point(), Point2::new(0.4, 0.5));
    }

    #[test]
    fn malformed_reply_is_a_detector_error() {
        assert!(matches!(
            parse_reply("not json"),
            Err(AnalysisError::Detector(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"landmarks":[[0.1]]}"#),
            Err(AnalysisError::Detector(_))
        ));
    }

    #[test]
    fn empty_command_is_rejected() {
        let result = MediaPipeBridge::spawn(&[], &AnalysisConfig::default());
        assert!(matches!(result, Err(AnalysisError::Detector(_))));
    }
}

// src/video.rs - Sequential frame decoding and image-sequence encoding
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, AnalysisResult};
use crate::scratch::StagingDir;

/// printf-style pattern of staged frame files, in encode order.
pub const FRAME_PATTERN: &str = "frame_%05d.png";

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:05}.png", index)
}

/// Frames of one video, strictly in temporal order.
pub trait FrameSource {
    /// `Ok(None)` once the video is exhausted.
    fn next_frame(&mut self) -> AnalysisResult<Option<RgbImage>>;

    fn dimensions(&self) -> (u32, u32);
}

pub trait VideoBackend: Send + Sync {
    fn open(&self, path: &Path) -> AnalysisResult<Box<dyn FrameSource>>;

    /// Encode the `FRAME_PATTERN` files of `frames_dir` into `output`.
    fn encode_sequence(&self, frames_dir: &Path, fps: u32, output: &Path) -> AnalysisResult<()>;
}

impl<T: VideoBackend + ?Sized> VideoBackend for std::sync::Arc<T> {
    fn open(&self, path: &Path) -> AnalysisResult<Box<dyn FrameSource>> {
        (**self).open(path)
    }

    fn encode_sequence(&self, frames_dir: &Path, fps: u32, output: &Path) -> AnalysisResult<()> {
        (**self).encode_sequence(frames_dir, fps, output)
    }
}

/// Frames already held in memory.
pub struct MemoryFrameSource {
    frames: VecDeque<RgbImage>,
    dimensions: (u32, u32),
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        let dimensions = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            frames: frames.into(),
            dimensions,
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn next_frame(&mut self) -> AnalysisResult<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }
}

/// Save `frames` into the staging directory and encode them at `fps`.
pub fn write_video(
    backend: &dyn VideoBackend,
    frames: &[RgbImage],
    staging: &StagingDir,
    fps: u32,
    output: &Path,
) -> AnalysisResult<()> {
    for (i, frame) in frames.iter().enumerate() {
        let frame_path = staging.path().join(frame_file_name(i));
        frame
            .save(&frame_path)
            .map_err(|e| AnalysisError::encode(&frame_path, e.to_string()))?;
    }
    debug!("Staged {} frames for {}", frames.len(), output.display());

    backend.encode_sequence(staging.path(), fps, output)?;
    staging.clear()?;

    info!("Wrote {} ({} frames at {} fps)", output.display(), frames.len(), fps);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    #[serde(default)]
    side_data_list: Vec<serde_json::Value>,
    #[serde(default)]
    tags: serde_json::Map<String, serde_json::Value>,
}

impl ProbeStream {
    fn rotation(&self) -> i64 {
        let from_side_data = self
            .side_data_list
            .iter()
            .find_map(|d| d.get("rotation").and_then(|r| r.as_i64()));
        let from_tags = self
            .tags
            .get("rotate")
            .and_then(|r| r.as_str())
            .and_then(|r| r.parse().ok());
        from_side_data.or(from_tags).unwrap_or(0)
    }
}

fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => rate.parse().ok(),
    }
}

fn parse_probe(path: &Path, json: &str) -> AnalysisResult<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| AnalysisError::decode(path, format!("unreadable ffprobe output: {}", e)))?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| AnalysisError::decode(path, "no video stream"))?;

    let (mut width, mut height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(AnalysisError::decode(path, "invalid video dimensions")),
    };
    // ffmpeg applies the display rotation while decoding
    if stream.rotation().rem_euclid(180) == 90 {
        std::mem::swap(&mut width, &mut height);
    }

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .unwrap_or(30.0);

    Ok(VideoInfo { width, height, fps })
}

/// Decoding and encoding through the ffmpeg command line tools.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn probe(&self, path: &Path) -> AnalysisResult<VideoInfo> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate:stream_side_data=rotation:stream_tags=rotate",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| AnalysisError::decode(path, format!("cannot run {}: {}", self.ffprobe, e)))?;

        if !output.status.success() {
            return Err(AnalysisError::decode(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_probe(path, &String::from_utf8_lossy(&output.stdout))
    }
}

impl VideoBackend for FfmpegBackend {
    fn open(&self, path: &Path) -> AnalysisResult<Box<dyn FrameSource>> {
        if !path.is_file() {
            return Err(AnalysisError::decode(path, "file does not exist"));
        }

        let info = self.probe(path)?;
        debug!(
            "{}: {}x{} at {:.2} fps",
            path.display(),
            info.width,
            info.height,
            info.fps
        );

        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AnalysisError::decode(path, format!("cannot run {}: {}", self.ffmpeg, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::decode(path, "ffmpeg stdout unavailable"))?;

        Ok(Box::new(FfmpegFrameReader {
            path: path.to_path_buf(),
            child,
            stdout,
            width: info.width,
            height: info.height,
            frames_read: 0,
            finished: false,
        }))
    }

    fn encode_sequence(&self, frames_dir: &Path, fps: u32, output: &Path) -> AnalysisResult<()> {
        let result = Command::new(&self.ffmpeg)
            .args(["-y", "-v", "error", "-framerate"])
            .arg(fps.to_string())
            .arg("-i")
            .arg(frames_dir.join(FRAME_PATTERN))
            .args([
                "-vf",
                "pad=ceil(iw/2)*2:ceil(ih/2)*2",
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-crf",
                "23",
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(output)
            .output()
            .map_err(|e| AnalysisError::encode(output, format!("cannot run {}: {}", self.ffmpeg, e)))?;

        if !result.status.success() {
            return Err(AnalysisError::encode(
                output,
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads `rgb24` frames from a running ffmpeg decoder, one at a time.
struct FfmpegFrameReader {
    path: PathBuf,
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frames_read: usize,
    finished: bool,
}

impl FfmpegFrameReader {
    fn finish(&mut self) -> AnalysisResult<()> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| AnalysisError::decode(&self.path, e.to_string()))?;
        if !status.success() && self.frames_read == 0 {
            return Err(AnalysisError::decode(&self.path, format!("ffmpeg exited with {}", status)));
        }
        Ok(())
    }
}

impl FrameSource for FfmpegFrameReader {
    fn next_frame(&mut self) -> AnalysisResult<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }

        let frame_len = self.width as usize * self.height as usize * 3;
        let mut buffer = vec![0u8; frame_len];
        let mut filled = 0;
        while filled < frame_len {
            match self.stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(AnalysisError::decode(&self.path, e.to_string())),
            }
        }

        if filled < frame_len {
            if filled > 0 {
                warn!(
                    "{}: dropping truncated trailing frame ({} of {} bytes)",
                    self.path.display(),
                    filled,
                    frame_len
                );
            }
            self.finish()?;
            return Ok(None);
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| AnalysisError::decode(&self.path, "frame buffer size mismatch"))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_sort_in_encode_order() {
        assert_eq!(frame_file_name(7), "frame_00007.png");
        assert!(frame_file_name(9) < frame_file_name(10));
    }

    #[test]
    fn frame_rate_parsing() {
        assert_eq!(parse_frame_rate("30000/1001").map(|f| (f * 100.0).round()), Some(2997.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn probe_output_is_parsed() {
        let json = r#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1"}]}"#;
        let info = parse_probe(Path::new("a.mp4"), json).unwrap();
        assert_eq!(info, VideoInfo { width: 1920, height: 1080, fps: 30.0 });
    }

    #[test]
    fn rotated_phone_video_swaps_dimensions() {
        let json = r#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1",
            "side_data_list":[{"rotation":-90}]}]}"#;
        let info = parse_probe(Path::new("a.mov"), json).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));

        let json = r#"{"streams":[{"width":640,"height":480,"tags":{"rotate":"270"}}]}"#;
        let info = parse_probe(Path::new("b.mov"), json).unwrap();
        assert_eq!((info.width, info.height), (480, 640));
    }

    #[test]
    fn missing_stream_is_a_decode_error() {
        assert!(matches!(
            parse_probe(Path::new("a.mp4"), r#"{"streams":[]}"#),
            Err(AnalysisError::Decode { .. })
        ));
        assert!(matches!(
            parse_probe(Path::new("a.mp4"), "garbage"),
            Err(AnalysisError::Decode { .. })
        ));
    }

    #[test]
    fn opening_a_missing_file_fails_before_spawning() {
        let backend = FfmpegBackend::new("definitely-not-ffmpeg", "definitely-not-ffprobe");
        let result = backend.open(Path::new("/nonexistent/video.mp4"));
        assert!(matches!(result, Err(AnalysisError::Decode { .. })));
    }

    #[test]
    fn memory_source_yields_frames_in_order() {
        let frames = vec![
            RgbImage::from_pixel(2, 2, image::Rgb([1, 0, 0])),
            RgbImage::from_pixel(2, 2, image::Rgb([2, 0, 0])),
        ];
        let mut source = MemoryFrameSource::new(frames);
        assert_eq!(source.dimensions(), (2, 2));
        assert_eq!(source.next_frame().unwrap().unwrap().get_pixel(0, 0)[0], 1);
        assert_eq!(source.next_frame().unwrap().unwrap().get_pixel(0, 0)[0], 2);
        assert!(source.next_frame().unwrap().is_none());
    }
}

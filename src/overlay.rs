// src/overlay.rs - Cosmetic annotation of frames with a detected pose
use std::f64::consts::PI;
use std::fmt::Write;

use image::RgbImage;
use nalgebra::Point2;

use crate::error::AnalysisResult;
use crate::pose_bridge::PoseLandmarks;
use crate::raster;
use crate::tracking::{ArmJoints, POSE_CONNECTIONS};

pub struct OverlayTheme {
    pub connection: &'static str,
    pub left_joint: &'static str,
    pub right_joint: &'static str,
    pub upper_arm: &'static str,
    pub forearm: &'static str,
    pub arc: &'static str,
    pub text: &'static str,
}

impl Default for OverlayTheme {
    fn default() -> Self {
        Self {
            connection: "#e0e0e0",
            left_joint: "#ff8c00",
            right_joint: "#00bfff",
            upper_arm: "#00ff00",
            forearm: "#ff0000",
            arc: "#ffff00",
            text: "#ffffff",
        }
    }
}

const ARC_RADIUS: f64 = 30.0;
const TEXT_OFFSET: (f64, f64) = (50.0, 20.0);

/// Copy of `frame` with the skeleton, the measured arm, an arc spanning the
/// elbow angle and the angle value drawn on top. The input is not modified.
pub fn annotate_frame(
    frame: &RgbImage,
    pose: &PoseLandmarks,
    joints: &ArmJoints,
    angle: f64,
) -> AnalysisResult<RgbImage> {
    let svg = overlay_svg(frame.width(), frame.height(), pose, joints, angle, &OverlayTheme::default());
    raster::render_svg_over(&svg, frame)
}

fn overlay_svg(
    width: u32,
    height: u32,
    pose: &PoseLandmarks,
    joints: &ArmJoints,
    angle: f64,
    theme: &OverlayTheme,
) -> String {
    let to_pixels = |p: Point2<f64>| Point2::new(p.x * width as f64, p.y * height as f64);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );

    // Skeleton
    for (from, to) in POSE_CONNECTIONS {
        if let (Some(a), Some(b)) = (pose.get(from), pose.get(to)) {
            let (a, b) = (to_pixels(a.point()), to_pixels(b.point()));
            let _ = write!(
                svg,
                r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"/>"#,
                a.x, a.y, b.x, b.y, theme.connection
            );
        }
    }
    for (index, landmark) in pose.points.iter().enumerate() {
        let p = to_pixels(landmark.point());
        // odd indices are on the subject's left side
        let color = if index % 2 == 1 { theme.left_joint } else { theme.right_joint };
        let _ = write!(
            svg,
            r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
            p.x, p.y, color
        );
    }

    let shoulder = to_pixels(joints.shoulder);
    let elbow = to_pixels(joints.elbow);
    let wrist = to_pixels(joints.wrist);

    let _ = write!(
        svg,
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="3"/>"#,
        elbow.x, elbow.y, shoulder.x, shoulder.y, theme.upper_arm
    );
    let _ = write!(
        svg,
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="3"/>"#,
        elbow.x, elbow.y, wrist.x, wrist.y, theme.forearm
    );

    if let Some(arc) = arc_path(elbow, shoulder, wrist, ARC_RADIUS) {
        let _ = write!(
            svg,
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            arc, theme.arc
        );
    }

    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="24" fill="{}">{}</text>"#,
        elbow.x - TEXT_OFFSET.0,
        elbow.y - TEXT_OFFSET.1,
        theme.text,
        raster::escape_text(&format!("{:.1} degrees", angle))
    );

    svg.push_str("</svg>");
    svg
}

/// Arc around `center` from the ray towards `from` to the ray towards `to`,
/// always along the smaller of the two angles.
fn arc_path(center: Point2<f64>, from: Point2<f64>, to: Point2<f64>, radius: f64) -> Option<String> {
    let start_dir = from - center;
    let end_dir = to - center;
    if start_dir.norm() < f64::EPSILON || end_dir.norm() < f64::EPSILON {
        return None;
    }

    let start = start_dir.y.atan2(start_dir.x);
    let end = end_dir.y.atan2(end_dir.x);
    let mut sweep = end - start;
    if sweep > PI {
        sweep -= 2.0 * PI;
    } else if sweep < -PI {
        sweep += 2.0 * PI;
    }
    if sweep.abs() < 1e-6 {
        return None;
    }

    let end = start + sweep;
    let sweep_flag = if sweep > 0.0 { 1 } else { 0 };
    Some(format!(
        "M {:.1} {:.1} A {r:.1} {r:.1} 0 0 {} {:.1} {:.1}",
        center.x + radius * start.cos(),
        center.y + radius * start.sin(),
        sweep_flag,
        center.x + radius * end.cos(),
        center.y + radius * end.sin(),
        r = radius,
    ))
}

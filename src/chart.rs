// src/chart.rs - Angle-over-time comparison chart
use std::fmt::Write;

use image::RgbImage;

use crate::error::AnalysisResult;
use crate::raster::{self, escape_text};

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 70.0;

const CORRECT_COLOR: &str = "#00ff00";
const WRONG_COLOR: &str = "#ff3333";

/// One chart image: both curves over fixed axes `[0, x_max] x [0, y_max]`.
#[derive(Debug, Clone)]
pub struct AngleChart<'a> {
    pub title: &'a str,
    pub correct: &'a [f64],
    pub wrong: &'a [f64],
    pub x_max: f64,
    pub y_max: f64,
    pub similarity_percentage: f64,
    pub width: u32,
    pub height: u32,
}

impl AngleChart<'_> {
    pub fn render(&self) -> AnalysisResult<RgbImage> {
        raster::render_svg(&self.to_svg(), self.width, self.height)
    }

    pub fn to_svg(&self) -> String {
        let plot = PlotArea::new(self.width, self.height, self.x_max, self.y_max);
        let mut svg = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif"><rect x="0" y="0" width="{w}" height="{h}" fill="#000000"/>"##,
            w = self.width,
            h = self.height
        );

        self.write_grid(&mut svg, &plot);
        write_series(&mut svg, &plot, self.correct, CORRECT_COLOR, None);
        write_series(&mut svg, &plot, self.wrong, WRONG_COLOR, Some("8,4"));
        self.write_labels(&mut svg, &plot);
        self.write_legend(&mut svg, &plot);

        svg.push_str("</svg>");
        svg
    }

    fn write_grid(&self, svg: &mut String, plot: &PlotArea) {
        let x_step = nice_step(self.x_max, 10);
        let y_step = nice_step(self.y_max, 9);

        for x in ticks(self.x_max, x_step) {
            let px = plot.x(x);
            let _ = write!(
                svg,
                r##"<line x1="{px:.1}" y1="{top:.1}" x2="{px:.1}" y2="{bottom:.1}" stroke="#ffffff" stroke-opacity="0.3" stroke-width="1"/><text x="{px:.1}" y="{label:.1}" font-size="12" fill="#ffffff" text-anchor="middle">{text}</text>"##,
                top = plot.top,
                bottom = plot.bottom(),
                label = plot.bottom() + 18.0,
                text = format_tick(x, x_step),
            );
        }
        for y in ticks(self.y_max, y_step) {
            let py = plot.y(y);
            let _ = write!(
                svg,
                r##"<line x1="{left:.1}" y1="{py:.1}" x2="{right:.1}" y2="{py:.1}" stroke="#ffffff" stroke-opacity="0.3" stroke-width="1"/><text x="{label:.1}" y="{baseline:.1}" font-size="12" fill="#ffffff" text-anchor="end">{text}</text>"##,
                left = plot.left,
                right = plot.right(),
                label = plot.left - 8.0,
                baseline = py + 4.0,
                text = format_tick(y, y_step),
            );
        }

        let _ = write!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#ffffff" stroke-width="1"/>"##,
            plot.left, plot.top, plot.width, plot.height
        );
    }

    fn write_labels(&self, svg: &mut String, plot: &PlotArea) {
        let center_x = plot.left + plot.width / 2.0;
        let center_y = plot.top + plot.height / 2.0;
        let _ = write!(
            svg,
            r##"<text x="{cx:.1}" y="30" font-size="19" fill="#ffffff" text-anchor="middle">{title}</text><text x="{cx:.1}" y="56" font-size="19" fill="#ffffff" text-anchor="middle">Similarity: {sim:.2}%</text>"##,
            cx = center_x,
            title = escape_text(self.title),
            sim = self.similarity_percentage,
        );
        let _ = write!(
            svg,
            r##"<text x="{cx:.1}" y="{by:.1}" font-size="14" fill="#ffffff" text-anchor="middle">Frame Number</text><text x="{lx:.1}" y="{cy:.1}" font-size="14" fill="#ffffff" text-anchor="middle" transform="rotate(-90 {lx:.1} {cy:.1})">Arm Angle (degrees)</text>"##,
            cx = center_x,
            by = plot.bottom() + 45.0,
            lx = plot.left - 55.0,
            cy = center_y,
        );
    }

    fn write_legend(&self, svg: &mut String, plot: &PlotArea) {
        let entries: Vec<(&str, &str, Option<&str>)> = [
            (!self.correct.is_empty()).then_some(("Correct Technique", CORRECT_COLOR, None)),
            (!self.wrong.is_empty()).then_some(("Wrong Technique", WRONG_COLOR, Some("8,4"))),
        ]
        .into_iter()
        .flatten()
        .collect();
        if entries.is_empty() {
            return;
        }

        let box_width = 190.0;
        let box_height = 12.0 + 22.0 * entries.len() as f64;
        let x = plot.right() - box_width - 10.0;
        let y = plot.top + 10.0;
        let _ = write!(
            svg,
            r##"<rect x="{x:.1}" y="{y:.1}" width="{box_width:.1}" height="{box_height:.1}" rx="4" fill="#000000" fill-opacity="0.8" stroke="#888888" stroke-width="1"/>"##,
        );
        for (i, (label, color, dash)) in entries.into_iter().enumerate() {
            let row = y + 17.0 + 22.0 * i as f64;
            let dash = dash
                .map(|d| format!(r#" stroke-dasharray="{}""#, d))
                .unwrap_or_default();
            let _ = write!(
                svg,
                r##"<line x1="{x1:.1}" y1="{row:.1}" x2="{x2:.1}" y2="{row:.1}" stroke="{color}" stroke-width="2"{dash}/><text x="{tx:.1}" y="{ty:.1}" font-size="13" fill="#ffffff">{label}</text>"##,
                x1 = x + 10.0,
                x2 = x + 45.0,
                tx = x + 55.0,
                ty = row + 4.5,
            );
        }
    }
}

fn write_series(svg: &mut String, plot: &PlotArea, values: &[f64], color: &str, dash: Option<&str>) {
    if values.is_empty() {
        return;
    }
    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{:.2},{:.2}", plot.x(i as f64), plot.y(*v)))
        .collect();
    let dash = dash
        .map(|d| format!(r#" stroke-dasharray="{}""#, d))
        .unwrap_or_default();
    let _ = write!(
        svg,
        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2" stroke-linejoin="round"{}/>"#,
        points.join(" "),
        color,
        dash
    );
}

struct PlotArea {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_max: f64,
    y_max: f64,
}

impl PlotArea {
    fn new(width: u32, height: u32, x_max: f64, y_max: f64) -> Self {
        Self {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: (width as f64 - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
            height: (height as f64 - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
            x_max: x_max.max(f64::EPSILON),
            y_max: y_max.max(f64::EPSILON),
        }
    }

    fn right(&self) -> f64 {
        self.left + self.width
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    // Values outside the axes are clamped to the plot edge.
    fn x(&self, value: f64) -> f64 {
        self.left + (value / self.x_max).clamp(0.0, 1.0) * self.width
    }

    fn y(&self, value: f64) -> f64 {
        self.bottom() - (value / self.y_max).clamp(0.0, 1.0) * self.height
    }
}

/// Tick spacing of 1, 2 or 5 times a power of ten giving at most `max_ticks` intervals.
fn nice_step(range: f64, max_ticks: usize) -> f64 {
    if range <= 0.0 || !range.is_finite() {
        return 1.0;
    }
    let raw = range / max_ticks.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= raw)
        .unwrap_or(10.0 * magnitude)
}

fn ticks(max: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = (max / step + 1e-9).floor() as usize;
    (0..=count).map(move |i| i as f64 * step)
}

fn format_tick(value: f64, step: f64) -> String {
    if step >= 1.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

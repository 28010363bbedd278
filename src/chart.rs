//! In-memory PNG line chart of daily closes.
//!
//! Light grid, a 2px blue line with round markers, and the most recent
//! close highlighted in red. With [`ChartLabels`] the chart also gets a
//! title, a y-axis label, price ticks and dates under each point; text needs
//! a TrueType font, found through [`find_font`].

use ab_glyph::{FontVec, PxScale};
use anyhow::{bail, Context, Result};
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::stocks::DailyClose;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 400;
const MARGIN_X: i32 = 70;
const MARGIN_Y: i32 = 50;
const GRID_LINES: i32 = 5;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
// Grid at roughly 30% opacity over white.
const GRID: Rgb<u8> = Rgb([179, 179, 179]);
const LINE: Rgb<u8> = Rgb([0x1f, 0x77, 0xb4]);
const HIGHLIGHT: Rgb<u8> = Rgb([214, 39, 40]);
const TEXT: Rgb<u8> = Rgb([33, 33, 33]);

const TITLE_SCALE: f32 = 22.0;
const LABEL_SCALE: f32 = 14.0;

/// Tried in order when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Text drawn around the plot.
pub struct ChartLabels {
    pub font: FontVec,
    pub title: String,
    pub y_label: String,
}

impl ChartLabels {
    /// `"IBM Stock Price - Last 5 Trading Days"`, y axis `"Price (USD)"`.
    pub fn for_symbol(font: FontVec, symbol: &str, days: usize) -> Self {
        Self {
            font,
            title: format!("{} Stock Price - Last {} Trading Days", symbol, days),
            y_label: "Price (USD)".to_string(),
        }
    }
}

pub fn load_font(path: &Path) -> Result<FontVec> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
    FontVec::try_from_vec(data).with_context(|| format!("invalid font file {}", path.display()))
}

/// The configured font, or the first usable system font. A configured path
/// that cannot be loaded is an error; no system font is `Ok(None)`.
pub fn find_font(configured: Option<&Path>) -> Result<Option<FontVec>> {
    if let Some(path) = configured {
        return load_font(path).map(Some);
    }
    for candidate in SYSTEM_FONTS.iter().map(PathBuf::from) {
        if !candidate.is_file() {
            continue;
        }
        match load_font(&candidate) {
            Ok(font) => return Ok(Some(font)),
            Err(e) => tracing::debug!(error = %e, "skipping system font"),
        }
    }
    Ok(None)
}

fn close_range(points: &[DailyClose]) -> (f64, f64) {
    let min = points.iter().map(|p| p.close).fold(f64::INFINITY, f64::min);
    let max = points
        .iter()
        .map(|p| p.close)
        .fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

/// Pixel coordinates of each close inside the plot area.
pub fn plot_points(points: &[DailyClose]) -> Vec<(i32, i32)> {
    let (min, max) = close_range(points);
    let flat = (max - min).abs() < f64::EPSILON;

    let plot_w = (WIDTH as i32 - 2 * MARGIN_X) as f64;
    let plot_h = (HEIGHT as i32 - 2 * MARGIN_Y) as f64;
    let step = if points.len() > 1 {
        plot_w / (points.len() - 1) as f64
    } else {
        0.0
    };

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = MARGIN_X as f64 + step * i as f64;
            // Flat series sit in the middle.
            let frac = if flat { 0.5 } else { (p.close - min) / (max - min) };
            let y = (HEIGHT as i32 - MARGIN_Y) as f64 - frac * plot_h;
            (x.round() as i32, y.round() as i32)
        })
        .collect()
}

pub fn render_line_chart(points: &[DailyClose], labels: Option<&ChartLabels>) -> Result<Vec<u8>> {
    if points.len() < 2 {
        bail!("need at least two points to draw a chart");
    }

    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let left = MARGIN_X as f32;
    let right = (WIDTH as i32 - MARGIN_X) as f32;
    let top = MARGIN_Y as f32;
    let bottom = (HEIGHT as i32 - MARGIN_Y) as f32;

    for i in 0..=GRID_LINES {
        let y = top + i as f32 * (bottom - top) / GRID_LINES as f32;
        draw_line_segment_mut(&mut img, (left, y), (right, y), GRID);
    }

    let coords = plot_points(points);
    for &(x, _) in &coords[1..coords.len() - 1] {
        draw_line_segment_mut(&mut img, (x as f32, top), (x as f32, bottom), GRID);
    }
    for pair in coords.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        // Two 1px segments, one pixel apart vertically.
        for dy in [0.0, 1.0] {
            draw_line_segment_mut(
                &mut img,
                (from.0 as f32, from.1 as f32 + dy),
                (to.0 as f32, to.1 as f32 + dy),
                LINE,
            );
        }
    }
    for &c in &coords {
        draw_filled_circle_mut(&mut img, c, 4, LINE);
    }
    if let Some(&last) = coords.last() {
        draw_filled_circle_mut(&mut img, last, 7, HIGHLIGHT);
    }

    if let Some(labels) = labels {
        draw_labels(&mut img, points, &coords, labels);
    }

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

fn draw_labels(img: &mut RgbImage, points: &[DailyClose], coords: &[(i32, i32)], labels: &ChartLabels) {
    let font = &labels.font;
    let title_scale = PxScale::from(TITLE_SCALE);
    let label_scale = PxScale::from(LABEL_SCALE);

    let (title_w, title_h) = text_size(title_scale, font, &labels.title);
    let title_x = (WIDTH as i32 - title_w as i32) / 2;
    let title_y = (MARGIN_Y - title_h as i32) / 2;
    draw_text_mut(img, TEXT, title_x.max(0), title_y.max(0), title_scale, font, &labels.title);

    let (_, label_h) = text_size(label_scale, font, &labels.y_label);
    draw_text_mut(
        img,
        TEXT,
        4,
        MARGIN_Y - label_h as i32 - 4,
        label_scale,
        font,
        &labels.y_label,
    );

    // Price ticks on the grid lines, top to bottom.
    let (min, max) = close_range(points);
    let bottom = HEIGHT as i32 - MARGIN_Y;
    for i in 0..=GRID_LINES {
        let y = MARGIN_Y + i * (bottom - MARGIN_Y) / GRID_LINES;
        let value = max - (max - min) * i as f64 / GRID_LINES as f64;
        let text = format!("{:.2}", value);
        let (w, h) = text_size(label_scale, font, &text);
        let x = (MARGIN_X - w as i32 - 6).max(0);
        draw_text_mut(img, TEXT, x, y - h as i32 / 2, label_scale, font, &text);
    }

    for (point, &(x, _)) in points.iter().zip(coords) {
        let text = point.date.format("%m-%d").to_string();
        let (w, _) = text_size(label_scale, font, &text);
        draw_text_mut(img, TEXT, x - w as i32 / 2, bottom + 8, label_scale, font, &text);
    }
}

/// Chart as base64 PNG, for embedding in JSON or HTML.
pub fn render_base64(points: &[DailyClose], labels: Option<&ChartLabels>) -> Result<String> {
    let png = render_line_chart(points, labels)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> Vec<DailyClose> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyClose {
                date: NaiveDate::from_ymd_opt(2024, 5, 1 + i as u32).unwrap(),
                close,
            })
            .collect()
    }

    fn decode(png: &[u8]) -> RgbImage {
        image::load_from_memory(png).unwrap().to_rgb8()
    }

    #[test]
    fn test_plot_points_span_plot_area() {
        let coords = plot_points(&series(&[10.0, 20.0, 15.0]));
        assert_eq!(coords[0], (MARGIN_X, HEIGHT as i32 - MARGIN_Y));
        assert_eq!(coords[1], (WIDTH as i32 / 2, MARGIN_Y));
        assert_eq!(coords[2].0, WIDTH as i32 - MARGIN_X);
    }

    #[test]
    fn test_flat_series_is_centered() {
        let coords = plot_points(&series(&[5.0, 5.0]));
        assert_eq!(coords[0].1, coords[1].1);
        assert_eq!(coords[0].1, HEIGHT as i32 / 2);
    }

    #[test]
    fn test_render_png() {
        let points = series(&[1.0, 3.0, 2.0, 4.0, 5.0]);
        let png = render_line_chart(&points, None).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let img = decode(&png);
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        let last = *plot_points(&points).last().unwrap();
        assert_eq!(*img.get_pixel(last.0 as u32, last.1 as u32), HIGHLIGHT);
        let first = plot_points(&points)[0];
        assert_eq!(*img.get_pixel(first.0 as u32, first.1 as u32), LINE);
    }

    // Rows above the top grid line that markers on the highest close
    // cannot reach.
    const TITLE_BAND: u32 = MARGIN_Y as u32 - 8;

    #[test]
    fn test_unlabeled_chart_leaves_title_band_blank() {
        let png = render_line_chart(&series(&[1.0, 2.0]), None).unwrap();
        let img = decode(&png);
        for y in 0..TITLE_BAND {
            for x in 0..WIDTH {
                assert_eq!(*img.get_pixel(x, y), BACKGROUND);
            }
        }
    }

    #[test]
    fn test_labels_draw_title_when_font_available() {
        let Some(font) = find_font(None).unwrap() else {
            // No system font on this machine; the text path cannot run.
            return;
        };
        let labels = ChartLabels::for_symbol(font, "IBM", 2);
        assert_eq!(labels.title, "IBM Stock Price - Last 2 Trading Days");

        let img = decode(&render_line_chart(&series(&[1.0, 2.0]), Some(&labels)).unwrap());
        let inked = (0..TITLE_BAND)
            .flat_map(|y| (0..WIDTH).map(move |x| (x, y)))
            .filter(|&(x, y)| *img.get_pixel(x, y) != BACKGROUND)
            .count();
        assert!(inked > 0);
    }

    #[test]
    fn test_configured_font_must_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("missing.ttf");
        assert!(find_font(Some(&missing)).is_err());

        let garbage = tmp.path().join("garbage.ttf");
        std::fs::write(&garbage, b"not a font").unwrap();
        assert!(find_font(Some(&garbage)).is_err());
    }

    #[test]
    fn test_render_requires_two_points() {
        assert!(render_line_chart(&series(&[1.0]), None).is_err());
    }

    #[test]
    fn test_base64_output() {
        let encoded = render_base64(&series(&[1.0, 2.0]), None).unwrap();
        assert!(encoded.starts_with("iVBORw0KGgo"));
    }
}

//! PNG line chart of a window snapshot.
//!
//! Draws upload and download series against time-of-day labels, plus a
//! dotted horizontal reference line at each advertised speed. The title
//! names the dates covered and the y axis is labelled in Mbps. Rendering is
//! done pixel by pixel into an [`image::RgbImage`] with a tiny built-in
//! uppercase bitmap font, then encoded as PNG.

use std::io::Cursor;

use chrono::Local;
use image::{ImageFormat, Rgb, RgbImage};

use crate::config::MonitorConfig;
use crate::report::date_span;
use crate::types::Mbps;
use crate::window::WindowSnapshot;

/// Error type for chart rendering failures.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    /// There is nothing to plot.
    #[error("cannot chart an empty window")]
    EmptySnapshot,

    /// The canvas is too small to hold the plot area.
    #[error("chart dimensions {width}x{height} are too small")]
    TooSmall { width: u32, height: u32 },

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

// ---------------------------------------------------------------------------
// Layout and palette
// ---------------------------------------------------------------------------

const MARGIN_LEFT: u32 = 64;
const MARGIN_RIGHT: u32 = 24;
const MARGIN_TOP: u32 = 60;
const MARGIN_BOTTOM: u32 = 44;

const Y_TICKS: u32 = 5;
const FONT_SCALE: u32 = 2;
const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;
const GLYPH_ADVANCE: u32 = (GLYPH_WIDTH + 1) * FONT_SCALE;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const UPLOAD: Rgb<u8> = Rgb([31, 119, 180]);
const DOWNLOAD: Rgb<u8> = Rgb([255, 127, 14]);

const TITLE_Y: i64 = 8;
const LEGEND_Y: i64 = 28;
const Y_LABEL: &str = "MBPS";

/// Label, colour and whether the line is dotted.
const LEGEND: [(&str, Rgb<u8>, bool); 4] = [
    ("UPLOAD", UPLOAD, false),
    ("DOWNLOAD", DOWNLOAD, false),
    ("ADVERTISED UP", UPLOAD, true),
    ("ADVERTISED DOWN", DOWNLOAD, true),
];

/// Canvas size in pixels.
#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Render `snapshot` as a PNG using the default canvas size.
pub fn render_png(
    snapshot: &WindowSnapshot,
    config: &MonitorConfig,
) -> Result<Vec<u8>, ChartError> {
    render_png_with(snapshot, config, &ChartOptions::default())
}

/// Render `snapshot` as a PNG with explicit options.
pub fn render_png_with(
    snapshot: &WindowSnapshot,
    config: &MonitorConfig,
    options: &ChartOptions,
) -> Result<Vec<u8>, ChartError> {
    let image = draw(snapshot, config, options)?;
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Maps data coordinates onto the plot area.
struct Plot {
    left: i64,
    right: i64,
    top: i64,
    bottom: i64,
    y_max: Mbps,
    points: usize,
}

impl Plot {
    fn x(&self, index: usize) -> i64 {
        if self.points <= 1 {
            return (self.left + self.right) / 2;
        }
        let span = (self.right - self.left) as f64;
        self.left + (span * index as f64 / (self.points - 1) as f64).round() as i64
    }

    fn y(&self, value: Mbps) -> i64 {
        let span = (self.bottom - self.top) as f64;
        let clamped = value.clamp(0.0, self.y_max);
        self.bottom - (span * clamped / self.y_max).round() as i64
    }
}

fn draw(
    snapshot: &WindowSnapshot,
    config: &MonitorConfig,
    options: &ChartOptions,
) -> Result<RgbImage, ChartError> {
    if snapshot.is_empty() {
        return Err(ChartError::EmptySnapshot);
    }
    if options.width <= MARGIN_LEFT + MARGIN_RIGHT + 10
        || options.height <= MARGIN_TOP + MARGIN_BOTTOM + 10
    {
        return Err(ChartError::TooSmall {
            width: options.width,
            height: options.height,
        });
    }

    let mut img = RgbImage::from_pixel(options.width, options.height, WHITE);

    let peak = snapshot
        .uploads()
        .iter()
        .chain(snapshot.downloads())
        .copied()
        .chain([config.advertised_upload(), config.advertised_download()])
        .fold(0.0_f64, f64::max);

    let plot = Plot {
        left: i64::from(MARGIN_LEFT),
        right: i64::from(options.width - MARGIN_RIGHT),
        top: i64::from(MARGIN_TOP),
        bottom: i64::from(options.height - MARGIN_BOTTOM),
        y_max: nice_ceiling(peak * 1.1),
        points: snapshot.len(),
    };

    draw_grid(&mut img, &plot);
    draw_time_labels(&mut img, &plot, snapshot);

    dotted_hline(&mut img, &plot, plot.y(config.advertised_download()), DOWNLOAD);
    dotted_hline(&mut img, &plot, plot.y(config.advertised_upload()), UPLOAD);

    draw_series(&mut img, &plot, snapshot.uploads(), UPLOAD);
    draw_series(&mut img, &plot, snapshot.downloads(), DOWNLOAD);

    draw_title(&mut img, &chart_title(snapshot));
    draw_legend(&mut img, &plot);

    Ok(img)
}

/// Round up to 1, 2 or 5 times a power of ten so tick labels stay short.
fn nice_ceiling(value: f64) -> f64 {
    if value <= 0.0 || !value.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powf(value.log10().floor());
    let normalized = value / magnitude;
    let step = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    step * magnitude
}

fn draw_grid(img: &mut RgbImage, plot: &Plot) {
    for tick in 0..=Y_TICKS {
        let value = plot.y_max * f64::from(tick) / f64::from(Y_TICKS);
        let y = plot.y(value);
        if tick > 0 {
            line(img, plot.left, y, plot.right, y, GRID);
        }
        let label = format_tick(value);
        let label_width = text_width(&label);
        let x = plot.left - 6 - label_width;
        text(img, x, y - i64::from(GLYPH_HEIGHT * FONT_SCALE / 2), &label, BLACK);
    }

    line(img, plot.left, plot.top, plot.left, plot.bottom, BLACK);
    line(img, plot.left, plot.bottom, plot.right, plot.bottom, BLACK);

    let label_y = plot.top - 10 - i64::from(GLYPH_HEIGHT * FONT_SCALE);
    text(img, 8, label_y, Y_LABEL, BLACK);
}

fn draw_time_labels(img: &mut RgbImage, plot: &Plot, snapshot: &WindowSnapshot) {
    let labels: Vec<String> = snapshot
        .timestamps()
        .iter()
        .map(|ts| ts.with_timezone(&Local).format("%H:%M").to_string())
        .collect();

    let label_width = labels.first().map(|l| text_width(l)).unwrap_or(0);
    let spacing = if labels.len() > 1 {
        (plot.right - plot.left) / (labels.len() as i64 - 1)
    } else {
        i64::MAX
    };
    // Skip labels so neighbours never overlap.
    let stride = if spacing >= label_width + 8 {
        1
    } else {
        ((label_width + 8) / spacing.max(1) + 1) as usize
    };

    for (index, label) in labels.iter().enumerate().step_by(stride) {
        let x = plot.x(index);
        line(img, x, plot.bottom, x, plot.bottom + 4, BLACK);
        text(img, x - label_width / 2, plot.bottom + 10, label, BLACK);
    }
}

fn draw_series(img: &mut RgbImage, plot: &Plot, values: &[Mbps], color: Rgb<u8>) {
    let points: Vec<(i64, i64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (plot.x(i), plot.y(*v)))
        .collect();

    if let [(x, y)] = points.as_slice() {
        marker(img, *x, *y, color);
        return;
    }
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        thick_line(img, x0, y0, x1, y1, color);
    }
    for (x, y) in points {
        marker(img, x, y, color);
    }
}

/// `BANDWIDTH RESULTS FROM <dates>`, uppercased for the bitmap font.
fn chart_title(snapshot: &WindowSnapshot) -> String {
    format!("BANDWIDTH RESULTS FROM {}", date_span(snapshot)).to_uppercase()
}

fn draw_title(img: &mut RgbImage, title: &str) {
    let x = ((i64::from(img.width()) - text_width(title)) / 2).max(0);
    text(img, x, TITLE_Y, title, BLACK);
}

fn draw_legend(img: &mut RgbImage, plot: &Plot) {
    let y = LEGEND_Y;
    let mut x = plot.left;
    for (label, color, dotted) in LEGEND {
        if dotted {
            for dx in (0..24).step_by(4) {
                line(img, x + dx, y + 4, x + dx + 1, y + 4, color);
            }
        } else {
            thick_line(img, x, y + 4, x + 24, y + 4, color);
        }
        text(img, x + 30, y, label, color);
        x += 30 + text_width(label) + 20;
    }
}

fn format_tick(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line.
fn line(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);

    loop {
        put(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn thick_line(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    for (ox, oy) in [(0, 0), (1, 0), (0, 1)] {
        line(img, x0 + ox, y0 + oy, x1 + ox, y1 + oy, color);
    }
}

fn dotted_hline(img: &mut RgbImage, plot: &Plot, y: i64, color: Rgb<u8>) {
    let mut x = plot.left + 1;
    while x <= plot.right {
        line(img, x, y, (x + 2).min(plot.right), y, color);
        x += 6;
    }
}

fn marker(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    for dy in -2..=2 {
        for dx in -2..=2 {
            put(img, x + dx, y + dy, color);
        }
    }
}

// ---------------------------------------------------------------------------
// Bitmap font
// ---------------------------------------------------------------------------

/// 3x5 glyphs, one row per byte, bit 2 is the leftmost column.
fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        ' ' => [0b000; 5],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        _ => return None,
    };
    Some(rows)
}

fn text_width(s: &str) -> i64 {
    let chars = s.chars().count() as i64;
    if chars == 0 {
        return 0;
    }
    chars * i64::from(GLYPH_ADVANCE) - i64::from(FONT_SCALE)
}

fn text(img: &mut RgbImage, x: i64, y: i64, s: &str, color: Rgb<u8>) {
    let scale = i64::from(FONT_SCALE);
    for (i, c) in s.chars().enumerate() {
        let Some(rows) = glyph(c) else { continue };
        let origin_x = x + i as i64 * i64::from(GLYPH_ADVANCE);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        put(
                            img,
                            origin_x + i64::from(col) * scale + sx,
                            y + row as i64 * scale + sy,
                            color,
                        );
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::sample::Sample;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn snapshot(n: i64) -> WindowSnapshot {
        let base = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        let samples: Vec<Sample> = (0..n)
            .map(|i| {
                Sample::new(8.0 + i as f64, 90.0 - i as f64, base + Duration::minutes(i * 10))
            })
            .collect();
        WindowSnapshot::from_samples(&samples)
    }

    #[test]
    fn renders_png_bytes() {
        let bytes = render_png(&snapshot(5), &MonitorConfig::default()).unwrap();
        assert!(bytes.len() > PNG_SIGNATURE.len());
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn decoded_png_has_requested_dimensions() {
        let options = ChartOptions {
            width: 640,
            height: 360,
        };
        let bytes = render_png_with(&snapshot(3), &MonitorConfig::default(), &options).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 640);
        assert_eq!(decoded.height(), 360);
    }

    #[test]
    fn single_sample_renders() {
        assert!(render_png(&snapshot(1), &MonitorConfig::default()).is_ok());
    }

    #[test]
    fn many_samples_render() {
        assert!(render_png(&snapshot(200), &MonitorConfig::default()).is_ok());
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let result = render_png(&snapshot(0), &MonitorConfig::default());
        assert_matches!(result, Err(ChartError::EmptySnapshot));
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        let options = ChartOptions {
            width: 50,
            height: 50,
        };
        let result = render_png_with(&snapshot(2), &MonitorConfig::default(), &options);
        assert_matches!(result, Err(ChartError::TooSmall { width: 50, height: 50 }));
    }

    #[test]
    fn series_pixels_use_series_colors() {
        let img = draw(&snapshot(4), &MonitorConfig::default(), &ChartOptions::default()).unwrap();
        assert!(img.pixels().any(|p| *p == UPLOAD));
        assert!(img.pixels().any(|p| *p == DOWNLOAD));
    }

    #[test]
    fn nice_ceiling_rounds_up() {
        assert_eq!(nice_ceiling(110.0), 200.0);
        assert_eq!(nice_ceiling(45.0), 50.0);
        assert_eq!(nice_ceiling(9.0), 10.0);
        assert_eq!(nice_ceiling(0.0), 1.0);
    }

    #[test]
    fn every_label_character_has_a_glyph() {
        let labels = LEGEND.iter().map(|(label, _, _)| label.to_string()).chain([
            Y_LABEL.to_string(),
            chart_title(&snapshot(3)),
            "0123456789:.-".to_string(),
        ]);
        for label in labels {
            for c in label.chars() {
                assert!(glyph(c).is_some(), "missing glyph for {c:?} in {label:?}");
            }
        }
    }

    #[test]
    fn title_names_the_covered_dates() {
        let snap = snapshot(3);
        let title = chart_title(&snap);
        assert!(title.starts_with("BANDWIDTH RESULTS FROM "));
        assert!(title.ends_with(&date_span(&snap).to_uppercase()));
        assert!(title.contains("2026"));
    }

    #[test]
    fn advertised_lines_have_their_own_legend_entries() {
        let labels: Vec<&str> = LEGEND.iter().map(|(label, _, _)| *label).collect();
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
        assert!(LEGEND.iter().any(|(l, _, dotted)| *dotted && l.contains("UP")));
        assert!(LEGEND.iter().any(|(l, _, dotted)| *dotted && l.contains("DOWN")));
    }

    #[test]
    fn title_and_axis_label_are_drawn_above_the_plot() {
        let img = draw(&snapshot(4), &MonitorConfig::default(), &ChartOptions::default()).unwrap();
        let title_top = TITLE_Y as u32;
        let title_inked = (title_top..title_top + GLYPH_HEIGHT * FONT_SCALE)
            .flat_map(|y| (0..img.width()).map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) == BLACK);
        assert!(title_inked);

        let label_y = MARGIN_TOP - 10 - GLYPH_HEIGHT * FONT_SCALE;
        let label_inked = (label_y..label_y + GLYPH_HEIGHT * FONT_SCALE)
            .flat_map(|y| (8..8 + text_width(Y_LABEL) as u32).map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) == BLACK);
        assert!(label_inked);
    }
}

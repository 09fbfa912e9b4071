//! SVG rendering of confusion matrices.

use crate::error::MlError;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Layout and colors for rendered figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Side length of one matrix cell, in pixels.
    #[serde(default = "default_cell_size")]
    pub cell_size: u32,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Fill of an empty cell (`#rrggbb`).
    #[serde(default = "default_low_color")]
    pub low_color: String,
    /// Fill of the largest cell (`#rrggbb`).
    #[serde(default = "default_high_color")]
    pub high_color: String,
    #[serde(default = "default_cell_alpha")]
    pub cell_alpha: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            font_size: default_font_size(),
            margin: default_margin(),
            low_color: default_low_color(),
            high_color: default_high_color(),
            cell_alpha: default_cell_alpha(),
        }
    }
}

fn default_cell_size() -> u32 {
    80
}

fn default_font_size() -> u32 {
    14
}

fn default_margin() -> u32 {
    20
}

// matplotlib "Blues" endpoints
fn default_low_color() -> String {
    "#f7fbff".to_string()
}

fn default_high_color() -> String {
    "#08306b".to_string()
}

fn default_cell_alpha() -> f64 {
    0.7
}

/// A rendered figure: an SVG document plus its title and size.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub width: u32,
    pub height: u32,
    svg: String,
}

impl Figure {
    pub fn svg(&self) -> &str {
        &self.svg
    }
}

fn parse_hex(color: &str) -> Result<[u8; 3], MlError> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(MlError::config(format!("invalid color {color:?}")));
    }
    let mut rgb = [0u8; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .map_err(|_| MlError::config(format!("invalid color {color:?}")))?;
    }
    Ok(rgb)
}

fn blend(low: [u8; 3], high: [u8; 3], t: f64) -> String {
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(low[0], high[0]),
        mix(low[1], high[1]),
        mix(low[2], high[2])
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `cm` (rows true, columns predicted) as an annotated heatmap titled
/// `Confusion Matrix - <model_name>`.
pub fn render_confusion_matrix(
    cm: ArrayView2<'_, u64>,
    class_names: &[String],
    model_name: &str,
    config: &RendererConfig,
) -> Result<Figure, MlError> {
    let n = class_names.len();
    if cm.nrows() != n || cm.ncols() != n {
        return Err(MlError::invalid_input(format!(
            "confusion matrix is {}x{} but {n} class names were given",
            cm.nrows(),
            cm.ncols()
        )));
    }
    if config.cell_size == 0 {
        return Err(MlError::config("render.cell_size must be positive"));
    }
    let low = parse_hex(&config.low_color)?;
    let high = parse_hex(&config.high_color)?;

    let cell = config.cell_size;
    let font = config.font_size;
    let longest = class_names.iter().map(|c| c.chars().count()).max().unwrap_or(1) as u32;
    let tick_width = longest * font * 3 / 5 + font / 2;
    let left = config.margin + 2 * font + tick_width;
    let top = config.margin + 2 * font;
    let grid = cell * n as u32;
    let width = left + grid + config.margin;
    let height = top + grid + 3 * font + config.margin;
    let peak = cm.iter().copied().max().unwrap_or(0);

    let title = format!("Confusion Matrix - {model_name}");
    let mut svg = String::new();
    // fmt::Write into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif" font-size="{font}">"#
    );
    let _ = writeln!(svg, r#"<rect width="{width}" height="{height}" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="{}">{}</text>"#,
        left + grid / 2,
        config.margin + font,
        font + 2,
        escape(&title)
    );

    for (row, counts) in cm.outer_iter().enumerate() {
        for (col, &count) in counts.iter().enumerate() {
            let t = if peak == 0 { 0.0 } else { count as f64 / peak as f64 };
            let x = left + col as u32 * cell;
            let y = top + row as u32 * cell;
            let _ = writeln!(
                svg,
                r#"<rect x="{x}" y="{y}" width="{cell}" height="{cell}" fill="{}" fill-opacity="{}" stroke="white"/>"#,
                blend(low, high, t),
                config.cell_alpha
            );
            let ink = if t > 0.5 { "white" } else { "black" };
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="middle" dominant-baseline="central" fill="{ink}">{count}</text>"#,
                x + cell / 2,
                y + cell / 2
            );
        }
    }

    for (i, name) in class_names.iter().enumerate() {
        let center = i as u32 * cell + cell / 2;
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            left + center,
            top + grid + font + 4,
            escape(name)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end" dominant-baseline="central">{}</text>"#,
            left - font / 2,
            top + center,
            escape(name)
        );
    }

    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle">Predicted Labels</text>"#,
        left + grid / 2,
        top + grid + 3 * font
    );
    let (ylabel_x, ylabel_y) = (config.margin + font, top + grid / 2);
    let _ = writeln!(
        svg,
        r#"<text x="{ylabel_x}" y="{ylabel_y}" text-anchor="middle" transform="rotate(-90 {ylabel_x} {ylabel_y})">True Labels</text>"#
    );
    svg.push_str("</svg>\n");

    Ok(Figure {
        title,
        width,
        height,
        svg,
    })
}

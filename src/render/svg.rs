/*
 *  render/svg.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Vector board drawing - frame, tiles, glyph paths and wordmark
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::charset;
use crate::grid::CharacterGrid;
use crate::model::DeviceModel;
use super::font::{self, GlyphRows, GLYPH_WIDTH, METRICS};
use super::layout::{BoardLayout, CAPTION};

/// Native height of the scalable drawing; the viewBox is `height * aspect` wide.
pub const VECTOR_HEIGHT: f32 = 100.0;

/// Lit dots are drawn slightly under pitch for the dot-matrix look.
const DOT_FILL: f32 = 0.92;

/// Scalable drawing of a grid on a model, no fixed pixel size.
pub fn render_svg(grid: &CharacterGrid, model: &DeviceModel) -> String {
    let layout = BoardLayout::for_model(model, VECTOR_HEIGHT);
    render_with_layout(grid, model, &layout, false)
}

/// Drawing for a precomputed layout. `sized` pins width/height attributes to
/// the layout so a rasterizer renders it 1:1.
pub fn render_with_layout(
    grid: &CharacterGrid,
    model: &DeviceModel,
    layout: &BoardLayout,
    sized: bool,
) -> String {
    let mut svg = String::with_capacity(32 * 1024);

    if sized {
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            n(layout.width),
            n(layout.height),
            n(layout.width),
            n(layout.height)
        ));
    } else {
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" viewBox="0 0 {} {}" preserveAspectRatio="xMidYMid meet">"#,
            n(layout.width),
            n(layout.height)
        ));
    }

    // frame, stroke kept inside the canvas
    let inset = layout.border / 2.0;
    svg.push_str(&format!(
        r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
        n(inset),
        n(inset),
        n(layout.width - layout.border),
        n(layout.height - layout.border),
        n(layout.corner),
        model.frame,
        model.bit,
        n(layout.border)
    ));

    let blank = model.color_for_code(charset::BLANK).unwrap_or(model.frame);

    // glyph dots are batched into one path per drawing
    let mut glyph_path = String::new();

    for (row, column, code) in grid.cells() {
        if row >= layout.rows || column >= layout.columns {
            continue;
        }
        let (x, y) = layout.tile_origin(row, column);

        if let Some(color) = model.color_for_code(code) {
            tile(&mut svg, layout, x, y, color);
            if code != charset::BLANK {
                divider(&mut svg, layout, x, y, model.frame);
            }
            continue;
        }

        tile(&mut svg, layout, x, y, blank);
        let rows = match model.char_for_code(code) {
            Some(over) => font::glyph_for_str(over),
            None => font::glyph(charset::symbol(code)),
        };
        if let Some(rows) = rows {
            let (gx, gy) = layout.glyph_origin(row, column);
            glyph_dots(&mut glyph_path, rows, gx, gy, layout.dot);
        }
    }

    if !glyph_path.is_empty() {
        svg.push_str(&format!(r#"<path fill="{}" d="{}"/>"#, model.text, glyph_path));
    }

    // wordmark
    let mut caption_path = String::new();
    let advance = (GLYPH_WIDTH + METRICS.spacing) as f32 * layout.caption_dot;
    for (i, c) in CAPTION.chars().enumerate() {
        if let Some(rows) = font::glyph(c) {
            let x = layout.caption_x + i as f32 * advance;
            glyph_dots(&mut caption_path, rows, x, layout.caption_y, layout.caption_dot);
        }
    }
    svg.push_str(&format!(r#"<path fill="{}" d="{}"/>"#, model.bit, caption_path));

    svg.push_str("</svg>");
    svg
}

fn tile(svg: &mut String, layout: &BoardLayout, x: f32, y: f32, color: &str) {
    svg.push_str(&format!(
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
        n(x),
        n(y),
        n(layout.tile_width),
        n(layout.tile_height),
        color
    ));
}

/// Split line across the middle of a color flap, cosmetic only.
fn divider(svg: &mut String, layout: &BoardLayout, x: f32, y: f32, color: &str) {
    svg.push_str(&format!(
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
        n(x),
        n(y + (layout.tile_height - layout.divider) / 2.0),
        n(layout.tile_width),
        n(layout.divider),
        color
    ));
}

fn glyph_dots(path: &mut String, rows: &GlyphRows, x: f32, y: f32, dot: f32) {
    let size = dot * DOT_FILL;
    for (dx, dy) in font::lit_dots(rows) {
        path.push_str(&format!(
            "M{} {}h{}v{}h-{}z",
            n(x + dx as f32 * dot),
            n(y + dy as f32 * dot),
            n(size),
            n(size),
            n(size)
        ));
    }
}

/// Fixed-precision coordinate, trailing zeros trimmed, so output is stable.
fn n(v: f32) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FLAGSHIP_BLACK, FLAGSHIP_WHITE, NOTE};

    fn grid_with(code: i32) -> CharacterGrid {
        let mut rows = vec![vec![0; 22]; 6];
        rows[0][0] = code;
        CharacterGrid::new(rows)
    }

    #[test]
    fn test_number_format() {
        assert_eq!(n(1.0), "1");
        assert_eq!(n(1.25), "1.25");
        assert_eq!(n(0.0001), "0");
        assert_eq!(n(-0.0001), "0");
        assert_eq!(n(187.0), "187");
    }

    #[test]
    fn test_deterministic() {
        let grid = grid_with(8);
        assert_eq!(render_svg(&grid, &FLAGSHIP_BLACK), render_svg(&grid, &FLAGSHIP_BLACK));
    }

    #[test]
    fn test_scalable_header() {
        let svg = render_svg(&grid_with(0), &FLAGSHIP_BLACK);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 187 100""#));
        assert!(!svg.contains("width=\"187\""));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_color_tiles_use_model_palette() {
        let svg = render_svg(&grid_with(63), &FLAGSHIP_BLACK);
        assert!(svg.contains("#DA291C"));
        let svg = render_svg(&grid_with(69), &FLAGSHIP_WHITE);
        assert!(svg.contains(r##"fill="#000000""##));
    }

    #[test]
    fn test_glyphs_use_text_color() {
        let blank = render_svg(&grid_with(0), &FLAGSHIP_BLACK);
        let lettered = render_svg(&grid_with(1), &FLAGSHIP_BLACK);
        assert!(!blank.contains(r##"<path fill="#FFFFFF""##));
        assert!(lettered.contains(r##"<path fill="#FFFFFF""##));
    }

    #[test]
    fn test_override_glyph_differs_by_model() {
        let mut rows = vec![vec![0; 15]; 3];
        rows[1][7] = 62;
        let grid = CharacterGrid::new(rows);
        let heart = render_svg(&grid, &NOTE);

        let mut cleared = grid.clone().into_rows();
        cleared[1][7] = 0;
        let empty = render_svg(&CharacterGrid::new(cleared), &NOTE);
        assert_ne!(heart, empty);
    }

    #[test]
    fn test_out_of_range_codes_render_blank() {
        let blank = render_svg(&grid_with(0), &FLAGSHIP_BLACK);
        let unknown = render_svg(&grid_with(250), &FLAGSHIP_BLACK);
        let negative = render_svg(&grid_with(-4), &FLAGSHIP_BLACK);
        assert!(!unknown.contains(r##"<path fill="#FFFFFF""##));
        assert!(!negative.contains(r##"<path fill="#FFFFFF""##));
        assert_eq!(unknown.len(), negative.len());
        assert!(blank.contains("#141414"));
    }

    #[test]
    fn test_caption_present() {
        let svg = render_svg(&grid_with(0), &FLAGSHIP_BLACK);
        assert!(svg.contains(r##"<path fill="#333333""##));
    }
}

/*
 *  render/layout.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Board geometry - every offset derived from the canvas height
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

use crate::model::DeviceModel;
use super::font::{GLYPH_HEIGHT, GLYPH_WIDTH, METRICS};

// fractions of the canvas width / height
const MARGIN_X: f32 = 0.05;
const MARGIN_TOP: f32 = 0.08;
const MARGIN_BOTTOM: f32 = 0.14;
const BORDER: f32 = 0.012;
const CORNER: f32 = 0.025;

// fractions of a pitch / tile
const TILE_FILL_X: f32 = 0.86;
const TILE_FILL_Y: f32 = 0.88;
const GLYPH_FILL_X: f32 = 0.72;
const GLYPH_FILL_Y: f32 = 0.66;
const DIVIDER: f32 = 0.035;

/// Caption dot size as a fraction of the canvas height.
const CAPTION_DOT: f32 = 0.0075;

pub const CAPTION: &str = "VESTABOARD";

/// Absolute geometry of one board drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardLayout {
    pub width: f32,
    pub height: f32,
    pub border: f32,
    pub corner: f32,
    pub rows: usize,
    pub columns: usize,
    /// top-left of tile (0, 0)
    pub start_x: f32,
    pub start_y: f32,
    pub column_pitch: f32,
    pub row_pitch: f32,
    pub tile_width: f32,
    pub tile_height: f32,
    pub divider: f32,
    /// glyph dot size inside a tile
    pub dot: f32,
    pub caption_dot: f32,
    pub caption_x: f32,
    pub caption_y: f32,
}

impl BoardLayout {
    /// Lay a model out on a canvas `height` units tall, keeping the model's
    /// native aspect ratio.
    pub fn for_model(model: &DeviceModel, height: f32) -> Self {
        let width = height * model.aspect_ratio;

        let grid_width = width * (1.0 - 2.0 * MARGIN_X);
        let grid_height = height * (1.0 - MARGIN_TOP - MARGIN_BOTTOM);
        let (column_pitch, row_pitch) = model.tile_size(grid_width, grid_height);

        let tile_width = column_pitch * TILE_FILL_X;
        let tile_height = row_pitch * TILE_FILL_Y;

        let dot = (tile_width * GLYPH_FILL_X / GLYPH_WIDTH as f32)
            .min(tile_height * GLYPH_FILL_Y / GLYPH_HEIGHT as f32);

        let caption_dot = height * CAPTION_DOT;
        let caption_width = METRICS.run_width(CAPTION.chars().count()) as f32 * caption_dot;
        let caption_band = height * MARGIN_BOTTOM;

        BoardLayout {
            width,
            height,
            border: height * BORDER,
            corner: height * CORNER,
            rows: model.rows,
            columns: model.columns,
            start_x: width * MARGIN_X + (column_pitch - tile_width) / 2.0,
            start_y: height * MARGIN_TOP + (row_pitch - tile_height) / 2.0,
            column_pitch,
            row_pitch,
            tile_width,
            tile_height,
            divider: tile_height * DIVIDER,
            dot,
            caption_dot,
            caption_x: (width - caption_width) / 2.0,
            caption_y: height - caption_band / 2.0 - GLYPH_HEIGHT as f32 * caption_dot / 2.0,
        }
    }

    /// Top-left corner of a tile.
    pub fn tile_origin(&self, row: usize, column: usize) -> (f32, f32) {
        (
            self.start_x + column as f32 * self.column_pitch,
            self.start_y + row as f32 * self.row_pitch,
        )
    }

    /// Top-left corner of a glyph centered in its tile.
    pub fn glyph_origin(&self, row: usize, column: usize) -> (f32, f32) {
        let (x, y) = self.tile_origin(row, column);
        (
            x + (self.tile_width - GLYPH_WIDTH as f32 * self.dot) / 2.0,
            y + (self.tile_height - GLYPH_HEIGHT as f32 * self.dot) / 2.0,
        )
    }

    /// Canvas width rounded to whole pixels.
    pub fn pixel_width(&self) -> u32 {
        self.width.round().max(1.0) as u32
    }
}

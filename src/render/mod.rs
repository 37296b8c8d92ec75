/*
 *  render/mod.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Board renderer - character grid + model to SVG or PNG
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

pub mod font;
pub mod layout;
pub mod raster;
pub mod svg;

use log::error;
use serde::{Deserialize, Serialize};

use crate::grid::CharacterGrid;
use crate::model::DeviceModel;

pub use layout::BoardLayout;
pub use raster::{RasterError, RasterRenderer, render_png};
pub use svg::render_svg;

pub const DEFAULT_PNG_HEIGHT: u32 = 400;

/// Output form of the rendered board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Scalable, self-contained vector drawing.
    #[default]
    Svg,
    /// Pre-rasterized at a fixed pixel height.
    Png,
}

impl ImageFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// Rendered artifact plus its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Renders grids for one model in one output format.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    model: &'static DeviceModel,
    format: ImageFormat,
    height: u32,
}

impl Renderer {
    pub fn new(model: &'static DeviceModel, format: ImageFormat, height: u32) -> Self {
        Renderer {
            model,
            format,
            height: height.max(1),
        }
    }

    pub fn model(&self) -> &'static DeviceModel {
        self.model
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn render(&self, grid: &CharacterGrid) -> Result<RenderedImage, RasterError> {
        match self.format {
            ImageFormat::Svg => Ok(self.vector(grid)),
            ImageFormat::Png => Ok(RenderedImage {
                content_type: ImageFormat::Png.content_type(),
                bytes: render_png(grid, self.model, self.height)?,
            }),
        }
    }

    /// Like `render`, falling back to the vector form if rasterizing fails so
    /// the artifact never lags the grid.
    pub fn render_or_vector(&self, grid: &CharacterGrid) -> RenderedImage {
        self.render(grid).unwrap_or_else(|e| {
            error!("Failed to rasterize {} board, using SVG: {}", self.model.name, e);
            self.vector(grid)
        })
    }

    fn vector(&self, grid: &CharacterGrid) -> RenderedImage {
        RenderedImage {
            content_type: ImageFormat::Svg.content_type(),
            bytes: render_svg(grid, self.model).into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{Align, Composer, Justify};
    use crate::model::{FLAGSHIP_WHITE, NOTE};

    #[test]
    fn test_renderer_formats() {
        let grid = Composer::new(&NOTE).compose("hello", Justify::Center, Align::Center).unwrap();

        let svg = Renderer::new(&NOTE, ImageFormat::Svg, 0).render(&grid).unwrap();
        assert_eq!(svg.content_type, "image/svg+xml");
        assert!(svg.bytes.starts_with(b"<svg"));

        let png = Renderer::new(&NOTE, ImageFormat::Png, 100).render(&grid).unwrap();
        assert_eq!(png.content_type, "image/png");
        assert!(png.bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_render_is_deterministic_for_every_model() {
        for name in DeviceModel::all_models() {
            let model = DeviceModel::from_name(name).unwrap();
            let grid = Composer::new(model)
                .compose("🟥 RED 72°\nall good", Justify::Left, Align::Top)
                .unwrap();
            for format in [ImageFormat::Svg, ImageFormat::Png] {
                let renderer = Renderer::new(model, format, 80);
                assert_eq!(renderer.render(&grid).unwrap(), renderer.render(&grid).unwrap());
            }
        }
    }

    #[test]
    fn test_white_model_palette_in_output() {
        let grid = Composer::new(&FLAGSHIP_WHITE).compose("x", Justify::Left, Align::Top).unwrap();
        let svg = Renderer::new(&FLAGSHIP_WHITE, ImageFormat::Svg, 0).render_or_vector(&grid);
        let text = String::from_utf8(svg.bytes).unwrap();
        assert!(text.contains("#F5F5F7"));
        assert!(text.contains(r##"<path fill="#000000""##));
    }

    #[test]
    fn test_format_serde() {
        let format: ImageFormat = serde_yaml::from_str("png").unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(format.extension(), "png");
    }
}

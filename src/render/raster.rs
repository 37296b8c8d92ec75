//! Module for rasterizing the board drawing to PNG.
//!
//! This module uses `usvg` for SVG parsing and `resvg` for rendering into a
//! `tiny_skia::Pixmap`. The layout is computed at the target pixel height, so
//! every offset in the drawing is already in device pixels and the tree is
//! rendered 1:1.

use resvg::render;
use tiny_skia::{Pixmap, Transform};
use usvg::{Options as UsvgOptions, Tree as UsvgTree};
use log::debug;
use std::error::Error;
use std::fmt;

use crate::grid::CharacterGrid;
use crate::model::DeviceModel;
use super::layout::BoardLayout;
use super::svg;

/// Custom error type for raster rendering operations.
#[derive(Debug)]
pub enum RasterError {
    /// Error parsing the SVG data.
    SvgParseError(String),
    /// Error creating a pixmap for rendering.
    PixmapCreationError(String),
    /// Error encoding the pixmap as PNG.
    EncodeError(String),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::SvgParseError(msg) => write!(f, "SVG parse error: {}", msg),
            RasterError::PixmapCreationError(msg) => write!(f, "Pixmap creation error: {}", msg),
            RasterError::EncodeError(msg) => write!(f, "PNG encode error: {}", msg),
        }
    }
}

impl Error for RasterError {}

/// Renders SVG data to an RGBA pixmap at a fixed size.
#[derive(Debug)]
pub struct RasterRenderer {
    tree: UsvgTree,
    target_width: u32,
    target_height: u32,
}

impl RasterRenderer {
    /// Creates a new `RasterRenderer` from SVG string data and target dimensions.
    ///
    /// The SVG will be scaled to fit `target_width` and `target_height`.
    pub fn new(svg_data: &str, target_width: u32, target_height: u32) -> Result<Self, RasterError> {
        let options = UsvgOptions::default();
        let tree = UsvgTree::from_str(svg_data, &options)
            .map_err(|e| RasterError::SvgParseError(format!("Failed to parse SVG: {:?}", e)))?;
        Ok(RasterRenderer {
            tree,
            target_width,
            target_height,
        })
    }

    pub fn render_pixmap(&self) -> Result<Pixmap, RasterError> {
        let mut pixmap = Pixmap::new(self.target_width, self.target_height).ok_or_else(|| {
            RasterError::PixmapCreationError(format!(
                "Failed to create {}x{} pixmap",
                self.target_width, self.target_height
            ))
        })?;

        // identity when the drawing was laid out at the target size
        let svg_size = self.tree.size();
        let scale_x = self.target_width as f32 / svg_size.width();
        let scale_y = self.target_height as f32 / svg_size.height();
        let transform = Transform::from_scale(scale_x, scale_y);

        render(&self.tree, transform, &mut pixmap.as_mut());
        Ok(pixmap)
    }

    pub fn render_png(&self) -> Result<Vec<u8>, RasterError> {
        let png = self
            .render_pixmap()?
            .encode_png()
            .map_err(|e| RasterError::EncodeError(e.to_string()))?;
        debug!(
            "board rasterized to {}x{} PNG ({} bytes)",
            self.target_width,
            self.target_height,
            png.len()
        );
        Ok(png)
    }
}

/// PNG of a grid on a model, `height` pixels tall.
pub fn render_png(grid: &CharacterGrid, model: &DeviceModel, height: u32) -> Result<Vec<u8>, RasterError> {
    let layout = BoardLayout::for_model(model, height as f32);
    let drawing = svg::render_with_layout(grid, model, &layout, true);
    RasterRenderer::new(&drawing, layout.pixel_width(), height)?.render_png()
}

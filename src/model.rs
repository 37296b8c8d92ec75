/*
 *  model.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Board model registry - dimensions, palette and glyph overrides
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

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown board model '{0}' (expected one of: black, white, note)")]
    UnknownModel(String),
}

/// code -> hex color shared by every model unless overridden
const DEFAULT_COLOR_MAP: [(i32, &str); 10] = [
    (0, "#141414"),  // blank
    (63, "#DA291C"), // red
    (64, "#FA7400"), // orange
    (65, "#FCB81B"), // yellow
    (66, "#1F9A44"), // green
    (67, "#2083D5"), // blue
    (68, "#702F8A"), // violet
    (69, "#FFFFFF"), // white
    (70, "#141414"), // black
    (71, "#FFFFFF"), // filled
];

const WHITE_COLOR_MAP: [(i32, &str); 10] = [
    (0, "#FFFFFF"),
    (63, "#DA291C"),
    (64, "#FA7400"),
    (65, "#FCB81B"),
    (66, "#1F9A44"),
    (67, "#2083D5"),
    (68, "#702F8A"),
    (69, "#000000"),
    (70, "#FFFFFF"),
    (71, "#000000"),
];

/// Visual and layout parameters of one board variant.
#[derive(Debug, PartialEq)]
pub struct DeviceModel {
    pub name: &'static str,
    /// housing color
    pub frame: &'static str,
    /// bit border / wordmark color
    pub bit: &'static str,
    pub text: &'static str,
    pub rows: usize,
    pub columns: usize,
    /// width / height of the whole board
    pub aspect_ratio: f32,
    color_map: &'static [(i32, &'static str)],
    char_map: &'static [(i32, &'static str)],
}

pub static FLAGSHIP_BLACK: DeviceModel = DeviceModel {
    name: "black",
    frame: "#171818",
    bit: "#333333",
    text: "#FFFFFF",
    rows: 6,
    columns: 22,
    aspect_ratio: 1.87,
    color_map: &DEFAULT_COLOR_MAP,
    char_map: &[(62, "°")],
};

pub static FLAGSHIP_WHITE: DeviceModel = DeviceModel {
    name: "white",
    frame: "#F5F5F7",
    bit: "#CCCCCC",
    text: "#000000",
    rows: 6,
    columns: 22,
    aspect_ratio: 1.87,
    color_map: &WHITE_COLOR_MAP,
    char_map: &[(62, "°")],
};

pub static NOTE: DeviceModel = DeviceModel {
    name: "note",
    frame: "#171818",
    bit: "#333333",
    text: "#FFFFFF",
    rows: 3,
    columns: 15,
    aspect_ratio: 2.35,
    color_map: &DEFAULT_COLOR_MAP,
    char_map: &[(62, "❤️")],
};

static MODELS: [&DeviceModel; 3] = [&FLAGSHIP_BLACK, &FLAGSHIP_WHITE, &NOTE];

impl DeviceModel {
    /// Resolve a configured model name.
    pub fn from_name(name: &str) -> Result<&'static DeviceModel, ModelError> {
        let canonical = match name.trim().to_ascii_lowercase().as_str() {
            "black" | "flagship-black" => "black",
            "white" | "flagship-white" => "white",
            "note" | "compact" => "note",
            _ => return Err(ModelError::UnknownModel(name.to_string())),
        };
        MODELS
            .iter()
            .copied()
            .find(|m| m.name == canonical)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn all_models() -> Vec<&'static str> {
        MODELS.iter().map(|m| m.name).collect()
    }

    pub fn color_for_code(&self, code: i32) -> Option<&'static str> {
        self.color_map.iter().find(|(c, _)| *c == code).map(|(_, hex)| *hex)
    }

    pub fn char_for_code(&self, code: i32) -> Option<&'static str> {
        self.char_map.iter().find(|(c, _)| *c == code).map(|(_, s)| *s)
    }

    /// The 6x22 boards, black or white.
    pub fn is_flagship(&self) -> bool {
        matches!(self.name, "black" | "white")
    }

    pub fn tile_size(&self, target_width: f32, target_height: f32) -> (f32, f32) {
        (
            target_width / self.columns as f32,
            target_height / self.rows as f32,
        )
    }

    pub fn tile_aspect_ratio(&self, target_width: f32, target_height: f32) -> f32 {
        let (w, h) = self.tile_size(target_width, target_height);
        w / h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_models() {
        assert_eq!(DeviceModel::from_name("black").unwrap().name, "black");
        assert_eq!(DeviceModel::from_name("Flagship-White").unwrap().name, "white");
        assert_eq!(DeviceModel::from_name("compact").unwrap().name, "note");
        assert_eq!(
            DeviceModel::from_name("grey"),
            Err(ModelError::UnknownModel("grey".to_string()))
        );
        assert_eq!(DeviceModel::all_models(), vec!["black", "white", "note"]);
    }

    #[test]
    fn test_dimensions() {
        assert_eq!((FLAGSHIP_BLACK.rows, FLAGSHIP_BLACK.columns), (6, 22));
        assert_eq!((NOTE.rows, NOTE.columns), (3, 15));
        assert!(FLAGSHIP_WHITE.is_flagship());
        assert!(!NOTE.is_flagship());
    }

    #[test]
    fn test_model_scoped_lookups() {
        assert_eq!(FLAGSHIP_BLACK.char_for_code(62), Some("°"));
        assert_eq!(NOTE.char_for_code(62), Some("❤️"));
        assert_eq!(FLAGSHIP_BLACK.char_for_code(1), None);

        assert_eq!(FLAGSHIP_BLACK.color_for_code(69), Some("#FFFFFF"));
        assert_eq!(FLAGSHIP_WHITE.color_for_code(69), Some("#000000"));
        assert_eq!(FLAGSHIP_WHITE.color_for_code(63), Some("#DA291C"));
        assert_eq!(FLAGSHIP_BLACK.color_for_code(5), None);
    }

    #[test]
    fn test_tile_size() {
        let (w, h) = FLAGSHIP_BLACK.tile_size(220.0, 60.0);
        assert_eq!((w, h), (10.0, 10.0));
        assert_eq!(NOTE.tile_aspect_ratio(150.0, 60.0), 0.5);
    }
}

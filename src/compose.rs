/*
 *  compose.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Message composer - free text with emoji color blocks to a board grid
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

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::charset;
use crate::grid::CharacterGrid;
use crate::model::DeviceModel;

/// Why a text could not be laid out directly on the board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("unsupported character {0:?}")]
    UnsupportedCharacter(char),
    #[error("invalid character code token {0:?}")]
    InvalidCode(String),
    #[error("word of {length} characters does not fit {columns} columns")]
    WordTooLong { length: usize, columns: usize },
    #[error("{lines} lines do not fit {rows} rows")]
    TooManyLines { lines: usize, rows: usize },
}

impl ComposeError {
    /// Whether a layout-template (VBML) request might still render the text.
    /// A malformed `{N}` token is a caller error no template can fix.
    pub fn wants_layout_service(&self) -> bool {
        !matches!(self, ComposeError::InvalidCode(_))
    }
}

/// Horizontal placement of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    Left,
    Right,
    #[default]
    Center,
    /// Block centered on its widest line, lines flush left within it.
    Justified,
}

/// Vertical placement of the block of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Top,
    Bottom,
    #[default]
    Center,
    Justified,
}

impl Align {
    /// `justified` has no vertical meaning of its own.
    pub fn normalized(self) -> Self {
        match self {
            Align::Justified => Align::Center,
            other => other,
        }
    }
}

impl Justify {
    pub fn as_str(self) -> &'static str {
        match self {
            Justify::Left => "left",
            Justify::Right => "right",
            Justify::Center => "center",
            Justify::Justified => "justified",
        }
    }
}

impl Align {
    pub fn as_str(self) -> &'static str {
        match self {
            Align::Top => "top",
            Align::Bottom => "bottom",
            Align::Center => "center",
            Align::Justified => "justified",
        }
    }
}

impl FromStr for Justify {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Justify::Left),
            "right" => Ok(Justify::Right),
            "center" | "centre" => Ok(Justify::Center),
            "justified" => Ok(Justify::Justified),
            other => Err(format!("unknown justify value '{other}'")),
        }
    }
}

impl FromStr for Align {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Align::Top),
            "bottom" => Ok(Align::Bottom),
            "center" | "centre" | "middle" => Ok(Align::Center),
            "justified" => Ok(Align::Justified),
            other => Err(format!("unknown align value '{other}'")),
        }
    }
}

/// Emoji that map one to one onto color-block codes.
pub const EMOJI_MAP: [(char, i32); 9] = [
    ('🟥', 63),
    ('🟧', 64),
    ('🟨', 65),
    ('🟩', 66),
    ('🟦', 67),
    ('🟪', 68),
    ('⬜', 69),
    ('⬛', 70),
    ('■', 71),
];

/// Replace color emoji with `{code}` tokens understood by the encoder.
pub fn substitute_emoji(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match EMOJI_MAP.iter().find(|(e, _)| *e == c) {
            Some((_, code)) => {
                out.push('{');
                out.push_str(&code.to_string());
                out.push('}');
            }
            None => out.push(c),
        }
    }
    out
}

/// Lays text out for one board model.
#[derive(Debug, Clone, Copy)]
pub struct Composer {
    model: &'static DeviceModel,
}

impl Composer {
    pub fn new(model: &'static DeviceModel) -> Self {
        Composer { model }
    }

    pub fn model(&self) -> &'static DeviceModel {
        self.model
    }

    /// Compose `text` into a grid sized for the model.
    pub fn compose(&self, text: &str, justify: Justify, align: Align) -> Result<CharacterGrid, ComposeError> {
        let text = substitute_emoji(text);
        charset::encode_text(
            &text,
            justify,
            align.normalized(),
            self.model.rows,
            self.model.columns,
        )
    }
}

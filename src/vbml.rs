/*
 *  vbml.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layout-template (VBML) composition service client
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

use log::debug;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::charset::MAX_CODE;
use crate::compose::{Align, Justify};
use crate::grid::CharacterGrid;

pub const VBML_URL: &str = "https://vbml.vestaboard.com/compose";

#[derive(Debug, Error)]
pub enum VbmlError {
    #[error("VBML request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("VBML service rejected the layout: {0}")]
    Rejected(String),
    #[error("VBML service returned an unusable grid: {0}")]
    InvalidResponse(String),
    #[error("invalid VBML document: {0}")]
    Invalid(String),
}

/// Top-left cell of a positioned component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justify: Option<Justify>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_characters: Option<Vec<Vec<i32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
}

/// A VBML document as posted to the composition service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vbml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<BTreeMap<String, String>>,
    pub components: Vec<Component>,
}

impl Vbml {
    /// Single template component laid out like the direct composer would.
    pub fn from_template(text: &str, justify: Justify, align: Align) -> Self {
        Vbml {
            props: None,
            components: vec![Component {
                template: Some(text.to_string()),
                raw_characters: None,
                style: Some(Style {
                    justify: Some(justify),
                    align: Some(align),
                    ..Default::default()
                }),
            }],
        }
    }

    /// Check bounds the service would otherwise reject less helpfully.
    pub fn validate(&self) -> Result<(), VbmlError> {
        if self.components.is_empty() {
            return Err(VbmlError::Invalid("no components".into()));
        }
        for (i, component) in self.components.iter().enumerate() {
            if component.template.is_none() && component.raw_characters.is_none() {
                return Err(VbmlError::Invalid(format!(
                    "component {} needs a template or rawCharacters",
                    i
                )));
            }
            if let Some(rows) = &component.raw_characters {
                if rows.iter().flatten().any(|c| !(0..=MAX_CODE).contains(c)) {
                    return Err(VbmlError::Invalid(format!(
                        "component {} has a character code outside 0-{}",
                        i, MAX_CODE
                    )));
                }
            }
            if let Some(style) = &component.style {
                if matches!(style.height, Some(h) if !(1..=6).contains(&h)) {
                    return Err(VbmlError::Invalid(format!("component {} height must be 1-6", i)));
                }
                if matches!(style.width, Some(w) if !(1..=22).contains(&w)) {
                    return Err(VbmlError::Invalid(format!("component {} width must be 1-22", i)));
                }
                if let Some(pos) = style.absolute_position {
                    if pos.x > 21 || pos.y > 5 {
                        return Err(VbmlError::Invalid(format!(
                            "component {} position ({}, {}) is off the board",
                            i, pos.x, pos.y
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Client for the hosted composition service.
#[derive(Debug, Clone)]
pub struct VbmlClient {
    url: String,
    client: Client,
}

impl VbmlClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, VbmlError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(VbmlClient {
            url: url.to_string(),
            client,
        })
    }

    /// Lay a document out into a grid.
    pub async fn compose(&self, vbml: &Vbml) -> Result<CharacterGrid, VbmlError> {
        vbml.validate()?;
        let response = self.client.post(&self.url).json(vbml).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("VBML compose answered {} with {} bytes", status, body.len());

        if !status.is_success() {
            return Err(VbmlError::Rejected(rejection_message(status.as_u16(), &body)));
        }
        parse_grid(&body)
    }
}

/// Error text from a failed compose, preferring the service's `message`.
fn rejection_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status))
}

fn parse_grid(body: &str) -> Result<CharacterGrid, VbmlError> {
    let rows: Vec<Vec<i32>> =
        serde_json::from_str(body).map_err(|e| VbmlError::InvalidResponse(e.to_string()))?;
    if rows.is_empty() {
        return Err(VbmlError::InvalidResponse("empty grid".into()));
    }
    Ok(CharacterGrid::new(rows))
}

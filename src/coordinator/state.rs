/*
 *  coordinator/state.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Observed display state and the snapshot published to observers
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

use chrono::{DateTime, Local};
use tokio::time::Instant;

use crate::charset;
use crate::grid::CharacterGrid;
use crate::render::{RenderedImage, Renderer};

/// Last observed grid and everything derived from it.
///
/// The three derived fields are only ever replaced together, by `observe`.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    data: Option<CharacterGrid>,
    message: String,
    image: Option<RenderedImage>,
    last_updated: Option<DateTime<Local>>,
}

impl DisplayState {
    /// Record `grid`, re-deriving text and image only if it changed.
    /// Returns whether anything changed.
    pub fn observe(&mut self, grid: CharacterGrid, renderer: &Renderer, now: DateTime<Local>) -> bool {
        if self.data.as_ref() == Some(&grid) {
            return false;
        }
        self.message = charset::decode(&grid);
        self.image = Some(renderer.render_or_vector(&grid));
        self.data = Some(grid);
        self.last_updated = Some(now);
        true
    }

    pub fn data(&self) -> Option<&CharacterGrid> {
        self.data.as_ref()
    }
}

/// An armed temporary message.
#[derive(Debug, Clone)]
pub struct TemporaryOverlay {
    pub grid: CharacterGrid,
    /// monotonic deadline the timer sleeps until
    pub deadline: Instant,
    /// wall time reported to observers
    pub expires_at: DateTime<Local>,
    pub generation: u64,
}

impl TemporaryOverlay {
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

/// What observers see of one board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    pub data: Option<CharacterGrid>,
    pub message: String,
    pub image: Option<RenderedImage>,
    pub last_updated: Option<DateTime<Local>>,
    pub temporary_expiration: Option<DateTime<Local>>,
    pub temporary_active: bool,
}

impl BoardSnapshot {
    pub fn new(state: &DisplayState, temporary: Option<&TemporaryOverlay>) -> Self {
        BoardSnapshot {
            data: state.data.clone(),
            message: state.message.clone(),
            image: state.image.clone(),
            last_updated: state.last_updated,
            temporary_expiration: temporary.map(|t| t.expires_at),
            temporary_active: temporary.is_some(),
        }
    }

    /// `{n}{n}...` form of the shown grid.
    pub fn character_codes(&self) -> Option<String> {
        self.data.as_ref().map(CharacterGrid::to_code_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NOTE;
    use crate::render::ImageFormat;

    #[test]
    fn test_observe_only_rerenders_on_change() {
        let renderer = Renderer::new(&NOTE, ImageFormat::Svg, 0);
        let mut state = DisplayState::default();
        let first = Local::now();
        let grid = CharacterGrid::filled(3, 15, 8);

        assert!(state.observe(grid.clone(), &renderer, first));
        assert_eq!(state.message.lines().next(), Some("HHHHHHHHHHHHHHH"));
        assert!(state.image.is_some());

        let later = first + chrono::Duration::seconds(15);
        assert!(!state.observe(grid, &renderer, later));
        assert_eq!(state.last_updated, Some(first));

        assert!(state.observe(CharacterGrid::filled(3, 15, 0), &renderer, later));
        assert_eq!(state.last_updated, Some(later));
        assert_eq!(state.message.trim(), "");
    }

    #[test]
    fn test_snapshot_reports_overlay() {
        let state = DisplayState::default();
        let expires_at = Local::now();
        let overlay = TemporaryOverlay {
            grid: CharacterGrid::filled(3, 15, 1),
            deadline: Instant::now(),
            expires_at,
            generation: 1,
        };
        let snap = BoardSnapshot::new(&state, Some(&overlay));
        assert!(snap.temporary_active);
        assert_eq!(snap.temporary_expiration, Some(expires_at));
        assert_eq!(snap.character_codes(), None);

        let idle = BoardSnapshot::new(&state, None);
        assert!(!idle.temporary_active);
    }
}

/*
 *  device/mock.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock board for testing without hardware
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

use std::sync::{Arc, Mutex, MutexGuard};

use crate::grid::CharacterGrid;
use super::{BoardDevice, DeviceError, WriteOptions};

/// Mock board
///
/// Holds a grid in memory, records every write and can be told to fail
/// reads or writes. Clones share state so a test can keep a handle while
/// the coordinator owns another.
#[derive(Debug, Clone, Default)]
pub struct MockBoard {
    state: Arc<Mutex<MockBoardState>>,
}

/// Shared state for the mock board (public for inspection in tests)
#[derive(Debug, Default)]
pub struct MockBoardState {
    /// What the board currently shows
    pub current: Option<CharacterGrid>,

    /// Every grid written, in order
    pub writes: Vec<CharacterGrid>,

    /// Number of read_message() calls
    pub read_count: usize,

    /// Fail the next reads with a transport error
    pub fail_reads: bool,

    /// Fail the next writes with a transport error
    pub fail_writes: bool,

    /// Answer reads with an auth rejection
    pub unauthorized: bool,

    /// Answer reads with no grid
    pub empty_reads: bool,
}

impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Board already showing `grid`.
    pub fn showing(grid: CharacterGrid) -> Self {
        let board = Self::new();
        board.state().current = Some(grid);
        board
    }

    /// Lock the shared state for inspection or fault injection.
    pub fn state(&self) -> MutexGuard<'_, MockBoardState> {
        // a test that panicked while holding the lock already failed
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn writes(&self) -> Vec<CharacterGrid> {
        self.state().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }

    pub fn current(&self) -> Option<CharacterGrid> {
        self.state().current.clone()
    }

    /// Change the board behind the coordinator's back, as the vendor app would.
    pub fn set_current(&self, grid: CharacterGrid) {
        self.state().current = Some(grid);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.state().unauthorized = unauthorized;
    }

    pub fn set_empty_reads(&self, empty: bool) {
        self.state().empty_reads = empty;
    }
}

impl BoardDevice for MockBoard {
    async fn read_message(&self) -> Result<Option<CharacterGrid>, DeviceError> {
        let mut state = self.state();
        state.read_count += 1;
        if state.unauthorized {
            return Err(DeviceError::Unauthorized(401));
        }
        if state.fail_reads {
            return Err(DeviceError::Transport("mock read failure".into()));
        }
        if state.empty_reads {
            return Ok(None);
        }
        Ok(state.current.clone())
    }

    async fn write_message(
        &self,
        grid: &CharacterGrid,
        _options: Option<&WriteOptions>,
    ) -> Result<(), DeviceError> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(DeviceError::Transport("mock write failure".into()));
        }
        state.writes.push(grid.clone());
        state.current = Some(grid.clone());
        Ok(())
    }
}

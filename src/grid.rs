/*
 *  grid.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Character grid - one full frame of board character codes
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
use std::fmt::Write;

/// Rows of raw character codes as reported by (or sent to) the board.
///
/// Codes are kept as `i32` so whatever the device hands back survives the
/// round trip; anything outside the printable table renders as a blank.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterGrid {
    rows: Vec<Vec<i32>>,
}

impl CharacterGrid {
    pub fn new(rows: Vec<Vec<i32>>) -> Self {
        CharacterGrid { rows }
    }

    /// A grid of `rows` x `columns` filled with `code`.
    pub fn filled(rows: usize, columns: usize, code: i32) -> Self {
        CharacterGrid {
            rows: vec![vec![code; columns]; rows],
        }
    }

    pub fn rows(&self) -> &[Vec<i32>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    pub fn get(&self, row: usize, column: usize) -> Option<i32> {
        self.rows.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Iterate `(row, column, code)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, i32)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter().enumerate().map(move |(c, code)| (r, c, *code))
        })
    }

    /// Flattened `{n}{n}...` form of every code, row-major.
    pub fn to_code_string(&self) -> String {
        let mut out = String::with_capacity(self.rows.len() * 22 * 4);
        for (_, _, code) in self.cells() {
            let _ = write!(out, "{{{code}}}");
        }
        out
    }

    pub fn into_rows(self) -> Vec<Vec<i32>> {
        self.rows
    }
}

impl From<Vec<Vec<i32>>> for CharacterGrid {
    fn from(rows: Vec<Vec<i32>>) -> Self {
        CharacterGrid::new(rows)
    }
}

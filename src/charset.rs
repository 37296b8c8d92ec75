/*
 *  charset.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Board character table - code <-> glyph mapping and text encoding
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

use crate::compose::{Align, ComposeError, Justify};
use crate::grid::CharacterGrid;

/// Printable symbol for every board code, indexed by code.
/// Unassigned slots are blanks.
pub const PRINTABLE: [char; 72] = [
    ' ', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q',
    'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    '0', '!', '@', '#', '$', '(', ')', ' ', '-', ' ', '+', '&', '=', ';', ':', ' ', '\'', '"',
    '%', ',', '.', ' ', ' ', '/', '?', ' ', '°', '🟥', '🟧', '🟨', '🟩', '🟦', '🟪', '⬜', '⬛',
    '■',
];

pub const BLANK: i32 = 0;
pub const MAX_CODE: i32 = 71;

/// First and last of the reserved color-block codes.
pub const COLOR_FIRST: i32 = 63;
pub const COLOR_LAST: i32 = 71;

/// Named color-block codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ColorCode {
    Red = 63,
    Orange = 64,
    Yellow = 65,
    Green = 66,
    Blue = 67,
    Violet = 68,
    White = 69,
    Black = 70,
    Filled = 71,
}

impl ColorCode {
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            63 => ColorCode::Red,
            64 => ColorCode::Orange,
            65 => ColorCode::Yellow,
            66 => ColorCode::Green,
            67 => ColorCode::Blue,
            68 => ColorCode::Violet,
            69 => ColorCode::White,
            70 => ColorCode::Black,
            71 => ColorCode::Filled,
            _ => return None,
        })
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

pub fn is_color_code(code: i32) -> bool {
    (COLOR_FIRST..=COLOR_LAST).contains(&code)
}

/// Symbol for a code; a space for anything outside the table.
pub fn symbol(code: i32) -> char {
    usize::try_from(code)
        .ok()
        .and_then(|i| PRINTABLE.get(i))
        .copied()
        .unwrap_or(' ')
}

/// Plain-text form of a grid, one line per row.
pub fn decode(grid: &CharacterGrid) -> String {
    grid.rows()
        .iter()
        .map(|row| row.iter().map(|&c| symbol(c)).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Code for a printable character. Letters are case-folded; color blocks and
/// unassigned blanks are never returned for plain characters.
pub fn code_for_char(c: char) -> Option<i32> {
    if c == ' ' {
        return Some(BLANK);
    }
    let c = c.to_ascii_uppercase();
    PRINTABLE[1..COLOR_FIRST as usize]
        .iter()
        .position(|&p| p == c)
        .map(|i| i as i32 + 1)
}

/// Split text into paragraphs of words, each word already converted to codes.
/// `{N}` injects code N directly.
fn tokenize(text: &str) -> Result<Vec<Vec<Vec<i32>>>, ComposeError> {
    let mut paragraphs = Vec::new();
    for line in text.split('\n') {
        let mut words: Vec<Vec<i32>> = Vec::new();
        let mut word: Vec<i32> = Vec::new();
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut token = String::new();
                    let mut closed = false;
                    for d in chars.by_ref() {
                        if d == '}' {
                            closed = true;
                            break;
                        }
                        token.push(d);
                    }
                    let code = token
                        .trim()
                        .parse::<i32>()
                        .ok()
                        .filter(|n| closed && (0..=MAX_CODE).contains(n))
                        .ok_or_else(|| ComposeError::InvalidCode(format!("{{{token}")))?;
                    word.push(code);
                }
                c if c.is_whitespace() => {
                    if !word.is_empty() {
                        words.push(std::mem::take(&mut word));
                    }
                }
                c => word.push(code_for_char(c).ok_or(ComposeError::UnsupportedCharacter(c))?),
            }
        }
        if !word.is_empty() {
            words.push(word);
        }
        paragraphs.push(words);
    }
    Ok(paragraphs)
}

/// Greedy word wrap at `columns`, single blank between words.
fn wrap(paragraphs: Vec<Vec<Vec<i32>>>, columns: usize) -> Result<Vec<Vec<i32>>, ComposeError> {
    let mut lines = Vec::new();
    for words in paragraphs {
        let mut line: Vec<i32> = Vec::new();
        for word in words {
            if word.len() > columns {
                return Err(ComposeError::WordTooLong {
                    length: word.len(),
                    columns,
                });
            }
            if line.is_empty() {
                line = word;
            } else if line.len() + 1 + word.len() <= columns {
                line.push(BLANK);
                line.extend(word);
            } else {
                lines.push(std::mem::replace(&mut line, word));
            }
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Encode free text into a `rows` x `columns` grid.
///
/// Fails rather than truncates when the text does not fit.
pub fn encode_text(
    text: &str,
    justify: Justify,
    align: Align,
    rows: usize,
    columns: usize,
) -> Result<CharacterGrid, ComposeError> {
    let mut lines = wrap(tokenize(text)?, columns)?;

    // surrounding blank lines carry no layout meaning once aligned
    while lines.last().is_some_and(Vec::is_empty) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);

    if lines.len() > rows {
        return Err(ComposeError::TooManyLines {
            lines: lines.len(),
            rows,
        });
    }

    let widest = lines.iter().map(Vec::len).max().unwrap_or(0);
    let block_left = (columns - widest) / 2;

    let top = match align {
        Align::Top => 0,
        Align::Bottom => rows - lines.len(),
        Align::Center | Align::Justified => (rows - lines.len()) / 2,
    };

    let mut grid = vec![vec![BLANK; columns]; rows];
    for (i, line) in lines.into_iter().enumerate() {
        let left = match justify {
            Justify::Left => 0,
            Justify::Right => columns - line.len(),
            Justify::Center => (columns - line.len()) / 2,
            Justify::Justified => block_left,
        };
        grid[top + i][left..left + line.len()].copy_from_slice(&line);
    }
    Ok(CharacterGrid::new(grid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(grid: &CharacterGrid) -> Vec<String> {
        decode(grid).split('\n').map(str::to_string).collect()
    }

    #[test]
    fn test_symbol_table() {
        assert_eq!(symbol(0), ' ');
        assert_eq!(symbol(1), 'A');
        assert_eq!(symbol(26), 'Z');
        assert_eq!(symbol(27), '1');
        assert_eq!(symbol(36), '0');
        assert_eq!(symbol(62), '°');
        assert_eq!(symbol(63), '🟥');
        assert_eq!(symbol(71), '■');
    }

    #[test]
    fn test_decode_is_total() {
        for code in -5..200 {
            let _ = symbol(code);
        }
        assert_eq!(symbol(-1), ' ');
        assert_eq!(symbol(72), ' ');
        assert_eq!(symbol(i32::MAX), ' ');
        let grid = CharacterGrid::new(vec![vec![8, 9, 500], vec![-3, 37]]);
        assert_eq!(decode(&grid), "HI \n !");
    }

    #[test]
    fn test_code_for_char() {
        assert_eq!(code_for_char('a'), Some(1));
        assert_eq!(code_for_char('Z'), Some(26));
        assert_eq!(code_for_char('0'), Some(36));
        assert_eq!(code_for_char('?'), Some(60));
        assert_eq!(code_for_char('°'), Some(62));
        assert_eq!(code_for_char(' '), Some(0));
        assert_eq!(code_for_char('🟥'), None);
        assert_eq!(code_for_char('~'), None);
    }

    #[test]
    fn test_round_trip() {
        let text = "Hello, World!\nIt's 72° (ok?)";
        let grid = encode_text(text, Justify::Left, Align::Top, 6, 22).unwrap();
        let decoded = lines(&grid);
        assert_eq!(decoded[0].trim_end(), "HELLO, WORLD!");
        assert_eq!(decoded[1].trim_end(), "IT'S 72° (OK?)");
        assert!(decoded[2..].iter().all(|l| l.trim().is_empty()));
        assert!(decoded.iter().all(|l| l.chars().count() == 22));
    }

    #[test]
    fn test_center_alignment() {
        let grid = encode_text("HI", Justify::Center, Align::Center, 6, 22).unwrap();
        assert_eq!(grid.row_count(), 6);
        assert_eq!(grid.get(2, 10), Some(8));
        assert_eq!(grid.get(2, 11), Some(9));
        assert!(grid.rows()[0].iter().all(|&c| c == BLANK));
    }

    #[test]
    fn test_right_bottom() {
        let grid = encode_text("ok", Justify::Right, Align::Bottom, 3, 15).unwrap();
        assert_eq!(grid.get(2, 13), Some(15));
        assert_eq!(grid.get(2, 14), Some(11));
    }

    #[test]
    fn test_justified_keeps_block_left_aligned() {
        let grid = encode_text("AB\nABCD", Justify::Justified, Align::Top, 6, 22).unwrap();
        // block of width 4 centered in 22 columns starts at 9
        assert_eq!(grid.get(0, 9), Some(1));
        assert_eq!(grid.get(1, 9), Some(1));
        assert_eq!(grid.get(1, 12), Some(4));
    }

    #[test]
    fn test_word_wrap() {
        let grid = encode_text(
            "the quick brown fox jumps over the lazy dog",
            Justify::Left,
            Align::Top,
            6,
            15,
        )
        .unwrap();
        let decoded = lines(&grid);
        assert_eq!(decoded[0].trim_end(), "THE QUICK BROWN");
        assert_eq!(decoded[1].trim_end(), "FOX JUMPS OVER");
        assert_eq!(decoded[2].trim_end(), "THE LAZY DOG");
    }

    #[test]
    fn test_code_tokens() {
        let grid = encode_text("{63}{0}{66}", Justify::Left, Align::Top, 1, 5).unwrap();
        assert_eq!(grid.rows()[0], vec![63, 0, 66, 0, 0]);
    }

    #[test]
    fn test_connected_banner_fits() {
        let row = "{63}{0} Now connected to {0}{65}";
        let grid = encode_text(row, Justify::Center, Align::Top, 1, 22).unwrap();
        assert_eq!(grid.rows()[0][0], 63);
        assert_eq!(grid.rows()[0][21], 65);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            encode_text("~", Justify::Left, Align::Top, 6, 22),
            Err(ComposeError::UnsupportedCharacter('~'))
        ));
        assert!(matches!(
            encode_text("{99}", Justify::Left, Align::Top, 6, 22),
            Err(ComposeError::InvalidCode(_))
        ));
        assert!(matches!(
            encode_text("{12", Justify::Left, Align::Top, 6, 22),
            Err(ComposeError::InvalidCode(_))
        ));
        assert!(matches!(
            encode_text("ABCDEFGHIJKLMNOP", Justify::Left, Align::Top, 3, 15),
            Err(ComposeError::WordTooLong { length: 16, columns: 15 })
        ));
        assert!(matches!(
            encode_text("A\nB\nC\nD", Justify::Left, Align::Top, 3, 15),
            Err(ComposeError::TooManyLines { lines: 4, rows: 3 })
        ));
    }

    #[test]
    fn test_empty_text_is_blank_grid() {
        let grid = encode_text("", Justify::Center, Align::Center, 3, 15).unwrap();
        assert_eq!(grid, CharacterGrid::filled(3, 15, BLANK));
    }
}

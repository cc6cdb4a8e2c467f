use std::fmt;
use serde::{Serialize, Deserialize};
use crate::error::ConfigError;

pub const MAX_PLAYERS: usize = 5;
pub const MIN_WIN_LENGTH: usize = 3;

// scan order for adjacency: up-left, up, up-right, left, right, down-left, down, down-right
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// Player marks, in seat order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol { X, O, D, T, S }

impl Symbol {
    pub const ALL: [Symbol; MAX_PLAYERS] = [Symbol::X, Symbol::O, Symbol::D, Symbol::T, Symbol::S];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_char(self) -> char {
        match self {
            Symbol::X => 'X',
            Symbol::O => 'O',
            Symbol::D => 'D',
            Symbol::T => 'T',
            Symbol::S => 'S',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_char() == c)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

pub type Cell = Option<Symbol>;

/// A run of `len` cells starting at `start`, each `stride` apart in the flat array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    start: usize,
    stride: usize,
    len: usize,
}

impl Line {
    pub fn cells(&self) -> impl Iterator<Item = usize> {
        let (start, stride) = (self.start, self.stride);
        (0..self.len).map(move |i| start + i * stride)
    }

    pub fn indices(&self) -> Vec<usize> {
        self.cells().collect()
    }
}

/// Every window of `win_length` consecutive cells: rows, columns, then both diagonals.
/// Stateless; each call walks the geometry afresh.
pub fn scan_lines(size: usize, win_length: usize) -> impl Iterator<Item = Line> {
    let span = (size + 1).saturating_sub(win_length);
    let len = win_length;
    let rows = (0..size).flat_map(move |row| {
        (0..span).map(move |col| Line { start: row * size + col, stride: 1, len })
    });
    let columns = (0..size).flat_map(move |col| {
        (0..span).map(move |row| Line { start: row * size + col, stride: size, len })
    });
    let diagonals = (0..span).flat_map(move |row| {
        (0..span).map(move |col| Line { start: row * size + col, stride: size + 1, len })
    });
    let anti_diagonals = (0..span).flat_map(move |row| {
        (len.saturating_sub(1)..size).map(move |col| Line { start: row * size + col, stride: size - 1, len })
    });
    rows.chain(columns).chain(diagonals).chain(anti_diagonals)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    win_length: usize,
    cells: Vec<Cell>,
}

impl Board {
    pub fn new(size: usize, win_length: usize) -> Result<Self, ConfigError> {
        Self::from_cells(size, win_length, vec![None; size * size])
    }

    pub fn from_cells(size: usize, win_length: usize, cells: Vec<Cell>) -> Result<Self, ConfigError> {
        if win_length < MIN_WIN_LENGTH {
            return Err(ConfigError::WinLengthTooShort(win_length));
        }
        if size < win_length {
            return Err(ConfigError::BoardTooSmall { size, win_length });
        }
        if cells.len() != size * size {
            return Err(ConfigError::CellCount { expected: size * size, actual: cells.len() });
        }
        Ok(Self { size, win_length, cells })
    }

    /// Builds a square board from text rows; `.` is an empty cell.
    pub fn from_rows(win_length: usize, rows: &[&str]) -> Result<Self, ConfigError> {
        let size = rows.len();
        let cells = rows.iter()
            .flat_map(|row| row.chars().filter(|c| !c.is_whitespace()))
            .map(Symbol::from_char)
            .collect();
        Self::from_cells(size, win_length, cells)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Always `size * size`.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// True while no player has a mark on the board.
    pub fn has_no_marks(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.cells.len()
    }

    pub fn get(&self, index: usize) -> Cell {
        self.cells.get(index).copied().flatten()
    }

    pub(crate) fn set(&mut self, index: usize, cell: Cell) {
        self.cells[index] = cell;
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().enumerate().filter(|(_, c)| c.is_none()).map(|(i, _)| i)
    }

    pub fn lines(&self) -> impl Iterator<Item = Line> {
        scan_lines(self.size, self.win_length)
    }

    /// In-bounds 8-neighbours of `index`, in the fixed scan order.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> {
        let size = self.size as isize;
        let (row, col) = ((index / self.size) as isize, (index % self.size) as isize);
        NEIGHBOR_OFFSETS.into_iter().filter_map(move |(dr, dc)| {
            let (r, c) = (row + dr, col + dc);
            if r >= 0 && r < size && c >= 0 && c < size {
                Some((r * size + c) as usize)
            } else {
                None
            }
        })
    }

    /// First neighbour of `index` holding `symbol`. First match wins, not closest.
    pub fn find_adjacent(&self, index: usize, symbol: Symbol) -> Option<usize> {
        self.neighbors(index).find(|&n| self.get(n) == Some(symbol))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.cells.chunks(self.size) {
            let line: String = row.iter().map(|c| c.map_or('.', Symbol::as_char)).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Wire form of a cell array: `"X"`..`"S"` for marks, `""` (or null) for empty.
pub mod cells_serde {
    use std::fmt;
    use serde::ser::{Serializer, SerializeSeq};
    use serde::de::{self, Deserializer, SeqAccess, Visitor};
    use super::{Cell, Symbol};

    pub fn serialize<S>(cells: &[Cell], serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        let mut seq = serializer.serialize_seq(Some(cells.len()))?;
        for cell in cells {
            match cell {
                Some(symbol) => seq.serialize_element(&symbol.to_string())?,
                None => seq.serialize_element("")?,
            }
        }
        seq.end()
    }

    struct CellsVisitor;
    impl<'de> Visitor<'de> for CellsVisitor {
        type Value = Vec<Cell>;
        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an array of player symbols or empty strings")
        }
        fn visit_seq<A>(self, mut seq: A) -> Result<Vec<Cell>, A::Error> where A: SeqAccess<'de> {
            let mut cells = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(raw) = seq.next_element::<Option<String>>()? {
                let cell = match raw.as_deref() {
                    None | Some("") => None,
                    Some(text) => {
                        let mut chars = text.chars();
                        match (chars.next().and_then(Symbol::from_char), chars.next()) {
                            (Some(symbol), None) => Some(symbol),
                            _ => return Err(de::Error::invalid_value(de::Unexpected::Str(text), &self)),
                        }
                    }
                };
                cells.push(cell);
            }
            Ok(cells)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Cell>, D::Error> where D: Deserializer<'de> {
        deserializer.deserialize_seq(CellsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_six_by_six() {
        // rows and columns: 6 * 3 each, diagonals: 3 * 3 each
        assert_eq!(scan_lines(6, 4).count(), 18 + 18 + 9 + 9);
    }

    #[test]
    fn test_lines_have_win_length_and_stay_in_bounds() {
        for line in scan_lines(7, 4) {
            let cells = line.indices();
            assert_eq!(cells.len(), 4);
            assert!(cells.iter().all(|&i| i < 49));
        }
    }

    #[test]
    fn test_anti_diagonal_does_not_wrap() {
        let lines: Vec<Vec<usize>> = scan_lines(4, 4).map(|l| l.indices()).collect();
        assert!(lines.contains(&vec![3, 6, 9, 12]));
        assert!(lines.contains(&vec![0, 5, 10, 15]));
        assert_eq!(lines.len(), 4 + 4 + 1 + 1);
    }

    #[test]
    fn test_scan_is_restartable() {
        let first: Vec<Line> = scan_lines(5, 3).collect();
        let second: Vec<Line> = scan_lines(5, 3).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_neighbor_order() {
        let board = Board::new(3, 3).unwrap();
        let around_center: Vec<usize> = board.neighbors(4).collect();
        assert_eq!(around_center, vec![0, 1, 2, 3, 5, 6, 7, 8]);
        let around_corner: Vec<usize> = board.neighbors(0).collect();
        assert_eq!(around_corner, vec![1, 3, 4]);
    }

    #[test]
    fn test_find_adjacent_first_match() {
        let board = Board::from_rows(3, &[
            "..X",
            "X..",
            "...",
        ]).unwrap();
        // up-right (2) is scanned before left (3)
        assert_eq!(board.find_adjacent(4, Symbol::X), Some(2));
        assert_eq!(board.find_adjacent(8, Symbol::X), None);
    }

    #[test]
    fn test_mark_presence_is_separate_from_cell_count() {
        let mut board = Board::new(4, 4).unwrap();
        assert!(board.has_no_marks());
        assert_eq!(board.cell_count(), 16);
        board.set(5, Some(Symbol::D));
        assert!(!board.has_no_marks());
        assert_eq!(board.cell_count(), 16);
    }

    #[test]
    fn test_is_full() {
        let mut board = Board::from_rows(3, &["XOX", "OXO", "OX."]).unwrap();
        assert!(!board.is_full());
        board.set(8, Some(Symbol::O));
        assert!(board.is_full());
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert_eq!(Board::new(3, 4), Err(ConfigError::BoardTooSmall { size: 3, win_length: 4 }));
        assert_eq!(Board::new(6, 2), Err(ConfigError::WinLengthTooShort(2)));
        assert_eq!(
            Board::from_cells(3, 3, vec![None; 8]),
            Err(ConfigError::CellCount { expected: 9, actual: 8 })
        );
    }

    #[test]
    fn test_cells_wire_format() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper(#[serde(with = "cells_serde")] Vec<Cell>);

        let cells = vec![Some(Symbol::X), None, Some(Symbol::T)];
        let json = serde_json::to_string(&Wrapper(cells.clone())).unwrap();
        assert_eq!(json, r#"["X","","T"]"#);

        let parsed: Wrapper = serde_json::from_str(r#"["X", null, "T"]"#).unwrap();
        assert_eq!(parsed.0, cells);
        assert!(serde_json::from_str::<Wrapper>(r#"["Q"]"#).is_err());
    }
}

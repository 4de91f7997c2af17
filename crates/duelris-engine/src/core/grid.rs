use std::fmt::{self, Write as _};

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::{
    GRID_HEIGHT, GRID_WIDTH,
    piece::{Piece, PieceKind},
};

/// A single playfield cell.
///
/// Locked pieces and garbage behave identically for collision and line
/// clearing; the distinction only matters for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    /// Row received from the opponent.
    Garbage,
    /// Cell of a locked piece.
    Piece(PieceKind),
}

impl Cell {
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Garbage => '#',
            Cell::Piece(kind) => kind.as_char(),
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Cell::Empty),
            '#' => Some(Cell::Garbage),
            _ => match PieceKind::from_char(c) {
                Some(kind) => Some(Cell::Piece(kind)),
                None => None,
            },
        }
    }
}

pub type Row = [Cell; GRID_WIDTH];

/// Row indices of complete rows, top to bottom.
pub type FullRows = ArrayVec<usize, GRID_HEIGHT>;

/// The 10×20 playfield.
///
/// `Grid` is a fixed-size `Copy` value so that speculative placements (line
/// clear animations, AI search) work on stack copies without allocating.
/// Row 0 is the top visible row. Cells above it are never stored: piece
/// cells with a negative row only exist while a piece is falling.
///
/// [`Grid::is_colliding`] is the single collision predicate of the engine.
///
/// # Example
///
/// ```
/// use duelris_engine::{Grid, Piece, PieceKind};
///
/// let grid = Grid::EMPTY;
/// let piece = Piece::spawn(PieceKind::I, 0);
/// let (after, cleared) = grid.simulate_placement(piece).unwrap();
/// assert_eq!(cleared, 0);
/// assert_eq!(after.column_height(5), 1);
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    rows: [Row; GRID_HEIGHT],
}

impl Default for Grid {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {{")?;
        for row in &self.rows {
            f.write_str("    ")?;
            for cell in row {
                f.write_char(cell.as_char())?;
            }
            f.write_char('\n')?;
        }
        f.write_char('}')
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows.iter().enumerate() {
            if y > 0 {
                f.write_char('\n')?;
            }
            for cell in row {
                f.write_char(cell.as_char())?;
            }
        }
        Ok(())
    }
}

impl Serialize for Grid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: "..........,....I.....,..." (one 10-char row per entry, top first)
        let mut s = String::with_capacity(GRID_HEIGHT * (GRID_WIDTH + 1));
        for (y, row) in self.rows.iter().enumerate() {
            if y > 0 {
                s.push(',');
            }
            s.extend(row.iter().map(|cell| cell.as_char()));
        }
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for Grid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;

        let s = String::deserialize(deserializer)?;
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != GRID_HEIGHT {
            return Err(D::Error::custom(format!(
                "expected {GRID_HEIGHT} comma-separated rows, got {}",
                parts.len()
            )));
        }

        let mut grid = Grid::EMPTY;
        for (y, part) in parts.iter().enumerate() {
            if part.chars().count() != GRID_WIDTH {
                return Err(D::Error::custom(format!(
                    "row {y} must have {GRID_WIDTH} cells, got '{part}'"
                )));
            }
            for (x, c) in part.chars().enumerate() {
                grid.rows[y][x] = Cell::from_char(c)
                    .ok_or_else(|| D::Error::custom(format!("invalid cell '{c}' at row {y}")))?;
            }
        }
        Ok(grid)
    }
}

impl Grid {
    pub const WIDTH: usize = GRID_WIDTH;
    pub const HEIGHT: usize = GRID_HEIGHT;

    pub const EMPTY: Self = Self {
        rows: [[Cell::Empty; GRID_WIDTH]; GRID_HEIGHT],
    };

    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.rows[y][x]
    }

    #[must_use]
    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        !self.rows[y][x].is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Sets a single cell. Intended for fixtures and replicated state.
    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        self.rows[y][x] = cell;
    }

    /// Returns `true` if any cell of `piece` lies outside the playfield
    /// horizontally, at or below the bottom, or on an occupied cell.
    ///
    /// Cells above row 0 are out of the stored grid and never collide with
    /// anything but the side walls.
    #[must_use]
    pub fn is_colliding(&self, piece: Piece) -> bool {
        piece.cells().any(|(x, y)| {
            let Ok(x) = usize::try_from(x) else {
                return true;
            };
            if x >= GRID_WIDTH {
                return true;
            }
            match usize::try_from(y) {
                Ok(y) => y >= GRID_HEIGHT || self.is_occupied(x, y),
                Err(_) => false,
            }
        })
    }

    /// Writes the cells of `piece` into the grid.
    ///
    /// Cells above row 0 are silently dropped.
    pub fn fill_piece(&mut self, piece: Piece) {
        for (x, y) in piece.cells() {
            let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
                continue;
            };
            if x < GRID_WIDTH && y < GRID_HEIGHT {
                self.rows[y][x] = Cell::Piece(piece.kind());
            }
        }
    }

    /// Returns the lowest position `piece` reaches by falling straight down.
    #[must_use]
    pub fn drop_position(&self, piece: Piece) -> Piece {
        let mut dropped = piece;
        while !self.is_colliding(dropped.moved(0, 1)) {
            dropped = dropped.moved(0, 1);
        }
        dropped
    }

    /// Returns the indices of complete rows in one pass, top to bottom.
    #[must_use]
    pub fn full_rows(&self) -> FullRows {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|cell| !cell.is_empty()))
            .map(|(y, _)| y)
            .collect()
    }

    /// Removes complete rows and returns how many were removed.
    ///
    /// Rows above each removed row shift down; empty rows enter at the top.
    /// This is the only line-clear routine: live locks and speculative
    /// placements both go through it.
    pub fn clear_lines(&mut self) -> usize {
        let mut count = 0;
        for y in (0..GRID_HEIGHT).rev() {
            if self.rows[y].iter().all(|cell| !cell.is_empty()) {
                count += 1;
                continue;
            }
            if count > 0 {
                self.rows[y + count] = self.rows[y];
            }
        }
        self.rows[..count].fill([Cell::Empty; GRID_WIDTH]);
        count
    }

    /// Drops a copy of `piece` straight down, locks it into a copy of the
    /// grid and clears complete rows.
    ///
    /// Returns `None` if `piece` already collides where it starts. The grid
    /// itself is never modified.
    #[must_use]
    pub fn simulate_placement(&self, piece: Piece) -> Option<(Grid, usize)> {
        if self.is_colliding(piece) {
            return None;
        }
        let mut grid = *self;
        grid.fill_piece(self.drop_position(piece));
        let cleared = grid.clear_lines();
        Some((grid, cleared))
    }

    /// Pushes garbage rows in from the bottom, one per entry of `holes`.
    ///
    /// The same number of rows is discarded from the top, so the row count
    /// never changes. Each garbage row is fully occupied except the column
    /// given by its hole.
    pub fn push_garbage(&mut self, holes: &[usize]) {
        let n = holes.len().min(GRID_HEIGHT);
        if n == 0 {
            return;
        }
        self.rows.copy_within(n.., 0);
        for (row, &hole) in self.rows[GRID_HEIGHT - n..].iter_mut().zip(holes) {
            *row = [Cell::Garbage; GRID_WIDTH];
            row[hole % GRID_WIDTH] = Cell::Empty;
        }
    }

    /// Height of column `x`: rows from the bottom up to and including its
    /// topmost occupied cell.
    #[must_use]
    pub fn column_height(&self, x: usize) -> usize {
        self.rows
            .iter()
            .position(|row| !row[x].is_empty())
            .map_or(0, |top| GRID_HEIGHT - top)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().flatten().all(|cell| cell.is_empty())
    }

    /// Creates a grid from ASCII art.
    ///
    /// Each line is one row of 10 cells: `.` is empty, `#` is garbage and a
    /// piece letter is a locked cell of that kind. Lines are aligned to the
    /// bottom of the grid, so a fixture only needs to spell out its top-most
    /// non-empty row and everything below it. Blank lines are ignored.
    ///
    /// # Panics
    ///
    /// Panics on malformed art; intended for tests and fixtures.
    #[must_use]
    pub fn from_ascii(art: &str) -> Self {
        let lines: Vec<&str> = art
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        assert!(
            lines.len() <= GRID_HEIGHT,
            "at most {GRID_HEIGHT} rows, got {}",
            lines.len()
        );

        let mut grid = Self::EMPTY;
        let top = GRID_HEIGHT - lines.len();
        for (i, line) in lines.iter().enumerate() {
            let cells: Vec<Cell> = line
                .chars()
                .map(|c| Cell::from_char(c).unwrap_or_else(|| panic!("invalid cell '{c}'")))
                .collect();
            assert_eq!(
                cells.len(),
                GRID_WIDTH,
                "Each row must have exactly {GRID_WIDTH} cells, got {} at row {i}",
                cells.len()
            );
            grid.rows[top + i].copy_from_slice(&cells);
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walls_and_floor_collide() {
        let grid = Grid::EMPTY;
        // I lying on row 1 of its box
        assert!(!grid.is_colliding(Piece::new(PieceKind::I, 0, 0, 0)));
        assert!(grid.is_colliding(Piece::new(PieceKind::I, 0, -1, 0)));
        assert!(!grid.is_colliding(Piece::new(PieceKind::I, 0, 6, 0)));
        assert!(grid.is_colliding(Piece::new(PieceKind::I, 0, 7, 0)));
        assert!(!grid.is_colliding(Piece::new(PieceKind::I, 0, 0, 18)));
        assert!(grid.is_colliding(Piece::new(PieceKind::I, 0, 0, 19)));
    }

    #[test]
    fn cells_above_top_only_hit_walls() {
        let grid = Grid::from_ascii(&"##########\n".repeat(GRID_HEIGHT));
        // Vertical I entirely above the grid
        assert!(!grid.is_colliding(Piece::new(PieceKind::I, 1, 0, -4)));
        // One cell reaches row 0
        assert!(grid.is_colliding(Piece::new(PieceKind::I, 1, 0, -3)));
        // Side wall still applies above the grid
        assert!(grid.is_colliding(Piece::new(PieceKind::I, 1, 8, -4)));
    }

    #[test]
    fn fill_piece_drops_hidden_cells() {
        let mut grid = Grid::EMPTY;
        grid.fill_piece(Piece::new(PieceKind::I, 1, 0, -2));
        assert_eq!(grid.column_height(2), GRID_HEIGHT);
        assert!(grid.is_occupied(2, 0));
        assert!(grid.is_occupied(2, 1));
        assert!(!grid.is_occupied(2, 2));
    }

    #[test]
    fn clear_lines_shifts_rows_down() {
        let mut grid = Grid::from_ascii(
            r"
            ..T.......
            IIIIIIIIII
            .O........
            ##########
            ",
        );
        assert_eq!(grid.full_rows().as_slice(), &[17, 19]);
        assert_eq!(grid.clear_lines(), 2);
        assert_eq!(
            grid,
            Grid::from_ascii(
                r"
                ..T.......
                .O........
                "
            )
        );
    }

    #[test]
    fn clear_lines_without_full_rows_is_noop() {
        let mut grid = Grid::from_ascii("#########.\n");
        let before = grid;
        assert_eq!(grid.clear_lines(), 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn simulate_placement_does_not_mutate() {
        let grid = Grid::from_ascii(
            r"
            ######.###
            ######.###
            ######.###
            ######.###
            ",
        );
        let piece = Piece::new(PieceKind::I, 1, 4, 0);
        let first = grid.simulate_placement(piece).unwrap();
        let second = grid.simulate_placement(piece).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.1, 4);
        assert!(first.0.is_empty());
        assert_eq!(grid.full_rows().len(), 0);
    }

    #[test]
    fn simulate_placement_rejects_colliding_start() {
        let grid = Grid::from_ascii(&"#########.\n".repeat(GRID_HEIGHT));
        assert!(grid.simulate_placement(Piece::spawn(PieceKind::T, 0)).is_none());
    }

    #[test]
    fn push_garbage_preserves_row_count() {
        let mut grid = Grid::from_ascii(
            r"
            ..T.......
            .TTT......
            ",
        );
        grid.push_garbage(&[0, 9]);
        assert_eq!(
            grid,
            Grid::from_ascii(
                r"
                ..T.......
                .TTT......
                .#########
                #########.
                "
            )
        );
        assert_eq!(grid.rows().count(), GRID_HEIGHT);
    }

    #[test]
    fn push_garbage_discards_top_rows() {
        let mut grid = Grid::from_ascii(&"O.........\n".repeat(GRID_HEIGHT));
        grid.push_garbage(&[3; GRID_HEIGHT + 5]);
        for row in grid.rows() {
            assert_eq!(row.iter().filter(|c| c.is_empty()).count(), 1);
            assert!(row[3].is_empty());
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let grid = Grid::from_ascii(
            r"
            ....Z.....
            #.#ZZ.LLL#
            ",
        );
        let serialized = serde_json::to_string(&grid).unwrap();
        assert!(serialized.ends_with(",....Z.....,#.#ZZ.LLL#\""));
        let deserialized: Grid = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, grid);

        assert!(serde_json::from_str::<Grid>("\"..........\"").is_err());
    }
}

//! Board grid: square matrix of candy cells with bounds-checked access.

use rand::Rng;
use thiserror::Error;

/// Candy type index in `0..token_types`.
pub type Token = u8;

/// Single cell: a candy, or empty while a settle cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Filled(Token),
    Empty,
}

impl Cell {
    #[inline]
    pub fn token(self) -> Option<Token> {
        match self {
            Self::Filled(t) => Some(t),
            Self::Empty => None,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// Grid coordinate. Row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// 4-directional neighbours only (Manhattan distance exactly 1).
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }
}

impl From<(usize, usize)> for Pos {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({row}, {col}) is outside a {size}x{size} grid")]
    OutOfBounds { row: usize, col: usize, size: usize },
    #[error("grid rows must form a non-empty square (got {rows} rows, row {bad_row} has {len} cells)")]
    NotSquare {
        rows: usize,
        bad_row: usize,
        len: usize,
    },
    #[error("token {token} is not below the token type count {token_types}")]
    TokenOutOfRange { token: Token, token_types: u8 },
}

/// Square board of `size x size` cells, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    token_types: u8,
    cells: Vec<Cell>,
}

impl Grid {
    /// Fill a fresh board with independent uniform tokens. Matches may already exist.
    ///
    /// # Panics
    ///
    /// Panics if `size` or `token_types` is zero.
    pub fn create<R: Rng + ?Sized>(size: usize, token_types: u8, rng: &mut R) -> Self {
        assert!(size > 0, "grid size must be at least 1");
        assert!(token_types > 0, "grid needs at least one token type");
        let cells = (0..size * size)
            .map(|_| Cell::Filled(random_token(rng, token_types)))
            .collect();
        Self {
            size,
            token_types,
            cells,
        }
    }

    /// Build from explicit token rows, e.g. `[[1, 1, 1], [2, 0, 2], [0, 2, 0]]`.
    #[allow(dead_code)]
    pub fn from_rows<R: AsRef<[Token]>>(rows: &[R], token_types: u8) -> Result<Self, GridError> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != size || size == 0 {
                return Err(GridError::NotSquare {
                    rows: size,
                    bad_row: i,
                    len: row.len(),
                });
            }
            for &token in row {
                if token >= token_types {
                    return Err(GridError::TokenOutOfRange { token, token_types });
                }
                cells.push(Cell::Filled(token));
            }
        }
        if size == 0 {
            return Err(GridError::NotSquare {
                rows: 0,
                bad_row: 0,
                len: 0,
            });
        }
        Ok(Self {
            size,
            token_types,
            cells,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn token_types(&self) -> u8 {
        self.token_types
    }

    #[inline]
    fn index(&self, pos: Pos) -> Result<usize, GridError> {
        if pos.row >= self.size || pos.col >= self.size {
            return Err(GridError::OutOfBounds {
                row: pos.row,
                col: pos.col,
                size: self.size,
            });
        }
        Ok(pos.row * self.size + pos.col)
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    pub fn get(&self, pos: Pos) -> Result<Cell, GridError> {
        self.index(pos).map(|i| self.cells[i])
    }

    pub fn set(&mut self, pos: Pos, cell: Cell) -> Result<(), GridError> {
        let i = self.index(pos)?;
        self.cells[i] = cell;
        Ok(())
    }

    /// In-grid cell for engine loops over `0..size`. Out-of-grid positions panic.
    #[inline]
    pub(crate) fn cell(&self, pos: Pos) -> Cell {
        assert!(self.contains(pos), "{pos:?} outside a {0}x{0} grid", self.size);
        self.cells[pos.row * self.size + pos.col]
    }

    #[inline]
    pub(crate) fn cell_mut(&mut self, pos: Pos) -> &mut Cell {
        assert!(self.contains(pos), "{pos:?} outside a {0}x{0} grid", self.size);
        &mut self.cells[pos.row * self.size + pos.col]
    }

    /// Exchange two cells. Both positions are checked before anything moves.
    pub fn swap(&mut self, a: Pos, b: Pos) -> Result<(), GridError> {
        let ia = self.index(a)?;
        let ib = self.index(b)?;
        self.cells.swap(ia, ib);
        Ok(())
    }

    /// Row slices, top to bottom. Used by the renderer.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size)
    }

    /// True when no cell is empty.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    /// Tokens as rows; `None` for empty cells.
    #[cfg(test)]
    pub fn to_rows(&self) -> Vec<Vec<Option<Token>>> {
        self.rows()
            .map(|row| row.iter().map(|c| c.token()).collect())
            .collect()
    }
}

#[inline]
pub(crate) fn random_token<R: Rng + ?Sized>(rng: &mut R, token_types: u8) -> Token {
    rng.random_range(0..token_types)
}

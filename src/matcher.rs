//! Match detection: horizontal and vertical windows of three equal candies.

use crate::grid::{Cell, Grid, Pos};
use std::collections::BTreeSet;

/// Unique matched coordinates. Overlapping runs collapse to one entry per cell.
pub type MatchSet = BTreeSet<Pos>;

#[inline]
fn same_three(a: Cell, b: Cell, c: Cell) -> bool {
    match (a, b, c) {
        (Cell::Filled(x), Cell::Filled(y), Cell::Filled(z)) => x == y && y == z,
        _ => false,
    }
}

/// Scan every 3-window in every row and column. Runs of 4 or 5 are the union of
/// their overlapping windows. Empty cells never match.
pub fn find_matches(grid: &Grid) -> MatchSet {
    let n = grid.size();
    let mut matches = MatchSet::new();
    if n < 3 {
        return matches;
    }
    let rows: Vec<&[Cell]> = grid.rows().collect();

    for (r, row) in rows.iter().enumerate() {
        for c in 0..=n - 3 {
            if same_three(row[c], row[c + 1], row[c + 2]) {
                matches.extend([Pos::new(r, c), Pos::new(r, c + 1), Pos::new(r, c + 2)]);
            }
        }
    }

    for c in 0..n {
        for r in 0..=n - 3 {
            if same_three(rows[r][c], rows[r + 1][c], rows[r + 2][c]) {
                matches.extend([Pos::new(r, c), Pos::new(r + 1, c), Pos::new(r + 2, c)]);
            }
        }
    }

    matches
}

/// Same rule as [`find_matches`], stopping at the first window found.
pub fn has_match(grid: &Grid) -> bool {
    let n = grid.size();
    if n < 3 {
        return false;
    }
    let rows: Vec<&[Cell]> = grid.rows().collect();
    let horizontal = rows
        .iter()
        .any(|row| row.windows(3).any(|w| same_three(w[0], w[1], w[2])));
    horizontal
        || (0..n).any(|c| (0..=n - 3).any(|r| same_three(rows[r][c], rows[r + 1][c], rows[r + 2][c])))
}

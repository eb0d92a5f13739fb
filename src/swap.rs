//! Swap validation: exchange two candies, keep the swap only if it makes a match.

use crate::grid::{Grid, GridError, Pos};
use crate::matcher::{MatchSet, find_matches};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Swap kept; the matches it produced are left on the board for the cascade.
    Accepted(MatchSet),
    /// No match; the swap was undone.
    Reverted,
}

/// Swap `a` and `b`, then check for matches; swap back if there are none.
/// Adjacency is the caller's job.
pub fn try_swap(grid: &mut Grid, a: Pos, b: Pos) -> Result<SwapOutcome, GridError> {
    grid.swap(a, b)?;
    let matches = find_matches(grid);
    if matches.is_empty() {
        grid.swap(a, b)?;
        return Ok(SwapOutcome::Reverted);
    }
    Ok(SwapOutcome::Accepted(matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::has_match;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_swap_that_matches_is_kept() {
        // Swapping (1,2) up into (0,2) completes the top row.
        let mut grid = Grid::from_rows(&[[1, 1, 0], [2, 0, 1], [0, 2, 2]], 3).unwrap();
        let outcome = try_swap(&mut grid, Pos::new(0, 2), Pos::new(1, 2)).unwrap();
        let SwapOutcome::Accepted(m) = outcome else {
            panic!("expected accepted swap");
        };
        assert_eq!(m.len(), 3);
        assert_eq!(grid.to_rows()[0], vec![Some(1), Some(1), Some(1)]);
    }

    #[test]
    fn test_swap_without_match_is_reverted() {
        let mut grid = Grid::from_rows(&[[0, 0, 1], [2, 1, 1], [2, 2, 0]], 3).unwrap();
        let before = grid.clone();
        assert_eq!(
            try_swap(&mut grid, Pos::new(0, 0), Pos::new(0, 1)).unwrap(),
            SwapOutcome::Reverted
        );
        assert_eq!(grid, before);
    }

    #[test]
    fn test_out_of_bounds_swap_fails_without_mutation() {
        let mut grid = Grid::from_rows(&[[0, 0, 1], [2, 1, 1], [2, 2, 0]], 3).unwrap();
        let before = grid.clone();
        assert!(matches!(
            try_swap(&mut grid, Pos::new(2, 2), Pos::new(2, 3)),
            Err(GridError::OutOfBounds { col: 3, .. })
        ));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_rejected_swaps_are_reversible_everywhere() {
        let mut rng = SmallRng::seed_from_u64(31);
        for _ in 0..50 {
            let mut grid = Grid::create(6, 5, &mut rng);
            crate::collapse::settle(&mut grid, &mut rng, 10, usize::MAX);
            for row in 0..6 {
                for col in 0..6 {
                    let a = Pos::new(row, col);
                    for b in [Pos::new(row, col + 1), Pos::new(row + 1, col)] {
                        if !grid.contains(b) {
                            continue;
                        }
                        let before = grid.clone();
                        let outcome = try_swap(&mut grid, a, b).unwrap();
                        if matches!(outcome, SwapOutcome::Accepted(_)) {
                            assert!(has_match(&grid));
                            grid = before;
                        } else {
                            assert_eq!(grid, before);
                        }
                    }
                }
            }
        }
    }
}

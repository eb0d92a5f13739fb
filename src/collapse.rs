//! Collapse engine: clear matches, score them, drop survivors, refill from the top.
//!
//! A settle cycle is detect → score → clear → gravity → refill. Refills can create
//! new matches, so [`Cascade`] keeps running cycles until the board is stable or
//! the per-turn cycle cap is reached.

use crate::grid::{Cell, Grid, Pos, random_token};
use crate::matcher::{MatchSet, find_matches, has_match};
use rand::Rng;
use tracing::warn;

/// Points per cleared cell unless configured otherwise.
pub const DEFAULT_SCORE_WEIGHT: u64 = 10;

/// Result of one settle cycle that changed the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Cells that matched and were cleared (pre-gravity coordinates).
    pub cleared: MatchSet,
    pub points: u64,
    /// Cells that received a fresh candy (post-gravity coordinates).
    pub refilled: Vec<Pos>,
}

/// Set every matched cell to empty.
pub fn clear_cells(grid: &mut Grid, cells: &MatchSet) {
    for &pos in cells {
        *grid.cell_mut(pos) = Cell::Empty;
    }
}

/// Per column, move filled cells to the bottom keeping their order; empties end on top.
pub fn apply_gravity(grid: &mut Grid) {
    let n = grid.size();
    for col in 0..n {
        let mut write = n;
        for row in (0..n).rev() {
            let pos = Pos::new(row, col);
            let cell = grid.cell(pos);
            if let Cell::Filled(_) = cell {
                write -= 1;
                if write != row {
                    *grid.cell_mut(Pos::new(write, col)) = cell;
                    *grid.cell_mut(pos) = Cell::Empty;
                }
            }
        }
    }
}

/// Give every empty cell an independent random candy. Returns the cells filled.
pub fn refill<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R) -> Vec<Pos> {
    let n = grid.size();
    let types = grid.token_types();
    let mut filled = Vec::new();
    for row in 0..n {
        for col in 0..n {
            let pos = Pos::new(row, col);
            let cell = grid.cell_mut(pos);
            if cell.is_empty() {
                *cell = Cell::Filled(random_token(rng, types));
                filled.push(pos);
            }
        }
    }
    filled
}

/// One settle cycle. `None` means no match was found and nothing changed.
pub fn settle_cycle<R: Rng + ?Sized>(
    grid: &mut Grid,
    rng: &mut R,
    weight: u64,
) -> Option<CycleReport> {
    let cleared = find_matches(grid);
    if cleared.is_empty() {
        return None;
    }
    let points = weight.saturating_mul(cleared.len() as u64);
    clear_cells(grid, &cleared);
    apply_gravity(grid);
    let refilled = refill(grid, rng);
    Some(CycleReport {
        cleared,
        points,
        refilled,
    })
}

/// Default cycle cap for one cascade: `size² × token_types`.
pub fn default_cycle_cap(size: usize, token_types: u8) -> usize {
    (size * size * token_types as usize).max(1)
}

/// Outcome of asking a cascade for its next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeStep {
    Changed(CycleReport),
    Stable,
    /// Cycle cap reached with matches possibly still on the board.
    Capped,
}

/// Drives settle cycles for a single turn and enforces the cycle cap.
#[derive(Debug, Clone)]
pub struct Cascade {
    cap: usize,
    cycles: usize,
    points: u64,
    weight: u64,
}

impl Cascade {
    pub fn new(cap: usize, weight: u64) -> Self {
        Self {
            cap,
            cycles: 0,
            points: 0,
            weight,
        }
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn step<R: Rng + ?Sized>(&mut self, grid: &mut Grid, rng: &mut R) -> CascadeStep {
        if self.cycles >= self.cap {
            // Finishing exactly on the cap is a normal settle.
            if !has_match(grid) {
                return CascadeStep::Stable;
            }
            warn!(
                cap = self.cap,
                points = self.points,
                "cascade cycle cap reached; board may still hold matches"
            );
            return CascadeStep::Capped;
        }
        match settle_cycle(grid, rng, self.weight) {
            Some(report) => {
                self.cycles += 1;
                self.points = self.points.saturating_add(report.points);
                CascadeStep::Changed(report)
            }
            None => CascadeStep::Stable,
        }
    }
}

/// Totals for a cascade run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettleSummary {
    pub cycles: usize,
    pub points: u64,
    pub capped: bool,
}

/// Run cycles until stable (or capped) without pacing.
pub fn settle<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R, weight: u64, cap: usize) -> SettleSummary {
    let mut cascade = Cascade::new(cap, weight);
    loop {
        match cascade.step(grid, rng) {
            CascadeStep::Changed(_) => continue,
            step => {
                return SettleSummary {
                    cycles: cascade.cycles(),
                    points: cascade.points(),
                    capped: step == CascadeStep::Capped,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn column(grid: &Grid, col: usize) -> Vec<Cell> {
        (0..grid.size())
            .map(|row| grid.get(Pos::new(row, col)).unwrap())
            .collect()
    }

    #[test]
    fn test_no_match_means_no_change() {
        let mut grid = Grid::from_rows(&[[0, 0, 1], [2, 1, 1], [2, 2, 0]], 3).unwrap();
        let before = grid.clone();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(settle_cycle(&mut grid, &mut rng, DEFAULT_SCORE_WEIGHT), None);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_top_row_cycle_scores_thirty_and_refills_top() {
        let mut grid = Grid::from_rows(&[[1, 1, 1], [2, 0, 2], [0, 2, 0]], 3).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        let report = settle_cycle(&mut grid, &mut rng, DEFAULT_SCORE_WEIGHT).unwrap();
        assert_eq!(report.points, 30);
        assert_eq!(report.cleared.len(), 3);
        assert_eq!(
            report.refilled,
            vec![Pos::new(0, 0), Pos::new(0, 1), Pos::new(0, 2)]
        );
        // Nothing sat above the cleared row, so the lower rows stay put.
        assert_eq!(grid.to_rows()[1], vec![Some(2), Some(0), Some(2)]);
        assert_eq!(grid.to_rows()[2], vec![Some(0), Some(2), Some(0)]);
        assert!(grid.is_full());
    }

    #[test]
    fn test_gravity_preserves_order_and_floats_empties() {
        let mut grid = Grid::from_rows(
            &[[0, 1, 2, 3], [1, 2, 3, 0], [2, 3, 0, 1], [3, 0, 1, 2]],
            4,
        )
        .unwrap();
        grid.set(Pos::new(1, 0), Cell::Empty).unwrap();
        grid.set(Pos::new(3, 0), Cell::Empty).unwrap();
        grid.set(Pos::new(2, 2), Cell::Empty).unwrap();
        apply_gravity(&mut grid);
        assert_eq!(
            column(&grid, 0),
            vec![Cell::Empty, Cell::Empty, Cell::Filled(0), Cell::Filled(2)]
        );
        assert_eq!(
            column(&grid, 2),
            vec![Cell::Empty, Cell::Filled(2), Cell::Filled(3), Cell::Filled(1)]
        );
        assert_eq!(
            column(&grid, 1),
            vec![Cell::Filled(1), Cell::Filled(2), Cell::Filled(3), Cell::Filled(0)]
        );
    }

    #[test]
    fn test_gravity_invariant_on_random_boards() {
        let mut rng = SmallRng::seed_from_u64(77);
        for _ in 0..100 {
            let mut grid = Grid::create(7, 5, &mut rng);
            let cleared = find_matches(&grid);
            let survivors: Vec<Vec<Cell>> = (0..7)
                .map(|c| {
                    column(&grid, c)
                        .into_iter()
                        .enumerate()
                        .filter(|(r, _)| !cleared.contains(&Pos::new(*r, c)))
                        .map(|(_, cell)| cell)
                        .collect()
                })
                .collect();
            clear_cells(&mut grid, &cleared);
            apply_gravity(&mut grid);
            for (c, expected) in survivors.iter().enumerate() {
                let col = column(&grid, c);
                let empties = 7 - expected.len();
                assert!(col[..empties].iter().all(|cell| cell.is_empty()));
                assert_eq!(&col[empties..], expected.as_slice());
            }
        }
    }

    #[test]
    fn test_score_is_weight_times_unique_cells() {
        let mut grid = Grid::from_rows(
            &[[0, 2, 0, 1], [2, 2, 2, 0], [1, 2, 1, 0], [0, 1, 0, 1]],
            3,
        )
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        let report = settle_cycle(&mut grid, &mut rng, DEFAULT_SCORE_WEIGHT).unwrap();
        assert_eq!(report.cleared.len(), 5);
        assert_eq!(report.points, 50);
    }

    #[test]
    fn test_settle_leaves_full_match_free_boards() {
        for seed in 0..200 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut grid = Grid::create(8, 6, &mut rng);
            let summary = settle(&mut grid, &mut rng, DEFAULT_SCORE_WEIGHT, default_cycle_cap(8, 6));
            assert!(!summary.capped);
            assert!(grid.is_full());
            assert!(!has_match(&grid));
            assert!(
                grid.rows()
                    .flatten()
                    .all(|c| c.token().is_some_and(|t| t < 6))
            );
        }
    }

    #[test]
    fn test_settle_points_match_cycle_sum() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut grid = Grid::create(8, 4, &mut rng);
        let mut expected = 0;
        let mut check = grid.clone();
        let mut check_rng = rng.clone();
        while let Some(report) = settle_cycle(&mut check, &mut check_rng, 10) {
            assert_eq!(report.points, 10 * report.cleared.len() as u64);
            expected += report.points;
        }
        let summary = settle(&mut grid, &mut rng, 10, usize::MAX);
        assert_eq!(summary.points, expected);
        assert_eq!(grid, check);
    }

    #[test]
    fn test_cap_is_reported_not_swallowed() {
        // A single token type refills into matches forever.
        let mut grid = Grid::from_rows(&[[0, 0, 0], [0, 0, 0], [0, 0, 0]], 1).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        let summary = settle(&mut grid, &mut rng, 10, 4);
        assert!(summary.capped);
        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.points, 4 * 90);
        assert!(grid.is_full());
    }

    #[test]
    fn test_settling_exactly_on_the_cap_is_not_capped() {
        for seed in 0..50 {
            let start = Grid::from_rows(&[[1, 1, 1], [2, 0, 2], [0, 2, 0]], 3).unwrap();
            let mut trial = start.clone();
            let needed = settle(
                &mut trial,
                &mut SmallRng::seed_from_u64(seed),
                10,
                usize::MAX,
            )
            .cycles;

            let mut grid = start;
            let summary = settle(&mut grid, &mut SmallRng::seed_from_u64(seed), 10, needed);
            assert_eq!(summary.cycles, needed);
            assert!(!summary.capped, "seed {seed}: settled in {needed} cycles");
            assert!(!has_match(&grid));
        }
    }

    #[test]
    fn test_cascade_step_at_cap_on_stable_board_is_stable() {
        let mut grid = Grid::from_rows(&[[0, 0, 1], [2, 1, 1], [2, 2, 0]], 3).unwrap();
        let mut cascade = Cascade::new(0, 10);
        let step = cascade.step(&mut grid, &mut SmallRng::seed_from_u64(2));
        assert_eq!(step, CascadeStep::Stable);
    }

    #[test]
    fn test_default_cycle_cap() {
        assert_eq!(default_cycle_cap(8, 6), 384);
        assert_eq!(default_cycle_cap(0, 6), 1);
    }
}

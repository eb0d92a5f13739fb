//! Game state: board, score, selection and the turn sequence.

use crate::GameConfig;
use crate::collapse::{self, Cascade, CascadeStep, SettleSummary};
use crate::grid::{Grid, GridError, Pos};
use crate::matcher::has_match;
use crate::swap::{SwapOutcome, try_swap};
use rand::rngs::SmallRng;
use tracing::{debug, info};

/// Pointer selection: nothing held, or one cell waiting for its swap partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Pending(Pos),
}

/// What happened to a swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Cells are not 4-directional neighbours; never reaches the validator.
    NotAdjacent,
    /// Adjacent, but no match formed; board unchanged.
    Rejected,
    /// Swap kept; a cascade is now running.
    Accepted,
    /// A cascade is still running; input is not accepted.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub moves: u32,
    pub rejected: u32,
    /// Cycles in the current or most recent cascade.
    pub chain: usize,
    pub best_chain: usize,
    pub last_cascade_points: u64,
}

#[derive(Debug)]
pub struct GameState {
    grid: Grid,
    score: u64,
    rng: SmallRng,
    selection: Selection,
    cascade: Option<Cascade>,
    stats: Stats,
    last_refill: Vec<Pos>,
    score_weight: u64,
    cascade_cap: usize,
}

impl GameState {
    pub fn new(config: &GameConfig, mut rng: SmallRng) -> Self {
        let grid = Self::fresh_grid(config, &mut rng);
        let mut state = Self {
            grid,
            score: 0,
            rng,
            selection: Selection::None,
            cascade: None,
            stats: Stats::default(),
            last_refill: Vec::new(),
            score_weight: config.score_weight,
            cascade_cap: config.cascade_cap,
        };
        // Matches already on a fresh board are scored by the first cascade.
        state.begin_cascade();
        state
    }

    fn fresh_grid(config: &GameConfig, rng: &mut SmallRng) -> Grid {
        let mut grid = Grid::create(config.size, config.token_types, rng);
        debug!(initial_matches = has_match(&grid), "new board");
        if config.clear_initial {
            let summary = collapse::settle(&mut grid, rng, 0, config.cascade_cap);
            debug!(cycles = summary.cycles, "pre-cleared initial board");
        }
        grid
    }

    /// Start over with a new board; score and stats reset.
    pub fn restart(&mut self, config: &GameConfig, mut rng: SmallRng) {
        self.grid = Self::fresh_grid(config, &mut rng);
        self.rng = rng;
        self.score = 0;
        self.selection = Selection::None;
        self.stats = Stats::default();
        self.last_refill.clear();
        self.cascade = None;
        self.begin_cascade();
        info!("game restarted");
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Cells that got new candies in the most recent settle cycle.
    pub fn last_refill(&self) -> &[Pos] {
        &self.last_refill
    }

    /// True while a cascade still has cycles to run.
    pub fn is_settling(&self) -> bool {
        self.cascade.is_some()
    }

    fn begin_cascade(&mut self) {
        self.cascade = Some(Cascade::new(self.cascade_cap, self.score_weight));
        self.stats.chain = 0;
        self.stats.last_cascade_points = 0;
    }

    /// Pointer pressed. `None` is a press outside the board and is ignored.
    pub fn pointer_down(&mut self, pos: Option<Pos>) {
        if self.is_settling() {
            return;
        }
        if let Some(pos) = pos.filter(|p| self.grid.contains(*p)) {
            self.selection = Selection::Pending(pos);
        }
    }

    /// Pointer released. Swaps with the pending cell when the release is adjacent;
    /// the selection is cleared either way.
    pub fn pointer_up(&mut self, pos: Option<Pos>) -> Option<TurnOutcome> {
        if self.is_settling() {
            return None;
        }
        let Selection::Pending(from) = std::mem::take(&mut self.selection) else {
            return None;
        };
        let to = pos.filter(|p| self.grid.contains(*p))?;
        if from == to {
            return None;
        }
        self.request_swap(from, to).ok()
    }

    /// Drop any pending selection.
    pub fn cancel_selection(&mut self) {
        self.selection = Selection::None;
    }

    /// Validate adjacency, then hand the pair to the swap validator.
    pub fn request_swap(&mut self, a: Pos, b: Pos) -> Result<TurnOutcome, GridError> {
        if self.is_settling() {
            return Ok(TurnOutcome::Busy);
        }
        if !a.is_adjacent(b) {
            debug!(?a, ?b, "swap ignored: not adjacent");
            return Ok(TurnOutcome::NotAdjacent);
        }
        match try_swap(&mut self.grid, a, b)? {
            SwapOutcome::Accepted(matches) => {
                self.stats.moves += 1;
                info!(?a, ?b, matched = matches.len(), "swap accepted");
                self.begin_cascade();
                Ok(TurnOutcome::Accepted)
            }
            SwapOutcome::Reverted => {
                self.stats.rejected += 1;
                debug!(?a, ?b, "swap reverted");
                Ok(TurnOutcome::Rejected)
            }
        }
    }

    /// Run one settle cycle of the active cascade.
    pub fn step(&mut self) -> CascadeStep {
        let Some(cascade) = self.cascade.as_mut() else {
            return CascadeStep::Stable;
        };
        let step = cascade.step(&mut self.grid, &mut self.rng);
        match &step {
            CascadeStep::Changed(report) => {
                debug_assert!(self.grid.is_full());
                debug!(
                    cycle = cascade.cycles(),
                    cleared = report.cleared.len(),
                    points = report.points,
                    "cascade cycle"
                );
                self.score = self.score.saturating_add(report.points);
                self.stats.chain = cascade.cycles();
                self.stats.best_chain = self.stats.best_chain.max(cascade.cycles());
                self.stats.last_cascade_points = cascade.points();
                self.last_refill.clone_from(&report.refilled);
            }
            CascadeStep::Stable | CascadeStep::Capped => {
                if cascade.cycles() > 0 {
                    debug!(
                        cycles = cascade.cycles(),
                        points = cascade.points(),
                        score = self.score,
                        "cascade settled"
                    );
                }
                self.cascade = None;
                self.last_refill.clear();
            }
        }
        step
    }

    /// Run the active cascade to completion.
    pub fn settle_all(&mut self) -> SettleSummary {
        let mut summary = SettleSummary::default();
        loop {
            match self.step() {
                CascadeStep::Changed(report) => {
                    summary.cycles += 1;
                    summary.points += report.points;
                }
                CascadeStep::Stable => return summary,
                CascadeStep::Capped => {
                    summary.capped = true;
                    return summary;
                }
            }
        }
    }
}

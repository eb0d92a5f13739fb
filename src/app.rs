//! App: terminal init, main loop, cascade pacing, key and mouse handling.

use crate::GameConfig;
use crate::collapse::CascadeStep;
use crate::game::{GameState, Selection, TurnOutcome};
use crate::grid::Pos;
use crate::input::{Action, cell_at, key_to_action, move_cursor};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    /// Keyboard cursor.
    cursor: Pos,
    /// Earliest time the next settle cycle may run.
    next_cycle_at: Instant,
    /// Fade-in for candies dropped by the latest settle cycle.
    refill_effect: Option<Effect>,
    refill_effect_process_time: Option<Instant>,
    /// Games started this session; offsets a fixed seed on restart.
    games: u64,
}

fn make_rng(seed: Option<u64>, games: u64) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s.wrapping_add(games)),
        None => SmallRng::from_os_rng(),
    }
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let state = GameState::new(&config, make_rng(config.seed, 0));
        Self {
            cursor: Pos::new(0, 0),
            next_cycle_at: Instant::now(),
            refill_effect: None,
            refill_effect_process_time: None,
            games: 1,
            config,
            theme,
            state,
        }
    }

    fn reset_game(&mut self) {
        let rng = make_rng(self.config.seed, self.games);
        self.games += 1;
        self.state.restart(&self.config, rng);
        self.cursor = Pos::new(0, 0);
        self.next_cycle_at = Instant::now();
        self.refill_effect = None;
        self.refill_effect_process_time = None;
    }

    fn cascade_delay(&self) -> Duration {
        if self.config.no_animation {
            Duration::ZERO
        } else {
            Duration::from_millis(self.config.cascade_delay_ms)
        }
    }

    fn on_turn(&mut self, outcome: Option<TurnOutcome>) {
        if let Some(outcome) = outcome {
            debug!(?outcome, "turn");
            if outcome == TurnOutcome::Accepted {
                // Let the swapped board show for one beat before it starts clearing.
                self.next_cycle_at = Instant::now() + self.cascade_delay();
            }
        }
    }

    /// Run settle cycles that are due. Without animation the cascade drains at once.
    fn tick_cascade(&mut self, now: Instant) {
        if !self.state.is_settling() || now < self.next_cycle_at {
            return;
        }
        if self.config.no_animation {
            let summary = self.state.settle_all();
            debug!(
                cycles = summary.cycles,
                points = summary.points,
                capped = summary.capped,
                "cascade drained"
            );
            return;
        }
        if let CascadeStep::Changed(_) = self.state.step() {
            self.next_cycle_at = now + self.cascade_delay();
            self.refill_effect = None;
            self.refill_effect_process_time = None;
        }
    }

    /// Returns false when the player quits.
    fn handle_key(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::Restart => {
                info!(score = self.state.score(), "new game requested");
                self.reset_game();
            }
            Action::Cancel => self.state.cancel_selection(),
            Action::CursorUp | Action::CursorDown | Action::CursorLeft | Action::CursorRight => {
                self.cursor = move_cursor(self.cursor, action, self.config.size);
            }
            Action::Select => match self.state.selection() {
                Selection::None => self.state.pointer_down(Some(self.cursor)),
                Selection::Pending(_) => {
                    let outcome = self.state.pointer_up(Some(self.cursor));
                    self.on_turn(outcome);
                }
            },
            Action::None => {}
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, area: Rect) {
        let board = crate::ui::board_rect(area, &self.config);
        let pos = cell_at(
            board,
            self.config.tile_width,
            self.config.tile_height,
            mouse.column,
            mouse.row,
        )
        .filter(|p| self.state.grid().contains(*p));
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.state.pointer_down(pos);
                if let (Some(p), Selection::Pending(_)) = (pos, self.state.selection()) {
                    self.cursor = p;
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let outcome = self.state.pointer_up(pos);
                self.on_turn(outcome);
            }
            _ => {}
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;
        info!(score = self.state.score(), moves = self.state.stats().moves, "session ended");

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        loop {
            let now = Instant::now();
            self.tick_cascade(now);

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.state,
                    &self.theme,
                    &self.config,
                    self.cursor,
                    &mut self.refill_effect,
                    &mut self.refill_effect_process_time,
                    now,
                )
            })?;

            let size = terminal.size()?;
            let area = Rect::new(0, 0, size.width, size.height);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if !self.handle_key(key_to_action(key)) {
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse) => self.handle_mouse(mouse, area),
                        _ => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::has_match;

    fn app(no_animation: bool) -> App {
        let config = GameConfig {
            seed: Some(21),
            no_animation,
            ..GameConfig::default()
        };
        App::new(config, Theme::default())
    }

    #[test]
    fn test_no_animation_drains_in_one_tick() {
        let mut app = app(true);
        app.tick_cascade(Instant::now());
        assert!(!app.state.is_settling());
        assert!(!has_match(app.state.grid()));
    }

    #[test]
    fn test_paced_cascade_waits_between_cycles() {
        let mut app = app(false);
        let start = Instant::now();
        app.next_cycle_at = start;
        let mut t = start;
        let mut ticks = 0;
        while app.state.is_settling() {
            // Ticking before the delay elapses never runs a cycle.
            let before = app.state.stats().chain;
            app.tick_cascade(app.next_cycle_at - Duration::from_millis(1));
            assert_eq!(app.state.stats().chain, before);
            t = t.max(app.next_cycle_at);
            app.tick_cascade(t);
            ticks += 1;
            assert!(ticks < 10_000);
        }
        assert!(!has_match(app.state.grid()));
    }

    #[test]
    fn test_keyboard_swap_flow() {
        let mut app = app(true);
        app.tick_cascade(Instant::now());
        assert!(app.handle_key(Action::Select));
        assert_eq!(app.state.selection(), Selection::Pending(Pos::new(0, 0)));
        assert!(app.handle_key(Action::CursorRight));
        assert!(app.handle_key(Action::Select));
        assert_eq!(app.state.selection(), Selection::None);
        assert!(app.handle_key(Action::Select));
        assert!(app.handle_key(Action::Cancel));
        assert_eq!(app.state.selection(), Selection::None);
        assert!(!app.handle_key(Action::Quit));
    }

    #[test]
    fn test_mouse_press_outside_board_is_ignored() {
        let mut app = app(true);
        app.tick_cascade(Instant::now());
        let area = Rect::new(0, 0, 100, 40);
        let press = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 0,
            row: 0,
            modifiers: crossterm::event::KeyModifiers::NONE,
        };
        app.handle_mouse(press, area);
        assert_eq!(app.state.selection(), Selection::None);

        let board = crate::ui::board_rect(area, &app.config);
        let press = MouseEvent {
            column: board.x,
            row: board.y,
            ..press
        };
        app.handle_mouse(press, area);
        assert_eq!(app.state.selection(), Selection::Pending(Pos::new(0, 0)));
        let release = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column: 0,
            row: 0,
            ..press
        };
        app.handle_mouse(release, area);
        assert_eq!(app.state.selection(), Selection::None);
    }

    #[test]
    fn test_restart_with_seed_is_reproducible() {
        let mut a = app(true);
        let mut b = app(true);
        a.reset_game();
        b.reset_game();
        assert_eq!(a.state.grid(), b.state.grid());
        assert_eq!(a.games, 2);
    }
}

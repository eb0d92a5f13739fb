//! Candytui: match-three candy swapping puzzle in the terminal.

mod app;
mod collapse;
mod game;
mod grid;
mod input;
mod matcher;
mod swap;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_GRID_SIZE: usize = 8;
pub const DEFAULT_TOKEN_TYPES: u8 = 6;
/// Keeps a 32-wide board plus sidebar inside `u16` terminal coordinates.
const MAX_TILE_SIDE: u16 = 16;
const MAX_FRAME_RATE: f64 = 240.0;
const MAX_CASCADE_DELAY_MS: u64 = 10_000;

/// Validated settings shared by the game state and the terminal shell.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub size: usize,
    pub token_types: u8,
    pub score_weight: u64,
    pub cascade_cap: usize,
    pub clear_initial: bool,
    pub tile_width: u16,
    pub tile_height: u16,
    pub frame_rate: f64,
    pub cascade_delay_ms: u64,
    pub no_animation: bool,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE,
            token_types: DEFAULT_TOKEN_TYPES,
            score_weight: collapse::DEFAULT_SCORE_WEIGHT,
            cascade_cap: collapse::default_cycle_cap(DEFAULT_GRID_SIZE, DEFAULT_TOKEN_TYPES),
            clear_initial: false,
            tile_width: 4,
            tile_height: 2,
            frame_rate: 60.0,
            cascade_delay_ms: 100,
            no_animation: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid size must be between 3 and 32, got {0}")]
    Size(usize),
    #[error("candy types must be between 2 and 16, got {0}")]
    TokenTypes(u8),
    #[error("tile width and height must be between 1 and 16")]
    TileSize,
    #[error("frame rate must be between 1 and 240, got {0}")]
    FrameRate(f64),
    #[error("cascade delay must be at most 10000 ms, got {0}")]
    CascadeDelay(u64),
    #[error("cascade cap must be at least 1")]
    CascadeCap,
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if !(3..=32).contains(&args.size) {
            return Err(ConfigError::Size(args.size));
        }
        if !(2..=16).contains(&args.types) {
            return Err(ConfigError::TokenTypes(args.types));
        }
        let tile_range = 1..=MAX_TILE_SIDE;
        if !tile_range.contains(&args.tile_width) || !tile_range.contains(&args.tile_height) {
            return Err(ConfigError::TileSize);
        }
        // Also rejects NaN.
        if !(1.0..=MAX_FRAME_RATE).contains(&args.frame_rate) {
            return Err(ConfigError::FrameRate(args.frame_rate));
        }
        if args.cascade_delay_ms > MAX_CASCADE_DELAY_MS {
            return Err(ConfigError::CascadeDelay(args.cascade_delay_ms));
        }
        let cascade_cap = match args.max_cascades {
            Some(0) => return Err(ConfigError::CascadeCap),
            Some(cap) => cap,
            None => collapse::default_cycle_cap(args.size, args.types),
        };
        Ok(Self {
            size: args.size,
            token_types: args.types,
            score_weight: args.score_weight,
            cascade_cap,
            clear_initial: args.clear_initial,
            tile_width: args.tile_width,
            tile_height: args.tile_height,
            frame_rate: args.frame_rate,
            cascade_delay_ms: args.cascade_delay_ms,
            no_animation: args.no_animation,
            seed: args.seed,
        })
    }
}

fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    // The terminal belongs to the game, so logs only go to a file.
    let Some(path) = path else {
        return Ok(());
    };
    let log_file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let config = GameConfig::from_args(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        warn!(%err, "theme not loaded, using default");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    info!(
        size = config.size,
        types = config.token_types,
        seed = ?config.seed,
        "starting candytui"
    );
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Match-three candy puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "candytui",
    version,
    about = "Match-three candy puzzle in the terminal. Swap neighbouring candies to line up three or more.",
    long_about = "Candytui is a terminal take on the classic candy-swapping puzzle.\n\n\
        Swap two neighbouring candies to make a row or column of three or more of the same \
        colour. Matches are cleared for 10 points per candy, the candies above fall down and \
        new ones drop in from the top, which can set off further matches.\n\n\
        MOUSE:\n  Press on a candy and release on a neighbour to swap them.\n\n\
        KEYBOARD:\n  Arrows / hjkl  Move cursor    Space / Enter  Pick / swap\n  Esc            Cancel pick    R              New game    Q  Quit"
)]
pub struct Args {
    /// Board size (the board is SIZE x SIZE).
    #[arg(short, long, default_value_t = DEFAULT_GRID_SIZE, value_name = "N")]
    pub size: usize,

    /// Number of distinct candy types.
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOKEN_TYPES, value_name = "N")]
    pub types: u8,

    /// Points per cleared candy.
    #[arg(long, default_value_t = collapse::DEFAULT_SCORE_WEIGHT, value_name = "POINTS")]
    pub score_weight: u64,

    /// Width of one candy tile in terminal columns.
    #[arg(long, default_value = "4", value_name = "COLS")]
    pub tile_width: u16,

    /// Height of one candy tile in terminal rows.
    #[arg(long, default_value = "2", value_name = "ROWS")]
    pub tile_height: u16,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Pause between cascade steps in ms.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub cascade_delay_ms: u64,

    /// Safety cap on settle cycles per turn (default: size² × types).
    #[arg(long, value_name = "N")]
    pub max_cascades: Option<usize>,

    /// Seed for the candy generator (random when not set).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Clear matches on the starting board before play, without scoring them.
    #[arg(long)]
    pub clear_initial: bool,

    /// Run cascades instantly with no pause or fade.
    #[arg(long)]
    pub no_animation: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("candytui").chain(extra.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = GameConfig::from_args(&parse(&[])).unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.cascade_cap, 8 * 8 * 6);
    }

    #[test]
    fn test_cap_follows_board_shape() {
        let config = GameConfig::from_args(&parse(&["--size", "5", "--types", "3"])).unwrap();
        assert_eq!(config.cascade_cap, 75);
        let config = GameConfig::from_args(&parse(&["--max-cascades", "9"])).unwrap();
        assert_eq!(config.cascade_cap, 9);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            GameConfig::from_args(&parse(&["--size", "2"])),
            Err(ConfigError::Size(2))
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["-k", "1"])),
            Err(ConfigError::TokenTypes(1))
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--tile-width", "0"])),
            Err(ConfigError::TileSize)
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--frame-rate", "0"])),
            Err(ConfigError::FrameRate(0.0))
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--frame-rate", "1e-20"])),
            Err(ConfigError::FrameRate(1e-20))
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--frame-rate", "1000"])),
            Err(ConfigError::FrameRate(1000.0))
        );
        assert!(matches!(
            GameConfig::from_args(&parse(&["--frame-rate", "NaN"])),
            Err(ConfigError::FrameRate(_))
        ));
        assert_eq!(
            GameConfig::from_args(&parse(&["--size", "32", "--tile-width", "3000"])),
            Err(ConfigError::TileSize)
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--tile-height", "17"])),
            Err(ConfigError::TileSize)
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--cascade-delay-ms", "18446744073709551615"])),
            Err(ConfigError::CascadeDelay(u64::MAX))
        );
        assert_eq!(
            GameConfig::from_args(&parse(&["--max-cascades", "0"])),
            Err(ConfigError::CascadeCap)
        );
    }

    #[test]
    fn test_largest_accepted_layout_fits_terminal_coordinates() {
        let config = GameConfig::from_args(&parse(&[
            "--size",
            "32",
            "--tile-width",
            "16",
            "--tile-height",
            "16",
            "--frame-rate",
            "240",
        ]))
        .unwrap();
        let wide =
            u32::from(MAX_TILE_SIDE) * config.size as u32 + 2 + u32::from(ui::SIDEBAR_WIDTH);
        assert!(wide <= u32::from(u16::MAX));
        let frame = std::time::Duration::from_secs_f64(1.0 / config.frame_rate);
        assert!(frame > std::time::Duration::ZERO);
    }

    #[test]
    fn test_palette_aliases() {
        assert_eq!(parse(&["--palette", "contrast"]).palette, Palette::HighContrast);
        assert_eq!(parse(&["--palette", "colourblind"]).palette, Palette::Colorblind);
    }
}

//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use crate::grid::Token;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Candy glyphs, drawn on top of the tile colour so types stay apart when colours repeat.
const CANDY_GLYPHS: [char; 16] = [
    '●', '■', '▲', '◆', '★', '♥', '♣', '♠', '✚', '▼', '◉', '▣', '◐', '✦', '♦', '☗',
];

/// Board and UI colours.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Candy colours by token: red, yellow, green, blue, purple, orange, cyan, pink.
    pub candy: [Color; 8],
    pub bg: Color,
    /// Border / grid lines.
    pub div_line: Color,
    /// Text (score, stats).
    pub main_fg: Color,
    pub title: Color,
    /// Help text.
    pub inactive_fg: Color,
    /// Pending selection and cursor markers.
    pub highlight: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// One Dark UI colours with bright candy colours.
    pub fn onedark_default() -> Self {
        Self {
            candy: [
                Color::Rgb(0xE0, 0x6C, 0x75), // red
                Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
                Color::Rgb(0x98, 0xC3, 0x79), // green
                Color::Rgb(0x61, 0xAF, 0xEF), // blue
                Color::Rgb(0xC6, 0x78, 0xDD), // purple
                Color::Rgb(0xD1, 0x9A, 0x66), // orange
                Color::Rgb(0x56, 0xB6, 0xC2), // cyan
                Color::Rgb(0xF4, 0x8F, 0xB1), // pink
            ],
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            highlight: Color::Rgb(0xFF, 0xFF, 0xFF),
        }
    }

    /// Load from a btop-style file: `theme[key]="value"`. Missing path or keys fall back to
    /// One Dark; `palette` then overrides candy colours.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.candy = [
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0xFF, 0x88, 0x00),
                    Color::Rgb(0x00, 0xFF, 0xFF),
                    Color::Rgb(0xFF, 0xFF, 0xFF),
                ];
            }
            Palette::Colorblind => {
                // Paul Tol "bright" scheme, plus orange.
                self.candy = [
                    Color::Rgb(0x44, 0x77, 0xAA),
                    Color::Rgb(0xEE, 0x66, 0x77),
                    Color::Rgb(0x22, 0x88, 0x33),
                    Color::Rgb(0xCC, 0xBB, 0x44),
                    Color::Rgb(0x66, 0xCC, 0xEE),
                    Color::Rgb(0xAA, 0x33, 0x77),
                    Color::Rgb(0xBB, 0xBB, 0xBB),
                    Color::Rgb(0xEE, 0x77, 0x33),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::onedark_default();
        let keys: [&[&str]; 8] = [
            &["cpu_end", "temp_end"],
            &["title", "cpu_mid"],
            &["mem_box", "cpu_start"],
            &["cpu_box"],
            &["net_box"],
            &["proc_box"],
            &["hi_fg", "proc_misc"],
            &["selected_bg"],
        ];
        let mut candy = base.candy;
        for (slot, names) in candy.iter_mut().zip(keys) {
            if let Some(c) = names.iter().find_map(|&k| get(k)) {
                *slot = c;
            }
        }
        Self {
            candy,
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
            highlight: get("hi_fg").unwrap_or(base.highlight),
        }
    }

    /// Tile colour for a candy. Colours repeat past the eighth type.
    #[inline]
    pub fn candy_color(&self, token: Token) -> Color {
        self.candy[token as usize % self.candy.len()]
    }

    #[inline]
    pub fn candy_glyph(&self, token: Token) -> char {
        CANDY_GLYPHS[token as usize % CANDY_GLYPHS.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}

//! Layout and drawing: board, selection markers, sidebar (score, stats, colours, keys).

use crate::GameConfig;
use crate::game::{GameState, Selection};
use crate::grid::Pos;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

pub(crate) const SIDEBAR_WIDTH: u16 = 24;

/// Board size in terminal cells, without border.
fn board_pixel_size(config: &GameConfig) -> (u16, u16) {
    let n = config.size as u16;
    (n * config.tile_width, n * config.tile_height)
}

/// Outer board rect (with border) and sidebar rect, centred in `area`.
fn game_layout(area: Rect, config: &GameConfig) -> (Rect, Rect) {
    let (bw, bh) = board_pixel_size(config);
    let (pw, ph) = (bw + 2, bh + 2);
    let total_w = pw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(ph) / 2;
    let board_outer = Rect {
        x,
        y,
        width: pw.min(area.width),
        height: ph.min(area.height),
    }
    .intersection(area);
    let sidebar = Rect {
        x: x + pw,
        y,
        width: SIDEBAR_WIDTH,
        height: ph.max(24),
    }
    .intersection(area);
    (board_outer, sidebar)
}

/// Board rect (tiles only, no border) for the given terminal area. Pointer events are
/// mapped against this.
pub fn board_rect(area: Rect, config: &GameConfig) -> Rect {
    let (outer, _) = game_layout(area, config);
    let (bw, bh) = board_pixel_size(config);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: bw.min(outer.width.saturating_sub(2)),
        height: bh.min(outer.height.saturating_sub(2)),
    }
}

/// Terminal rect covered by one tile.
fn tile_rect(board: Rect, config: &GameConfig, pos: Pos) -> Rect {
    Rect {
        x: board.x + pos.col as u16 * config.tile_width,
        y: board.y + pos.row as u16 * config.tile_height,
        width: config.tile_width,
        height: config.tile_height,
    }
    .intersection(board)
}

/// Draw the game. While a cascade is running, freshly dropped candies fade in from the
/// background (TachyonFX); `refill_effect` is rebuilt by the caller after every cycle.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    config: &GameConfig,
    cursor: Pos,
    refill_effect: &mut Option<Effect>,
    refill_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    fill_bg(frame.buffer_mut(), area, theme.bg);
    let (board_outer, sidebar) = game_layout(area, config);
    draw_board(frame, state, theme, config, cursor, board_outer);
    draw_sidebar(frame, state, theme, config, sidebar);
    if !config.no_animation && !state.last_refill().is_empty() {
        apply_refill_effect(
            frame,
            state,
            theme,
            config,
            area,
            refill_effect,
            refill_process_time,
            now,
        );
    }
}

fn fill_bg(buf: &mut Buffer, area: Rect, bg: Color) {
    buf.set_style(area, Style::default().bg(bg));
}

fn draw_board(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    config: &GameConfig,
    cursor: Pos,
    area: Rect,
) {
    let title = if state.is_settling() {
        " Candytui  ~ cascading ~ "
    } else {
        " Candytui "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    block.render(area, frame.buffer_mut());

    let board = board_rect(frame.area(), config);
    let pending = match state.selection() {
        Selection::Pending(p) => Some(p),
        Selection::None => None,
    };
    let buf = frame.buffer_mut();

    for (r, row) in state.grid().rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let pos = Pos::new(r, c);
            let rect = tile_rect(board, config, pos);
            let (color, glyph) = match cell.token() {
                Some(t) => (theme.candy_color(t), theme.candy_glyph(t)),
                None => (theme.bg, ' '),
            };
            buf.set_style(rect, Style::default().bg(color).fg(theme.bg));
            for y in rect.top()..rect.bottom() {
                for x in rect.left()..rect.right() {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_char(' ');
                    }
                }
            }
            if rect.is_empty() {
                continue;
            }
            let mid_x = rect.x + rect.width / 2;
            let mid_y = rect.y + rect.height.saturating_sub(1) / 2;
            if let Some(cell) = buf.cell_mut((mid_x, mid_y)) {
                cell.set_char(glyph);
            }

            let is_pending = pending == Some(pos);
            let is_cursor = cursor == pos && !state.is_settling();
            if is_pending || is_cursor {
                let marker_style = Style::default()
                    .fg(theme.highlight)
                    .bg(color)
                    .add_modifier(Modifier::BOLD);
                let (left, right) = if is_pending { ('[', ']') } else { ('›', '‹') };
                if rect.width >= 3 {
                    if let Some(cell) = buf.cell_mut((rect.left(), mid_y)) {
                        cell.set_char(left).set_style(marker_style);
                    }
                    if let Some(cell) = buf.cell_mut((rect.right() - 1, mid_y)) {
                        cell.set_char(right).set_style(marker_style);
                    }
                } else if let Some(cell) = buf.cell_mut((mid_x, mid_y)) {
                    cell.set_style(marker_style.add_modifier(Modifier::REVERSED));
                }
            }
        }
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    config: &GameConfig,
    area: Rect,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let stats = state.stats();

    let status = if state.is_settling() {
        "Cascading..."
    } else if matches!(state.selection(), Selection::Pending(_)) {
        "Pick a neighbour"
    } else {
        "Pick a candy"
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score().to_string(), fg_style.add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Chain: ", title_style),
            Span::styled(
                format!("{} (+{})", stats.chain, stats.last_cascade_points),
                fg_style,
            ),
        ]),
        Line::from(vec![
            Span::styled("Best chain: ", title_style),
            Span::styled(stats.best_chain.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(stats.moves.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Rejected: ", title_style),
            Span::styled(stats.rejected.to_string(), fg_style),
        ]),
        Line::from(""),
        Line::from(Span::styled(status, fg_style)),
        Line::from(""),
        Line::from(Span::styled("Candies", title_style)),
    ];

    let legend: Vec<Span> = (0..config.token_types)
        .map(|t| {
            Span::styled(
                format!(" {} ", theme.candy_glyph(t)),
                Style::default().fg(theme.bg).bg(theme.candy_color(t)),
            )
        })
        .collect();
    for chunk in legend.chunks(5) {
        lines.push(Line::from(chunk.to_vec()));
    }

    lines.push(Line::from(""));
    for help in [
        "Mouse  drag to swap",
        "←↓↑→ / hjkl  move",
        "Space  pick / swap",
        "Esc  cancel  R  new",
        "Q  quit",
    ] {
        lines.push(Line::from(Span::styled(help, dim_style)));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg));
    Paragraph::new(Text::from(lines))
        .block(block)
        .render(area, frame.buffer_mut());
}

/// Buffer positions covered by the tiles that were just refilled.
fn refill_buffer_positions(board: Rect, config: &GameConfig, cells: &[Pos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        let rect = tile_rect(board, config, pos);
        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Create (when missing) and advance the fade-in effect for refilled tiles.
fn apply_refill_effect(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    config: &GameConfig,
    area: Rect,
    refill_effect: &mut Option<Effect>,
    refill_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, config);
    let delta = refill_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *refill_process_time = Some(now);

    if refill_effect.is_none() {
        let refilled = refill_buffer_positions(board, config, state.last_refill());
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            refilled.contains(&(pos.x, pos.y))
        }));
        let fade_ms = config.cascade_delay_ms.clamp(1, u32::MAX as u64) as u32;
        let effect = fx::fade_from(theme.bg, theme.bg, (fade_ms, Interpolation::QuadOut))
            .with_filter(filter)
            .with_area(board);
        *refill_effect = Some(effect);
    }

    if let Some(effect) = refill_effect {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

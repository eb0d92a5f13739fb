//! Key bindings (normal and vim-style) and pointer → board cell translation.

use crate::grid::Pos;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    /// Pick the cursor cell, or swap with the picked cell.
    Select,
    Cancel,
    Restart,
    Quit,
    None,
}

/// Map key event to game action. Supports both arrows and vim keys (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') => Action::Quit,
        KeyCode::Esc => Action::Cancel,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Up | KeyCode::Char('k') => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => Action::CursorDown,
        KeyCode::Left | KeyCode::Char('h') => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::CursorRight,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        _ => Action::None,
    }
}

/// Move the keyboard cursor one cell, staying on a `size x size` board.
pub fn move_cursor(cursor: Pos, action: Action, size: usize) -> Pos {
    let last = size.saturating_sub(1);
    match action {
        Action::CursorUp => Pos::new(cursor.row.saturating_sub(1), cursor.col),
        Action::CursorDown => Pos::new((cursor.row + 1).min(last), cursor.col),
        Action::CursorLeft => Pos::new(cursor.row, cursor.col.saturating_sub(1)),
        Action::CursorRight => Pos::new(cursor.row, (cursor.col + 1).min(last)),
        _ => cursor,
    }
}

/// Board cell under terminal position (`column`, `row`), or `None` when the pointer is
/// outside the board (border, sidebar, score strip).
pub fn cell_at(board: Rect, tile_w: u16, tile_h: u16, column: u16, row: u16) -> Option<Pos> {
    if tile_w == 0 || tile_h == 0 {
        return None;
    }
    if column < board.x || row < board.y {
        return None;
    }
    let (dx, dy) = (column - board.x, row - board.y);
    if dx >= board.width || dy >= board.height {
        return None;
    }
    Some(Pos::new((dy / tile_h) as usize, (dx / tile_w) as usize))
}

// model = "claude-opus-4-5"
// created = "2026-08-03"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! Cursors: a selection range with direction and vertical memory.
//!
//! A cursor is a pure value. The `pivot` is the anchor where a selection
//! began; the `position` is the active end that moves. `offset` remembers
//! the column the user was on for vertical navigation, so moving through a
//! short line does not lose the column.
//!
//! Endpoints may transiently leave the buffer immediately after an edit;
//! they must be clamped before reuse. `clamp` is idempotent.

use serde::Deserialize;
use serde::Serialize;

use crate::text;

/// Which way a selection runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Pivot at or before position.
    Ltr,
    /// Pivot after position.
    Rtl,
}

/// A single caret or selection range belonging to a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// The anchor end of the selection.
    pub pivot: i64,
    /// The active end of the selection.
    pub position: i64,
    /// Remembered column for vertical navigation.
    pub offset: i64,
}

impl Cursor {
    /// A collapsed cursor at the start of the buffer.
    pub fn new() -> Cursor {
        return Cursor::at(0);
    }

    /// A collapsed cursor at `pos`.
    pub fn at(pos: i64) -> Cursor {
        return Cursor {
            pivot: pos,
            position: pos,
            offset: 0,
        };
    }

    /// The lower endpoint of the selection.
    pub fn selection_start(&self) -> i64 {
        return self.pivot.min(self.position);
    }

    /// The upper endpoint of the selection.
    pub fn selection_end(&self) -> i64 {
        return self.pivot.max(self.position);
    }

    /// True when the selection is empty (a bare caret).
    pub fn is_empty(&self) -> bool {
        return self.pivot == self.position;
    }

    /// The selection's direction. Ltr iff pivot <= position.
    pub fn direction(&self) -> Direction {
        if self.pivot <= self.position {
            return Direction::Ltr;
        }
        return Direction::Rtl;
    }

    /// Set both endpoints.
    pub fn select(&mut self, pivot: i64, position: i64) {
        self.pivot = pivot;
        self.position = position;
    }

    /// Collapse the selection and move the caret by `delta`.
    pub fn move_by(&mut self, delta: i64) {
        self.position += delta;
        self.pivot = self.position;
    }

    /// Extend the active end by `delta`, leaving the pivot in place.
    pub fn highlight(&mut self, delta: i64) {
        self.position += delta;
    }

    /// Shift the selection's endpoints, direction-aware: `d_left` applies to
    /// the lower endpoint and `d_right` to the upper, whichever of pivot and
    /// position those currently are.
    pub fn select_relative(&mut self, d_left: i64, d_right: i64) {
        match self.direction() {
            Direction::Ltr => {
                self.pivot += d_left;
                self.position += d_right;
            }
            Direction::Rtl => {
                self.position += d_left;
                self.pivot += d_right;
            }
        }
    }

    /// Clamp both endpoints into the buffer. Idempotent.
    pub fn clamp(&mut self, buffer: &str) {
        let len = text::char_len(buffer);
        self.pivot = self.pivot.clamp(0, len);
        self.position = self.position.clamp(0, len);
    }

    /// Re-derive the remembered column from the active end.
    pub fn remember_column(&mut self, buffer: &str) {
        self.offset = text::column(buffer, self.position);
    }

    /// True when the two selections touch or overlap.
    pub fn touches(&self, other: &Cursor) -> bool {
        return self.selection_start() <= other.selection_end()
            && other.selection_start() <= self.selection_end();
    }

    /// Absorb `other` into this cursor: the merged selection is the union
    /// span, keeping this cursor's direction and vertical memory.
    pub fn merge(&mut self, other: &Cursor) {
        let lo = self.selection_start().min(other.selection_start());
        let hi = self.selection_end().max(other.selection_end());
        match self.direction() {
            Direction::Ltr => self.select(lo, hi),
            Direction::Rtl => self.select(hi, lo),
        }
    }

    /// Line-level context of the selection, used by structural actions.
    pub fn selection_info(&self, buffer: &str) -> SelectionInfo {
        let start = self.selection_start();
        let end = self.selection_end();
        let line_start = text::line_start(buffer, start);
        let line_end = text::line_end(buffer, end);
        return SelectionInfo {
            line_start,
            line_end,
            prefix: text::slice(buffer, line_start, start).to_string(),
            suffix: text::slice(buffer, end, line_end).to_string(),
        };
    }
}

impl Default for Cursor {
    fn default() -> Cursor {
        return Cursor::new();
    }
}

/// The lines a selection spans and the text flanking it on those lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionInfo {
    /// Start of the first spanned line.
    pub line_start: i64,
    /// End of the last spanned line (before its newline, or the buffer end).
    pub line_end: i64,
    /// Text on the first line before the selection.
    pub prefix: String,
    /// Text on the last line after the selection.
    pub suffix: String,
}

// model = "claude-opus-4-5"
// created = "2026-08-04"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! Users and multi-cursor batching.
//!
//! A user owns an ordered, non-empty set of cursors; index 0 is the most
//! recently created (primary) cursor. One action applies to every cursor in
//! a single batch over a shared window: cursors are processed in ascending
//! order, and each edit's net length delta translates the cursors that have
//! not had their turn yet, which keeps multi-cursor coordinates consistent
//! and makes the final buffer independent of processing order.

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;
use smallvec::smallvec;

use crate::action;
use crate::action::Action;
use crate::cursor::Cursor;
use crate::cursor::Direction;
use crate::profile::Profile;
use crate::range::EditResult;
use crate::range::Range;
use crate::text;

/// A stable user identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "user-{}", self.0);
    }
}

/// One editing participant: a stable id and an ordered cursor set.
#[derive(Clone, Debug)]
pub struct User {
    pub id: UserId,
    /// Index 0 is the most recently created (primary) cursor.
    pub cursors: SmallVec<[Cursor; 2]>,
}

impl User {
    /// A user with a single collapsed cursor at the buffer start.
    pub fn new(id: UserId) -> User {
        return User {
            id,
            cursors: smallvec![Cursor::new()],
        };
    }

    /// The primary cursor.
    pub fn primary(&self) -> &Cursor {
        return &self.cursors[0];
    }

    /// Clamp every cursor into the buffer.
    pub fn clamp_all(&mut self, buffer: &str) {
        for cursor in &mut self.cursors {
            cursor.clamp(buffer);
        }
    }

    /// Merge cursors that touch or overlap, keeping the lower-index
    /// cursor's identity and direction. The set never becomes empty.
    pub fn collapse_cursors(&mut self) {
        let mut i = 0;
        while i < self.cursors.len() {
            let mut j = i + 1;
            while j < self.cursors.len() {
                if self.cursors[i].touches(&self.cursors[j]) {
                    let absorbed = self.cursors[j];
                    self.cursors[i].merge(&absorbed);
                    self.cursors.remove(j);
                    // Re-check from the start: the union may now touch
                    // a cursor we already passed.
                    i = 0;
                    j = i + 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    /// The minimal window covering every cursor, extended by one line each
    /// way: lookback for backspace and bracket context, lookahead so a
    /// forward delete can consume the newline.
    pub fn window_span(&self, buffer: &str) -> (i64, i64) {
        let lo = self.cursors.iter().map(|c| c.selection_start()).min().unwrap_or(0);
        let hi = self.cursors.iter().map(|c| c.selection_end()).max().unwrap_or(0);
        let mut end = text::line_end(buffer, hi);
        if end < text::char_len(buffer) {
            end = text::line_end(buffer, end + 1);
        }
        return (text::prev_line_start(buffer, lo), end);
    }

    /// Apply a buffer-mutating action at every cursor: ascending
    /// processing order, left-to-right delta accumulation, one `Range` per
    /// cursor in processing order, window spliced back, then clamp and
    /// collapse. Returns the new buffer and the ranges.
    pub fn apply_batch(
        &mut self,
        buffer: &str,
        action: &Action,
        profile: &Profile,
    ) -> (String, Vec<Range>) {
        let (window_start, window_end) = self.window_span(buffer);
        let mut window = text::slice(buffer, window_start, window_end).to_string();

        let mut order: Vec<usize> = (0..self.cursors.len()).collect();
        order.sort_by_key(|i| self.cursors[*i].selection_start());

        let mut ranges = Vec::with_capacity(order.len());
        let mut shift = 0;
        for index in order {
            let cursor = &mut self.cursors[index];
            // Fold in the deltas of the cursors already processed.
            cursor.pivot += shift;
            cursor.position += shift;

            let start = cursor.selection_start() - window_start;
            let end = cursor.selection_end() - window_start;
            let out = action::apply_edit(&window, start, end, action, profile);
            window = out.value;

            let span_start = out.span[0] + window_start;
            let span_end = out.span[1] + window_start;
            let new_start = span_start + out.select_relative[0];
            let new_end = span_start + out.select_relative[1];
            match cursor.direction() {
                Direction::Ltr => cursor.select(new_start, new_end),
                Direction::Rtl => cursor.select(new_end, new_start),
            }

            ranges.push(Range::new(
                span_start,
                span_end,
                EditResult {
                    select_relative: out.select_relative,
                    offset: out.offset,
                },
            ));
            shift += out.offset;
        }

        let value = text::splice(buffer, window_start, window_end, &window);
        self.clamp_all(&value);
        self.collapse_cursors();
        return (value, ranges);
    }

    /// Replay someone else's ranges, in order, against every cursor here,
    /// then clamp and collapse.
    pub fn adjust_from_ranges(&mut self, buffer: &str, ranges: &[Range]) {
        for range in ranges {
            for cursor in &mut self.cursors {
                let deltas = cursor.adjust_from_range(range);
                cursor.select_relative(deltas[0], deltas[1]);
            }
        }
        self.clamp_all(buffer);
        self.collapse_cursors();
    }

    /// Apply a pure cursor action. Never touches the buffer.
    ///
    /// Panics on buffer-mutating actions: those go through `apply_batch`.
    pub fn apply_motion(&mut self, buffer: &str, action: &Action) {
        match action {
            Action::NoOp => {}
            Action::Select { pivot, position } => {
                self.cursors.truncate(1);
                self.cursors[0].select(*pivot, *position);
                self.cursors[0].clamp(buffer);
                self.cursors[0].remember_column(buffer);
            }
            Action::SelectAll => {
                self.cursors.truncate(1);
                self.cursors[0].select(0, text::char_len(buffer));
            }
            Action::SelectEmpty => {
                for cursor in &mut self.cursors {
                    cursor.pivot = cursor.position;
                }
            }
            Action::ResetCursor => {
                self.cursors.truncate(1);
                self.cursors[0].pivot = self.cursors[0].position;
            }
            Action::CollapseCursors => {}
            Action::CreateCursor { pivot, position } => {
                let mut cursor = Cursor::new();
                cursor.select(*pivot, *position);
                cursor.clamp(buffer);
                cursor.remember_column(buffer);
                self.cursors.insert(0, cursor);
            }
            Action::CreateNextCursor => self.create_next_cursor(buffer),
            Action::DestroyLastCursor => {
                if self.cursors.len() > 1 {
                    self.cursors.remove(0);
                }
            }
            Action::MoveCursors { delta, highlight } => {
                for cursor in &mut self.cursors {
                    if *highlight {
                        cursor.highlight(*delta);
                    } else {
                        cursor.move_by(*delta);
                    }
                    cursor.clamp(buffer);
                    cursor.remember_column(buffer);
                }
            }
            Action::MoveCursorsByLine { delta, highlight } => {
                for cursor in &mut self.cursors {
                    move_by_line(cursor, buffer, *delta, *highlight);
                }
            }
            Action::MoveCursorsByWord { delta, highlight } => {
                for cursor in &mut self.cursors {
                    let mut pos = cursor.position;
                    for _ in 0..delta.abs() {
                        pos = word_hop(buffer, pos, delta.signum());
                    }
                    if *highlight {
                        cursor.position = pos;
                    } else {
                        cursor.select(pos, pos);
                    }
                    cursor.remember_column(buffer);
                }
            }
            Action::MoveCursorsByDocument { delta, highlight } => {
                let target = if *delta < 0 { 0 } else { text::char_len(buffer) };
                for cursor in &mut self.cursors {
                    if *highlight {
                        cursor.position = target;
                    } else {
                        cursor.select(target, target);
                    }
                    cursor.remember_column(buffer);
                }
            }
            other => panic!("apply_motion called with buffer action {}", other.name()),
        }
        self.clamp_all(buffer);
        self.collapse_cursors();
    }

    /// Add a cursor selecting the next occurrence of the primary cursor's
    /// selected text, scanning forward from the last cursor. No-op when the
    /// primary selection is empty or nothing more matches.
    fn create_next_cursor(&mut self, buffer: &str) {
        let primary = self.cursors[0];
        if primary.is_empty() {
            return;
        }
        let needle = text::slice(buffer, primary.selection_start(), primary.selection_end());
        let from = self.cursors.iter().map(|c| c.selection_end()).max().unwrap_or(0);
        let tail = text::slice(buffer, from, text::char_len(buffer));
        let Some(byte) = tail.find(needle) else {
            return;
        };
        let found = from + tail[..byte].chars().count() as i64;
        let mut cursor = Cursor::new();
        cursor.select(found, found + text::char_len(needle));
        cursor.remember_column(buffer);
        self.cursors.insert(0, cursor);
    }
}

/// Vertical motion with column memory: the cursor lands on the remembered
/// column of the target line, clipped to that line's length, and keeps the
/// memory so crossing a short line does not lose the column.
fn move_by_line(cursor: &mut Cursor, buffer: &str, delta: i64, highlight: bool) {
    let lines = text::count_lines(buffer);
    let line = (text::line_of(buffer, cursor.position) + delta).clamp(0, lines - 1);
    let start = text::start_of_line(buffer, line);
    let len = text::line_end(buffer, start) - start;
    let target = start + cursor.offset.min(len);
    if highlight {
        cursor.position = target;
    } else {
        cursor.select(target, target);
    }
}

fn is_word(c: char) -> bool {
    return c.is_alphanumeric() || c == '_';
}

/// The next word boundary from `pos` in direction `dir` (±1): skip any
/// separators, then the run of word characters.
fn word_hop(buffer: &str, pos: i64, dir: i64) -> i64 {
    let chars: Vec<char> = buffer.chars().collect();
    let len = chars.len() as i64;
    let mut i = pos.clamp(0, len);
    if dir > 0 {
        while i < len && !is_word(chars[i as usize]) {
            i += 1;
        }
        while i < len && is_word(chars[i as usize]) {
            i += 1;
        }
    } else {
        while i > 0 && !is_word(chars[i as usize - 1]) {
            i -= 1;
        }
        while i > 0 && is_word(chars[i as usize - 1]) {
            i -= 1;
        }
    }
    return i;
}

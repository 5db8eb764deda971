// model = "claude-opus-4-5"
// created = "2026-08-03"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! Actions and the edit engine.
//!
//! `Action` is the exhaustive set of things a user can do. It doubles as
//! the wire format: the serde tag is the action name, so an unknown name
//! from a peer fails at the parse boundary instead of deep inside the
//! engine.
//!
//! The edit functions are pure: `(window, selection, args, profile)` in,
//! `EditOutcome` out. They operate on a window, the minimal slice of the
//! buffer spanning every affected cursor plus one line of lookback, which
//! the orchestrator splices back into the full buffer.

use serde::Deserialize;
use serde::Serialize;

use crate::profile::Profile;
use crate::text;

/// Everything a user can do. Buffer-mutating variants are **goto-enabled**:
/// they count as one undo/redo step. The rest are pure cursor motion, kept
/// in the history only for replay fidelity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args")]
pub enum Action {
    NoOp,
    InsertText {
        text: String,
        #[serde(default)]
        adjust: i64,
        #[serde(default)]
        select_len: i64,
    },
    RemoveText {
        amount: i64,
    },
    AddIndent,
    RemoveIndent,
    ToggleComment,
    Select {
        pivot: i64,
        position: i64,
    },
    SelectAll,
    SelectEmpty,
    ResetCursor,
    CollapseCursors,
    CreateCursor {
        pivot: i64,
        position: i64,
    },
    CreateNextCursor,
    DestroyLastCursor,
    MoveCursors {
        delta: i64,
        #[serde(default)]
        highlight: bool,
    },
    MoveCursorsByLine {
        delta: i64,
        #[serde(default)]
        highlight: bool,
    },
    MoveCursorsByWord {
        delta: i64,
        #[serde(default)]
        highlight: bool,
    },
    MoveCursorsByDocument {
        delta: i64,
        #[serde(default)]
        highlight: bool,
    },
}

impl Action {
    /// True for actions that mutate the buffer and count as an undo step.
    pub fn is_goto_enabled(&self) -> bool {
        return matches!(
            self,
            Action::InsertText { .. }
                | Action::RemoveText { .. }
                | Action::AddIndent
                | Action::RemoveIndent
                | Action::ToggleComment
        );
    }

    /// The wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::NoOp => "NoOp",
            Action::InsertText { .. } => "InsertText",
            Action::RemoveText { .. } => "RemoveText",
            Action::AddIndent => "AddIndent",
            Action::RemoveIndent => "RemoveIndent",
            Action::ToggleComment => "ToggleComment",
            Action::Select { .. } => "Select",
            Action::SelectAll => "SelectAll",
            Action::SelectEmpty => "SelectEmpty",
            Action::ResetCursor => "ResetCursor",
            Action::CollapseCursors => "CollapseCursors",
            Action::CreateCursor { .. } => "CreateCursor",
            Action::CreateNextCursor => "CreateNextCursor",
            Action::DestroyLastCursor => "DestroyLastCursor",
            Action::MoveCursors { .. } => "MoveCursors",
            Action::MoveCursorsByLine { .. } => "MoveCursorsByLine",
            Action::MoveCursorsByWord { .. } => "MoveCursorsByWord",
            Action::MoveCursorsByDocument { .. } => "MoveCursorsByDocument",
        }
    }
}

/// The result of one edit applied at one cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditOutcome {
    /// The new window contents.
    pub value: String,
    /// The pre-edit span the action replaced, window-relative.
    pub span: [i64; 2],
    /// The acting cursor's new `[start, end]` relative to the span start.
    pub select_relative: [i64; 2],
    /// Net change in window length.
    pub offset: i64,
}

/// Apply a buffer-mutating action to a window at one cursor's selection.
///
/// Panics on non-mutating actions and on malformed arguments: both are
/// embedding bugs, not runtime conditions.
pub fn apply_edit(
    window: &str,
    start: i64,
    end: i64,
    action: &Action,
    profile: &Profile,
) -> EditOutcome {
    match action {
        Action::RemoveText { amount } => remove_text(window, start, end, *amount),
        Action::InsertText {
            text,
            adjust,
            select_len,
        } => insert_text(window, start, end, text, *adjust, *select_len, profile),
        Action::AddIndent => add_indent(window, start, end, profile),
        Action::RemoveIndent => remove_indent(window, start, end, profile),
        Action::ToggleComment => toggle_comment(window, start, end, profile),
        other => panic!("apply_edit called with non-buffer action {}", other.name()),
    }
}

/// Delete the selection, or `amount` characters forward (`> 0`) or backward
/// (`< 0`, clipped at the window start) from a bare caret.
fn remove_text(window: &str, start: i64, end: i64, amount: i64) -> EditOutcome {
    let (from, to) = if start != end {
        (start, end)
    } else {
        assert!(amount != 0, "RemoveText with empty selection and zero amount");
        if amount > 0 {
            (start, (start + amount).min(text::char_len(window)))
        } else {
            ((start + amount).max(0), start)
        }
    };
    return EditOutcome {
        value: text::splice(window, from, to, ""),
        span: [from, to],
        select_relative: [0, 0],
        offset: from - to,
    };
}

/// Replace the selection with `text`, auto-wrapping bracket characters and
/// re-indenting multi-line insertions to the caret line's indentation.
fn insert_text(
    window: &str,
    start: i64,
    end: i64,
    raw: &str,
    adjust: i64,
    select_len: i64,
    profile: &Profile,
) -> EditOutcome {
    // A single bracket-class character typed over a selection wraps it.
    let mut chars = raw.chars();
    if let (Some(open), None) = (chars.next(), chars.next()) {
        if start != end {
            if let Some(close) = profile.complement(open) {
                let selected = text::slice(window, start, end);
                let mut wrapped = String::with_capacity(selected.len() + 2);
                wrapped.push(open);
                wrapped.push_str(selected);
                wrapped.push(close);
                return EditOutcome {
                    value: text::splice(window, start, end, &wrapped),
                    span: [start, end],
                    select_relative: [1, 1 + (end - start)],
                    offset: 2,
                };
            }
        }
    }

    let replacement = if raw.contains('\n') {
        reindent(window, start, raw, profile)
    } else {
        raw.to_string()
    };

    let inserted = text::char_len(&replacement);
    let landing = inserted + adjust;
    return EditOutcome {
        value: text::splice(window, start, end, &replacement),
        span: [start, end],
        select_relative: [landing, landing + select_len],
        offset: inserted - (end - start),
    };
}

/// Re-indent a multi-line insertion: normalize the source's relative indent
/// (subtract the minimum, divide by the GCD, rescale to the profile's tab)
/// and re-prefix every non-first line with the caret line's own indentation.
fn reindent(window: &str, start: i64, raw: &str, profile: &Profile) -> String {
    let caret_line_start = text::line_start(window, start);
    let caret_line = text::slice(window, caret_line_start, text::line_end(window, start));
    let caret_indent: String = caret_line
        .chars()
        .take(profile.indent_chars(caret_line) as usize)
        .collect();

    let lines: Vec<&str> = raw.split('\n').collect();
    let widths: Vec<i64> = lines.iter().map(|l| profile.indent_width(l)).collect();

    // Minimum and GCD consider only non-blank continuation lines.
    let min = lines
        .iter()
        .zip(&widths)
        .skip(1)
        .filter(|(l, _)| !l.trim().is_empty())
        .map(|(_, w)| *w)
        .min()
        .unwrap_or(0);
    let mut unit = 0;
    for (line, width) in lines.iter().zip(&widths).skip(1) {
        if !line.trim().is_empty() {
            unit = gcd(unit, width - min);
        }
    }
    if unit == 0 {
        unit = 1;
    }

    let mut out = String::new();
    for (i, (line, width)) in lines.iter().zip(&widths).enumerate() {
        if i > 0 {
            out.push('\n');
            if line.trim().is_empty() {
                continue;
            }
            out.push_str(&caret_indent);
            for _ in 0..(width - min) / unit {
                out.push_str(&profile.tab);
            }
        }
        let content: String = line
            .chars()
            .skip(if i == 0 { 0 } else { profile.indent_chars(line) as usize })
            .collect();
        out.push_str(&content);
    }
    return out;
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    return a;
}

/// One in-place line edit: `removed` characters deleted at `pos`, then
/// `inserted` text added there. Positions are in original coordinates.
struct LineEdit {
    pos: i64,
    removed: i64,
    inserted: String,
}

/// Apply a sorted batch of line edits and map cursor endpoints through them.
fn apply_line_edits(window: &str, start: i64, end: i64, edits: Vec<LineEdit>) -> EditOutcome {
    let ls = text::line_start(window, start.min(end));
    let le = text::line_end(window, start.max(end));

    let mut value = window.to_string();
    let mut offset = 0;
    // Apply back to front so earlier positions stay valid.
    for edit in edits.iter().rev() {
        value = text::splice(&value, edit.pos, edit.pos + edit.removed, &edit.inserted);
        offset += text::char_len(&edit.inserted) - edit.removed;
    }

    let map = |p: i64| -> i64 {
        let mut shift = 0;
        for edit in &edits {
            if p <= edit.pos {
                break;
            }
            if p < edit.pos + edit.removed {
                // Endpoint inside a removed span lands at the edit.
                return edit.pos + shift;
            }
            shift += text::char_len(&edit.inserted) - edit.removed;
        }
        return p + shift;
    };

    return EditOutcome {
        value,
        span: [ls, le],
        select_relative: [map(start) - ls, map(end) - ls],
        offset,
    };
}

/// Character offsets of the starts of every line spanned by `[start, end]`.
fn spanned_line_starts(window: &str, start: i64, end: i64) -> Vec<i64> {
    let mut starts = vec![text::line_start(window, start)];
    let last = text::line_start(window, end);
    while *starts.last().unwrap() < last {
        let line_end = text::line_end(window, *starts.last().unwrap());
        starts.push(line_end + 1);
    }
    return starts;
}

/// Add one indent unit at the start of every spanned line.
fn add_indent(window: &str, start: i64, end: i64, profile: &Profile) -> EditOutcome {
    let edits = spanned_line_starts(window, start, end)
        .into_iter()
        .map(|pos| LineEdit {
            pos,
            removed: 0,
            inserted: profile.tab.clone(),
        })
        .collect();
    return apply_line_edits(window, start, end, edits);
}

/// Remove up to one tab-width of leading indent from every spanned line.
/// Partial indents lose `width % tab_width` columns, full ones a whole stop.
fn remove_indent(window: &str, start: i64, end: i64, profile: &Profile) -> EditOutcome {
    let mut edits = Vec::new();
    for pos in spanned_line_starts(window, start, end) {
        let line = text::slice(window, pos, text::line_end(window, pos));
        let width = profile.indent_width(line);
        if width == 0 {
            continue;
        }
        let target = if width % profile.tab_width != 0 {
            width % profile.tab_width
        } else {
            profile.tab_width
        };
        let mut removed_cols = 0;
        let mut removed_chars = 0;
        for c in line.chars() {
            if removed_cols >= target {
                break;
            }
            match c {
                '\t' => removed_cols += profile.tab_width,
                ' ' => removed_cols += 1,
                _ => break,
            }
            removed_chars += 1;
        }
        edits.push(LineEdit {
            pos,
            removed: removed_chars,
            inserted: String::new(),
        });
    }
    return apply_line_edits(window, start, end, edits);
}

/// Comment every non-blank spanned line, or uncomment all of them when every
/// non-blank line already carries the marker.
fn toggle_comment(window: &str, start: i64, end: i64, profile: &Profile) -> EditOutcome {
    let marker = &profile.comment;
    if marker.is_empty() {
        return apply_line_edits(window, start, end, Vec::new());
    }

    let starts = spanned_line_starts(window, start, end);
    let commented = |line: &str| line.trim_start().starts_with(marker.as_str());
    let adding = starts.iter().any(|pos| {
        let line = text::slice(window, *pos, text::line_end(window, *pos));
        return !line.trim().is_empty() && !commented(line);
    });

    let mut edits = Vec::new();
    for pos in starts {
        let line = text::slice(window, pos, text::line_end(window, pos));
        if adding {
            if line.trim().is_empty() {
                continue;
            }
            edits.push(LineEdit {
                pos: pos + profile.indent_chars(line),
                removed: 0,
                inserted: format!("{} ", marker),
            });
        } else if commented(line) {
            let at = pos + profile.indent_chars(line);
            let after = text::slice(window, at + marker.chars().count() as i64, text::line_end(window, pos));
            let trailing_space = if after.starts_with(' ') { 1 } else { 0 };
            edits.push(LineEdit {
                pos: at,
                removed: marker.chars().count() as i64 + trailing_space,
                inserted: String::new(),
            });
        }
    }
    return apply_line_edits(window, start, end, edits);
}

// model = "claude-opus-4-5"
// created = "2026-08-03"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! Ranges: the span and effect of one already-applied edit, and the
//! transformer that re-derives every other cursor from it.
//!
//! Whenever any action mutates the buffer, each processed cursor emits one
//! `Range`. Replaying those ranges in application order against every
//! cursor of every *other* user is what keeps all cursors valid and
//! semantically correct under concurrent editing. Spans are recorded in the
//! coordinates that were current when the edit applied (earlier edits of
//! the same batch already folded in), so in-order replay is exact.

use serde::Deserialize;
use serde::Serialize;

use crate::cursor::Cursor;

/// What an edit did to the text at its span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditResult {
    /// The acting cursor's new `[start, end]` relative to the span start.
    /// `select_relative[0]` doubles as the landing offset for any foreign
    /// cursor endpoint the edit consumed.
    pub select_relative: [i64; 2],
    /// Net change in buffer length.
    pub offset: i64,
}

/// The span and effect of one already-applied edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// Lower end of the replaced span, pre-edit.
    pub selection_start: i64,
    /// Upper end of the replaced span, pre-edit.
    pub selection_end: i64,
    /// The edit's effect.
    pub result: EditResult,
}

impl Range {
    pub fn new(selection_start: i64, selection_end: i64, result: EditResult) -> Range {
        return Range {
            selection_start,
            selection_end,
            result,
        };
    }
}

impl Cursor {
    /// How this cursor's endpoints must shift given someone else's
    /// already-applied edit. Returns `[delta_start_side, delta_end_side]`,
    /// to be applied with `select_relative`.
    pub fn adjust_from_range(&self, range: &Range) -> [i64; 2] {
        let s = self.selection_start();
        let e = self.selection_end();
        let rs = range.selection_start;
        let re = range.selection_end;
        let land = range.result.select_relative[0];
        let offset = range.result.offset;

        // 1. Edit fully precedes the cursor: translate both ends.
        if s > re {
            return [offset, offset];
        }

        // 2. Edit overlaps the cursor's start.
        if rs < s && s <= re {
            if e <= re {
                // Cursor fully consumed: collapse to the edit's start.
                return [rs - s, rs - e];
            }
            return [rs - s + land, offset];
        }

        // 3. Edit starts inside the cursor.
        if s <= rs && rs < e {
            if e <= re {
                // Tail consumed: the end lands with the replacement.
                return [0, rs - e + land];
            }
            // Edit is a strict interior subrange: the selection absorbs it.
            return [0, offset];
        }

        // 4. No overlap.
        return [0, 0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deletion(start: i64, end: i64) -> Range {
        return Range::new(
            start,
            end,
            EditResult {
                select_relative: [0, 0],
                offset: start - end,
            },
        );
    }

    fn insertion(at: i64, len: i64) -> Range {
        return Range::new(
            at,
            at,
            EditResult {
                select_relative: [len, len],
                offset: len,
            },
        );
    }

    fn cursor(pivot: i64, position: i64) -> Cursor {
        let mut c = Cursor::new();
        c.select(pivot, position);
        return c;
    }

    #[test]
    fn cursor_after_edit_translates_by_offset() {
        let c = cursor(10, 12);
        assert_eq!(c.adjust_from_range(&deletion(2, 5)), [-3, -3]);
        assert_eq!(c.adjust_from_range(&insertion(4, 7)), [7, 7]);
    }

    #[test]
    fn cursor_inside_deletion_collapses_to_edit_start() {
        let c = cursor(4, 6);
        let deltas = c.adjust_from_range(&deletion(2, 8));
        assert_eq!(deltas, [2 - 4, 2 - 6]);
        let mut c = c;
        c.select_relative(deltas[0], deltas[1]);
        assert_eq!((c.selection_start(), c.selection_end()), (2, 2));
    }

    #[test]
    fn caret_at_insertion_point_stays() {
        let c = cursor(5, 5);
        assert_eq!(c.adjust_from_range(&insertion(5, 3)), [0, 0]);
    }

    #[test]
    fn selection_spanning_insertion_absorbs_it() {
        let c = cursor(2, 9);
        // Insertion strictly inside: start fixed, end grows.
        assert_eq!(c.adjust_from_range(&insertion(5, 3)), [0, 3]);
    }

    #[test]
    fn overlap_of_cursor_start_lands_after_replacement() {
        // Edit [2, 6) replaced with 4 chars; cursor [4, 10).
        let edit = Range::new(
            2,
            6,
            EditResult {
                select_relative: [4, 4],
                offset: 0,
            },
        );
        let c = cursor(4, 10);
        // Start pulled to edit start + landing, end translated by offset.
        assert_eq!(c.adjust_from_range(&edit), [2 - 4 + 4, 0]);
    }

    #[test]
    fn tail_consumed_lands_with_replacement() {
        // Edit [5, 12) deleted; cursor [2, 8) loses its tail.
        let c = cursor(2, 8);
        let deltas = c.adjust_from_range(&deletion(5, 12));
        assert_eq!(deltas, [0, 5 - 8]);
    }

    #[test]
    fn disjoint_preceding_cursor_is_untouched() {
        let c = cursor(0, 2);
        assert_eq!(c.adjust_from_range(&deletion(5, 8)), [0, 0]);
        assert_eq!(c.adjust_from_range(&insertion(7, 2)), [0, 0]);
    }

    #[test]
    fn rtl_cursor_adjusts_like_ltr() {
        // The algebra sees selection_start/end, not pivot/position.
        let ltr = cursor(4, 6);
        let rtl = cursor(6, 4);
        let edit = deletion(2, 8);
        assert_eq!(ltr.adjust_from_range(&edit), rtl.adjust_from_range(&edit));
    }
}

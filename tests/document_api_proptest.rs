// model = "claude-opus-4-5"
// created = "2026-08-05"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! Property-based tests for the edit calculus and history engine.

use proptest::prelude::*;
use tandem::action::Action;
use tandem::cursor::Cursor;
use tandem::document::Document;
use tandem::history::History;
use tandem::history::HistoryEntry;
use tandem::profile::Profile;
use tandem::range::EditResult;
use tandem::range::Range;
use tandem::user::User;
use tandem::user::UserId;

const ALICE: UserId = UserId(1);

fn profile() -> Profile {
    return Profile::new("    ", 4, "//");
}

// =============================================================================
// Test helpers
// =============================================================================

/// One random editing step. Positions are percentages of the buffer length
/// at application time, so every script is valid on every prefix.
#[derive(Clone, Debug)]
enum EditStep {
    Insert { pos_pct: f64, content: String },
    Remove { pos_pct: f64, amount: i64 },
    Move { delta: i64 },
}

fn arbitrary_step() -> impl Strategy<Value = EditStep> {
    let content = prop::collection::vec(
        prop_oneof![
            8 => (b'a'..=b'z').prop_map(|b| b as char),
            1 => Just(' '),
            1 => Just('\n'),
        ],
        1..8,
    )
    .prop_map(|chars| chars.into_iter().collect::<String>());

    return prop_oneof![
        (0.0..=1.0f64, content)
            .prop_map(|(pos_pct, content)| EditStep::Insert { pos_pct, content }),
        (0.0..=1.0f64, prop_oneof![-4..0i64, 1..5i64])
            .prop_map(|(pos_pct, amount)| EditStep::Remove { pos_pct, amount }),
        (-6..6i64).prop_map(|delta| EditStep::Move { delta }),
    ];
}

fn apply_step(doc: &mut Document, step: &EditStep) {
    let len = doc.value().chars().count() as i64;
    match step {
        EditStep::Insert { pos_pct, content } => {
            let pos = ((*pos_pct * len as f64) as i64).min(len);
            doc.apply(ALICE, Action::Select { pivot: pos, position: pos });
            doc.apply(
                ALICE,
                Action::InsertText {
                    text: content.clone(),
                    adjust: 0,
                    select_len: 0,
                },
            );
        }
        EditStep::Remove { pos_pct, amount } => {
            let pos = ((*pos_pct * len as f64) as i64).min(len);
            doc.apply(ALICE, Action::Select { pivot: pos, position: pos });
            doc.apply(ALICE, Action::RemoveText { amount: *amount });
        }
        EditStep::Move { delta } => {
            doc.apply(ALICE, Action::MoveCursors { delta: *delta, highlight: false });
        }
    }
}

// =============================================================================
// Cursor properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// clamp(clamp(c, buf), buf) == clamp(c, buf)
    #[test]
    fn clamp_is_idempotent(
        pivot in -50i64..100,
        position in -50i64..100,
        content in prop::collection::vec(b'a'..=b'z', 0..40),
    ) {
        let buffer = String::from_utf8(content).unwrap();
        let mut cursor = Cursor::new();
        cursor.select(pivot, position);

        cursor.clamp(&buffer);
        let once = cursor;
        cursor.clamp(&buffer);
        prop_assert_eq!(cursor, once);
        prop_assert!(cursor.selection_start() >= 0);
        prop_assert!(cursor.selection_end() <= buffer.len() as i64);
    }

    /// A cursor starting strictly after an edit's span shifts by exactly
    /// the edit's net length delta.
    #[test]
    fn cursor_after_edit_shifts_by_net_delta(
        edit_start in 0i64..50,
        edit_len in 0i64..20,
        replacement_len in 0i64..20,
        gap in 1i64..20,
        width in 0i64..10,
    ) {
        let edit_end = edit_start + edit_len;
        let offset = replacement_len - edit_len;
        let range = Range::new(edit_start, edit_end, EditResult {
            select_relative: [replacement_len, replacement_len],
            offset,
        });

        let mut cursor = Cursor::new();
        cursor.select(edit_end + gap, edit_end + gap + width);
        prop_assert_eq!(cursor.adjust_from_range(&range), [offset, offset]);
    }

    /// A cursor strictly inside a deleted span collapses to the edit start.
    #[test]
    fn cursor_inside_deletion_collapses(
        edit_start in 0i64..50,
        edit_len in 2i64..20,
        inner_a in 1i64..19,
        inner_b in 1i64..19,
    ) {
        let edit_end = edit_start + edit_len;
        let a = edit_start + inner_a.min(edit_len);
        let b = edit_start + inner_b.min(edit_len);
        prop_assume!(a > edit_start || b > edit_start);

        let range = Range::new(edit_start, edit_end, EditResult {
            select_relative: [0, 0],
            offset: -edit_len,
        });
        let mut cursor = Cursor::new();
        cursor.select(a.max(b), a.min(b));
        let deltas = cursor.adjust_from_range(&range);
        cursor.select_relative(deltas[0], deltas[1]);
        prop_assert_eq!(cursor.selection_start(), edit_start);
        prop_assert_eq!(cursor.selection_end(), edit_start);
    }
}

// =============================================================================
// Multi-cursor properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Inserting at two positions yields the same buffer whichever cursor
    /// is processed first: left-to-right accumulation makes the result
    /// order-independent.
    #[test]
    fn multi_cursor_insert_is_order_independent(
        content in prop::collection::vec(b'a'..=b'z', 4..40),
        first_pct in 0.0..1.0f64,
        second_pct in 0.0..1.0f64,
    ) {
        let buffer = String::from_utf8(content).unwrap();
        let len = buffer.len() as i64;
        let p1 = (first_pct * len as f64) as i64;
        let p2 = (second_pct * len as f64) as i64;
        prop_assume!((p1 - p2).abs() > 1);

        let action = Action::InsertText {
            text: "X".to_string(),
            adjust: 0,
            select_len: 0,
        };

        let mut forward = User::new(ALICE);
        forward.cursors.clear();
        forward.cursors.push(Cursor::at(p1));
        forward.cursors.push(Cursor::at(p2));
        let (a, _) = forward.apply_batch(&buffer, &action, &profile());

        let mut backward = User::new(ALICE);
        backward.cursors.clear();
        backward.cursors.push(Cursor::at(p2));
        backward.cursors.push(Cursor::at(p1));
        let (b, _) = backward.apply_batch(&buffer, &action, &profile());

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.len(), buffer.len() + 2);
    }
}

// =============================================================================
// History properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// After any script, undoing everything returns to the seed and
    /// redoing everything reproduces buffer and cursors bit-for-bit.
    #[test]
    fn undo_redo_round_trips(
        steps in prop::collection::vec(arbitrary_step(), 1..25),
    ) {
        let mut doc = Document::new("", profile());
        for step in &steps {
            apply_step(&mut doc, step);
        }

        let value = doc.value().to_string();
        let cursors = doc.export_cursors(ALICE);

        while doc.can_goto(ALICE, -1) {
            doc.undo(ALICE);
        }
        prop_assert_eq!(doc.value(), "");

        while doc.can_goto(ALICE, 1) {
            doc.redo(ALICE);
        }
        prop_assert_eq!(doc.value(), value.as_str());
        prop_assert_eq!(doc.export_cursors(ALICE), cursors);
    }

    /// Tombstoning an entry twice leaves exactly one tombstone.
    #[test]
    fn tombstone_is_idempotent(
        count in 1usize..10,
        target_pct in 0.0..1.0f64,
    ) {
        let mut history = History::new();
        for i in 0..count {
            history.add_entry(
                HistoryEntry::pending(ALICE, Action::InsertText {
                    text: format!("{}", i),
                    adjust: 0,
                    select_len: 0,
                }),
                false,
            );
        }
        let target = ((target_pct * count as f64) as usize).min(count - 1);
        let uuid = history.entries()[target].uuid;

        prop_assert_eq!(history.remove_entry(&uuid), Some(target));
        prop_assert_eq!(history.remove_entry(&uuid), None);
        let tombstones = history.removed().iter().filter(|u| **u == uuid).count();
        prop_assert_eq!(tombstones, 1);
        prop_assert!(history.entries()[target].is_noop());
    }
}

// =============================================================================
// Structural action properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// AddIndent then RemoveIndent on unindented lines is the identity.
    #[test]
    fn indent_round_trips_on_unindented_lines(
        lines in prop::collection::vec(prop::collection::vec(b'a'..=b'z', 0..12), 1..5),
    ) {
        let buffer = lines
            .into_iter()
            .map(|l| String::from_utf8(l).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let mut doc = Document::new(&buffer, profile());
        doc.apply(ALICE, Action::SelectAll);
        doc.apply(ALICE, Action::AddIndent);
        doc.apply(ALICE, Action::RemoveIndent);
        prop_assert_eq!(doc.value(), buffer.as_str());
    }

    /// ToggleComment twice on an initially-uncommented span is the identity.
    #[test]
    fn comment_round_trips_on_uncommented_span(
        lines in prop::collection::vec(
            (0usize..6, prop::collection::vec(b'a'..=b'z', 0..12)),
            1..5,
        ),
    ) {
        let buffer = lines
            .into_iter()
            .map(|(indent, l)| format!("{}{}", " ".repeat(indent), String::from_utf8(l).unwrap()))
            .collect::<Vec<_>>()
            .join("\n");

        let mut doc = Document::new(&buffer, profile());
        doc.apply(ALICE, Action::SelectAll);
        doc.apply(ALICE, Action::ToggleComment);
        doc.apply(ALICE, Action::ToggleComment);
        prop_assert_eq!(doc.value(), buffer.as_str());
    }
}

// model = "claude-opus-4-5"
// created = "2026-08-05"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! End-to-end tests of the document API: editing, multi-cursor batching,
//! undo/redo, and reconciliation against a canonical order.

use tandem::action::Action;
use tandem::document::Document;
use tandem::history::HistoryEntry;
use tandem::profile::Profile;
use tandem::sync::OperationBatch;
use tandem::sync::TextOperations;
use tandem::user::UserId;

const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);

fn doc(initial: &str) -> Document {
    return Document::new(initial, Profile::new("    ", 4, "//"));
}

fn insert(text: &str) -> Action {
    return Action::InsertText {
        text: text.to_string(),
        adjust: 0,
        select_len: 0,
    };
}

fn select(pivot: i64, position: i64) -> Action {
    return Action::Select { pivot, position };
}

// =============================================================================
// Editing scenarios
// =============================================================================

#[test]
fn typing_session() {
    let mut doc = doc("");
    doc.apply(ALICE, insert("fn main"));
    doc.apply(
        ALICE,
        Action::InsertText {
            text: "()".to_string(),
            adjust: -1,
            select_len: 0,
        },
    );
    doc.apply(ALICE, Action::MoveCursors { delta: 1, highlight: false });
    doc.apply(ALICE, insert(" {}"));
    assert_eq!(doc.value(), "fn main() {}");
}

#[test]
fn bracket_wrap_via_apply() {
    let mut doc = doc("hello");
    doc.apply(ALICE, select(0, 5));
    doc.apply(ALICE, insert("("));
    assert_eq!(doc.value(), "(hello)");
    // The wrapped text stays selected inside the pair.
    let cursor = doc.export_cursors(ALICE)[0];
    assert_eq!(cursor.selection_start(), 1);
    assert_eq!(cursor.selection_end(), 6);
}

#[test]
fn indent_round_trip_on_unindented_lines() {
    let mut doc = doc("first\nsecond");
    doc.apply(ALICE, select(0, 12));
    doc.apply(ALICE, Action::AddIndent);
    assert_eq!(doc.value(), "    first\n    second");
    doc.apply(ALICE, Action::RemoveIndent);
    assert_eq!(doc.value(), "first\nsecond");
}

#[test]
fn comment_round_trip_on_uniform_span() {
    let mut doc = doc("let x = 1;\nlet y = 2;");
    doc.apply(ALICE, Action::SelectAll);
    doc.apply(ALICE, Action::ToggleComment);
    assert_eq!(doc.value(), "// let x = 1;\n// let y = 2;");
    doc.apply(ALICE, Action::ToggleComment);
    assert_eq!(doc.value(), "let x = 1;\nlet y = 2;");
}

#[test]
fn multi_cursor_word_edit() {
    let mut doc = doc("one two\none two");
    doc.apply(ALICE, select(0, 3));
    doc.apply(ALICE, Action::CreateNextCursor);
    doc.apply(ALICE, insert("three"));
    assert_eq!(doc.value(), "three two\nthree two");
}

#[test]
fn foreign_user_cursor_survives_heavy_editing() {
    let mut doc = doc("the quick brown fox");
    doc.apply(BOB, select(10, 15)); // "brown"
    doc.apply(ALICE, select(0, 3));
    doc.apply(ALICE, insert("a")); // "a quick brown fox"
    doc.apply(ALICE, Action::MoveCursorsByWord { delta: 1, highlight: false });
    doc.apply(ALICE, insert("er")); // "a quicker brown fox"

    let bob = doc.export_cursors(BOB)[0];
    let start = bob.selection_start() as usize;
    let end = bob.selection_end() as usize;
    assert_eq!(&doc.value()[start..end], "brown");
}

// =============================================================================
// Undo / redo
// =============================================================================

#[test]
fn undo_respects_other_users_edits() {
    let mut doc = doc("");
    doc.apply(ALICE, insert("aaa "));
    doc.apply(BOB, Action::MoveCursorsByDocument { delta: 1, highlight: false });
    doc.apply(BOB, insert("bbb"));
    assert_eq!(doc.value(), "aaa bbb");

    // Alice's undo removes only her own edit.
    assert_eq!(doc.undo(ALICE), "bbb");
    // And her redo restores it.
    assert_eq!(doc.redo(ALICE), "aaa bbb");
}

#[test]
fn undo_redo_with_interleaved_selections() {
    let mut doc = doc("abc");
    doc.apply(ALICE, select(3, 3));
    doc.apply(ALICE, insert("d"));
    doc.apply(ALICE, select(0, 0));
    doc.apply(ALICE, insert("z"));
    assert_eq!(doc.value(), "zabcd");

    doc.undo(ALICE);
    assert_eq!(doc.value(), "abcd");
    doc.undo(ALICE);
    assert_eq!(doc.value(), "abc");
    doc.redo(ALICE);
    assert_eq!(doc.value(), "abcd");
    doc.redo(ALICE);
    assert_eq!(doc.value(), "zabcd");
}

#[test]
fn deep_undo_stack() {
    let mut doc = doc("");
    for i in 0..40 {
        doc.apply(ALICE, insert(&format!("{} ", i)));
    }
    let full = doc.value().to_string();
    for _ in 0..40 {
        doc.undo(ALICE);
    }
    assert_eq!(doc.value(), "");
    for _ in 0..40 {
        doc.redo(ALICE);
    }
    assert_eq!(doc.value(), full);
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Assign canonical revs to a client batch, in order, continuing from
/// `next_rev`.
fn sequence(msg: &TextOperations, next_rev: &mut i64) -> Vec<HistoryEntry> {
    let mut canonical = Vec::new();
    for entry in &msg.operations.add {
        let mut entry = entry.clone();
        entry.rev = *next_rev;
        *next_rev += 1;
        canonical.push(entry);
    }
    return canonical;
}

#[test]
fn two_clients_converge_through_canonical_order() {
    let mut a = doc("abc");
    let mut b = doc("abc");
    let mut next_rev = 0;

    a.apply(ALICE, select(0, 0));
    a.apply(ALICE, insert("X"));
    b.apply(BOB, select(3, 3));
    b.apply(BOB, insert("Y"));

    // The server sequences A's ops first and broadcasts them.
    let canon_a = sequence(&a.serialize_client_text_operations(), &mut next_rev);
    let to_both = TextOperations {
        client_revision: [0, 0],
        server_revision: [2, 0],
        operations: OperationBatch { add: canon_a, remove: vec![] },
    };
    a.read_server_text_operations(&to_both).unwrap();
    b.read_server_text_operations(&to_both).unwrap();
    assert_eq!(a.value(), "Xabc");
    assert_eq!(b.value(), "XabcY");

    // Then B's (already transformed through A's insert).
    let canon_b = sequence(&b.serialize_client_text_operations(), &mut next_rev);
    let to_both = TextOperations {
        client_revision: [2, 0],
        server_revision: [4, 0],
        operations: OperationBatch { add: canon_b, remove: vec![] },
    };
    a.read_server_text_operations(&to_both).unwrap();
    b.read_server_text_operations(&to_both).unwrap();

    assert_eq!(a.value(), "XabcY");
    assert_eq!(b.value(), "XabcY");
    assert_eq!(a.digest(), b.digest());
}

#[test]
fn mismatched_watermark_forces_full_resync() {
    let mut a = doc("abc");
    a.apply(ALICE, insert("x"));

    let stale = TextOperations {
        client_revision: [5, 5],
        server_revision: [9, 9],
        operations: OperationBatch::default(),
    };
    assert!(a.read_server_text_operations(&stale).is_err());

    // Recovery path: the caller cold-loads the server's full log.
    let mut next_rev = 0;
    let mut fresh = doc("abc");
    fresh.apply(ALICE, select(3, 3));
    fresh.apply(ALICE, insert("!"));
    let canonical = sequence(&fresh.serialize_client_text_operations(), &mut next_rev);
    let full = TextOperations {
        client_revision: [0, 0],
        server_revision: [2, 0],
        operations: OperationBatch { add: canonical, remove: vec![] },
    };
    a.load_server_text_operations(&full);
    assert_eq!(a.value(), "abc!");
    assert!(!a.has_pending_operations());
}

// =============================================================================
// Cursor sharing
// =============================================================================

#[test]
fn cursors_export_for_presence_display() {
    let mut a = doc("shared text");
    let mut b = doc("shared text");

    a.apply(ALICE, select(0, 6));
    b.load_cursors(ALICE, &a.export_cursors(ALICE));

    let shown = b.export_cursors(ALICE)[0];
    assert_eq!(shown.selection_start(), 0);
    assert_eq!(shown.selection_end(), 6);
}

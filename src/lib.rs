// model = "claude-opus-4-5"
// created = "2026-08-03"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! Tandem - a concurrent edit calculus and history/reconciliation engine.
//!
//! Multiple users edit one shared buffer with multi-cursor support,
//! per-user undo/redo, and eventual convergence against a server-assigned
//! canonical order. The engine is the pure core: cursor algebra, per-action
//! buffer transforms, multi-cursor batching, the history log, and the
//! client/server reconciliation protocol. Rendering, highlighting and the
//! transport itself live in the embedder.
//!
//! # Quick Start
//!
//! ```
//! use tandem::action::Action;
//! use tandem::document::Document;
//! use tandem::profile::Profile;
//! use tandem::user::UserId;
//!
//! // One document, seeded by the persistence layer.
//! let mut doc = Document::new("Hello!", Profile::default());
//!
//! // Edits go through the sole mutation entry point.
//! let alice = UserId(1);
//! doc.apply(alice, Action::Select { pivot: 5, position: 5 });
//! doc.apply(alice, Action::InsertText {
//!     text: ", World".to_string(),
//!     adjust: 0,
//!     select_len: 0,
//! });
//! assert_eq!(doc.value(), "Hello, World!");
//!
//! // Each user has their own undo.
//! assert_eq!(doc.undo(alice), "Hello!");
//! ```

pub mod action;
pub mod cursor;
pub mod document;
pub mod history;
pub mod profile;
pub mod range;
pub mod sync;
pub mod text;
pub mod user;

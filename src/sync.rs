// model = "claude-opus-4-5"
// created = "2026-08-05"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! The synchronization protocol: reconciling the local history log against
//! the server's canonical order.
//!
//! Pending local entries carry `rev = -1` until the server assigns them a
//! place. `client_revision` and `server_revision` are `[adds, removes]`
//! watermarks: how much of our local lists the server has acknowledged, and
//! how much of the server's log we have seen. A server batch applies only
//! when its echoed client watermark matches ours exactly; on mismatch
//! nothing is touched and the caller must full-resync with
//! `load_server_text_operations`. Partial merges across a mismatch are
//! never attempted.
//!
//! The transport itself is out of scope: `Session` models the coalescing
//! and connectivity state machine, and the embedder moves `TextOperations`
//! values over whatever ordered, reliable channel it has.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::action::Action;
use crate::document::ApplyOutcome;
use crate::document::Document;
use crate::history::HistoryEntry;
use crate::history::Uuid;
use crate::user::UserId;

/// One batch of operations on the wire.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OperationBatch {
    pub add: Vec<HistoryEntry>,
    pub remove: Vec<Uuid>,
}

/// The reconciliation message exchanged with the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextOperations {
    /// `[adds, removes]` acknowledged out of the client's local lists.
    pub client_revision: [u64; 2],
    /// `[adds, removes]` of the server's canonical log.
    pub server_revision: [u64; 2],
    pub operations: OperationBatch,
}

/// Protocol failures. Everything here is recoverable by design.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The server's echoed watermark does not match ours: the call was a
    /// no-op and the caller must request a full resync.
    #[error("client revision mismatch: local {local:?}, echoed {echoed:?}")]
    RevisionMismatch { local: [u64; 2], echoed: [u64; 2] },
}

/// The minimal slice of the log that changed: re-render from `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayWindow {
    pub start: usize,
}

/// Boundary between the acknowledged prefix (`rev >= 0`) and the pending
/// suffix (`rev = -1`). The list is guaranteed partitioned, so a binary
/// search finds the split.
pub fn split_operations(entries: &[HistoryEntry]) -> usize {
    return entries.partition_point(|e| e.rev >= 0);
}

/// An entry reduced to its wire-safe fields: cached value and cursor state
/// stay local, peers recompute them by replay.
fn wire_trim(entry: &HistoryEntry) -> HistoryEntry {
    let mut trimmed = entry.clone();
    trimmed.snapshot = None;
    trimmed.applied = None;
    return trimmed;
}

impl Document {
    /// The pending tail of the local log, wire-trimmed, with the current
    /// watermarks. Produced on the embedder's coalescing timer.
    pub fn serialize_client_text_operations(&self) -> TextOperations {
        let boundary = split_operations(self.history.entries());
        let add = self.history.entries()[boundary..].iter().map(wire_trim).collect();
        let remove = self.history.removed()[self.client_revision[1] as usize..].to_vec();
        return TextOperations {
            client_revision: self.client_revision,
            server_revision: self.server_revision,
            operations: OperationBatch { add, remove },
        };
    }

    /// Whether anything is waiting for acknowledgment.
    pub fn has_pending_operations(&self) -> bool {
        return split_operations(self.history.entries()) < self.history.entries().len()
            || (self.client_revision[1] as usize) < self.history.removed().len();
    }

    /// Merge a server batch into the local log.
    ///
    /// Applies only when the echoed client watermark matches ours exactly.
    /// Server entries overwrite or create local entries by uuid, in server
    /// order; still-pending local entries absent from the batch stay
    /// pending, re-appended after the server's. Server removes go through
    /// the idempotent tombstoning path. Returns the minimal replay window.
    pub fn read_server_text_operations(
        &mut self,
        msg: &TextOperations,
    ) -> Result<ReplayWindow, SyncError> {
        if msg.client_revision != self.client_revision {
            warn!(
                local = ?self.client_revision,
                echoed = ?msg.client_revision,
                "revision mismatch, full resync required"
            );
            return Err(SyncError::RevisionMismatch {
                local: self.client_revision,
                echoed: msg.client_revision,
            });
        }

        let boundary = split_operations(self.history.entries());
        let server_len = msg.operations.add.len();

        // Entries we have never seen: their replay must transform the
        // positions stored in our still-pending operations.
        let fresh: FxHashSet<Uuid> = msg
            .operations
            .add
            .iter()
            .filter(|e| self.history.index_of(&e.uuid).is_none())
            .map(|e| e.uuid)
            .collect();

        if server_len > 0 {
            let mut pending = self.history.add.split_off(boundary);
            for wire in &msg.operations.add {
                if let Some(local) = pending.iter().position(|e| e.uuid == wire.uuid) {
                    pending.remove(local);
                }
                self.history.add.push(wire_trim(wire));
            }
            self.history.add.append(&mut pending);
            self.history.rebuild_lookup();
            // Everything from the boundary on was reordered: its cached
            // state no longer matches its position in the log.
            for entry in &mut self.history.add[boundary..] {
                entry.snapshot = None;
                entry.applied = None;
            }
        }

        let mut first_changed = if server_len > 0 {
            boundary
        } else {
            self.history.entries().len()
        };
        if !msg.operations.remove.is_empty() {
            let acked_removes = self.client_revision[1] as usize;
            for uuid in &msg.operations.remove {
                if let Some(index) = self.history.remove_entry(uuid) {
                    first_changed = first_changed.min(index);
                }
            }
            // Server order is authoritative for the remove list too: the
            // batch's removes become acknowledged, surviving local pending
            // removes stay at the tail.
            let mut tail = self.history.remove.split_off(acked_removes);
            tail.retain(|u| !msg.operations.remove.contains(u));
            self.history.remove.extend(msg.operations.remove.iter().copied());
            self.history.remove.append(&mut tail);
            self.client_revision[1] = (acked_removes + msg.operations.remove.len()) as u64;
        }

        self.client_revision[0] = (boundary + server_len) as u64;
        self.server_revision = msg.server_revision;

        if first_changed < self.history.entries().len() {
            self.reconstitute_with(first_changed, &fresh);
        }
        debug!(
            adds = server_len,
            removes = msg.operations.remove.len(),
            window = first_changed,
            "merged server operations"
        );
        return Ok(ReplayWindow { start: first_changed });
    }

    /// Cold-start path: discard all local state and rebuild from the
    /// server's full log. Also the recovery path after a revision mismatch.
    pub fn load_server_text_operations(&mut self, msg: &TextOperations) {
        self.history.add = msg.operations.add.iter().map(wire_trim).collect();
        self.history.remove = msg.operations.remove.clone();
        self.history.rebuild_lookup();
        self.history.clear_futures();
        self.client_revision = [
            self.history.add.len() as u64,
            self.history.remove.len() as u64,
        ];
        self.server_revision = msg.server_revision;
        self.reconstitute(0);
        debug!(entries = self.history.entries().len(), "cold-loaded server log");
    }
}

/// Transport connectivity, as reported by the embedder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Connected,
    Reconnecting,
}

/// The per-connection state machine: open documents, a dirty set drained on
/// the embedder's coalescing timer, and connectivity. While reconnecting,
/// outbound sync is suspended; operations keep queueing in each document's
/// pending tail and flush after resync.
#[derive(Debug, Default)]
pub struct Session {
    documents: FxHashMap<String, Document>,
    dirty: Vec<String>,
    reconnecting: bool,
}

impl Session {
    pub fn new() -> Session {
        return Session::default();
    }

    pub fn connectivity(&self) -> Connectivity {
        if self.reconnecting {
            return Connectivity::Reconnecting;
        }
        return Connectivity::Connected;
    }

    /// Track a newly opened document.
    pub fn open(&mut self, id: &str, document: Document) {
        self.documents.insert(id.to_string(), document);
    }

    /// Stop tracking a document, returning it for save/close handling.
    pub fn close(&mut self, id: &str) -> Option<Document> {
        self.dirty.retain(|d| d != id);
        return self.documents.remove(id);
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        return self.documents.get(id);
    }

    /// Ids of every open document, for the reconnect refresh request.
    pub fn open_documents(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents.keys().cloned().collect();
        ids.sort();
        return ids;
    }

    fn mark_dirty(&mut self, id: &str) {
        if !self.dirty.iter().any(|d| d == id) {
            self.dirty.push(id.to_string());
        }
    }

    /// Apply an action to an open document and mark it for the next flush.
    pub fn apply(&mut self, id: &str, user_id: UserId, action: Action) -> Option<ApplyOutcome> {
        let outcome = self.documents.get_mut(id)?.apply(user_id, action);
        self.mark_dirty(id);
        return Some(outcome);
    }

    /// Undo on an open document, marking it for the next flush.
    pub fn undo(&mut self, id: &str, user_id: UserId) -> Option<String> {
        let value = self.documents.get_mut(id)?.undo(user_id);
        self.mark_dirty(id);
        return Some(value);
    }

    /// Redo on an open document, marking it for the next flush.
    pub fn redo(&mut self, id: &str, user_id: UserId) -> Option<String> {
        let value = self.documents.get_mut(id)?.redo(user_id);
        self.mark_dirty(id);
        return Some(value);
    }

    /// Merge a server batch into one document.
    pub fn read(&mut self, id: &str, msg: &TextOperations) -> Option<Result<ReplayWindow, SyncError>> {
        return Some(self.documents.get_mut(id)?.read_server_text_operations(msg));
    }

    /// Drain the dirty set into one outbound batch per document. Driven by
    /// the embedder's coalescing timer; produces nothing while
    /// reconnecting, so operations queue instead of being dropped.
    pub fn flush(&mut self) -> Vec<(String, TextOperations)> {
        if self.reconnecting {
            return Vec::new();
        }
        let mut batches = Vec::new();
        for id in std::mem::take(&mut self.dirty) {
            let Some(document) = self.documents.get(&id) else {
                continue;
            };
            if document.has_pending_operations() {
                batches.push((id.clone(), document.serialize_client_text_operations()));
            }
        }
        return batches;
    }

    /// Transport loss: suspend outbound sync.
    pub fn disconnect(&mut self) {
        self.reconnecting = true;
        warn!("transport lost, outbound sync suspended");
    }

    /// Transport restored: resume sync and return the full open-document
    /// list so the server can issue an authoritative refresh. Every open
    /// document is marked dirty so queued operations flush after resync.
    pub fn reconnect(&mut self) -> Vec<String> {
        self.reconnecting = false;
        let ids = self.open_documents();
        for id in &ids {
            self.mark_dirty(id);
        }
        return ids;
    }
}

// model = "claude-opus-4-5"
// created = "2026-08-04"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! The document aggregate: one open document, its users, its history.
//!
//! All mutation funnels through `apply`, `undo`, `redo` and the sync
//! entry points: no shared free variables, one aggregate per open
//! document. Within a process everything here is synchronous; concurrency
//! lives between processes, reconciled by the sync protocol.
//!
//! The current buffer value is maintained incrementally, but the history
//! log is the single source of truth: `reconstitute` rebuilds value and
//! cursors from the nearest checkpoint, and undo, redo, initial load and
//! resync all go through it.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::action::Action;
use crate::cursor::Cursor;
use crate::history::AppliedEffect;
use crate::history::History;
use crate::history::HistoryEntry;
use crate::history::Snapshot;
use crate::history::Uuid;
use crate::profile::Profile;
use crate::range::Range;
use crate::user::User;
use crate::user::UserId;

/// Every this-many entries, the new entry caches a full snapshot so
/// reconstitution never replays far.
pub const CHECKPOINT_INTERVAL: usize = 16;

/// What one `apply` did: the new buffer and the ranges to broadcast.
#[derive(Clone, Debug)]
pub struct ApplyOutcome {
    pub value: String,
    pub ranges: Vec<Range>,
}

/// One open document: buffer, users, history, profile.
#[derive(Clone, Debug)]
pub struct Document {
    value: String,
    users: Vec<User>,
    pub(crate) history: History,
    profile: Profile,
    /// State before the first log entry, from the persistence layer.
    base: Snapshot,
    /// `[adds, removes]` acknowledged by the server out of our local lists.
    pub(crate) client_revision: [u64; 2],
    /// `[adds, removes]` of the server's canonical log we have seen.
    pub(crate) server_revision: [u64; 2],
}

impl Document {
    /// A document seeded with the persistence layer's initial value.
    pub fn new(initial: &str, profile: Profile) -> Document {
        return Document {
            value: initial.to_string(),
            users: Vec::new(),
            history: History::new(),
            profile,
            base: Snapshot {
                value: initial.to_string(),
                cursors: FxHashMap::default(),
            },
            client_revision: [0, 0],
            server_revision: [0, 0],
        };
    }

    /// The current buffer.
    pub fn value(&self) -> &str {
        return &self.value;
    }

    pub fn profile(&self) -> &Profile {
        return &self.profile;
    }

    pub fn history(&self) -> &History {
        return &self.history;
    }

    pub fn user(&self, user_id: UserId) -> Option<&User> {
        return self.users.iter().find(|u| u.id == user_id);
    }

    fn ensure_user(&mut self, user_id: UserId) -> usize {
        if let Some(i) = self.users.iter().position(|u| u.id == user_id) {
            return i;
        }
        self.users.push(User::new(user_id));
        return self.users.len() - 1;
    }

    /// A blake3 digest of the buffer, for cheap convergence checks
    /// between replicas.
    pub fn digest(&self) -> [u8; 32] {
        return *blake3::hash(self.value.as_bytes()).as_bytes();
    }

    /// Full current state: buffer plus every user's cursors.
    pub fn snapshot(&self) -> Snapshot {
        let mut cursors = FxHashMap::default();
        for user in &self.users {
            cursors.insert(user.id, user.cursors.clone());
        }
        return Snapshot {
            value: self.value.clone(),
            cursors,
        };
    }

    /// The sole mutation entry point: apply one action for one user,
    /// batched across all of that user's cursors, and re-derive every
    /// other user's cursors from the resulting ranges.
    pub fn apply(&mut self, user_id: UserId, action: Action) -> ApplyOutcome {
        return self.apply_recorded(user_id, action, false);
    }

    fn apply_recorded(
        &mut self,
        user_id: UserId,
        action: Action,
        preserve_futures: bool,
    ) -> ApplyOutcome {
        self.ensure_user(user_id);
        let entry = HistoryEntry::pending(user_id, action.clone());
        let index = self.history.add_entry(entry, preserve_futures);
        let outcome = self.execute(user_id, &action);
        self.finish_entry(index, &outcome);
        return outcome;
    }

    /// Mutate buffer and cursors for one action, without touching history.
    fn execute(&mut self, user_id: UserId, action: &Action) -> ApplyOutcome {
        let index = self.ensure_user(user_id);
        if action.is_goto_enabled() {
            let (value, ranges) = self.users[index].apply_batch(&self.value, action, &self.profile);
            self.value = value;
            for (i, other) in self.users.iter_mut().enumerate() {
                if i != index {
                    other.adjust_from_ranges(&self.value, &ranges);
                }
            }
            return ApplyOutcome {
                value: self.value.clone(),
                ranges,
            };
        }
        self.users[index].apply_motion(&self.value, action);
        return ApplyOutcome {
            value: self.value.clone(),
            ranges: Vec::new(),
        };
    }

    /// Record where an entry landed and checkpoint on the interval.
    fn finish_entry(&mut self, index: usize, outcome: &ApplyOutcome) {
        if !outcome.ranges.is_empty() {
            let start = outcome
                .ranges
                .iter()
                .map(|r| r.selection_start)
                .min()
                .unwrap_or(0);
            let offset = outcome.ranges.iter().map(|r| r.result.offset).sum();
            self.history.set_applied(index, AppliedEffect { start, offset });
        }
        if (index + 1) % CHECKPOINT_INTERVAL == 0 {
            self.history.set_snapshot(index, self.snapshot());
        }
    }

    /// Whether `amount` steps of time travel are available for the user
    /// (negative = undo, positive = redo).
    pub fn can_goto(&self, user_id: UserId, amount: i64) -> bool {
        return self.history.can_goto(user_id, amount);
    }

    /// Undo one goto-enabled step for the user and return the
    /// reconstituted buffer.
    pub fn undo(&mut self, user_id: UserId) -> String {
        if !self.history.can_goto(user_id, -1) {
            return self.value.clone();
        }
        let changed = self.history.back(user_id, 1);
        if let Some(&first) = changed.iter().min() {
            self.reconstitute(first);
        }
        debug!(user = %user_id, "undo reconstituted");
        return self.value.clone();
    }

    /// Redo one goto-enabled step for the user and return the resulting
    /// buffer. The redone actions become fresh entries at the end of the
    /// log; the tombstones of their originals stay where they were.
    pub fn redo(&mut self, user_id: UserId) -> String {
        let run = self.history.replay(user_id, 1);
        for record in run {
            self.apply_recorded(record.user_id, record.action, true);
        }
        return self.value.clone();
    }

    /// Rebuild buffer and cursors from the log: scan backward from
    /// `from_index` to the nearest checkpoint (or the base state), then
    /// replay every live entry forward. Re-caches interval checkpoints
    /// invalidated by tombstoning along the way.
    pub(crate) fn reconstitute(&mut self, from_index: usize) {
        self.reconstitute_with(from_index, &FxHashSet::default());
    }

    /// Reconstitution with reconciliation support: entries whose uuid is in
    /// `fresh` were merged in from the server and were never seen by this
    /// client's pending operations. After replaying such an entry, the
    /// positions stored in later still-pending entries are re-derived
    /// through the range algebra, so a pending selection keeps pointing at
    /// the text the user meant.
    pub(crate) fn reconstitute_with(&mut self, from_index: usize, fresh: &FxHashSet<Uuid>) {
        let (start, snapshot) = match self.history.checkpoint_before(from_index) {
            Some(i) => (i + 1, self.history.entries()[i].snapshot.clone().expect("checkpoint")),
            None => (0, self.base.clone()),
        };

        self.value = snapshot.value;
        for user in &mut self.users {
            match snapshot.cursors.get(&user.id) {
                Some(cursors) => user.cursors = cursors.clone(),
                None => *user = User::new(user.id),
            }
        }

        for index in start..self.history.entries().len() {
            let entry = &self.history.entries()[index];
            if entry.is_noop() {
                continue;
            }
            let (uuid, user_id, action) = (entry.uuid, entry.user_id, entry.action.clone());
            let outcome = self.execute(user_id, &action);
            self.finish_entry(index, &outcome);
            if fresh.contains(&uuid) && !outcome.ranges.is_empty() {
                self.transform_pending(index + 1, &outcome.ranges);
            }
        }
        debug!(from = from_index, replayed_to = self.history.entries().len(), "reconstituted");
    }

    /// Re-derive the positional arguments of pending entries at or after
    /// `from` through a freshly replayed foreign edit's ranges.
    fn transform_pending(&mut self, from: usize, ranges: &[Range]) {
        for entry in &mut self.history.add[from..] {
            if entry.rev >= 0 {
                continue;
            }
            let (pivot, position) = match &mut entry.action {
                Action::Select { pivot, position } => (pivot, position),
                Action::CreateCursor { pivot, position } => (pivot, position),
                _ => continue,
            };
            let mut cursor = Cursor::new();
            cursor.select(*pivot, *position);
            for range in ranges {
                let deltas = cursor.adjust_from_range(range);
                cursor.select_relative(deltas[0], deltas[1]);
            }
            *pivot = cursor.pivot;
            *position = cursor.position;
        }
    }

    /// A user's cursors, for presence display on peers.
    pub fn export_cursors(&self, user_id: UserId) -> Vec<Cursor> {
        return self
            .user(user_id)
            .map(|u| u.cursors.to_vec())
            .unwrap_or_default();
    }

    /// Replace a user's cursors from a peer's export. Clamped and
    /// collapsed; an empty import resets to a single cursor.
    pub fn load_cursors(&mut self, user_id: UserId, cursors: &[Cursor]) {
        let index = self.ensure_user(user_id);
        let value = self.value.clone();
        let user = &mut self.users[index];
        if cursors.is_empty() {
            user.cursors.clear();
            user.cursors.push(Cursor::new());
        } else {
            user.cursors = cursors.iter().copied().collect();
        }
        user.clamp_all(&value);
        user.collapse_cursors();
    }
}

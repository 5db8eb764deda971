// model = "claude-opus-4-5"
// created = "2026-08-04"
// modified = "2026-08-06"
// driver = "Isaac Clayton"

//! The history log: a globally ordered operation list with per-user
//! undo/redo stacks layered on top.
//!
//! The add list is ordered by application time and entries are never
//! deleted: undoing converts an entry in place to a `NoOp` **tombstone** so
//! every index stays stable, and the entry's uuid is recorded in a parallel
//! remove list for the wire protocol. Most entries are delta-only; an entry
//! carrying a cached `Snapshot` is a **checkpoint**, the anchor that
//! reconstitution replays forward from.

use rand_core::OsRng;
use rand_core::RngCore;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::debug;

use crate::action::Action;
use crate::cursor::Cursor;
use crate::user::UserId;

/// A random 128-bit identifier for one history entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uuid(pub [u8; 16]);

impl Uuid {
    /// Generate a fresh random uuid from the OS RNG.
    pub fn generate() -> Uuid {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        return Uuid(bytes);
    }
}

fn hex(bytes: &[u8]) -> String {
    return bytes.iter().map(|b| format!("{:02x}", b)).collect();
}

impl std::fmt::Debug for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "Uuid({})", hex(&self.0));
    }
}

impl std::fmt::Display for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", hex(&self.0));
    }
}

impl Serialize for Uuid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return serializer.serialize_str(&hex(&self.0));
    }
}

impl<'de> Deserialize<'de> for Uuid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(serde::de::Error::custom("uuid must be 32 hex characters"));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(serde::de::Error::custom)?;
        }
        return Ok(Uuid(bytes));
    }
}

/// A cached full document state: buffer value plus every user's cursors.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub value: String,
    pub cursors: FxHashMap<UserId, SmallVec<[Cursor; 2]>>,
}

/// Where an entry's edit landed when it was applied locally: the lowest
/// affected position and the net length delta. Drives the stored-position
/// remap when the entry is later tombstoned. Never crosses the wire.
#[derive(Clone, Copy, Debug)]
pub struct AppliedEffect {
    pub start: i64,
    pub offset: i64,
}

/// One operation in the global log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Server-assigned position in the canonical order; -1 while pending.
    pub rev: i64,
    pub uuid: Uuid,
    pub user_id: UserId,
    pub action: Action,
    /// Checkpoint cache. Local only: peers recompute by replay.
    #[serde(skip)]
    pub snapshot: Option<Snapshot>,
    /// Landing cache for the tombstone remap. Local only.
    #[serde(skip)]
    pub applied: Option<AppliedEffect>,
}

impl HistoryEntry {
    /// A fresh, unacknowledged entry.
    pub fn pending(user_id: UserId, action: Action) -> HistoryEntry {
        return HistoryEntry {
            rev: -1,
            uuid: Uuid::generate(),
            user_id,
            action,
            snapshot: None,
            applied: None,
        };
    }

    /// True once the entry has been tombstoned (or never did anything).
    pub fn is_noop(&self) -> bool {
        return matches!(self.action, Action::NoOp);
    }
}

/// A lightweight redo record: enough to re-apply, no cached state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FutureEntry {
    pub user_id: UserId,
    pub action: Action,
}

/// The global ordered log plus per-user undo/redo bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct History {
    /// Every operation, in application order. Entries are tombstoned in
    /// place, never removed, so indices stay stable.
    pub(crate) add: Vec<HistoryEntry>,
    /// Uuids of tombstoned entries, in tombstoning order.
    pub(crate) remove: Vec<Uuid>,
    /// uuid → index into `add`.
    index: FxHashMap<Uuid, usize>,
    /// Per-user indices of live entries, oldest first.
    pasts: FxHashMap<UserId, Vec<usize>>,
    /// Per-user redo stacks; the top is the next entry to redo.
    futures: FxHashMap<UserId, Vec<FutureEntry>>,
    /// Per-user uuid of the entry that was on top of pasts at the last
    /// undo. A mismatch means actions happened after that undo.
    breakpoints: FxHashMap<UserId, Option<Uuid>>,
}

impl History {
    pub fn new() -> History {
        return History::default();
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        return &self.add;
    }

    pub fn removed(&self) -> &[Uuid] {
        return &self.remove;
    }

    pub fn index_of(&self, uuid: &Uuid) -> Option<usize> {
        return self.index.get(uuid).copied();
    }

    /// Append an entry to the global log and the user's pasts.
    ///
    /// Goto-enabled entries clear the user's redo stack unless
    /// `preserve_futures` is set (redo itself re-adds entries). Consecutive
    /// identical `Select` entries are deduplicated. Returns the entry's
    /// index in the add list.
    pub fn add_entry(&mut self, entry: HistoryEntry, preserve_futures: bool) -> usize {
        if matches!(entry.action, Action::Select { .. }) {
            if let Some(&last) = self.pasts.get(&entry.user_id).and_then(|p| p.last()) {
                if last == self.add.len() - 1 && self.add[last].action == entry.action {
                    return last;
                }
            }
        }

        if entry.action.is_goto_enabled() && !preserve_futures {
            self.futures.remove(&entry.user_id);
        }

        let index = self.add.len();
        self.index.insert(entry.uuid, index);
        self.pasts.entry(entry.user_id).or_default().push(index);
        self.add.push(entry);
        return index;
    }

    /// Attach the landing cache to an applied entry.
    pub fn set_applied(&mut self, index: usize, effect: AppliedEffect) {
        self.add[index].applied = Some(effect);
    }

    /// Attach a checkpoint snapshot to an entry.
    pub fn set_snapshot(&mut self, index: usize, snapshot: Snapshot) {
        self.add[index].snapshot = Some(snapshot);
    }

    /// Whether the user can travel `amount` steps: negative asks for undo
    /// (needs at least one goto-enabled entry in pasts), positive for redo
    /// (needs a non-empty futures stack).
    pub fn can_goto(&self, user_id: UserId, amount: i64) -> bool {
        if amount > 0 {
            return self.futures.get(&user_id).is_some_and(|f| !f.is_empty());
        }
        return self
            .pasts
            .get(&user_id)
            .is_some_and(|p| p.iter().any(|i| self.add[*i].action.is_goto_enabled()));
    }

    /// Undo: tombstone entries off the user's pasts until `amount`
    /// goto-enabled entries are gone, pushing each popped entry onto the
    /// redo stack as a lightweight record.
    ///
    /// If a redo stack exists but actions happened after the last undo
    /// (the stored breakpoint no longer matches the top of pasts), those
    /// trailing actions are rewound first so the redo stack stays
    /// consistent. Returns the indices of every entry tombstoned.
    pub fn back(&mut self, user_id: UserId, amount: i64) -> Vec<usize> {
        let mut changed = Vec::new();

        let has_futures = self.futures.get(&user_id).is_some_and(|f| !f.is_empty());
        if has_futures {
            let breakpoint = self.breakpoints.get(&user_id).copied().unwrap_or(None);
            while let Some(&top) = self.pasts.get(&user_id).and_then(|p| p.last()) {
                // Only motions can sit past the undo point: goto-enabled
                // adds clear the redo stack.
                if Some(self.add[top].uuid) == breakpoint
                    || self.add[top].action.is_goto_enabled()
                {
                    break;
                }
                debug!(user = %user_id, index = top, "rewinding action past undo point");
                let uuid = self.add[top].uuid;
                if let Some(index) = self.remove_entry(&uuid) {
                    changed.push(index);
                }
            }
        }

        let mut remaining = amount.max(0);
        while remaining > 0 {
            let Some(&top) = self.pasts.get(&user_id).and_then(|p| p.last()) else {
                break;
            };
            let entry = &self.add[top];
            if entry.action.is_goto_enabled() {
                remaining -= 1;
            }
            let record = FutureEntry {
                user_id: entry.user_id,
                action: entry.action.clone(),
            };
            let uuid = entry.uuid;
            self.futures.entry(user_id).or_default().push(record);
            if let Some(index) = self.remove_entry(&uuid) {
                changed.push(index);
            }
        }

        let new_top = self
            .pasts
            .get(&user_id)
            .and_then(|p| p.last())
            .map(|i| self.add[*i].uuid);
        self.breakpoints.insert(user_id, new_top);
        debug!(user = %user_id, tombstoned = changed.len(), "undo");
        return changed;
    }

    /// Redo: pop entries off the user's futures until `amount` goto-enabled
    /// entries are popped, returning the run in original application order
    /// for the caller to re-apply (with `preserve_futures`).
    ///
    /// If the first popped entry is not goto-enabled the redo stack is
    /// desynchronized; the whole popped run is discarded.
    pub fn replay(&mut self, user_id: UserId, amount: i64) -> Vec<FutureEntry> {
        let mut run = Vec::new();
        let mut remaining = amount.max(0);
        while remaining > 0 {
            let Some(record) = self.futures.get_mut(&user_id).and_then(|f| f.pop()) else {
                break;
            };
            if record.action.is_goto_enabled() {
                remaining -= 1;
            }
            run.push(record);
        }
        if !run.first().is_some_and(|r| r.action.is_goto_enabled()) {
            debug!(user = %user_id, dropped = run.len(), "discarding desynchronized redo run");
            return Vec::new();
        }
        // Carry the motion records that followed the last replayed edit, so
        // the next redo starts on a goto-enabled entry again.
        while let Some(record) = self.futures.get_mut(&user_id).and_then(|f| {
            if f.last().is_some_and(|r| !r.action.is_goto_enabled()) {
                return f.pop();
            }
            return None;
        }) {
            run.push(record);
        }
        debug!(user = %user_id, replaying = run.len(), "redo");
        return run;
    }

    /// Tombstone an entry: convert it to `NoOp` in place, drop its cached
    /// state, record its uuid in the remove list, invalidate every later
    /// snapshot (their buffer basis changed), and remap the positions
    /// stored in later `Select` entries by the removed edit's net offset.
    ///
    /// Removing an already-removed (or unknown) entry is a safe no-op.
    /// Returns the entry's index when anything changed.
    pub fn remove_entry(&mut self, uuid: &Uuid) -> Option<usize> {
        let index = self.index.get(uuid).copied()?;
        if self.add[index].is_noop() {
            return None;
        }

        let applied = self.add[index].applied;
        self.add[index].action = Action::NoOp;
        self.add[index].snapshot = None;
        self.remove.push(*uuid);

        for later in &mut self.add[index + 1..] {
            later.snapshot = None;
            if let (Some(effect), Action::Select { pivot, position }) = (applied, &mut later.action)
            {
                remap(pivot, effect);
                remap(position, effect);
            }
        }

        let user_id = self.add[index].user_id;
        if let Some(pasts) = self.pasts.get_mut(&user_id) {
            pasts.retain(|i| *i != index);
        }
        debug!(%uuid, index, "tombstoned history entry");
        return Some(index);
    }

    /// The nearest checkpoint at or before `index`.
    pub fn checkpoint_before(&self, index: usize) -> Option<usize> {
        if self.add.is_empty() {
            return None;
        }
        let from = index.min(self.add.len() - 1);
        return (0..=from).rev().find(|i| self.add[*i].snapshot.is_some());
    }

    /// Boundary between the acknowledged prefix (`rev >= 0`) and the pending
    /// suffix (`rev = -1`).
    pub fn pending_start(&self) -> usize {
        return crate::sync::split_operations(&self.add);
    }

    /// Rebuild the uuid index and per-user pasts from the add list.
    /// Used after reconciliation reorders the log.
    pub(crate) fn rebuild_lookup(&mut self) {
        self.index.clear();
        self.pasts.clear();
        for (i, entry) in self.add.iter().enumerate() {
            self.index.insert(entry.uuid, i);
            if !entry.is_noop() {
                self.pasts.entry(entry.user_id).or_default().push(i);
            }
        }
    }

    /// Drop every redo stack. Used on cold reload.
    pub(crate) fn clear_futures(&mut self) {
        self.futures.clear();
        self.breakpoints.clear();
    }
}

/// Shift a stored position to account for a removed edit: positions past
/// the edit's start lose the edit's net offset.
fn remap(position: &mut i64, effect: AppliedEffect) {
    if *position > effect.start {
        *position = (*position - effect.offset).max(effect.start);
    }
}

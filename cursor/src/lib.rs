/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! The cursor registry: paused executions a client can resume.
//!
//! A cursor is a handle to a suspended pipeline. The registry allocates
//! ids, tracks per-index counts against configured caps, leases cursors
//! exclusively to one reader at a time and reclaims the ones whose idle
//! window expired.
//!
//! Exclusive access is structural: while a cursor is leased, its execution
//! state lives inside the [`CursorGuard`] and nowhere else. Dropping the
//! guard either puts the state back (pause) or destroys it (dispose), so
//! the paired request is freed exactly once on every path.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    /// The per-index cursor cap was reached.
    #[error("Too many cursors allocated for index")]
    CapExceeded,
    /// The id does not name a live cursor.
    #[error("Cursor not found")]
    NotFound,
    /// The cursor is currently leased to another reader. Concurrent reads
    /// of one cursor are a protocol violation, not a reason to wait.
    #[error("Cursor is busy")]
    Leased,
}

/// Registry tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct CursorsConfig {
    /// Idle window applied when a reservation does not name one.
    pub default_max_idle: Duration,
    /// Upper bound a reservation-supplied idle window is clamped to.
    pub max_idle_limit: Duration,
    /// Cap applied to indexes without a declared cap.
    pub default_cap: usize,
}

impl Default for CursorsConfig {
    fn default() -> Self {
        Self {
            default_max_idle: Duration::from_secs(300),
            max_idle_limit: Duration::from_secs(300),
            default_cap: 128,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum LeaseState {
    Paused,
    Leased,
}

struct CursorEntry<T> {
    index: Arc<str>,
    /// The suspended execution. `None` exactly while the cursor is leased,
    /// in which case the state lives in the lessee's [`CursorGuard`].
    exec_state: Option<T>,
    last_used: Instant,
    max_idle: Duration,
    state: LeaseState,
    /// Set by a DEL that raced a lease; honored when the lease ends.
    dispose_pending: bool,
}

impl<T> CursorEntry<T> {
    fn expired(&self, now: Instant) -> bool {
        self.state == LeaseState::Paused
            && now.duration_since(self.last_used) >= self.max_idle
    }
}

struct Inner<T> {
    cursors: HashMap<u64, CursorEntry<T>>,
    /// Live-cursor count per index, next to the index's cap.
    per_index: HashMap<Arc<str>, (usize, usize)>,
    next_id: u64,
}

/// The process-wide cursor registry. `T` is the suspended execution state
/// a cursor owns (the request object of the execution layer).
pub struct CursorRegistry<T> {
    config: CursorsConfig,
    inner: Mutex<Inner<T>>,
}

impl<T> CursorRegistry<T> {
    pub fn new(config: CursorsConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                cursors: HashMap::new(),
                per_index: HashMap::new(),
                // Ids are process-unique and non-guessable across restarts.
                // Zero is reserved as the "no more results" sentinel.
                next_id: rand::rng().random_range(1..=u64::MAX >> 1),
            }),
        }
    }

    /// Declare an index with its cursor cap. Undeclared indexes fall back
    /// to the configured default cap.
    pub fn declare_index(&self, index: impl Into<Arc<str>>, cap: usize) {
        let mut inner = self.lock();
        inner.per_index.entry(index.into()).or_insert((0, cap)).1 = cap;
    }

    /// Reserve a cursor for `index`. The fresh cursor is born leased to the
    /// reserver; the returned guard owns `exec_state` until it is paused or
    /// disposed.
    pub fn reserve(
        self: &Arc<Self>,
        index: impl Into<Arc<str>>,
        max_idle: Option<Duration>,
        exec_state: T,
    ) -> Result<CursorGuard<T>, CursorError> {
        let index = index.into();
        let max_idle = max_idle
            .unwrap_or(self.config.default_max_idle)
            .min(self.config.max_idle_limit);

        let mut inner = self.lock();

        let default_cap = self.config.default_cap;
        let (count, cap) = inner
            .per_index
            .entry(Arc::clone(&index))
            .or_insert((0, default_cap));
        if *count >= *cap {
            tracing::debug!(index = %index, cap = *cap, "cursor reservation refused");
            return Err(CursorError::CapExceeded);
        }
        *count += 1;

        let id = inner.allocate_id();
        inner.cursors.insert(
            id,
            CursorEntry {
                index: Arc::clone(&index),
                exec_state: None,
                last_used: Instant::now(),
                max_idle,
                state: LeaseState::Leased,
                dispose_pending: false,
            },
        );
        drop(inner);

        tracing::debug!(cursor_id = id, index = %index, ?max_idle, "cursor reserved");

        Ok(CursorGuard {
            registry: Arc::clone(self),
            id,
            exec_state: Some(exec_state),
            dispose: false,
        })
    }

    /// Atomically lease a paused cursor for execution. Fails with
    /// [`CursorError::Leased`] while another caller holds the lease.
    pub fn take_for_execution(self: &Arc<Self>, id: u64) -> Result<CursorGuard<T>, CursorError> {
        let mut inner = self.lock();
        let entry = inner.cursors.get_mut(&id).ok_or(CursorError::NotFound)?;

        if entry.state == LeaseState::Leased {
            return Err(CursorError::Leased);
        }
        entry.state = LeaseState::Leased;
        let exec_state = entry.exec_state.take();
        debug_assert!(exec_state.is_some(), "paused cursor without exec state");
        drop(inner);

        Ok(CursorGuard {
            registry: Arc::clone(self),
            id,
            exec_state,
            dispose: false,
        })
    }

    /// Dispose a cursor on demand. A leased cursor is marked for disposal,
    /// which takes effect when the lessee releases it.
    pub fn purge(&self, id: u64) -> Result<(), CursorError> {
        let removed = {
            let mut inner = self.lock();
            let entry = inner.cursors.get_mut(&id).ok_or(CursorError::NotFound)?;

            if entry.state == LeaseState::Leased {
                entry.dispose_pending = true;
                None
            } else {
                Some(inner.remove(id))
            }
        };

        tracing::debug!(cursor_id = id, deferred = removed.is_none(), "cursor purged");
        // The suspended execution state is dropped outside the lock.
        drop(removed);
        Ok(())
    }

    /// Dispose every paused cursor whose idle window has expired. Returns
    /// the number of cursors reclaimed.
    pub fn collect_idle(&self) -> usize {
        let now = Instant::now();
        let removed: Vec<CursorEntry<T>> = {
            let mut inner = self.lock();
            let expired: Vec<u64> = inner
                .cursors
                .iter()
                .filter(|(_, entry)| entry.expired(now))
                .map(|(id, _)| *id)
                .collect();
            expired.into_iter().map(|id| inner.remove(id)).collect()
        };

        let n_freed = removed.len();
        if n_freed > 0 {
            tracing::info!(n_freed, "idle cursors reclaimed");
        }
        drop(removed);
        n_freed
    }

    /// The number of live cursors for `index`.
    pub fn count(&self, index: &str) -> usize {
        let inner = self.lock();
        inner
            .per_index
            .get(index)
            .map(|(count, _)| *count)
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().expect("cursor registry poisoned")
    }
}

impl<T> Inner<T> {
    fn allocate_id(&mut self) -> u64 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1).max(1);
            if !self.cursors.contains_key(&id) {
                return id;
            }
        }
    }

    /// Final step of the dispose protocol: drop the registry's bookkeeping
    /// for `id`. The caller drops the returned entry (and with it the
    /// detached execution state) outside the lock.
    fn remove(&mut self, id: u64) -> CursorEntry<T> {
        let entry = self.cursors.remove(&id).expect("cursor id vanished");
        if let Some((count, _)) = self.per_index.get_mut(&entry.index) {
            *count -= 1;
        }
        entry
    }
}

/// Scoped exclusive access to a leased cursor.
///
/// Exactly one guard exists per leased cursor. Dropping it pauses the
/// cursor (the default); [`CursorGuard::dispose`] destroys it instead.
pub struct CursorGuard<T> {
    registry: Arc<CursorRegistry<T>>,
    id: u64,
    exec_state: Option<T>,
    dispose: bool,
}

impl<T> CursorGuard<T> {
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn exec_state(&self) -> &T {
        self.exec_state.as_ref().expect("guard holds the exec state")
    }

    pub fn exec_state_mut(&mut self) -> &mut T {
        self.exec_state.as_mut().expect("guard holds the exec state")
    }

    /// Release the lease: the cursor returns to `Paused` and its idle clock
    /// restarts.
    pub fn pause(self) {
        drop(self);
    }

    /// Destroy the cursor and its execution state.
    pub fn dispose(mut self) {
        self.dispose = true;
        drop(self);
    }
}

impl<T> Drop for CursorGuard<T> {
    fn drop(&mut self) {
        let exec_state = self.exec_state.take();

        let removed = {
            let mut inner = self.registry.lock();
            let Some(entry) = inner.cursors.get_mut(&self.id) else {
                // Disposed behind our back; nothing to release.
                return;
            };

            if self.dispose || entry.dispose_pending {
                Some(inner.remove(self.id))
            } else {
                entry.exec_state = exec_state;
                entry.state = LeaseState::Paused;
                entry.last_used = Instant::now();
                return;
            }
        };

        tracing::debug!(cursor_id = self.id, "cursor disposed");
        // Both the entry and the (still-detached) exec state drop here,
        // outside the lock.
        drop(removed);
        drop(exec_state);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Per-key mutual exclusion.
//!
//! [`KeyedLock`] hands out one [`Mutex`] per key. Locks are created lazily on
//! first use and live as long as the table itself, so every caller that names
//! the same key always contends on the same lock instance.
//!
//! # Example
//!
//! ```
//! use point_ledger_rs::KeyedLock;
//!
//! let locks = KeyedLock::new();
//! let doubled = locks.with_lock(&"alice", || 21 * 2);
//! assert_eq!(doubled, 42);
//! assert_eq!(locks.len(), 1);
//! ```

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tracing::trace;

/// A table of lazily created, never removed locks keyed by `K`.
///
/// The table's own shard guard is released before waiting on a key's lock,
/// so a thread blocked on one key never holds up lookups for another.
pub struct KeyedLock<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Runs `action` while holding the lock for `key`.
    ///
    /// The lock is released when `action` returns, whatever it returns, and
    /// also when it panics. Acquiring the same key again from inside `action`
    /// deadlocks.
    pub fn with_lock<R>(&self, key: &K, action: impl FnOnce() -> R) -> R {
        let lock = self.handle(key);
        let _guard = lock.lock();
        action()
    }

    /// Number of keys that have a lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Returns the shared lock for `key`, creating it on first use.
    fn handle(&self, key: &K) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(key) {
            return Arc::clone(lock.value());
        }

        // Entry API makes concurrent first-time callers converge on one lock.
        let lock = self.locks.entry(key.clone()).or_insert_with(|| {
            trace!(?key, "creating lock");
            Arc::new(Mutex::new(()))
        });
        Arc::clone(lock.value())
    }
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for KeyedLock<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLock")
            .field("keys", &self.locks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_key_returns_same_lock() {
        let locks = KeyedLock::new();
        let first = locks.handle(&1);
        let second = locks.handle(&1);
        let other = locks.handle(&2);

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn debug_reports_key_count() {
        let locks = KeyedLock::new();
        locks.with_lock(&"alice", || ());
        locks.with_lock(&"bob", || ());
        assert_eq!(format!("{locks:?}"), "KeyedLock { keys: 2 }");
    }

    #[test]
    fn concurrent_first_use_converges_on_one_lock() {
        const NUM_THREADS: usize = 16;

        let locks = Arc::new(KeyedLock::new());
        let barrier = Arc::new(Barrier::new(NUM_THREADS));

        let handles: Vec<_> = (0..NUM_THREADS)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    locks.handle(&7)
                })
            })
            .collect();

        let handles: Vec<Arc<Mutex<()>>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(handles.iter().all(|lock| Arc::ptr_eq(lock, &handles[0])));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn same_key_is_mutually_exclusive() {
        let locks = Arc::new(KeyedLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                thread::spawn(move || {
                    for _ in 0..50 {
                        locks.with_lock(&1, || {
                            if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                                overlaps.fetch_add(1, Ordering::SeqCst);
                            }
                            thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn distinct_keys_do_not_block_each_other() {
        let locks = Arc::new(KeyedLock::new());
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                locks.with_lock(&1, || {
                    held_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                });
            })
        };

        held_rx.recv().unwrap();

        // Key 1 is held for as long as we like; key 2 must still be available.
        let (done_tx, done_rx) = mpsc::channel();
        let other = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                locks.with_lock(&2, || done_tx.send(()).unwrap());
            })
        };
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        other.join().unwrap();
    }

    #[test]
    fn lock_released_after_error() {
        let locks = KeyedLock::new();
        let result: Result<(), &str> = locks.with_lock(&1, || Err("rejected"));
        assert_eq!(result, Err("rejected"));
        assert!(!locks.handle(&1).is_locked());
    }

    #[test]
    fn lock_released_after_panic() {
        let locks = KeyedLock::new();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: i32 = locks.with_lock(&1, || panic!("boom"));
        }));
        assert!(outcome.is_err());
        assert!(!locks.handle(&1).is_locked());
        assert_eq!(locks.with_lock(&1, || 5), 5);
    }
}

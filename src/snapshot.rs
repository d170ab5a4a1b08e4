//! Published prefix snapshot.
//!
//! # Responsibilities
//! - Hold the current prefix set behind a single reference
//! - Apply the install policy (replace / keep previous / accept empty / refuse)
//! - Hand out independent copies to readers
//!
//! # Design Decisions
//! - Readers go through `ArcSwap::load`, which never blocks on a writer
//! - Installs are serialized by a writer mutex so the policy check and the swap
//!   happen as one step
//! - A snapshot is never mutated after it is published; installs swap the whole `Arc`
//! - `close` takes the writer lock, so once it returns no install can land

use arc_swap::ArcSwap;
use ipnetwork::IpNetwork;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::observability::metrics;
use crate::refresh::RefreshError;

/// An immutable, published set of prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    prefixes: Vec<IpNetwork>,
    generation: u64,
    installed_at: Option<SystemTime>,
}

impl Snapshot {
    pub fn prefixes(&self) -> &[IpNetwork] {
        &self.prefixes
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Number of installs that produced this snapshot; 0 before the first install.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn installed_at(&self) -> Option<SystemTime> {
        self.installed_at
    }
}

/// What `install` did with a freshly fetched prefix set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The new set replaced the previous snapshot.
    Replaced { count: usize },
    /// The new set was empty and the non-empty previous snapshot was kept.
    KeptPrevious { previous: usize },
    /// The new set was empty and so was the previous one; the empty set was installed.
    InstalledEmpty,
}

impl InstallOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            InstallOutcome::Replaced { .. } => "replaced",
            InstallOutcome::KeptPrevious { .. } => "kept_previous",
            InstallOutcome::InstalledEmpty => "installed_empty",
        }
    }
}

/// Single-writer, many-reader holder of the current [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    writer: Mutex<()>,
    closed: AtomicBool,
    require_nonempty: bool,
}

impl SnapshotStore {
    /// Create an empty store.
    ///
    /// With `require_nonempty`, an empty install over an empty snapshot is refused.
    pub fn new(require_nonempty: bool) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(()),
            closed: AtomicBool::new(false),
            require_nonempty,
        }
    }

    /// Publish a freshly fetched prefix set according to the install policy.
    pub fn install(&self, prefixes: Vec<IpNetwork>) -> Result<InstallOutcome, RefreshError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::SeqCst) {
            return Err(RefreshError::Stopped);
        }
        let previous = self.current.load_full();

        if prefixes.is_empty() {
            if !previous.is_empty() {
                tracing::warn!(
                    previous_count = previous.len(),
                    "Refresh yielded zero prefixes; keeping previous set"
                );
                return Ok(InstallOutcome::KeptPrevious {
                    previous: previous.len(),
                });
            }
            if self.require_nonempty {
                return Err(RefreshError::FatalEmpty);
            }
            tracing::warn!("Resolved zero prefixes; leaving empty set (will retry)");
            self.publish(&previous, Vec::new());
            return Ok(InstallOutcome::InstalledEmpty);
        }

        let count = prefixes.len();
        self.publish(&previous, prefixes);
        tracing::info!(
            count,
            generation = previous.generation + 1,
            "Installed new prefix set"
        );
        Ok(InstallOutcome::Replaced { count })
    }

    fn publish(&self, previous: &Snapshot, prefixes: Vec<IpNetwork>) {
        metrics::record_prefix_count(prefixes.len());
        self.current.store(Arc::new(Snapshot {
            prefixes,
            generation: previous.generation + 1,
            installed_at: Some(SystemTime::now()),
        }));
    }

    /// Refuse all further installs. Waits for an install in progress to finish.
    pub fn close(&self) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Copy of the current prefixes. Never blocks on an install.
    pub fn read(&self) -> Vec<IpNetwork> {
        self.current.load().prefixes.clone()
    }

    /// The current snapshot itself.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn require_nonempty(&self) -> bool {
        self.require_nonempty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nets(items: &[&str]) -> Vec<IpNetwork> {
        items.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_initial_state_is_empty() {
        let store = SnapshotStore::new(false);
        assert!(store.read().is_empty());
        assert_eq!(store.snapshot().generation(), 0);
        assert_eq!(store.snapshot().installed_at(), None);
    }

    #[test]
    fn test_nonempty_replaces() {
        let store = SnapshotStore::new(true);
        let outcome = store.install(nets(&["10.0.0.0/8", "2600:9000::/28"])).unwrap();
        assert_eq!(outcome, InstallOutcome::Replaced { count: 2 });

        let outcome = store.install(nets(&["192.168.0.0/16"])).unwrap();
        assert_eq!(outcome, InstallOutcome::Replaced { count: 1 });
        assert_eq!(store.read(), nets(&["192.168.0.0/16"]));
        assert_eq!(store.snapshot().generation(), 2);
    }

    #[test]
    fn test_empty_keeps_previous() {
        for require_nonempty in [false, true] {
            let store = SnapshotStore::new(require_nonempty);
            store.install(nets(&["10.0.0.0/8", "172.16.0.0/12"])).unwrap();
            let before = store.snapshot();

            let outcome = store.install(Vec::new()).unwrap();
            assert_eq!(outcome, InstallOutcome::KeptPrevious { previous: 2 });
            assert_eq!(store.read(), nets(&["10.0.0.0/8", "172.16.0.0/12"]));
            assert!(Arc::ptr_eq(&before, &store.snapshot()));
        }
    }

    #[test]
    fn test_empty_at_bootstrap_is_fatal_when_required() {
        let store = SnapshotStore::new(true);
        let err = store.install(Vec::new()).unwrap_err();
        assert!(matches!(err, RefreshError::FatalEmpty));
        assert_eq!(store.snapshot().generation(), 0);
    }

    #[test]
    fn test_empty_at_bootstrap_installed_when_not_required() {
        let store = SnapshotStore::new(false);
        let outcome = store.install(Vec::new()).unwrap();
        assert_eq!(outcome, InstallOutcome::InstalledEmpty);
        assert!(store.read().is_empty());
        assert_eq!(store.snapshot().generation(), 1);
        assert!(store.snapshot().installed_at().is_some());
    }

    #[test]
    fn test_closed_store_refuses_installs() {
        let store = SnapshotStore::new(false);
        store.install(nets(&["10.0.0.0/8"])).unwrap();
        store.close();
        store.close();

        let err = store.install(nets(&["192.168.0.0/16"])).unwrap_err();
        assert!(matches!(err, RefreshError::Stopped));
        assert!(store.is_closed());
        assert_eq!(store.read(), nets(&["10.0.0.0/8"]));
        assert_eq!(store.snapshot().generation(), 1);
    }

    #[test]
    fn test_poisoned_writer_lock_still_installs() {
        let store = Arc::new(SnapshotStore::new(false));
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _writer = poisoner.writer.lock().unwrap();
            panic!("writer panicked while holding the lock");
        })
        .join();
        assert!(store.writer.is_poisoned());

        let outcome = store.install(nets(&["10.0.0.0/8"])).unwrap();
        assert_eq!(outcome, InstallOutcome::Replaced { count: 1 });
        store.close();
        assert!(store.is_closed());
    }

    #[test]
    fn test_read_returns_independent_copy() {
        let store = SnapshotStore::new(false);
        store.install(nets(&["10.0.0.0/8"])).unwrap();

        let mut copy = store.read();
        copy.push("192.0.2.0/24".parse().unwrap());
        copy[0] = "198.51.100.0/24".parse().unwrap();

        assert_eq!(store.read(), nets(&["10.0.0.0/8"]));
    }
}

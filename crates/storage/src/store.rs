//! The capacity-bounded content store.
//!
//! [`ContentStore`] keeps a recency index of every object it holds and
//! enforces its [`CapacityBudget`] on every insert. The capacity check,
//! eviction and the backend write happen under one lock, so no reader ever
//! observes a store over budget or an object that is indexed but not yet
//! written.

use std::sync::Arc;

use hashlink::LinkedHashMap;
use hyrule_primitives::{
    CapacityBudget, Fingerprint, RepoId, RepositoryManifest, RepositoryObject,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::{ObjectBackend, StoreError, StoreResult, metrics::StoreMetrics};

/// What an insert may do when the object does not fit in the free space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Evict least-recently accessed objects until it fits.
    #[default]
    Lru,
    /// Refuse with [`StoreError::InsufficientSpace`].
    Never,
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The object was written, after evicting `evicted` (oldest first).
    Stored { evicted: Vec<Fingerprint> },
    /// The object was already held; its recency was refreshed.
    AlreadyPresent,
}

impl PutOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    NotFound,
}

/// Point-in-time usage figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub objects: usize,
    /// Total payload bytes, whatever the budget unit.
    pub bytes: u64,
    /// Usage in budget units.
    pub used: u64,
    pub budget: CapacityBudget,
    pub manifest_version: u64,
}

impl StoreStats {
    pub fn percent_used(&self) -> f64 {
        self.budget.percent_used(self.used)
    }
}

/// Outcome of an integrity pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub checked: usize,
    /// Records whose content no longer matches their fingerprint.
    pub corrupted: Vec<Fingerprint>,
    /// Indexed objects the backend no longer has.
    pub missing: Vec<Fingerprint>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.corrupted.is_empty() && self.missing.is_empty()
    }
}

#[derive(Debug)]
struct Entry {
    repo: RepoId,
    weight: u64,
    size: u64,
}

/// Index state guarded by the store lock. Front of `index` is least recent.
#[derive(Debug, Default)]
struct State {
    index: LinkedHashMap<Fingerprint, Entry>,
    used: u64,
    bytes: u64,
    manifest: RepositoryManifest,
}

impl State {
    fn insert(&mut self, fingerprint: Fingerprint, entry: Entry) {
        self.manifest.insert(entry.repo.clone(), fingerprint);
        self.track(fingerprint, entry);
    }

    /// Index an object without touching the manifest.
    fn track(&mut self, fingerprint: Fingerprint, entry: Entry) {
        self.used += entry.weight;
        self.bytes += entry.size;
        self.index.insert(fingerprint, entry);
    }

    fn remove(&mut self, fingerprint: &Fingerprint) -> Option<Entry> {
        let entry = self.index.remove(fingerprint)?;
        self.used -= entry.weight;
        self.bytes -= entry.size;
        self.manifest.remove(&entry.repo, fingerprint);
        Some(entry)
    }
}

/// Capacity-bounded store of repository objects.
pub struct ContentStore {
    backend: Box<dyn ObjectBackend>,
    budget: CapacityBudget,
    state: Mutex<State>,
    metrics: StoreMetrics,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl ContentStore {
    /// Open a store over `backend`, rebuilding the index from its records.
    ///
    /// Recency is seeded from modification time, oldest first. Records that
    /// fail to decode or verify are dropped. If the backend holds more than
    /// `budget` allows, least recent objects are evicted until it fits.
    pub fn open(backend: impl ObjectBackend + 'static, budget: CapacityBudget) -> StoreResult<Self> {
        let mut loaded = Vec::new();
        let mut corrupt = Vec::new();
        backend.for_each(&mut |fingerprint, data| {
            match postcard::from_bytes::<RepositoryObject>(data) {
                Ok(object) if object.fingerprint() == *fingerprint && object.verify() => {
                    loaded.push((object.modified_at(), *fingerprint, object));
                }
                _ => corrupt.push(*fingerprint),
            }
            true
        })?;

        for fingerprint in &corrupt {
            warn!(%fingerprint, "Dropping unreadable object record");
            backend.delete(fingerprint)?;
        }

        loaded.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut state = State {
            manifest: RepositoryManifest::from_entries(
                loaded.iter().map(|(_, fingerprint, object)| (object.repo().clone(), *fingerprint)),
            ),
            ..State::default()
        };
        for (_, fingerprint, object) in loaded {
            state.track(
                fingerprint,
                Entry {
                    repo: object.repo().clone(),
                    weight: budget.weight(&object),
                    size: object.size(),
                },
            );
        }

        let store = Self {
            backend: Box::new(backend),
            budget,
            state: Mutex::new(state),
            metrics: StoreMetrics::default(),
        };

        let evicted = store.shrink_to_budget()?;
        let stats = store.stats();
        store.metrics.set_usage(stats.objects, stats.bytes);
        info!(
            objects = stats.objects,
            used = stats.used,
            %budget,
            evicted,
            dropped = corrupt.len(),
            "Opened content store"
        );
        Ok(store)
    }

    /// Insert an object, evicting least recently used objects if needed.
    pub fn put(&self, object: RepositoryObject) -> StoreResult<PutOutcome> {
        self.put_with(object, EvictionPolicy::Lru)
    }

    /// Insert an object under an explicit eviction policy.
    pub fn put_with(
        &self,
        object: RepositoryObject,
        policy: EvictionPolicy,
    ) -> StoreResult<PutOutcome> {
        let fingerprint = object.fingerprint();
        if !object.verify() {
            return Err(StoreError::InvalidObject(fingerprint));
        }
        let weight = self.budget.weight(&object);
        let limit = self.budget.limit();

        let mut state = self.state.lock();

        if state.index.to_back(&fingerprint).is_some() {
            trace!(%fingerprint, "Object already stored");
            return Ok(PutOutcome::AlreadyPresent);
        }

        if weight > limit {
            self.metrics.on_rejected();
            return Err(StoreError::CapacityExceeded {
                fingerprint,
                weight,
                limit,
            });
        }

        let free = limit.saturating_sub(state.used);
        let mut evict = Vec::new();
        if weight > free {
            if policy == EvictionPolicy::Never {
                self.metrics.on_rejected();
                return Err(StoreError::InsufficientSpace {
                    fingerprint,
                    weight,
                    free,
                });
            }

            let mut reclaimed = 0;
            for (victim, entry) in state.index.iter() {
                if free + reclaimed >= weight {
                    break;
                }
                reclaimed += entry.weight;
                evict.push(*victim);
            }
        }

        let data = postcard::to_allocvec(&object)?;
        self.backend.replace(&evict, &fingerprint, &data)?;

        for victim in &evict {
            state.remove(victim);
            debug!(fingerprint = %victim, "Evicted object");
        }
        state.insert(
            fingerprint,
            Entry {
                repo: object.repo().clone(),
                weight,
                size: object.size(),
            },
        );

        self.metrics.on_stored(evict.len());
        self.metrics.set_usage(state.index.len(), state.bytes);
        trace!(%fingerprint, repo = %object.repo(), evicted = evict.len(), "Stored object");

        Ok(PutOutcome::Stored { evicted: evict })
    }

    /// Read an object. Counts as an access.
    pub fn get(&self, fingerprint: &Fingerprint) -> StoreResult<Option<RepositoryObject>> {
        let mut state = self.state.lock();
        if state.index.to_back(fingerprint).is_none() {
            return Ok(None);
        }

        let Some(data) = self.backend.get(fingerprint)? else {
            warn!(%fingerprint, "Indexed object missing from backend");
            state.remove(fingerprint);
            return Ok(None);
        };

        Ok(Some(postcard::from_bytes(&data)?))
    }

    /// Whether the object is held. Does not count as an access.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.state.lock().index.contains_key(fingerprint)
    }

    pub fn delete(&self, fingerprint: &Fingerprint) -> StoreResult<DeleteOutcome> {
        let mut state = self.state.lock();
        if !state.index.contains_key(fingerprint) {
            return Ok(DeleteOutcome::NotFound);
        }

        self.backend.delete(fingerprint)?;
        state.remove(fingerprint);
        self.metrics.set_usage(state.index.len(), state.bytes);

        debug!(%fingerprint, "Deleted object");
        Ok(DeleteOutcome::Removed)
    }

    /// Snapshot of which objects are held, per repository.
    pub fn manifest(&self) -> RepositoryManifest {
        self.state.lock().manifest.clone()
    }

    /// Fingerprints held for one repository, in fingerprint order.
    pub fn list(&self, repo: &RepoId) -> Vec<Fingerprint> {
        self.state
            .lock()
            .manifest
            .repo(repo)
            .map(|r| r.objects.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.lock();
        StoreStats {
            objects: state.index.len(),
            bytes: state.bytes,
            used: state.used,
            budget: self.budget,
            manifest_version: state.manifest.version,
        }
    }

    pub fn budget(&self) -> CapacityBudget {
        self.budget
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-read every indexed object and check it against its fingerprint.
    ///
    /// Does not hold the store lock across reads, so objects deleted or
    /// evicted during the pass are skipped rather than reported.
    pub fn verify(&self) -> StoreResult<VerifyReport> {
        let fingerprints: Vec<Fingerprint> = self.state.lock().index.keys().copied().collect();
        let mut report = VerifyReport::default();

        for fingerprint in fingerprints {
            let data = self.backend.get(&fingerprint)?;
            if !self.contains(&fingerprint) {
                continue;
            }
            report.checked += 1;

            match data {
                None => report.missing.push(fingerprint),
                Some(data) => {
                    let intact = postcard::from_bytes::<RepositoryObject>(&data)
                        .is_ok_and(|o| o.fingerprint() == fingerprint && o.verify());
                    if !intact {
                        report.corrupted.push(fingerprint);
                    }
                }
            }
        }

        Ok(report)
    }

    /// Drop index entries (and any backend records) for objects a
    /// [`VerifyReport`] flagged, so they can be replicated again.
    pub fn purge(&self, report: &VerifyReport) -> StoreResult<usize> {
        let mut purged = 0;
        for fingerprint in report.corrupted.iter().chain(&report.missing) {
            if self.delete(fingerprint)? == DeleteOutcome::Removed {
                purged += 1;
            }
        }
        Ok(purged)
    }

    fn shrink_to_budget(&self) -> StoreResult<usize> {
        let mut state = self.state.lock();
        let mut evicted = 0;
        while state.used > self.budget.limit() {
            let Some(victim) = state.index.keys().next().copied() else {
                break;
            };
            self.backend.delete(&victim)?;
            state.remove(&victim);
            evicted += 1;
        }
        self.metrics.on_evicted(evicted);
        Ok(evicted)
    }

    /// Run `f` against the store on the blocking thread pool.
    ///
    /// Inserts, reads and deletes commit to the backend while holding the
    /// store lock; async callers go through here to keep that off the
    /// runtime's worker threads.
    pub async fn blocking<T, F>(self: &Arc<Self>, f: F) -> StoreResult<T>
    where
        F: FnOnce(&ContentStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|err| StoreError::StorageFailure(format!("store task failed: {err}")))?
    }
}

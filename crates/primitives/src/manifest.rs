//! Manifests: which objects a node holds, per repository.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Fingerprint, RepoId};

/// Objects held for a single repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoManifest {
    /// Incremented on every insert or removal within this repository.
    pub version: u64,
    pub objects: BTreeSet<Fingerprint>,
}

/// Node-wide manifest, ordered by repository id.
///
/// A repository stays listed after its last object is removed, so its
/// version never goes backwards when objects arrive again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryManifest {
    /// Incremented on every store mutation.
    pub version: u64,
    pub repos: BTreeMap<RepoId, RepoManifest>,
}

impl RepositoryManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manifest from an existing set of objects.
    ///
    /// Versions start at the object counts, so a node that restarts with
    /// content never advertises a lower version than an empty peer.
    pub fn from_entries(entries: impl IntoIterator<Item = (RepoId, Fingerprint)>) -> Self {
        let mut manifest = Self::new();
        for (repo, fingerprint) in entries {
            manifest.insert(repo, fingerprint);
        }
        manifest
    }

    /// Record an object. Returns `false` if it was already listed.
    pub fn insert(&mut self, repo: RepoId, fingerprint: Fingerprint) -> bool {
        let entry = self.repos.entry(repo).or_default();
        if !entry.objects.insert(fingerprint) {
            return false;
        }
        entry.version += 1;
        self.version += 1;
        true
    }

    /// Forget an object. Returns `false` if it was not listed.
    pub fn remove(&mut self, repo: &RepoId, fingerprint: &Fingerprint) -> bool {
        let Some(entry) = self.repos.get_mut(repo) else {
            return false;
        };
        if !entry.objects.remove(fingerprint) {
            return false;
        }
        entry.version += 1;
        self.version += 1;
        true
    }

    pub fn repo(&self, repo: &RepoId) -> Option<&RepoManifest> {
        self.repos.get(repo)
    }

    /// Per-repository version, zero for unknown repositories.
    pub fn repo_version(&self, repo: &RepoId) -> u64 {
        self.repos.get(repo).map_or(0, |r| r.version)
    }

    pub fn contains(&self, repo: &RepoId, fingerprint: &Fingerprint) -> bool {
        self.repos
            .get(repo)
            .is_some_and(|r| r.objects.contains(fingerprint))
    }

    /// Total number of objects across all repositories.
    pub fn object_count(&self) -> usize {
        self.repos.values().map(|r| r.objects.len()).sum()
    }

    /// Repositories currently holding at least one object.
    pub fn non_empty_repos(&self) -> impl Iterator<Item = (&RepoId, &RepoManifest)> {
        self.repos.iter().filter(|(_, r)| !r.objects.is_empty())
    }

    /// Whether no objects are listed.
    pub fn is_empty(&self) -> bool {
        self.repos.values().all(|r| r.objects.is_empty())
    }
}

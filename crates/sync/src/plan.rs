//! Reconciliation of two manifests.

use std::collections::BTreeSet;

use hyrule_primitives::{Fingerprint, RepoId, RepositoryManifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Remote-only object, pull it.
    Fetch,
    /// Local-only object, send it.
    Push,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub direction: Direction,
    pub repo: RepoId,
    pub fingerprint: Fingerprint,
}

/// Transfers needed to make two manifests equal, in two phases.
///
/// Per repository, the side with the higher manifest version is
/// authoritative and its direction goes in the first phase. On equal
/// versions neither side is preferred: fetches go first and pushes second,
/// and both sides end up with the union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub first: Vec<Transfer>,
    pub second: Vec<Transfer>,
}

impl SyncPlan {
    pub fn build(local: &RepositoryManifest, remote: &RepositoryManifest) -> Self {
        let empty = BTreeSet::new();
        let repos: BTreeSet<&RepoId> = local.repos.keys().chain(remote.repos.keys()).collect();

        let mut plan = Self::default();
        for repo in repos {
            let ours = local.repo(repo).map_or(&empty, |r| &r.objects);
            let theirs = remote.repo(repo).map_or(&empty, |r| &r.objects);

            let fetches = transfers(Direction::Fetch, repo, theirs.difference(ours));
            let pushes = transfers(Direction::Push, repo, ours.difference(theirs));

            if local.repo_version(repo) > remote.repo_version(repo) {
                plan.first.extend(pushes);
                plan.second.extend(fetches);
            } else {
                plan.first.extend(fetches);
                plan.second.extend(pushes);
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }

    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.first
            .iter()
            .chain(&self.second)
            .filter(|t| t.direction == direction)
            .count()
    }
}

fn transfers<'a>(
    direction: Direction,
    repo: &RepoId,
    fingerprints: impl Iterator<Item = &'a Fingerprint>,
) -> Vec<Transfer> {
    fingerprints
        .map(|fp| Transfer {
            direction,
            repo: repo.clone(),
            fingerprint: *fp,
        })
        .collect()
}

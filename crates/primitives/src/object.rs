//! Repository objects.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Fingerprint;

/// Identifier of the repository an object belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(String);

impl RepoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RepoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An immutable, fingerprinted unit of repository content.
///
/// The fingerprint covers the repository id, the path and the payload. The
/// modification time is metadata only: writing the same content twice yields
/// the same fingerprint regardless of when it was written.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryObject {
    fingerprint: Fingerprint,
    repo: RepoId,
    path: String,
    modified_at: u64,
    payload: Bytes,
}

impl RepositoryObject {
    /// Create an object, computing its fingerprint from the content.
    pub fn new(
        repo: impl Into<RepoId>,
        path: impl Into<String>,
        payload: impl Into<Bytes>,
        modified_at: u64,
    ) -> Self {
        let repo = repo.into();
        let path = path.into();
        let payload = payload.into();
        let fingerprint = Fingerprint::of(repo.as_str(), &path, &payload);
        Self {
            fingerprint,
            repo,
            path,
            modified_at,
            payload,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last modification time in unix milliseconds.
    pub fn modified_at(&self) -> u64 {
        self.modified_at
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }

    /// Whether the carried fingerprint matches the content.
    ///
    /// Objects decoded from disk or from the wire carry their fingerprint
    /// as data, so it must be checked before the object is trusted.
    pub fn verify(&self) -> bool {
        Fingerprint::of(self.repo.as_str(), &self.path, &self.payload) == self.fingerprint
    }
}

impl fmt::Debug for RepositoryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryObject")
            .field("fingerprint", &self.fingerprint)
            .field("repo", &self.repo)
            .field("path", &self.path)
            .field("modified_at", &self.modified_at)
            .field("size", &self.size())
            .finish()
    }
}

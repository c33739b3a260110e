//! Object persistence backends.
//!
//! The [`ObjectBackend`] trait abstracts over where encoded objects live.
//! [`ContentStore`](crate::ContentStore) owns all capacity and recency
//! bookkeeping; a backend only maps fingerprints to bytes.

use std::collections::HashMap;

use hyrule_primitives::Fingerprint;
use parking_lot::RwLock;

use crate::StoreResult;

/// Low-level fingerprint to bytes storage.
///
/// Implementations must be thread-safe. The content store serializes all
/// mutations, so a backend never sees two concurrent writes.
pub trait ObjectBackend: Send + Sync {
    /// Store an encoded object. Overwrites any existing record.
    fn put(&self, fingerprint: &Fingerprint, data: &[u8]) -> StoreResult<()>;

    /// Read an encoded object.
    fn get(&self, fingerprint: &Fingerprint) -> StoreResult<Option<Vec<u8>>>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, fingerprint: &Fingerprint) -> StoreResult<bool>;

    /// Remove `evict` and store `fingerprint` as one unit.
    ///
    /// Backends with transactions should override this so that a crash
    /// never leaves the evictions applied without the insert.
    fn replace(
        &self,
        evict: &[Fingerprint],
        fingerprint: &Fingerprint,
        data: &[u8],
    ) -> StoreResult<()> {
        for victim in evict {
            self.delete(victim)?;
        }
        self.put(fingerprint, data)
    }

    /// Visit every record. Return `false` from the callback to stop.
    fn for_each(
        &self,
        callback: &mut dyn FnMut(&Fingerprint, &[u8]) -> bool,
    ) -> StoreResult<()>;
}

/// Volatile backend for `--storage.memory` and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<Fingerprint, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectBackend for MemoryBackend {
    fn put(&self, fingerprint: &Fingerprint, data: &[u8]) -> StoreResult<()> {
        self.objects.write().insert(*fingerprint, data.to_vec());
        Ok(())
    }

    fn get(&self, fingerprint: &Fingerprint) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.objects.read().get(fingerprint).cloned())
    }

    fn delete(&self, fingerprint: &Fingerprint) -> StoreResult<bool> {
        Ok(self.objects.write().remove(fingerprint).is_some())
    }

    fn for_each(
        &self,
        callback: &mut dyn FnMut(&Fingerprint, &[u8]) -> bool,
    ) -> StoreResult<()> {
        let objects = self.objects.read();
        for (fingerprint, data) in objects.iter() {
            if !callback(fingerprint, data) {
                break;
            }
        }
        Ok(())
    }
}

impl<B: ObjectBackend + ?Sized> ObjectBackend for std::sync::Arc<B> {
    fn put(&self, fingerprint: &Fingerprint, data: &[u8]) -> StoreResult<()> {
        (**self).put(fingerprint, data)
    }

    fn get(&self, fingerprint: &Fingerprint) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(fingerprint)
    }

    fn delete(&self, fingerprint: &Fingerprint) -> StoreResult<bool> {
        (**self).delete(fingerprint)
    }

    fn replace(
        &self,
        evict: &[Fingerprint],
        fingerprint: &Fingerprint,
        data: &[u8],
    ) -> StoreResult<()> {
        (**self).replace(evict, fingerprint, data)
    }

    fn for_each(
        &self,
        callback: &mut dyn FnMut(&Fingerprint, &[u8]) -> bool,
    ) -> StoreResult<()> {
        (**self).for_each(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(n: u8) -> Fingerprint {
        Fingerprint::new([n; 32])
    }

    #[test]
    fn test_put_get_delete() {
        let backend = MemoryBackend::new();
        backend.put(&fp(1), b"one").unwrap();

        assert_eq!(backend.get(&fp(1)).unwrap(), Some(b"one".to_vec()));
        assert!(backend.delete(&fp(1)).unwrap());
        assert!(!backend.delete(&fp(1)).unwrap());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_default_replace() {
        let backend = MemoryBackend::new();
        backend.put(&fp(1), b"one").unwrap();
        backend.put(&fp(2), b"two").unwrap();

        backend.replace(&[fp(1), fp(2)], &fp(3), b"three").unwrap();

        assert_eq!(backend.len(), 1);
        assert!(backend.get(&fp(3)).unwrap().is_some());
    }

    #[test]
    fn test_for_each_stops() {
        let backend = MemoryBackend::new();
        for i in 0..5 {
            backend.put(&fp(i), b"x").unwrap();
        }

        let mut seen = 0;
        backend
            .for_each(&mut |_, _| {
                seen += 1;
                seen < 2
            })
            .unwrap();
        assert_eq!(seen, 2);
    }
}

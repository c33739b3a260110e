//! redb-based object backend.

use std::path::Path;

use hyrule_primitives::Fingerprint;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::{ObjectBackend, StoreResult};

/// Key: 32-byte fingerprint. Value: postcard-encoded object.
const OBJECTS_TABLE: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("objects");

/// Persistent backend on a single redb file.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = Database::create(path.as_ref())?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(OBJECTS_TABLE)?;
        }
        write_txn.commit()?;

        debug!(path = %path.as_ref().display(), "Opened redb object backend");
        Ok(Self { db })
    }
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend").finish_non_exhaustive()
    }
}

impl ObjectBackend for RedbBackend {
    fn put(&self, fingerprint: &Fingerprint, data: &[u8]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(OBJECTS_TABLE)?;
            table.insert(fingerprint.as_bytes(), data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get(&self, fingerprint: &Fingerprint) -> StoreResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OBJECTS_TABLE)?;
        Ok(table
            .get(fingerprint.as_bytes())?
            .map(|value| value.value().to_vec()))
    }

    fn delete(&self, fingerprint: &Fingerprint) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(OBJECTS_TABLE)?;
            table.remove(fingerprint.as_bytes())?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn replace(
        &self,
        evict: &[Fingerprint],
        fingerprint: &Fingerprint,
        data: &[u8],
    ) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(OBJECTS_TABLE)?;
            for victim in evict {
                table.remove(victim.as_bytes())?;
            }
            table.insert(fingerprint.as_bytes(), data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn for_each(
        &self,
        callback: &mut dyn FnMut(&Fingerprint, &[u8]) -> bool,
    ) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OBJECTS_TABLE)?;

        for entry in table.iter()? {
            let (key, value) = entry?;
            let fingerprint = Fingerprint::new(*key.value());
            if !callback(&fingerprint, value.value()) {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fp(n: u8) -> Fingerprint {
        Fingerprint::new([n; 32])
    }

    #[test]
    fn test_put_get() {
        let dir = tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("objects.redb")).unwrap();

        backend.put(&fp(1), b"hello world").unwrap();
        assert_eq!(backend.get(&fp(1)).unwrap(), Some(b"hello world".to_vec()));
        assert_eq!(backend.get(&fp(2)).unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("objects.redb")).unwrap();

        backend.put(&fp(3), b"data").unwrap();
        assert!(backend.delete(&fp(3)).unwrap());
        assert!(!backend.delete(&fp(3)).unwrap());
        assert_eq!(backend.get(&fp(3)).unwrap(), None);
    }

    #[test]
    fn test_replace_is_atomic_unit() {
        let dir = tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("objects.redb")).unwrap();

        backend.put(&fp(1), b"one").unwrap();
        backend.put(&fp(2), b"two").unwrap();
        backend.replace(&[fp(1)], &fp(3), b"three").unwrap();

        let mut keys = Vec::new();
        backend
            .for_each(&mut |key, _| {
                keys.push(*key);
                true
            })
            .unwrap();
        keys.sort();
        assert_eq!(keys, vec![fp(2), fp(3)]);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("objects.redb");
        {
            let backend = RedbBackend::open(&path).unwrap();
            backend.put(&fp(4), b"persisted").unwrap();
        }

        let backend = RedbBackend::open(&path).unwrap();
        assert_eq!(backend.get(&fp(4)).unwrap(), Some(b"persisted".to_vec()));
    }
}

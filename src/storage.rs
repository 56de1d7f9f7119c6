//! Storage backends for the index.
//!
//! Two logical keyspaces share one store: raw city records keyed by
//! identity, and cell-token buckets of index entries. The trait abstracts
//! the backing so the index can run fully in memory or against a snapshot
//! file that survives process restarts.

use crate::error::{GeoAnchorError, Result};
use crate::types::CityRecord;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Discriminates the two keyspaces stored side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyGroup {
    /// `(source, id) -> CityRecord` point lookups.
    CityRecords,
    /// `cell token -> Vec<IndexEntry>` spatial buckets.
    CellBuckets,
}

impl KeyGroup {
    /// Stable key prefix. Must never contain the key delimiter.
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyGroup::CityRecords => "city",
            KeyGroup::CellBuckets => "cell",
        }
    }
}

/// Composite store key: a group discriminator plus a name.
///
/// Encodes as `"<group>:<name>"`. The group prefix never contains the
/// delimiter, so decoding splits on the first `:` and keeps the remainder
/// as the name verbatim, so names are free to contain the delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub group: KeyGroup,
    pub name: String,
}

impl StoreKey {
    /// Identity key for a raw city record.
    pub fn city(source_name: &str, id: &str) -> Self {
        Self {
            group: KeyGroup::CityRecords,
            name: CityRecord::id_phrase(source_name, id),
        }
    }

    /// Bucket key for a cell token.
    pub fn bucket(token: &str) -> Self {
        Self {
            group: KeyGroup::CellBuckets,
            name: token.to_string(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}", self.group.prefix(), self.name)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let (prefix, name) = raw.split_once(':').ok_or_else(|| {
            GeoAnchorError::InvalidInput(format!("store key without a group: [{}]", raw))
        })?;

        let group = match prefix {
            "city" => KeyGroup::CityRecords,
            "cell" => KeyGroup::CellBuckets,
            other => {
                return Err(GeoAnchorError::InvalidInput(format!(
                    "unrecognized key group: [{}]",
                    other
                )));
            }
        };

        if name.is_empty() {
            return Err(GeoAnchorError::InvalidInput(format!(
                "store key without a name: [{}]",
                raw
            )));
        }

        Ok(Self {
            group,
            name: name.to_string(),
        })
    }
}

/// Storage backend statistics.
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    pub key_count: usize,
    /// Approximate payload size.
    pub size_bytes: usize,
    /// Write operations performed.
    pub operations_count: u64,
}

/// Trait for record-store implementations.
///
/// Values are opaque byte payloads; the index layers its own encoding on
/// top. Implementations must tolerate `get` on absent keys by returning
/// `Ok(None)`.
pub trait RecordStore: Send + Sync {
    /// Insert or replace a value.
    fn put(&mut self, key: &StoreKey, value: &[u8]) -> Result<()>;

    /// Fetch a value; `Ok(None)` when the key is absent.
    fn get(&self, key: &StoreKey) -> Result<Option<Bytes>>;

    fn contains(&self, key: &StoreKey) -> Result<bool>;

    /// Total number of keys across both groups.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterate over every `(encoded key, value)` pair.
    fn iter(&self) -> Result<Box<dyn Iterator<Item = (String, Bytes)> + '_>>;

    /// Flush pending writes to durable storage.
    fn sync(&mut self) -> Result<()>;

    /// Release the backend; further use is implementation-defined.
    fn close(&mut self) -> Result<()>;

    fn stats(&self) -> Result<StorageStats>;
}

/// In-memory store backed by an ordered map: the lighter variant for
/// indexes that never outlive the process.
pub struct MemoryStore {
    data: BTreeMap<String, Bytes>,
    operations: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            operations: 0,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn put(&mut self, key: &StoreKey, value: &[u8]) -> Result<()> {
        self.data
            .insert(key.encode(), Bytes::copy_from_slice(value));
        self.operations += 1;
        Ok(())
    }

    fn get(&self, key: &StoreKey) -> Result<Option<Bytes>> {
        Ok(self.data.get(&key.encode()).cloned())
    }

    fn contains(&self, key: &StoreKey) -> Result<bool> {
        Ok(self.data.contains_key(&key.encode()))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.data.len())
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = (String, Bytes)> + '_>> {
        Ok(Box::new(
            self.data.iter().map(|(k, v)| (k.clone(), v.clone())),
        ))
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.data.clear();
        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            key_count: self.data.len(),
            size_bytes: self.data.iter().map(|(k, v)| k.len() + v.len()).sum(),
            operations_count: self.operations,
        })
    }
}

/// Snapshot-file store: the full working set lives in memory and is
/// persisted as a single bincode snapshot on `sync` and `close`.
pub struct FileStore {
    path: PathBuf,
    data: BTreeMap<String, Vec<u8>>,
    operations: u64,
    dirty: bool,
}

impl FileStore {
    /// Open a store at `path`, loading an existing snapshot if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = match File::open(&path) {
            Ok(file) => {
                if file.metadata()?.len() == 0 {
                    BTreeMap::new()
                } else {
                    let reader = BufReader::new(file);
                    bincode::deserialize_from(reader)?
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        log::debug!(
            "opened file store at [{}] with {} keys",
            path.display(),
            data.len()
        );

        Ok(Self {
            path,
            data,
            operations: 0,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(&self) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        bincode::serialize_into(&mut writer, &self.data)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|err| err.into_error())?
            .sync_all()?;

        Ok(())
    }
}

impl RecordStore for FileStore {
    fn put(&mut self, key: &StoreKey, value: &[u8]) -> Result<()> {
        self.data.insert(key.encode(), value.to_vec());
        self.operations += 1;
        self.dirty = true;
        Ok(())
    }

    fn get(&self, key: &StoreKey) -> Result<Option<Bytes>> {
        Ok(self
            .data
            .get(&key.encode())
            .map(|v| Bytes::copy_from_slice(v)))
    }

    fn contains(&self, key: &StoreKey) -> Result<bool> {
        Ok(self.data.contains_key(&key.encode()))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.data.len())
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = (String, Bytes)> + '_>> {
        Ok(Box::new(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), Bytes::copy_from_slice(v))),
        ))
    }

    fn sync(&mut self) -> Result<()> {
        if self.dirty {
            self.write_snapshot()?;
            self.dirty = false;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.sync()?;
        log::debug!("closing file store at [{}]", self.path.display());
        self.data.clear();
        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            key_count: self.data.len(),
            size_bytes: self.data.iter().map(|(k, v)| k.len() + v.len()).sum(),
            operations_count: self.operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_round_trip() {
        let key = StoreKey::city("GeoNames", "4989005");
        assert_eq!(key.encode(), "city:GeoNames,4989005");
        assert_eq!(StoreKey::decode(&key.encode()).unwrap(), key);

        let key = StoreKey::bucket("8824c5cc");
        assert_eq!(key.encode(), "cell:8824c5cc");
        assert_eq!(StoreKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn test_store_key_name_may_contain_delimiter() {
        let key = StoreKey {
            group: KeyGroup::CityRecords,
            name: "Odd:Source,42".to_string(),
        };
        let decoded = StoreKey::decode(&key.encode()).unwrap();
        assert_eq!(decoded.name, "Odd:Source,42");
    }

    #[test]
    fn test_store_key_decode_rejects_garbage() {
        assert!(StoreKey::decode("no-delimiter").is_err());
        assert!(StoreKey::decode("bogus:name").is_err());
        assert!(StoreKey::decode("city:").is_err());
    }

    #[test]
    fn test_memory_store_basic_ops() {
        let mut store = MemoryStore::new();
        let key = StoreKey::bucket("8824c");

        assert!(store.get(&key).unwrap().is_none());
        store.put(&key, b"payload").unwrap();

        assert_eq!(store.get(&key).unwrap().unwrap().as_ref(), b"payload");
        assert!(store.contains(&key).unwrap());
        assert_eq!(store.len().unwrap(), 1);
        assert!(!store.is_empty().unwrap());

        store.put(&key, b"replaced").unwrap();
        assert_eq!(store.get(&key).unwrap().unwrap().as_ref(), b"replaced");
        assert_eq!(store.len().unwrap(), 1);

        let stats = store.stats().unwrap();
        assert_eq!(stats.key_count, 1);
        assert_eq!(stats.operations_count, 2);
    }

    #[test]
    fn test_memory_store_iter() {
        let mut store = MemoryStore::new();
        store.put(&StoreKey::bucket("aa"), b"1").unwrap();
        store.put(&StoreKey::city("GeoNames", "1"), b"2").unwrap();

        let pairs: Vec<_> = store.iter().unwrap().collect();
        assert_eq!(pairs.len(), 2);
        // BTreeMap keeps keys ordered.
        assert!(pairs[0].0 < pairs[1].0);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        let key = StoreKey::city("GeoNames", "5011148");
        {
            let mut store = FileStore::open(&path).unwrap();
            store.put(&key, b"sterling heights").unwrap();
            store.close().unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(
            store.get(&key).unwrap().unwrap().as_ref(),
            b"sterling heights"
        );
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_file_store_opens_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path().join("missing.bin")).unwrap();
        assert!(store.is_empty().unwrap());

        let empty = dir.path().join("empty.bin");
        File::create(&empty).unwrap();
        let store = FileStore::open(&empty).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_file_store_sync_only_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        let mut store = FileStore::open(&path).unwrap();
        store.sync().unwrap();
        // Nothing written yet; the snapshot file was never created.
        assert!(!path.exists());

        store.put(&StoreKey::bucket("aa"), b"1").unwrap();
        store.sync().unwrap();
        assert!(path.exists());
    }
}

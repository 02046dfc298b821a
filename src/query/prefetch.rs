//! Materialized ("prefetched") query result sets.
//!
//! A completed query run stores its ordered result-key list exactly once
//! under a fresh job UUID; the record is frozen afterwards and may be read
//! by any number of reloads, which replay it without re-evaluating any
//! predicate.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::query::schema::data::VariantKey;

/// Identity of one result row: the case it came from plus the variant key.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ResultKey {
    /// Name of the case.
    pub case_name: String,
    /// Key of the variant record.
    pub variant: VariantKey,
}

/// The frozen, ordered result of one completed query run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PrefetchedResult {
    /// Job UUID the result set is stored under.
    pub sodar_uuid: uuid::Uuid,
    /// Name of the case or cohort the query ran against.
    pub target: String,
    /// Creation time.
    pub created: chrono::DateTime<chrono::Utc>,
    /// Ordered keys of the passing rows.
    pub result_keys: Vec<ResultKey>,
}

/// Error type for result set storage.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No result set stored under the job UUID.
    #[error("result set {0} not found")]
    NotFound(uuid::Uuid),
    /// A result set was already stored under the job UUID; result sets are
    /// write-once.
    #[error("result set {0} already stored")]
    AlreadyStored(uuid::Uuid),
    /// Problem accessing the underlying storage.
    #[error("problem accessing result set storage: {0}")]
    Io(#[from] std::io::Error),
    /// Problem decoding a stored result set.
    #[error("problem decoding result set: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Storage collaborator for materialized result sets (write once, read
/// many).
pub trait ResultSetStore {
    /// Store the result set under its job UUID; fails if the UUID is taken.
    fn save(&self, result: &PrefetchedResult) -> Result<(), Error>;
    /// Load the result set stored under the job UUID.
    fn load(&self, job_id: uuid::Uuid) -> Result<PrefetchedResult, Error>;
}

/// Result sets as JSON files in a directory, one file per job UUID.
#[derive(Debug, Clone)]
pub struct FsResultSetStore {
    path: PathBuf,
}

impl FsResultSetStore {
    /// Use the given directory (created on first save).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn file_path(&self, job_id: uuid::Uuid) -> PathBuf {
        self.path.join(format!("{}.json", job_id))
    }
}

impl ResultSetStore for FsResultSetStore {
    fn save(&self, result: &PrefetchedResult) -> Result<(), Error> {
        std::fs::create_dir_all(&self.path)?;
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.file_path(result.sodar_uuid))
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    Error::AlreadyStored(result.sodar_uuid)
                } else {
                    Error::Io(e)
                }
            })?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer(&mut writer, result)?;
        writer.flush()?;
        Ok(())
    }

    fn load(&self, job_id: uuid::Uuid) -> Result<PrefetchedResult, Error> {
        let file = std::fs::File::open(self.file_path(job_id)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(job_id)
            } else {
                Error::Io(e)
            }
        })?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// In-memory result set store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemResultSetStore {
    results: RwLock<HashMap<uuid::Uuid, PrefetchedResult>>,
}

impl ResultSetStore for MemResultSetStore {
    fn save(&self, result: &PrefetchedResult) -> Result<(), Error> {
        let mut results = self.results.write().expect("lock poisoned");
        if results.contains_key(&result.sodar_uuid) {
            return Err(Error::AlreadyStored(result.sodar_uuid));
        }
        results.insert(result.sodar_uuid, result.clone());
        Ok(())
    }

    fn load(&self, job_id: uuid::Uuid) -> Result<PrefetchedResult, Error> {
        self.results
            .read()
            .expect("lock poisoned")
            .get(&job_id)
            .cloned()
            .ok_or(Error::NotFound(job_id))
    }
}

#[cfg(test)]
mod test {
    use super::{
        Error, FsResultSetStore, MemResultSetStore, PrefetchedResult, ResultKey, ResultSetStore,
    };
    use crate::query::schema::data::VariantKey;

    fn example_result() -> PrefetchedResult {
        PrefetchedResult {
            sodar_uuid: uuid::Uuid::new_v4(),
            target: String::from("trio"),
            created: chrono::Utc::now(),
            result_keys: vec![ResultKey {
                case_name: String::from("trio"),
                variant: VariantKey {
                    release: String::from("GRCh37"),
                    chrom: String::from("1"),
                    start: 100,
                    reference: String::from("A"),
                    alternative: String::from("T"),
                },
            }],
        }
    }

    #[test]
    fn mem_store_round_trip() -> Result<(), Error> {
        let store = MemResultSetStore::default();
        let result = example_result();

        store.save(&result)?;
        assert_eq!(store.load(result.sodar_uuid)?, result);

        Ok(())
    }

    #[test]
    fn mem_store_is_write_once() {
        let store = MemResultSetStore::default();
        let result = example_result();

        store.save(&result).expect("first save");
        assert!(matches!(
            store.save(&result),
            Err(Error::AlreadyStored(_))
        ));
    }

    #[test]
    fn mem_store_unknown_job_is_not_found() {
        let store = MemResultSetStore::default();
        assert!(matches!(
            store.load(uuid::Uuid::new_v4()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn fs_store_round_trip() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::TempDir::new()?;
        let store = FsResultSetStore::new(tmp_dir.path().join("results"));
        let result = example_result();

        store.save(&result)?;
        assert_eq!(store.load(result.sodar_uuid)?, result);

        Ok(())
    }

    #[test]
    fn fs_store_is_write_once() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::TempDir::new()?;
        let store = FsResultSetStore::new(tmp_dir.path());
        let result = example_result();

        store.save(&result)?;
        assert!(matches!(
            store.save(&result),
            Err(Error::AlreadyStored(_))
        ));

        Ok(())
    }

    #[test]
    fn fs_store_unknown_job_is_not_found() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::TempDir::new()?;
        let store = FsResultSetStore::new(tmp_dir.path());

        assert!(matches!(
            store.load(uuid::Uuid::new_v4()),
            Err(Error::NotFound(_))
        ));

        Ok(())
    }
}

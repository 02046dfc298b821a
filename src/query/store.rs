//! Variant store and conservation collaborators.
//!
//! The query engine reads the annotated variant relation through these
//! traits; the in-memory implementations back the command line interface
//! from JSONL/TSV files.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use indexmap::IndexMap;

use crate::common::canonical_chrom;
use crate::query::schema::data::{VariantKey, VariantRecord};

/// Error type for store access.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The case has no variant set; filtering without genotypes is a fatal
    /// configuration error, not an empty result.
    #[error("no variant set for case {0}")]
    NoVariantSet(String),
    /// A requested record is not in the case's variant set.
    #[error("variant {key} not in variant set of case {case}")]
    UnknownVariant {
        /// Key of the missing record.
        key: String,
        /// Name of the case.
        case: String,
    },
    /// Problem accessing the underlying storage.
    #[error("problem accessing variant store: {0}")]
    Io(#[from] std::io::Error),
    /// Problem decoding a stored record.
    #[error("problem decoding variant record: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read access to the annotated variant relation of cases.
pub trait VariantStore {
    /// Return all records of the case's variant set.
    fn case_records(&self, case_name: &str) -> Result<Vec<VariantRecord>, Error>;
    /// Fetch specific records of a case by key, for result-set replay.
    fn records_by_keys(
        &self,
        case_name: &str,
        keys: &[VariantKey],
    ) -> Result<Vec<VariantRecord>, Error>;
}

/// Variant sets held in memory, keyed by case name.
#[derive(Debug, Default)]
pub struct MemVariantStore {
    sets: IndexMap<String, Vec<VariantRecord>>,
}

impl MemVariantStore {
    /// Register the variant set of one case.
    pub fn insert(&mut self, case_name: &str, records: Vec<VariantRecord>) {
        self.sets.insert(case_name.to_string(), records);
    }

    /// Load the variant set of one case from a JSONL file (one record per
    /// line); returns the number of records read.
    pub fn load_jsonl(&mut self, case_name: &str, path: &Path) -> Result<usize, Error> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        let count = records.len();
        self.insert(case_name, records);
        Ok(count)
    }
}

impl VariantStore for MemVariantStore {
    fn case_records(&self, case_name: &str) -> Result<Vec<VariantRecord>, Error> {
        self.sets
            .get(case_name)
            .cloned()
            .ok_or_else(|| Error::NoVariantSet(case_name.to_string()))
    }

    fn records_by_keys(
        &self,
        case_name: &str,
        keys: &[VariantKey],
    ) -> Result<Vec<VariantRecord>, Error> {
        let records = self
            .sets
            .get(case_name)
            .ok_or_else(|| Error::NoVariantSet(case_name.to_string()))?;
        let by_key: HashMap<VariantKey, &VariantRecord> = records
            .iter()
            .map(|record| (record.key(), record))
            .collect();
        keys.iter()
            .map(|key| {
                by_key
                    .get(key)
                    .map(|&record| record.clone())
                    .ok_or_else(|| Error::UnknownVariant {
                        key: key.to_string(),
                        case: case_name.to_string(),
                    })
            })
            .collect()
    }
}

/// One row of the cross-species conservation alignment table.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConservationRecord {
    /// Chromosome name.
    pub chrom: String,
    /// Transcript the alignment column belongs to.
    pub transcript_id: String,
    /// 1-based start position.
    pub start: i32,
    /// 1-based end position.
    pub end: i32,
    /// Per-species amino acid alignment column.
    pub alignment: String,
}

/// Collaborator providing conservation alignment rows for the table export.
pub trait ConservationProvider {
    /// All alignment rows overlapping the 1-based inclusive interval.
    fn overlapping(&self, chrom: &str, start: i32, end: i32) -> Vec<ConservationRecord>;
}

/// Conservation table held in memory.
#[derive(Debug, Default)]
pub struct MemConservationProvider {
    records: Vec<ConservationRecord>,
}

impl MemConservationProvider {
    /// Build from the given rows.
    pub fn new(records: Vec<ConservationRecord>) -> Self {
        Self { records }
    }

    /// Load the table from a TSV file with header line.
    pub fn load_tsv(path: &Path) -> Result<Self, anyhow::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(Self::new(records))
    }
}

impl ConservationProvider for MemConservationProvider {
    fn overlapping(&self, chrom: &str, start: i32, end: i32) -> Vec<ConservationRecord> {
        let chrom = canonical_chrom(chrom);
        self.records
            .iter()
            .filter(|record| {
                canonical_chrom(&record.chrom) == chrom
                    && record.start <= end
                    && record.end >= start
            })
            .cloned()
            .collect()
    }
}

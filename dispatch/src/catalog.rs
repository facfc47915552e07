pub mod table;


use crate::estimator::EstimatedRecord;
use chrono::NaiveDate;
use itertools::Itertools;
use std::{collections::BTreeMap, collections::HashSet, path::PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub use table::MetadataTable;

/// Date format used by the archive search and in fallback file names
pub const DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Failed to read query results from {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Query results in {path:?} are missing the '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Query results in {0:?} contain no header row")]
    MissingHeader(PathBuf),
}

#[derive(Error, Debug)]
#[error(
    "Archive query returned no accessions (publication window {window}, search term '{term}')"
)]
pub struct EmptyCatalogError {
    pub window: String,
    pub term: String,
}

/// One sequencing run as reported by the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessionRecord {
    pub accession_id: String,
    pub raw_size_bytes: u64,
}

impl AccessionRecord {
    pub fn new(accession_id: impl Into<String>, raw_size_bytes: u64) -> Self {
        Self {
            accession_id: accession_id.into(),
            raw_size_bytes,
        }
    }
}

/// Materialized query result, accession ids are unique and kept in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessionCatalog {
    records: Vec<AccessionRecord>,
}

impl AccessionCatalog {
    pub fn from_sizes<I, S>(sizes: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for (id, raw_size_bytes) in sizes {
            let accession_id: String = id.into();
            let accession_id = accession_id.trim().to_owned();

            if accession_id.is_empty() {
                warn!("Skipping query row without an accession id");
                continue;
            }

            if !seen.insert(accession_id.clone()) {
                warn!(accession = %accession_id, "Duplicate accession in query results, keeping the first entry");
                continue;
            }

            records.push(AccessionRecord {
                accession_id,
                raw_size_bytes,
            });
        }

        debug!("Catalog holds {} accessions", records.len());

        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AccessionRecord] {
        &self.records
    }

    pub fn accession_ids(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .map(|record| record.accession_id.as_str())
    }

    pub fn total_raw_size(&self) -> u64 {
        self.records
            .iter()
            .fold(0u64, |acc, record| acc.saturating_add(record.raw_size_bytes))
    }

    /// Estimated footprint for every accession, in catalog order
    pub fn estimate(&self) -> Vec<EstimatedRecord> {
        self.records.iter().map(EstimatedRecord::from).collect()
    }
}

/// Parameters handed to the archive query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub keywords: BTreeMap<String, String>,
}

impl QueryParams {
    /// keyword values joined by a single space, ordered by key
    pub fn search_term(&self) -> String {
        self.keywords
            .values()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .join(" ")
    }

    pub fn publication_window(&self) -> String {
        format!(
            "{}:{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }

    /// `<start>_<end>`, used to name the single-node fallback list
    pub fn window_label(&self) -> String {
        format!(
            "{}_{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Source of accession sizes, e.g. an archive search client or an exported search result
pub trait ArchiveQuery {
    fn query(&self, params: &QueryParams) -> Result<AccessionCatalog, QueryError>;
}

/// Reject an empty query result before anything gets partitioned
pub fn require_non_empty(
    catalog: AccessionCatalog,
    params: &QueryParams,
) -> Result<AccessionCatalog, EmptyCatalogError> {
    if catalog.is_empty() {
        Err(EmptyCatalogError {
            window: params.publication_window(),
            term: params.search_term(),
        })
    } else {
        Ok(catalog)
    }
}

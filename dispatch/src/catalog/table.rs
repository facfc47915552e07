use super::{AccessionCatalog, ArchiveQuery, QueryError, QueryParams};
use crate::size::parse_size;
use std::{fs, path::PathBuf};
use tracing::{debug, info, warn};

pub const ACCESSION_COLUMN: &str = "run_1_accession";
pub const SIZE_COLUMN: &str = "run_1_size";

/// Exported archive search result: a tab separated table with a header row.
///
/// Only the accession and size columns are read. Tables written together with
/// their row index carry an unnamed first column, which lines up like any
/// other column and is ignored.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    path: PathBuf,
}

impl MetadataTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(&self, content: &str) -> Result<AccessionCatalog, QueryError> {
        let mut lines = content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| QueryError::MissingHeader(self.path.clone()))?;
        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

        let position = |column: &'static str| {
            columns
                .iter()
                .position(|name| *name == column)
                .ok_or_else(|| QueryError::MissingColumn {
                    path: self.path.clone(),
                    column,
                })
        };
        let accession_index = position(ACCESSION_COLUMN)?;
        let size_index = position(SIZE_COLUMN)?;

        let rows = lines.enumerate().filter_map(|(row, line)| {
            let fields: Vec<&str> = line.split('\t').collect();

            let Some(accession) = fields.get(accession_index).map(|field| field.trim()) else {
                warn!(row, "Row is missing the accession column, skipping");
                return None;
            };

            let size = match fields.get(size_index).map(|field| field.trim()) {
                Some(raw) if !raw.is_empty() => parse_size(raw).unwrap_or_else(|error| {
                    warn!(accession, row, "Unexpected size format, counting as 0 bytes: {error}");
                    0
                }),
                _ => {
                    warn!(accession, row, "Missing size, counting as 0 bytes");
                    0
                }
            };

            Some((accession.to_owned(), size))
        });

        Ok(AccessionCatalog::from_sizes(rows))
    }
}

impl ArchiveQuery for MetadataTable {
    fn query(&self, params: &QueryParams) -> Result<AccessionCatalog, QueryError> {
        info!(
            window = %params.publication_window(),
            term = %params.search_term(),
            path = ?self.path,
            "Loading archive search results"
        );

        let content = fs::read_to_string(&self.path).map_err(|source| QueryError::Io {
            path: self.path.clone(),
            source,
        })?;
        let catalog = self.parse(&content)?;

        debug!(
            accessions = catalog.len(),
            raw_bytes = catalog.total_raw_size(),
            "Loaded search results"
        );

        Ok(catalog)
    }
}

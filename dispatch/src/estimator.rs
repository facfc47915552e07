use crate::catalog::AccessionRecord;
use serde::Serialize;

/// Expansion factor from the compressed archive size to the decompressed and
/// aligned footprint on a node's scratch disk.
pub const SIZE_MULTIPLIER: u64 = 20;

/// Estimated processing footprint for a raw archive size
pub fn estimate(raw_size_bytes: u64) -> u64 {
    raw_size_bytes.saturating_mul(SIZE_MULTIPLIER)
}

/// An accession together with its estimated footprint.
/// All disk budgeting downstream works on `estimated_size`, never on the raw size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstimatedRecord {
    pub accession_id: String,
    pub raw_size_bytes: u64,
    pub estimated_size: u64,
}

impl From<AccessionRecord> for EstimatedRecord {
    fn from(record: AccessionRecord) -> Self {
        Self {
            estimated_size: estimate(record.raw_size_bytes),
            accession_id: record.accession_id,
            raw_size_bytes: record.raw_size_bytes,
        }
    }
}

impl From<&AccessionRecord> for EstimatedRecord {
    fn from(record: &AccessionRecord) -> Self {
        Self::from(record.clone())
    }
}

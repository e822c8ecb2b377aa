//! Sample bookkeeping: records, TSV ingestion, directory scans, grouping
//! and checkpoints.

pub mod checkpoint;
pub mod group;
pub mod record;
pub mod scan;
pub mod tsv;

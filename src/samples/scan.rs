//! Discovers paired FASTQ files from sample directories.

use std::path::{Path, PathBuf};
use glob::{glob, Pattern};
use log::{debug, info};
use crate::config::defs::{PipelineError, FASTQ_GZ_EXT, R1_MARKER, R2_MARKER};
use crate::samples::record::{Gender, SampleRecord, Status};
use crate::utils::fastq::flowcell_lane_from_fastq;

fn expand(pattern: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let paths = glob(pattern)
        .map_err(|e| PipelineError::InvalidConfig(format!("Invalid pattern '{}': {}", pattern, e)))?;
    let mut out = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| PipelineError::IOError(e.to_string()))?;
        out.push(path);
    }
    out.sort();
    Ok(out)
}

/// Expected R2 mate of an R1 file: same directory, marker swapped in the
/// file name.
pub fn mate_path(r1: &Path) -> Option<PathBuf> {
    let name = r1.file_name()?.to_str()?;
    if !name.contains(R1_MARKER) {
        return None;
    }
    Some(r1.with_file_name(name.replacen(R1_MARKER, R2_MARKER, 1)))
}

fn scan_sample_dir(dir: &Path) -> Result<Vec<SampleRecord>, PipelineError> {
    let sample_id = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::InvalidConfig(format!("Cannot name sample for {}", dir.display())))?;

    let r1_pattern = format!(
        "{}/**/*{}*{}",
        Pattern::escape(&dir.to_string_lossy()),
        R1_MARKER,
        FASTQ_GZ_EXT
    );

    let mut records = Vec::new();
    for file1 in expand(&r1_pattern)? {
        let file2 = mate_path(&file1).ok_or_else(|| PipelineError::MissingFile(file1.clone()))?;
        if !file2.exists() {
            return Err(PipelineError::MissingFile(file2));
        }
        let (flowcell, lane) = flowcell_lane_from_fastq(&file1)?;
        let run_id = format!("{}.{}.{}", flowcell, sample_id, lane);
        debug!("{}: run {} from {}", sample_id, run_id, file1.display());

        records.push(SampleRecord {
            patient_id: sample_id.clone(),
            gender: Gender::Unknown,
            status: Status::Normal,
            sample_id: sample_id.clone(),
            run_id,
            file1,
            file2,
        });
    }
    Ok(records)
}

/// Builds one record per R1/R2 pair found below every directory matching
/// `pattern`. Each directory's name is both the sample and the patient id;
/// every sample is normal with unknown gender.
///
/// # Arguments
///
/// * `pattern` - Glob matching sample directories, e.g. `runs/*`.
///
/// # Returns
/// Records in directory order, then file order.
pub fn extract_fastq_from_dir(pattern: &str) -> Result<Vec<SampleRecord>, PipelineError> {
    let dirs: Vec<PathBuf> = expand(pattern)?.into_iter().filter(|p| p.is_dir()).collect();
    if dirs.is_empty() {
        return Err(PipelineError::NoSampleDirectories(pattern.to_string()));
    }

    let mut records = Vec::new();
    for dir in &dirs {
        let found = scan_sample_dir(dir)?;
        info!("Found {} read pair(s) in {}", found.len(), dir.display());
        records.extend(found);
    }
    Ok(records)
}

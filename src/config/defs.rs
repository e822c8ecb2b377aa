use std::path::PathBuf;
use thiserror::Error;
use crate::cli::Arguments;
use crate::config::layout::DirectoryLayout;

// External software
pub const FASTQC_TAG: &str = "fastqc";
pub const BWA_TAG: &str = "bwa";
pub const SAMTOOLS_TAG: &str = "samtools";
pub const PICARD_TAG: &str = "picard";
pub const GATK_TAG: &str = "gatk3";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamtoolsSubcommand {
    Sort,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GatkWalker {
    RealignerTargetCreator,
    IndelRealigner,
}

impl GatkWalker {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatkWalker::RealignerTargetCreator => "RealignerTargetCreator",
            GatkWalker::IndelRealigner => "IndelRealigner",
        }
    }
}

// Static Filenames
/// Sample sheet `--test` reads for mapping, relative to `--project-dir`.
pub const TEST_SAMPLE_TSV: &str = "data/tsv/tiny.tsv";
pub const NON_REALIGNED_TSV: &str = "nonRealigned.tsv";
pub const REALIGNED_TSV: &str = "realigned.tsv";

// Suffixes
pub const FASTQ_GZ_EXT: &str = ".fastq.gz";
pub const BAM_EXT: &str = ".bam";
pub const BAI_EXT: &str = ".bai";
pub const MARKDUP_SUFFIX: &str = ".md";
pub const REALIGNED_SUFFIX: &str = ".real";
pub const R1_MARKER: &str = "_R1_";
pub const R2_MARKER: &str = "_R2_";

// Static Parameters
pub const SAMPLE_TSV_COLUMNS: usize = 7;
pub const CHECKPOINT_TSV_COLUMNS: usize = 6;
pub const SAMTOOLS_SORT_MEMORY: &str = "4G";
pub const BWA_MISMATCH_PENALTY: u32 = 3;
pub const FASTQC_THREADS: usize = 2;
pub const READ_GROUP_PLATFORM: &str = "illumina";


#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed row in {path} line {line}: expected {expected} tab-separated fields, found {found}")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid {field} '{value}' in {path} line {line}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Missing file: {0}")]
    MissingFile(PathBuf),

    #[error("File {path} has the wrong extension, expected {expected}")]
    WrongExtension {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("Unrecognized FASTQ header in {path}: {reason}")]
    UnrecognizedHeader {
        path: PathBuf,
        reason: String,
    },

    #[error("No directories found matching pattern '{0}'")]
    NoSampleDirectories(String),

    #[error("Patient {patient} is recorded with conflicting genders {first} and {second}")]
    InconsistentGender {
        patient: String,
        first: String,
        second: String,
    },

    #[error("Tool {tool} failed: {error}")]
    ToolExecution {
        tool: String,
        error: String,
    },

    #[error("IO error: {0}")]
    IOError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}


/// Resolved, immutable context for one invocation.
pub struct RunConfig {
    pub cwd: PathBuf,
    pub project_dir: PathBuf,
    pub layout: DirectoryLayout,
    pub args: Arguments,
    pub max_jobs: usize,
}

impl RunConfig {
    /// Resolves `path` against the invocation's working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.cwd.join(path)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_row_message() {
        let error = PipelineError::MalformedRow {
            path: PathBuf::from("samples.tsv"),
            line: 3,
            expected: 7,
            found: 5,
        };
        let msg = format!("{error}");
        assert!(msg.contains("samples.tsv line 3"));
        assert!(msg.contains("expected 7"));
        assert!(msg.contains("found 5"));
    }

    #[test]
    fn test_wrong_extension_message() {
        let error = PipelineError::WrongExtension {
            path: PathBuf::from("reads_1.fq"),
            expected: FASTQ_GZ_EXT,
        };
        let msg = format!("{error}");
        assert!(msg.contains("reads_1.fq"));
        assert!(msg.contains(".fastq.gz"));
    }

    #[test]
    fn test_gatk_walker_names() {
        assert_eq!(GatkWalker::RealignerTargetCreator.as_str(), "RealignerTargetCreator");
        assert_eq!(GatkWalker::IndelRealigner.as_str(), "IndelRealigner");
    }
}

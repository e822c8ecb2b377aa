use std::fs;
use std::path::{Path, PathBuf};
use crate::config::defs::{PipelineError, NON_REALIGNED_TSV, REALIGNED_TSV};

/// Per-stage output directories under the output root.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryLayout {
    pub fastqc: PathBuf,
    pub markdup_qc: PathBuf,
    pub mapped: PathBuf,
    pub non_realigned: PathBuf,
    pub realigned: PathBuf,
}

impl DirectoryLayout {
    pub fn new(out_dir: &Path) -> Self {
        let reports = out_dir.join("Reports");
        let preprocessing = out_dir.join("Preprocessing");
        DirectoryLayout {
            fastqc: reports.join("FastQC"),
            markdup_qc: reports.join("MarkDuplicates"),
            mapped: preprocessing.join("Mapped"),
            non_realigned: preprocessing.join("NonRealigned"),
            realigned: preprocessing.join("Realigned"),
        }
    }

    /// Checkpoint written by the mapping step and read by realign.
    pub fn non_realigned_checkpoint(&self) -> PathBuf {
        self.non_realigned.join(NON_REALIGNED_TSV)
    }

    pub fn realigned_checkpoint(&self) -> PathBuf {
        self.realigned.join(REALIGNED_TSV)
    }

    pub fn ensure<P: AsRef<Path>>(dirs: &[P]) -> Result<(), PipelineError> {
        for dir in dirs {
            let dir = dir.as_ref();
            fs::create_dir_all(dir).map_err(|e| {
                PipelineError::IOError(format!("Cannot create directory {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout_paths() {
        let layout = DirectoryLayout::new(Path::new("/out"));
        assert_eq!(layout.fastqc, PathBuf::from("/out/Reports/FastQC"));
        assert_eq!(layout.markdup_qc, PathBuf::from("/out/Reports/MarkDuplicates"));
        assert_eq!(
            layout.non_realigned_checkpoint(),
            PathBuf::from("/out/Preprocessing/NonRealigned/nonRealigned.tsv")
        );
        assert_eq!(
            layout.realigned_checkpoint(),
            PathBuf::from("/out/Preprocessing/Realigned/realigned.tsv")
        );
    }

    #[test]
    fn test_ensure_creates_nested_dirs() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let layout = DirectoryLayout::new(tmp.path());
        DirectoryLayout::ensure(&[&layout.mapped, &layout.fastqc])?;
        assert!(layout.mapped.is_dir());
        assert!(layout.fastqc.is_dir());
        assert!(!layout.realigned.exists());
        Ok(())
    }
}

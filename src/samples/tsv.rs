//! Lazy readers for sample and checkpoint TSV files.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use crate::config::defs::{
    PipelineError, BAI_EXT, BAM_EXT, CHECKPOINT_TSV_COLUMNS, FASTQ_GZ_EXT, SAMPLE_TSV_COLUMNS,
};
use crate::samples::record::{CheckpointRecord, Gender, SampleRecord, Status};
use crate::utils::file::validate_file_input;

/// Where a row came from, for error messages and path resolution.
pub struct RowContext<'a> {
    pub path: &'a Path,
    pub line: usize,
    pub base: &'a Path,
}

impl RowContext<'_> {
    fn gender(&self, value: &str) -> Result<Gender, PipelineError> {
        Gender::parse(value).ok_or_else(|| PipelineError::InvalidValue {
            field: "gender",
            value: value.to_string(),
            path: self.path.to_path_buf(),
            line: self.line,
            reason: "expected M, F, XY, XX or ZZ".to_string(),
        })
    }

    fn status(&self, value: &str) -> Result<Status, PipelineError> {
        Status::parse(value).ok_or_else(|| PipelineError::InvalidValue {
            field: "status",
            value: value.to_string(),
            path: self.path.to_path_buf(),
            line: self.line,
            reason: "expected 0 (normal) or 1 (tumor)".to_string(),
        })
    }

    fn file(&self, value: &str, extension: &'static str) -> Result<PathBuf, PipelineError> {
        validate_file_input(value, self.base, extension)
    }
}

/// A record type that can be read from, and written to, one TSV row.
pub trait TsvRow: Sized {
    const COLUMNS: usize;

    fn from_fields(fields: &[&str], ctx: &RowContext<'_>) -> Result<Self, PipelineError>;

    fn to_fields(&self) -> Vec<String>;

    fn to_line(&self) -> String {
        self.to_fields().join("\t")
    }
}

impl TsvRow for SampleRecord {
    const COLUMNS: usize = SAMPLE_TSV_COLUMNS;

    fn from_fields(fields: &[&str], ctx: &RowContext<'_>) -> Result<Self, PipelineError> {
        Ok(SampleRecord {
            patient_id: fields[0].to_string(),
            gender: ctx.gender(fields[1])?,
            status: ctx.status(fields[2])?,
            sample_id: fields[3].to_string(),
            run_id: fields[4].to_string(),
            file1: ctx.file(fields[5], FASTQ_GZ_EXT)?,
            file2: ctx.file(fields[6], FASTQ_GZ_EXT)?,
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.patient_id.clone(),
            self.gender.to_string(),
            self.status.to_string(),
            self.sample_id.clone(),
            self.run_id.clone(),
            self.file1.to_string_lossy().into_owned(),
            self.file2.to_string_lossy().into_owned(),
        ]
    }
}

impl TsvRow for CheckpointRecord {
    const COLUMNS: usize = CHECKPOINT_TSV_COLUMNS;

    fn from_fields(fields: &[&str], ctx: &RowContext<'_>) -> Result<Self, PipelineError> {
        Ok(CheckpointRecord {
            patient_id: fields[0].to_string(),
            gender: ctx.gender(fields[1])?,
            status: ctx.status(fields[2])?,
            sample_id: fields[3].to_string(),
            bam: ctx.file(fields[4], BAM_EXT)?,
            bai: ctx.file(fields[5], BAI_EXT)?,
        })
    }

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.patient_id.clone(),
            self.gender.to_string(),
            self.status.to_string(),
            self.sample_id.clone(),
            self.bam.to_string_lossy().into_owned(),
            self.bai.to_string_lossy().into_owned(),
        ]
    }
}

/// Iterator over the rows of a TSV file. Stops after the first error.
pub struct TsvReader<T> {
    path: PathBuf,
    base: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
    failed: bool,
    _row: PhantomData<T>,
}

impl<T: TsvRow> TsvReader<T> {
    /// Opens `path`; relative file paths inside it resolve against `base`.
    pub fn open(path: &Path, base: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::MissingFile(path.to_path_buf()),
            _ => PipelineError::IOError(format!("Cannot open {}: {}", path.display(), e)),
        })?;
        Ok(TsvReader {
            path: path.to_path_buf(),
            base: base.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line: 0,
            failed: false,
            _row: PhantomData,
        })
    }

    fn parse_line(&self, raw: &str) -> Result<T, PipelineError> {
        let fields: Vec<&str> = raw.split('\t').collect();
        if fields.len() != T::COLUMNS {
            return Err(PipelineError::MalformedRow {
                path: self.path.clone(),
                line: self.line,
                expected: T::COLUMNS,
                found: fields.len(),
            });
        }
        let ctx = RowContext {
            path: &self.path,
            line: self.line,
            base: &self.base,
        };
        T::from_fields(&fields, &ctx)
    }
}

impl<T: TsvRow> Iterator for TsvReader<T> {
    type Item = Result<T, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(PipelineError::IOError(format!(
                        "Cannot read {}: {}",
                        self.path.display(),
                        e
                    ))));
                }
            };
            self.line += 1;
            let raw = raw.trim_end_matches('\r');
            if raw.trim().is_empty() {
                continue;
            }
            let parsed = self.parse_line(raw);
            self.failed = parsed.is_err();
            return Some(parsed);
        }
    }
}

pub fn read_samples(path: &Path, base: &Path) -> Result<TsvReader<SampleRecord>, PipelineError> {
    TsvReader::open(path, base)
}

pub fn read_checkpoint(path: &Path, base: &Path) -> Result<TsvReader<CheckpointRecord>, PipelineError> {
    TsvReader::open(path, base)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn fixture(rows: &str, files: &[&str]) -> anyhow::Result<(TempDir, PathBuf)> {
        let tmp = tempdir()?;
        for f in files {
            File::create(tmp.path().join(f))?;
        }
        let tsv = tmp.path().join("samples.tsv");
        fs::write(&tsv, rows)?;
        Ok((tmp, tsv))
    }

    #[test]
    fn test_read_samples() -> anyhow::Result<()> {
        let rows = "P1\tM\t0\tS1\tR1\ta_1.fastq.gz\ta_2.fastq.gz\n\
                    \n\
                    P1\tM\t1\tS2\tR1\tb_1.fastq.gz\tb_2.fastq.gz\r\n";
        let (tmp, tsv) = fixture(rows, &["a_1.fastq.gz", "a_2.fastq.gz", "b_1.fastq.gz", "b_2.fastq.gz"])?;

        let records = read_samples(&tsv, tmp.path())?.collect::<Result<Vec<_>, _>>()?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].patient_id, "P1");
        assert_eq!(records[0].gender, Gender::Male);
        assert_eq!(records[0].status, Status::Normal);
        assert_eq!(records[0].file1, tmp.path().join("a_1.fastq.gz"));
        assert_eq!(records[1].status, Status::Tumor);
        assert_eq!(records[1].file2, tmp.path().join("b_2.fastq.gz"));
        Ok(())
    }

    #[test]
    fn test_wrong_field_count_names_line() -> anyhow::Result<()> {
        let rows = "P1\tM\t0\tS1\tR1\ta_1.fastq.gz\ta_2.fastq.gz\nP1\tM\t0\tS1\tR2\ta_1.fastq.gz\n";
        let (tmp, tsv) = fixture(rows, &["a_1.fastq.gz", "a_2.fastq.gz"])?;

        let mut reader = read_samples(&tsv, tmp.path())?;
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(PipelineError::MalformedRow { line, expected, found, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(expected, 7);
                assert_eq!(found, 6);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(reader.next().is_none());
        Ok(())
    }

    #[test]
    fn test_space_separated_row_is_malformed() -> anyhow::Result<()> {
        let (tmp, tsv) = fixture("P1 M 0 S1 R1 a_1.fastq.gz a_2.fastq.gz\n", &[])?;
        let result: Result<Vec<SampleRecord>, _> = read_samples(&tsv, tmp.path())?.collect();
        assert!(matches!(result, Err(PipelineError::MalformedRow { found: 1, .. })));
        Ok(())
    }

    #[test]
    fn test_status_out_of_range() -> anyhow::Result<()> {
        let rows = "P1\tM\t2\tS1\tR1\ta_1.fastq.gz\ta_2.fastq.gz\n";
        let (tmp, tsv) = fixture(rows, &["a_1.fastq.gz", "a_2.fastq.gz"])?;
        let result: Result<Vec<SampleRecord>, _> = read_samples(&tsv, tmp.path())?.collect();
        match result {
            Err(PipelineError::InvalidValue { field, value, line, .. }) => {
                assert_eq!(field, "status");
                assert_eq!(value, "2");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_missing_and_misnamed_files() -> anyhow::Result<()> {
        let rows = "P1\tF\t0\tS1\tR1\ta_1.fastq.gz\ta_2.fastq.gz\n";
        let (tmp, tsv) = fixture(rows, &["a_1.fastq.gz"])?;
        let result: Result<Vec<SampleRecord>, _> = read_samples(&tsv, tmp.path())?.collect();
        assert!(matches!(result, Err(PipelineError::MissingFile(p)) if p.ends_with("a_2.fastq.gz")));

        let rows = "P1\tF\t0\tS1\tR1\ta_1.fq\ta_2.fq\n";
        let (tmp, tsv) = fixture(rows, &["a_1.fq", "a_2.fq"])?;
        let result: Result<Vec<SampleRecord>, _> = read_samples(&tsv, tmp.path())?.collect();
        assert!(matches!(result, Err(PipelineError::WrongExtension { .. })));
        Ok(())
    }

    #[test]
    fn test_read_checkpoint() -> anyhow::Result<()> {
        let rows = "P1\tXX\t1\tS2\tS2_1.md.bam\tS2_1.md.bai\n";
        let (tmp, tsv) = fixture(rows, &["S2_1.md.bam", "S2_1.md.bai"])?;
        let records = read_checkpoint(&tsv, tmp.path())?.collect::<Result<Vec<_>, _>>()?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].gender, Gender::Female);
        assert_eq!(records[0].bai, tmp.path().join("S2_1.md.bai"));
        assert_eq!(
            records[0].to_line(),
            format!("P1\tF\t1\tS2\t{}\t{}", records[0].bam.display(), records[0].bai.display())
        );
        Ok(())
    }

    #[test]
    fn test_missing_tsv() {
        let err = read_samples(Path::new("/nonexistent/samples.tsv"), Path::new("/")).err().unwrap();
        assert!(matches!(err, PipelineError::MissingFile(_)));
    }
}

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Accepts `M`/`XY`, `F`/`XX` and `ZZ` (unknown).
    pub fn parse(value: &str) -> Option<Gender> {
        match value {
            "M" | "XY" => Some(Gender::Male),
            "F" | "XX" => Some(Gender::Female),
            "ZZ" => Some(Gender::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Unknown => "ZZ",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Normal,
    Tumor,
}

impl Status {
    pub fn parse(value: &str) -> Option<Status> {
        match value.parse::<u8>().ok()? {
            0 => Some(Status::Normal),
            1 => Some(Status::Tumor),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Status::Normal => 0,
            Status::Tumor => 1,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Grouping key shared by all runs of one sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleKey {
    pub patient_id: String,
    pub status: Status,
    pub sample_id: String,
}

pub trait Keyed {
    fn sample_key(&self) -> SampleKey;
}

pub trait PatientKeyed {
    fn patient_id(&self) -> &str;
}

/// One sequencing run: a pair of FASTQ files.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub patient_id: String,
    pub gender: Gender,
    pub status: Status,
    pub sample_id: String,
    pub run_id: String,
    pub file1: PathBuf,
    pub file2: PathBuf,
}

impl Keyed for SampleRecord {
    fn sample_key(&self) -> SampleKey {
        SampleKey {
            patient_id: self.patient_id.clone(),
            status: self.status,
            sample_id: self.sample_id.clone(),
        }
    }
}

impl PatientKeyed for SampleRecord {
    fn patient_id(&self) -> &str {
        &self.patient_id
    }
}

/// A mapped run: the sample record plus the sorted BAM produced for it.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRun {
    pub record: SampleRecord,
    pub bam: PathBuf,
}

impl Keyed for MappedRun {
    fn sample_key(&self) -> SampleKey {
        self.record.sample_key()
    }
}

/// All files of one sample. Holds the per-run BAMs before merging and the
/// single merged BAM afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSampleRecord {
    pub patient_id: String,
    pub status: Status,
    pub sample_id: String,
    pub files: Vec<PathBuf>,
}

impl MergedSampleRecord {
    pub fn new(key: SampleKey, files: Vec<PathBuf>) -> Self {
        MergedSampleRecord {
            patient_id: key.patient_id,
            status: key.status,
            sample_id: key.sample_id,
            files,
        }
    }
}

impl Keyed for MergedSampleRecord {
    fn sample_key(&self) -> SampleKey {
        SampleKey {
            patient_id: self.patient_id.clone(),
            status: self.status,
            sample_id: self.sample_id.clone(),
        }
    }
}

impl PatientKeyed for MergedSampleRecord {
    fn patient_id(&self) -> &str {
        &self.patient_id
    }
}

/// One row of a checkpoint file: a sample and its BAM/BAI pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    pub patient_id: String,
    pub gender: Gender,
    pub status: Status,
    pub sample_id: String,
    pub bam: PathBuf,
    pub bai: PathBuf,
}

impl Keyed for CheckpointRecord {
    fn sample_key(&self) -> SampleKey {
        SampleKey {
            patient_id: self.patient_id.clone(),
            status: self.status,
            sample_id: self.sample_id.clone(),
        }
    }
}

impl PatientKeyed for CheckpointRecord {
    fn patient_id(&self) -> &str {
        &self.patient_id
    }
}

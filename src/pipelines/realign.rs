//! Realign step: per patient, GATK RealignerTargetCreator then
//! IndelRealigner over all of the patient's samples together.

use std::path::{Path, PathBuf};
use log::info;
use crate::config::defs::{
    GatkWalker, PipelineError, RunConfig, BAI_EXT, BAM_EXT, GATK_TAG, REALIGNED_SUFFIX,
};
use crate::config::layout::DirectoryLayout;
use crate::config::references::ReferenceSet;
use crate::samples::checkpoint::write_checkpoint;
use crate::samples::group::{find_duplicate, find_name_collision, group_by_patient, PatientGenderIndex, PatientGroup};
use crate::samples::record::{CheckpointRecord, Keyed};
use crate::utils::command::{gatk, Invocation, Job};
use crate::utils::executor::{run_jobs, Executor};
use crate::utils::file::strip_extension;

fn realign_config(layout: &DirectoryLayout, references: &ReferenceSet, patient: &PatientGroup<CheckpointRecord>, threads: usize) -> gatk::RealignConfig {
    gatk::RealignConfig {
        fasta: references.fasta.clone(),
        bams: patient.members.iter().map(|s| s.bam.clone()).collect(),
        known_indels: references.known_indels.clone(),
        intervals: layout.realigned.join(format!("{}.intervals", patient.patient_id)),
        threads,
    }
}

pub fn target_creator_job(layout: &DirectoryLayout, references: &ReferenceSet, patient: &PatientGroup<CheckpointRecord>, threads: usize) -> Job {
    let config = realign_config(layout, references, patient, threads);
    let intervals = config.intervals.clone();
    Job::new(
        format!("RealignerTargetCreator {}", patient.patient_id),
        Invocation::new(GATK_TAG, gatk::arg_generator(GatkWalker::RealignerTargetCreator, &config)),
    )
    .produces(intervals)
}

/// `S1_0.md.bam` -> `S1_0.md.real`.
pub fn realigned_stem(bam: &Path) -> String {
    format!("{}{}", strip_extension(bam, BAM_EXT), REALIGNED_SUFFIX)
}

/// IndelRealigner writes `{stem}.real.bam` next to where it runs, one per
/// input BAM, so the job runs inside the realigned directory.
pub fn indel_realigner_job(
    layout: &DirectoryLayout,
    references: &ReferenceSet,
    patient: &PatientGroup<CheckpointRecord>,
    threads: usize,
) -> (Job, Vec<CheckpointRecord>) {
    let config = realign_config(layout, references, patient, threads);
    let mut job = Job::new(
        format!("IndelRealigner {}", patient.patient_id),
        Invocation::new(GATK_TAG, gatk::arg_generator(GatkWalker::IndelRealigner, &config)),
    )
    .in_dir(layout.realigned.clone());

    let mut rows = Vec::with_capacity(patient.members.len());
    for sample in &patient.members {
        let stem = realigned_stem(&sample.bam);
        let bam = layout.realigned.join(format!("{}{}", stem, BAM_EXT));
        let bai = layout.realigned.join(format!("{}{}", stem, BAI_EXT));
        job = job.produces(bam.clone()).produces(bai.clone());
        rows.push(CheckpointRecord {
            patient_id: patient.patient_id.clone(),
            gender: patient.gender,
            status: sample.status,
            sample_id: sample.sample_id.clone(),
            bam,
            bai,
        });
    }
    (job, rows)
}

/// Runs the realign step and returns the checkpoint path.
pub async fn run<E: Executor>(
    config: &RunConfig,
    references: &ReferenceSet,
    records: Vec<CheckpointRecord>,
    executor: &E,
) -> Result<PathBuf, PipelineError> {
    if records.is_empty() {
        return Err(PipelineError::InvalidConfig("No samples to realign".to_string()));
    }
    if let Some(dup) = find_duplicate(&records, |r| r.sample_key()) {
        return Err(PipelineError::InvalidConfig(format!(
            "Sample {} (patient {}, status {}) is listed more than once",
            dup.sample_id, dup.patient_id, dup.status
        )));
    }
    // Every realigned BAM lands in one directory, named after its input file.
    if let Some((first, second)) = find_name_collision(&records, |r| r.sample_key(), |r| realigned_stem(&r.bam)) {
        return Err(PipelineError::InvalidConfig(format!(
            "Samples {} (patient {}) and {} (patient {}) would both be realigned to {}{}",
            first.sample_id,
            first.patient_id,
            second.sample_id,
            second.patient_id,
            realigned_stem(&second.bam),
            BAM_EXT
        )));
    }
    let genders = PatientGenderIndex::build(records.iter().map(|r| (r.patient_id.as_str(), r.gender)))?;
    let patients = group_by_patient(records, &genders);
    info!("Realigning {} patient(s)", patients.len());

    let layout = &config.layout;
    let threads = config.args.threads;
    DirectoryLayout::ensure(&[&layout.realigned])?;

    let target_jobs: Vec<Job> = patients
        .iter()
        .map(|p| target_creator_job(layout, references, p, threads))
        .collect();
    run_jobs(executor, "RealignerTargetCreator", &target_jobs, config.max_jobs).await?;

    let (realign_jobs, rows): (Vec<Job>, Vec<Vec<CheckpointRecord>>) = patients
        .iter()
        .map(|p| indel_realigner_job(layout, references, p, threads))
        .unzip();
    run_jobs(executor, "IndelRealigner", &realign_jobs, config.max_jobs).await?;

    let rows: Vec<CheckpointRecord> = rows.into_iter().flatten().collect();
    let checkpoint = layout.realigned_checkpoint();
    if executor.is_dry_run() {
        info!("[dry-run] would write {} row(s) to {}", rows.len(), checkpoint.display());
    } else {
        write_checkpoint(&checkpoint, &rows)?;
    }
    Ok(checkpoint)
}

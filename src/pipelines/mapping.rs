//! Mapping step: FastQC, bwa mem + sort per run, merge per sample,
//! MarkDuplicates per sample, then the nonRealigned checkpoint.

use std::path::{Path, PathBuf};
use log::info;
use crate::config::defs::{
    PipelineError, RunConfig, SamtoolsSubcommand, BAI_EXT, BAM_EXT, BWA_TAG, FASTQC_TAG, MARKDUP_SUFFIX,
    PICARD_TAG, SAMTOOLS_TAG,
};
use crate::config::layout::DirectoryLayout;
use crate::config::references::ReferenceSet;
use crate::samples::checkpoint::write_checkpoint;
use crate::samples::group::{
    find_duplicate, find_name_collision, group_by_sample, merged_bam_name, PatientGenderIndex, SampleGroup,
};
use crate::samples::record::{CheckpointRecord, Keyed, MappedRun, MergedSampleRecord, SampleKey, SampleRecord};
use crate::utils::command::{bwa, fastqc, picard, samtools, Invocation, Job};
use crate::utils::executor::{run_jobs, Executor};

/// Scratch directory for one sample's BAMs.
pub fn sample_work_dir(layout: &DirectoryLayout, key: &SampleKey) -> PathBuf {
    layout
        .mapped
        .join(&key.patient_id)
        .join(format!("{}_{}", key.sample_id, key.status))
}

pub fn fastqc_job(layout: &DirectoryLayout, record: &SampleRecord) -> Job {
    let out_dir = layout.fastqc.join(&record.run_id);
    Job::new(
        format!("FastQC {}", record.run_id),
        Invocation::new(FASTQC_TAG, fastqc::arg_generator(&out_dir, &record.file1, &record.file2)),
    )
}

/// `bwa mem | samtools sort` for one run.
pub fn map_job(layout: &DirectoryLayout, references: &ReferenceSet, record: &SampleRecord, threads: usize) -> (Job, MappedRun) {
    let bam = sample_work_dir(layout, &record.sample_key())
        .join("runs")
        .join(format!("{}{}", record.run_id, BAM_EXT));

    let bwa_args = bwa::arg_generator(&bwa::BwaMemConfig {
        fasta: references.fasta.clone(),
        fastq1: record.file1.clone(),
        fastq2: record.file2.clone(),
        run_id: record.run_id.clone(),
        sample_id: record.sample_id.clone(),
        threads,
    });
    let sort_args = samtools::arg_generator(&samtools::SamtoolsConfig {
        subcommand: SamtoolsSubcommand::Sort,
        threads,
        output: None,
        inputs: Vec::new(),
    });

    let job = Job::new(format!("MapReads {}", record.run_id), Invocation::new(BWA_TAG, bwa_args))
        .pipe(Invocation::new(SAMTOOLS_TAG, sort_args))
        .stdout_to(bam.clone());
    (job, MappedRun { record: record.clone(), bam })
}

/// Work needed to bring every sample down to one `{sampleId}.bam`.
#[derive(Debug, Default)]
pub struct MergePlan {
    pub jobs: Vec<Job>,
    pub moves: Vec<(PathBuf, PathBuf)>,
    pub samples: Vec<MergedSampleRecord>,
}

/// Grouped samples get a `samtools merge`; single-run samples are only
/// renamed.
pub fn plan_merges(layout: &DirectoryLayout, groups: Vec<SampleGroup<MappedRun>>, threads: usize) -> MergePlan {
    let mut plan = MergePlan::default();
    for group in groups {
        let key = group.key();
        let target = sample_work_dir(layout, &key).join(merged_bam_name(&key.sample_id));
        let needs_merge = group.needs_merge();
        let runs = group.into_merged(|run| run.bam.clone());
        if needs_merge {
            let args = samtools::arg_generator(&samtools::SamtoolsConfig {
                subcommand: SamtoolsSubcommand::Merge,
                threads,
                output: Some(target.clone()),
                inputs: runs.files.clone(),
            });
            plan.jobs.push(
                Job::new(format!("MergeBams {}", key.sample_id), Invocation::new(SAMTOOLS_TAG, args))
                    .produces(target.clone()),
            );
        } else {
            plan.moves.push((runs.files[0].clone(), target.clone()));
        }
        plan.samples.push(MergedSampleRecord::new(key, vec![target]));
    }
    plan
}

/// MarkDuplicates for one sample; returns the job and the checkpoint row
/// describing its output.
pub fn markdup_job(layout: &DirectoryLayout, sample: &MergedSampleRecord, genders: &PatientGenderIndex) -> (Job, CheckpointRecord) {
    let stem = format!("{}_{}{}", sample.sample_id, sample.status, MARKDUP_SUFFIX);
    let bam = layout.non_realigned.join(format!("{}{}", stem, BAM_EXT));
    let bai = layout.non_realigned.join(format!("{}{}", stem, BAI_EXT));
    let input = sample.files[0].clone();
    let tmp_dir = input.parent().map(Path::to_path_buf).unwrap_or_else(|| layout.mapped.clone());

    let args = picard::arg_generator(&picard::MarkDuplicatesConfig {
        metrics: layout.markdup_qc.join(format!("{}{}.metrics", stem, BAM_EXT)),
        input,
        output: bam.clone(),
        tmp_dir,
    });
    let job = Job::new(format!("MarkDuplicates {}", sample.sample_id), Invocation::new(PICARD_TAG, args))
        .produces(bam.clone())
        .produces(bai.clone());

    let row = CheckpointRecord {
        patient_id: sample.patient_id.clone(),
        gender: genders.gender(&sample.patient_id),
        status: sample.status,
        sample_id: sample.sample_id.clone(),
        bam,
        bai,
    };
    (job, row)
}

/// Runs the mapping step and returns the checkpoint path.
pub async fn run<E: Executor>(
    config: &RunConfig,
    references: &ReferenceSet,
    records: Vec<SampleRecord>,
    executor: &E,
) -> Result<PathBuf, PipelineError> {
    if records.is_empty() {
        return Err(PipelineError::InvalidConfig("No sequencing runs to map".to_string()));
    }
    if let Some(dup) = find_duplicate(&records, |r| (r.sample_key(), r.run_id.clone())) {
        return Err(PipelineError::InvalidConfig(format!(
            "Run {} of sample {} (patient {}) is listed more than once",
            dup.run_id, dup.sample_id, dup.patient_id
        )));
    }
    // Duplicate-marked BAMs are named by sample and status only.
    if let Some((first, second)) =
        find_name_collision(&records, |r| r.sample_key(), |r| (r.sample_id.clone(), r.status))
    {
        return Err(PipelineError::InvalidConfig(format!(
            "Sample {} with status {} belongs to both patient {} and patient {}; sample ids must be unique per status",
            second.sample_id, second.status, first.patient_id, second.patient_id
        )));
    }
    let genders = PatientGenderIndex::build(records.iter().map(|r| (r.patient_id.as_str(), r.gender)))?;
    info!("Mapping {} run(s) from {} patient(s)", records.len(), genders.patient_count());

    let layout = &config.layout;
    let threads = config.args.threads;
    let max_jobs = config.max_jobs;

    if !config.args.no_reports {
        let jobs: Vec<Job> = records.iter().map(|r| fastqc_job(layout, r)).collect();
        let dirs: Vec<PathBuf> = records.iter().map(|r| layout.fastqc.join(&r.run_id)).collect();
        DirectoryLayout::ensure(&dirs)?;
        run_jobs(executor, "FastQC", &jobs, max_jobs).await?;
    }

    let (map_jobs, mapped): (Vec<Job>, Vec<MappedRun>) =
        records.iter().map(|r| map_job(layout, references, r, threads)).unzip();
    let run_dirs: Vec<&Path> = mapped.iter().filter_map(|m| m.bam.parent()).collect();
    DirectoryLayout::ensure(&run_dirs)?;
    run_jobs(executor, "MapReads", &map_jobs, max_jobs).await?;

    let groups = group_by_sample(mapped);
    let plan = plan_merges(layout, groups, threads);
    info!(
        "{} sample(s): {} to merge, {} single-run",
        plan.samples.len(),
        plan.jobs.len(),
        plan.moves.len()
    );
    run_jobs(executor, "MergeBams", &plan.jobs, max_jobs).await?;
    for (from, to) in &plan.moves {
        if from != to {
            executor.relocate(from, to).await?;
        }
    }

    DirectoryLayout::ensure(&[&layout.non_realigned, &layout.markdup_qc])?;
    let (md_jobs, rows): (Vec<Job>, Vec<CheckpointRecord>) =
        plan.samples.iter().map(|s| markdup_job(layout, s, &genders)).unzip();
    run_jobs(executor, "MarkDuplicates", &md_jobs, max_jobs).await?;

    let checkpoint = layout.non_realigned_checkpoint();
    if executor.is_dry_run() {
        info!("[dry-run] would write {} row(s) to {}", rows.len(), checkpoint.display());
    } else {
        write_checkpoint(&checkpoint, &rows)?;
    }
    Ok(checkpoint)
}

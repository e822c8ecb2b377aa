pub mod mapping;
pub mod realign;
pub mod step;

use std::path::PathBuf;
use log::info;
use crate::config::defs::{PipelineError, RunConfig};
use crate::config::references::ReferenceSet;
use crate::samples::record::{CheckpointRecord, SampleRecord};
use crate::samples::scan::extract_fastq_from_dir;
use crate::samples::tsv::{read_checkpoint, read_samples};
use crate::utils::command::check_versions;
use crate::utils::executor::Executor;
use step::{resolve_ingestion, Source, Step};

/// Resolves the step and its input, checks references and tools, then runs
/// the step. Returns the checkpoint the step wrote.
pub async fn run_step<E: Executor>(config: &RunConfig, executor: &E) -> Result<PathBuf, PipelineError> {
    let ingestion = resolve_ingestion(config)?;

    let genome_base = config.resolve(&config.args.genome_base);
    let references = ReferenceSet::resolve(&config.args.genome, &genome_base)?;
    match ingestion.step {
        Step::Mapping => ReferenceSet::validate(&references.mapping_files())?,
        Step::Realign => ReferenceSet::validate(&references.realign_files())?,
    }
    info!("Using genome {} from {}", references.genome, genome_base.display());

    if !executor.is_dry_run() && !config.args.skip_tool_check {
        check_versions(&ingestion.step.tools(!config.args.no_reports)).await?;
    }

    match ingestion.source {
        Source::SampleTsv(path) => {
            let records: Vec<SampleRecord> = read_samples(&path, &config.cwd)?.collect::<Result<_, _>>()?;
            mapping::run(config, &references, records, executor).await
        }
        Source::SampleDirectory(pattern) => {
            let records = extract_fastq_from_dir(&pattern)?;
            mapping::run(config, &references, records, executor).await
        }
        Source::Checkpoint(path) => {
            let records: Vec<CheckpointRecord> = read_checkpoint(&path, &config.cwd)?.collect::<Result<_, _>>()?;
            realign::run(config, &references, records, executor).await
        }
    }
}

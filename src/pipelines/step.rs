//! Chooses how a step gets its input: which reader, which file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use log::info;
use crate::config::defs::{PipelineError, RunConfig, BWA_TAG, FASTQC_TAG, GATK_TAG, PICARD_TAG, SAMTOOLS_TAG, TEST_SAMPLE_TSV};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Mapping,
    Realign,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Mapping => "mapping",
            Step::Realign => "realign",
        }
    }

    /// External programs the step invokes.
    pub fn tools(&self, reports: bool) -> Vec<&'static str> {
        match self {
            Step::Mapping => {
                let mut tools = vec![BWA_TAG, SAMTOOLS_TAG, PICARD_TAG];
                if reports {
                    tools.insert(0, FASTQC_TAG);
                }
                tools
            }
            Step::Realign => vec![GATK_TAG],
        }
    }
}

impl FromStr for Step {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mapping" => Ok(Step::Mapping),
            "realign" => Ok(Step::Realign),
            _ => Err(PipelineError::InvalidConfig(format!(
                "Unknown step '{}'; expected mapping or realign",
                s
            ))),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// 7-column per-run TSV.
    SampleTsv(PathBuf),
    /// Glob of sample directories.
    SampleDirectory(String),
    /// 6-column per-sample TSV written by an earlier step.
    Checkpoint(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingestion {
    pub step: Step,
    pub source: Source,
}

fn existing_tsv(path: PathBuf, hint: &str) -> Result<PathBuf, PipelineError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(PipelineError::InvalidConfig(format!(
            "Sample file {} does not exist{}",
            path.display(),
            hint
        )))
    }
}

/// Resolves the requested step and sample source. Exactly one of `--test`,
/// `--sample` and `--sample-dir` must be set.
pub fn resolve_ingestion(config: &RunConfig) -> Result<Ingestion, PipelineError> {
    let args = &config.args;
    let step: Step = args.step.parse()?;

    let given = [args.test, args.sample.is_some(), args.sample_dir.is_some()]
        .iter()
        .filter(|set| **set)
        .count();
    if given != 1 {
        return Err(PipelineError::InvalidConfig(format!(
            "Exactly one of --test, --sample or --sample-dir is required ({} given)",
            given
        )));
    }

    let source = match (step, &args.sample, &args.sample_dir) {
        (Step::Mapping, Some(sample), None) => Source::SampleTsv(existing_tsv(config.resolve(sample), "")?),
        (Step::Mapping, None, Some(pattern)) => {
            let pattern = config.resolve(pattern).to_string_lossy().into_owned();
            Source::SampleDirectory(pattern)
        }
        (Step::Mapping, None, None) => {
            Source::SampleTsv(existing_tsv(config.project_dir.join(TEST_SAMPLE_TSV), "; --test reads it from --project-dir")?)
        }
        (Step::Realign, Some(sample), None) => Source::Checkpoint(existing_tsv(config.resolve(sample), "")?),
        (Step::Realign, None, None) => Source::Checkpoint(existing_tsv(
            config.layout.non_realigned_checkpoint(),
            "; run the mapping step first",
        )?),
        (Step::Realign, None, Some(_)) => {
            return Err(PipelineError::InvalidConfig(
                "--sample-dir can only be used with the mapping step".to_string(),
            ));
        }
        (_, Some(_), Some(_)) => unreachable!("sources are mutually exclusive"),
    };

    info!("Step {}: reading input from {:?}", step, source);
    Ok(Ingestion { step, source })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;
    use crate::cli::Arguments;
    use crate::config::layout::DirectoryLayout;

    fn config(root: &Path, args: Arguments) -> RunConfig {
        let out_dir = root.join("out");
        RunConfig {
            cwd: root.to_path_buf(),
            project_dir: root.to_path_buf(),
            layout: DirectoryLayout::new(&out_dir),
            args,
            max_jobs: 1,
        }
    }

    fn args(step: &str) -> Arguments {
        Arguments {
            step: step.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_step_parsing() {
        assert_eq!("mapping".parse::<Step>().unwrap(), Step::Mapping);
        assert_eq!("Realign".parse::<Step>().unwrap(), Step::Realign);
        assert!(matches!("recalibrate".parse::<Step>(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_step_tools() {
        assert_eq!(Step::Mapping.tools(false), vec![BWA_TAG, SAMTOOLS_TAG, PICARD_TAG]);
        assert_eq!(Step::Mapping.tools(true)[0], FASTQC_TAG);
        assert_eq!(Step::Realign.tools(true), vec![GATK_TAG]);
    }

    #[test]
    fn test_exactly_one_source() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let none = config(tmp.path(), args("mapping"));
        assert!(matches!(resolve_ingestion(&none), Err(PipelineError::InvalidConfig(_))));

        let mut both = args("mapping");
        both.test = true;
        both.sample = Some("x.tsv".to_string());
        let err = resolve_ingestion(&config(tmp.path(), both)).unwrap_err();
        assert!(err.to_string().contains("2 given"));
        Ok(())
    }

    #[test]
    fn test_mapping_sources() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        fs::write(tmp.path().join("samples.tsv"), "")?;

        let mut a = args("mapping");
        a.sample = Some("samples.tsv".to_string());
        let ingestion = resolve_ingestion(&config(tmp.path(), a))?;
        assert_eq!(ingestion.source, Source::SampleTsv(tmp.path().join("samples.tsv")));

        let mut a = args("mapping");
        a.sample_dir = Some("runs/*".to_string());
        let ingestion = resolve_ingestion(&config(tmp.path(), a))?;
        assert_eq!(
            ingestion.source,
            Source::SampleDirectory(tmp.path().join("runs/*").to_string_lossy().into_owned())
        );

        let mut a = args("mapping");
        a.test = true;
        let err = resolve_ingestion(&config(tmp.path(), a.clone())).unwrap_err();
        assert!(err.to_string().contains("data/tsv/tiny.tsv does not exist; --test reads it from --project-dir"));
        fs::create_dir_all(tmp.path().join("data/tsv"))?;
        fs::write(tmp.path().join(TEST_SAMPLE_TSV), "")?;
        let ingestion = resolve_ingestion(&config(tmp.path(), a))?;
        assert_eq!(ingestion.source, Source::SampleTsv(tmp.path().join(TEST_SAMPLE_TSV)));
        Ok(())
    }

    #[test]
    fn test_realign_requires_checkpoint() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let mut a = args("realign");
        a.test = true;
        let cfg = config(tmp.path(), a);
        let err = resolve_ingestion(&cfg).unwrap_err();
        assert!(err.to_string().contains("run the mapping step first"));

        fs::create_dir_all(&cfg.layout.non_realigned)?;
        fs::write(cfg.layout.non_realigned_checkpoint(), "")?;
        let ingestion = resolve_ingestion(&cfg)?;
        assert_eq!(ingestion.step, Step::Realign);
        assert_eq!(ingestion.source, Source::Checkpoint(cfg.layout.non_realigned_checkpoint()));
        Ok(())
    }

    #[test]
    fn test_realign_rejects_directory_input() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let mut a = args("realign");
        a.sample_dir = Some("runs/*".to_string());
        let err = resolve_ingestion(&config(tmp.path(), a)).unwrap_err();
        assert!(err.to_string().contains("only be used with the mapping step"));
        Ok(())
    }

    #[test]
    fn test_unknown_step_fails_first() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let mut a = args("annotate");
        a.test = true;
        let err = resolve_ingestion(&config(tmp.path(), a)).unwrap_err();
        assert!(err.to_string().contains("Unknown step 'annotate'"));
        Ok(())
    }
}

//! Functions and structs for building external tool command lines

use std::path::{Path, PathBuf};
use anyhow::{anyhow, Result};
use log::info;
use tokio::process::Command;
use crate::config::defs::{PipelineError, BWA_TAG, FASTQC_TAG, GATK_TAG, PICARD_TAG, SAMTOOLS_TAG};
use crate::utils::streams::{read_child_output_to_vec, ChildStream};

/// One external program and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub tool: &'static str,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(tool: &'static str, args: Vec<String>) -> Self {
        Invocation { tool, args }
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.tool.to_string()];
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                parts.push(format!("'{}'", arg));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// A unit of work for the executor: one invocation, or several piped
/// stdout-to-stdin, with the files it must leave behind.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub label: String,
    pub stages: Vec<Invocation>,
    pub stdout: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

impl Job {
    pub fn new(label: impl Into<String>, first: Invocation) -> Self {
        Job {
            label: label.into(),
            stages: vec![first],
            stdout: None,
            cwd: None,
            outputs: Vec::new(),
        }
    }

    pub fn pipe(mut self, next: Invocation) -> Self {
        self.stages.push(next);
        self
    }

    pub fn stdout_to(mut self, path: PathBuf) -> Self {
        self.outputs.push(path.clone());
        self.stdout = Some(path);
        self
    }

    pub fn in_dir(mut self, dir: PathBuf) -> Self {
        self.cwd = Some(dir);
        self
    }

    pub fn produces(mut self, path: PathBuf) -> Self {
        self.outputs.push(path);
        self
    }

    pub fn tools(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.tool).collect()
    }

    pub fn command_line(&self) -> String {
        let mut line = self
            .stages
            .iter()
            .map(Invocation::command_line)
            .collect::<Vec<_>>()
            .join(" | ");
        if let Some(out) = &self.stdout {
            line.push_str(&format!(" > {}", out.display()));
        }
        line
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}


pub mod fastqc {
    use std::path::Path;
    use crate::config::defs::FASTQC_THREADS;
    use super::path_arg;

    pub fn arg_generator(out_dir: &Path, fastq1: &Path, fastq2: &Path) -> Vec<String> {
        vec![
            "-t".to_string(),
            FASTQC_THREADS.to_string(),
            "-q".to_string(),
            "-o".to_string(),
            path_arg(out_dir),
            path_arg(fastq1),
            path_arg(fastq2),
        ]
    }

    pub fn parse_version(lines: &[String]) -> Option<String> {
        lines.first()?.split_whitespace().nth(1).map(|v| v.trim_start_matches('v').to_string())
    }
}

pub mod bwa {
    use std::path::PathBuf;
    use crate::config::defs::{BWA_MISMATCH_PENALTY, READ_GROUP_PLATFORM};
    use super::path_arg;

    pub struct BwaMemConfig {
        pub fasta: PathBuf,
        pub fastq1: PathBuf,
        pub fastq2: PathBuf,
        pub run_id: String,
        pub sample_id: String,
        pub threads: usize,
    }

    /// `@RG` header line; bwa expands the literal `\t` escapes.
    pub fn read_group(run_id: &str, sample_id: &str) -> String {
        format!(
            "@RG\\tID:{run}\\tPU:{run}\\tSM:{sample}\\tLB:{sample}\\tPL:{platform}",
            run = run_id,
            sample = sample_id,
            platform = READ_GROUP_PLATFORM
        )
    }

    pub fn arg_generator(config: &BwaMemConfig) -> Vec<String> {
        vec![
            "mem".to_string(),
            "-R".to_string(),
            read_group(&config.run_id, &config.sample_id),
            "-B".to_string(),
            BWA_MISMATCH_PENALTY.to_string(),
            "-t".to_string(),
            config.threads.to_string(),
            "-M".to_string(),
            path_arg(&config.fasta),
            path_arg(&config.fastq1),
            path_arg(&config.fastq2),
        ]
    }

    /// bwa prints its usage, including `Version: x`, to stderr.
    pub fn parse_version(lines: &[String]) -> Option<String> {
        lines
            .iter()
            .find_map(|l| l.strip_prefix("Version:"))
            .map(|v| v.trim().to_string())
    }
}

pub mod samtools {
    use std::path::PathBuf;
    use crate::config::defs::{SamtoolsSubcommand, SAMTOOLS_SORT_MEMORY};
    use super::path_arg;

    pub struct SamtoolsConfig {
        pub subcommand: SamtoolsSubcommand,
        pub threads: usize,
        pub output: Option<PathBuf>,
        pub inputs: Vec<PathBuf>,
    }

    pub fn arg_generator(config: &SamtoolsConfig) -> Vec<String> {
        let mut args_vec: Vec<String> = Vec::new();
        match config.subcommand {
            SamtoolsSubcommand::Sort => {
                args_vec.push("sort".to_string());
                args_vec.push("--threads".to_string());
                args_vec.push(config.threads.to_string());
                args_vec.push("-m".to_string());
                args_vec.push(SAMTOOLS_SORT_MEMORY.to_string());
                if config.inputs.is_empty() {
                    args_vec.push("-".to_string());
                }
            }
            SamtoolsSubcommand::Merge => {
                args_vec.push("merge".to_string());
                args_vec.push("--threads".to_string());
                args_vec.push(config.threads.to_string());
                if let Some(out) = &config.output {
                    args_vec.push(path_arg(out));
                }
            }
        }
        args_vec.extend(config.inputs.iter().map(|p| path_arg(p)));
        args_vec
    }

    pub fn parse_version(lines: &[String]) -> Option<String> {
        lines.first()?.split_whitespace().nth(1).map(str::to_string)
    }
}

pub mod picard {
    use std::path::PathBuf;
    use super::path_arg;

    pub struct MarkDuplicatesConfig {
        pub input: PathBuf,
        pub output: PathBuf,
        pub metrics: PathBuf,
        pub tmp_dir: PathBuf,
    }

    pub fn arg_generator(config: &MarkDuplicatesConfig) -> Vec<String> {
        vec![
            "MarkDuplicates".to_string(),
            format!("INPUT={}", path_arg(&config.input)),
            format!("METRICS_FILE={}", path_arg(&config.metrics)),
            format!("TMP_DIR={}", path_arg(&config.tmp_dir)),
            "ASSUME_SORTED=true".to_string(),
            "VALIDATION_STRINGENCY=LENIENT".to_string(),
            "CREATE_INDEX=TRUE".to_string(),
            format!("OUTPUT={}", path_arg(&config.output)),
        ]
    }

    /// Picard reports its version on stderr, sometimes as `Version:x`.
    pub fn parse_version(lines: &[String]) -> Option<String> {
        let last = lines.iter().rev().find(|l| !l.trim().is_empty())?;
        let version = last.trim().trim_start_matches("Version:").trim();
        if version.is_empty() { None } else { Some(version.to_string()) }
    }
}

pub mod gatk {
    use std::path::PathBuf;
    use crate::config::defs::GatkWalker;
    use super::path_arg;

    pub struct RealignConfig {
        pub fasta: PathBuf,
        pub bams: Vec<PathBuf>,
        pub known_indels: Vec<PathBuf>,
        pub intervals: PathBuf,
        pub threads: usize,
    }

    fn common_args(walker: GatkWalker, config: &RealignConfig) -> Vec<String> {
        let mut args_vec = vec![
            "-T".to_string(),
            walker.as_str().to_string(),
            "-R".to_string(),
            path_arg(&config.fasta),
        ];
        for bam in &config.bams {
            args_vec.push("-I".to_string());
            args_vec.push(path_arg(bam));
        }
        for vcf in &config.known_indels {
            args_vec.push("-known".to_string());
            args_vec.push(path_arg(vcf));
        }
        args_vec
    }

    pub fn arg_generator(walker: GatkWalker, config: &RealignConfig) -> Vec<String> {
        let mut args_vec = common_args(walker, config);
        match walker {
            GatkWalker::RealignerTargetCreator => {
                args_vec.push("-nt".to_string());
                args_vec.push(config.threads.to_string());
                args_vec.push("-o".to_string());
                args_vec.push(path_arg(&config.intervals));
            }
            GatkWalker::IndelRealigner => {
                args_vec.push("-targetIntervals".to_string());
                args_vec.push(path_arg(&config.intervals));
                args_vec.push("-nWayOut".to_string());
                args_vec.push(".real.bam".to_string());
            }
        }
        args_vec
    }

    pub fn parse_version(lines: &[String]) -> Option<String> {
        lines.first().map(|l| l.trim().to_string()).filter(|v| !v.is_empty())
    }
}


/// Runs `tool` with `args` and reads the version from the given stream.
async fn presence_check(
    tool: &str,
    args: &[&str],
    stream: ChildStream,
    parse: fn(&[String]) -> Option<String>,
) -> Result<String> {
    let (stdout, stderr) = match stream {
        ChildStream::Stdout => (std::process::Stdio::piped(), std::process::Stdio::null()),
        ChildStream::Stderr => (std::process::Stdio::null(), std::process::Stdio::piped()),
    };
    let mut child = Command::new(tool)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|e| anyhow!("Failed to spawn {}: {}. Is {} installed?", tool, e, tool))?;

    let lines = read_child_output_to_vec(&mut child, stream).await?;
    parse(&lines).ok_or_else(|| anyhow!("Could not read a version from `{} {}`", tool, args.join(" ")))
}

pub async fn check_version(tool: &str) -> Result<String> {
    match tool {
        FASTQC_TAG => presence_check(FASTQC_TAG, &["--version"], ChildStream::Stdout, fastqc::parse_version).await,
        BWA_TAG => presence_check(BWA_TAG, &[], ChildStream::Stderr, bwa::parse_version).await,
        SAMTOOLS_TAG => presence_check(SAMTOOLS_TAG, &["--version"], ChildStream::Stdout, samtools::parse_version).await,
        PICARD_TAG => presence_check(PICARD_TAG, &["MarkDuplicates", "--version"], ChildStream::Stderr, picard::parse_version).await,
        GATK_TAG => presence_check(GATK_TAG, &["--version"], ChildStream::Stdout, gatk::parse_version).await,
        _ => Err(anyhow!("Unknown tool: {}", tool)),
    }
}

/// Probes every tool a step needs, failing on the first one missing.
pub async fn check_versions(tools: &[&'static str]) -> Result<(), PipelineError> {
    for tool in tools {
        let version = check_version(tool).await.map_err(|e| PipelineError::ToolExecution {
            tool: tool.to_string(),
            error: e.to_string(),
        })?;
        info!("Found {} version {}", tool, version);
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defs::{GatkWalker, SamtoolsSubcommand};

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_job_command_line() {
        let job = Job::new("map R1", Invocation::new(BWA_TAG, vec!["mem".to_string(), "ref.fa".to_string()]))
            .pipe(Invocation::new(SAMTOOLS_TAG, vec!["sort".to_string(), "-".to_string()]))
            .stdout_to(PathBuf::from("/out/R1.bam"));
        assert_eq!(job.command_line(), "bwa mem ref.fa | samtools sort - > /out/R1.bam");
        assert_eq!(job.outputs, vec![PathBuf::from("/out/R1.bam")]);
        assert_eq!(job.tools(), vec![BWA_TAG, SAMTOOLS_TAG]);
    }

    #[test]
    fn test_bwa_read_group() {
        let args = bwa::arg_generator(&bwa::BwaMemConfig {
            fasta: PathBuf::from("ref.fa"),
            fastq1: PathBuf::from("a_1.fastq.gz"),
            fastq2: PathBuf::from("a_2.fastq.gz"),
            run_id: "R1".to_string(),
            sample_id: "S1".to_string(),
            threads: 4,
        });
        assert_eq!(args[0], "mem");
        assert_eq!(args[2], "@RG\\tID:R1\\tPU:R1\\tSM:S1\\tLB:S1\\tPL:illumina");
        assert_eq!(&args[args.len() - 3..], &["ref.fa", "a_1.fastq.gz", "a_2.fastq.gz"]);
    }

    #[test]
    fn test_samtools_args() {
        let sort = samtools::arg_generator(&samtools::SamtoolsConfig {
            subcommand: SamtoolsSubcommand::Sort,
            threads: 2,
            output: None,
            inputs: Vec::new(),
        });
        assert_eq!(sort, vec!["sort", "--threads", "2", "-m", "4G", "-"]);

        let merge = samtools::arg_generator(&samtools::SamtoolsConfig {
            subcommand: SamtoolsSubcommand::Merge,
            threads: 2,
            output: Some(PathBuf::from("S1.bam")),
            inputs: vec![PathBuf::from("R1.bam"), PathBuf::from("R2.bam")],
        });
        assert_eq!(merge, vec!["merge", "--threads", "2", "S1.bam", "R1.bam", "R2.bam"]);
    }

    #[test]
    fn test_gatk_args() {
        let config = gatk::RealignConfig {
            fasta: PathBuf::from("ref.fa"),
            bams: vec![PathBuf::from("N.bam"), PathBuf::from("T.bam")],
            known_indels: vec![PathBuf::from("mills.vcf")],
            intervals: PathBuf::from("P1.intervals"),
            threads: 4,
        };
        let rtc = gatk::arg_generator(GatkWalker::RealignerTargetCreator, &config);
        assert_eq!(&rtc[..2], &["-T", "RealignerTargetCreator"]);
        assert!(rtc.windows(2).any(|w| w == ["-o", "P1.intervals"]));
        assert_eq!(rtc.iter().filter(|a| *a == "-I").count(), 2);

        let ir = gatk::arg_generator(GatkWalker::IndelRealigner, &config);
        assert!(ir.windows(2).any(|w| w == ["-targetIntervals", "P1.intervals"]));
        assert!(ir.windows(2).any(|w| w == ["-nWayOut", ".real.bam"]));
        assert!(ir.windows(2).any(|w| w == ["-known", "mills.vcf"]));
    }

    #[test]
    fn test_version_parsers() {
        assert_eq!(samtools::parse_version(&lines("samtools 1.20\nUsing htslib 1.20")), Some("1.20".to_string()));
        assert_eq!(fastqc::parse_version(&lines("FastQC v0.12.1")), Some("0.12.1".to_string()));
        assert_eq!(
            bwa::parse_version(&lines("\nProgram: bwa (alignment via Burrows-Wheeler transformation)\nVersion: 0.7.17-r1188\n")),
            Some("0.7.17-r1188".to_string())
        );
        assert_eq!(picard::parse_version(&lines("Version:2.27.5\n")), Some("2.27.5".to_string()));
        assert_eq!(gatk::parse_version(&lines("3.8-1-0-gf15c1c3ef")), Some("3.8-1-0-gf15c1c3ef".to_string()));
        assert_eq!(gatk::parse_version(&[]), None);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        assert!(check_version("bowtie2").await.is_err());
    }
}

// src/utils/executor.rs: runs tool jobs as subprocesses
use std::path::Path;
use std::process::{Output, Stdio};
use futures::future::join_all;
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, info};
use tokio::process::{ChildStdout, Command};
use crate::config::defs::PipelineError;
use crate::utils::command::Job;
use crate::utils::streams::tail;

const STDERR_TAIL_LINES: usize = 20;

/// Carries out the side effects of a stage: tool jobs and moving files into
/// place.
#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn run(&self, job: &Job) -> Result<(), PipelineError>;

    async fn relocate(&self, from: &Path, to: &Path) -> Result<(), PipelineError>;

    /// True when nothing is actually executed, so no outputs will exist.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Runs every job of one stage, at most `max_jobs` at a time. Returns the
/// first failure.
pub async fn run_jobs<E: Executor>(
    executor: &E,
    stage: &str,
    jobs: &[Job],
    max_jobs: usize,
) -> Result<(), PipelineError> {
    if jobs.is_empty() {
        debug!("{}: nothing to run", stage);
        return Ok(());
    }
    info!("{}: running {} job(s), up to {} at a time", stage, jobs.len(), max_jobs.max(1));
    stream::iter(jobs.iter().map(|job| executor.run(job)))
        .buffer_unordered(max_jobs.max(1))
        .try_collect::<Vec<()>>()
        .await?;
    Ok(())
}

fn tool_error(tool: &str, error: String) -> PipelineError {
    PipelineError::ToolExecution {
        tool: tool.to_string(),
        error,
    }
}

pub struct ProcessExecutor {
    pub verbose: bool,
}

impl ProcessExecutor {
    pub fn new(verbose: bool) -> Self {
        ProcessExecutor { verbose }
    }

    fn stderr(&self) -> Stdio {
        if self.verbose { Stdio::inherit() } else { Stdio::piped() }
    }
}

impl Executor for ProcessExecutor {
    async fn run(&self, job: &Job) -> Result<(), PipelineError> {
        debug!("{}: {}", job.label, job.command_line());

        let mut children = Vec::with_capacity(job.stages.len());
        let mut upstream: Option<ChildStdout> = None;
        for (i, stage) in job.stages.iter().enumerate() {
            let last = i + 1 == job.stages.len();
            let mut cmd = Command::new(stage.tool);
            cmd.args(&stage.args).kill_on_drop(true).stderr(self.stderr());
            if let Some(dir) = &job.cwd {
                cmd.current_dir(dir);
            }

            match upstream.take() {
                Some(out) => {
                    let stdin: Stdio = out.try_into()?;
                    cmd.stdin(stdin);
                }
                None => {
                    cmd.stdin(Stdio::null());
                }
            }

            if !last {
                cmd.stdout(Stdio::piped());
            } else if let Some(path) = &job.stdout {
                let file = std::fs::File::create(path).map_err(|e| {
                    PipelineError::IOError(format!("Cannot create {}: {}", path.display(), e))
                })?;
                cmd.stdout(Stdio::from(file));
            } else if self.verbose {
                cmd.stdout(Stdio::inherit());
            } else {
                cmd.stdout(Stdio::null());
            }

            let mut child = cmd
                .spawn()
                .map_err(|e| tool_error(stage.tool, format!("Failed to spawn: {}. Is {} installed?", e, stage.tool)))?;
            if !last {
                upstream = Some(
                    child
                        .stdout
                        .take()
                        .ok_or_else(|| tool_error(stage.tool, "Failed to get stdout".to_string()))?,
                );
            }
            children.push((stage.tool, child));
        }

        let waits = children.into_iter().map(|(tool, child)| async move {
            let output: std::io::Result<Output> = child.wait_with_output().await;
            (tool, output)
        });
        for (tool, output) in join_all(waits).await {
            let output = output?;
            if !output.status.success() {
                return Err(tool_error(
                    tool,
                    format!(
                        "{} exited with {}\n{}",
                        job.label,
                        output.status,
                        tail(&output.stderr, STDERR_TAIL_LINES)
                    ),
                ));
            }
        }

        for out in &job.outputs {
            if !out.exists() {
                let tool = job.stages.last().map(|s| s.tool).unwrap_or("unknown");
                return Err(tool_error(
                    tool,
                    format!("{} finished but {} was not produced", job.label, out.display()),
                ));
            }
        }
        debug!("{}: done", job.label);
        Ok(())
    }

    async fn relocate(&self, from: &Path, to: &Path) -> Result<(), PipelineError> {
        debug!("Moving {} to {}", from.display(), to.display());
        if tokio::fs::rename(from, to).await.is_err() {
            // rename fails across filesystems
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await?;
        }
        Ok(())
    }
}

/// Logs what would run.
pub struct DryRunExecutor;

impl Executor for DryRunExecutor {
    async fn run(&self, job: &Job) -> Result<(), PipelineError> {
        info!("[dry-run] {}: {}", job.label, job.command_line());
        Ok(())
    }

    async fn relocate(&self, from: &Path, to: &Path) -> Result<(), PipelineError> {
        info!("[dry-run] mv {} {}", from.display(), to.display());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use env_logger::Builder;
use log::{debug, error, info, LevelFilter};
use somatic_preprocess::cli::{parse, Arguments};
use somatic_preprocess::config::defs::RunConfig;
use somatic_preprocess::config::layout::DirectoryLayout;
use somatic_preprocess::pipelines::run_step;
use somatic_preprocess::utils::executor::{DryRunExecutor, ProcessExecutor};
use somatic_preprocess::utils::system::{compute_max_jobs, detect_cores_and_load};


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n Somatic Preprocess\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}", dir);

    let out_dir = setup_output_dir(&args, &dir)?;
    let project_dir = match &args.project_dir {
        Some(p) => absolute(&dir, p),
        None => dir.clone(),
    };

    let max_jobs = match args.max_jobs {
        Some(n) => n.max(1),
        None => {
            let (cores, cpu_load) = detect_cores_and_load().await;
            let jobs = compute_max_jobs(cores, cpu_load, args.threads);
            debug!("Detected {} physical cores; CPU load {}%; running up to {} jobs of {} threads",
                   cores, cpu_load, jobs, args.threads);
            jobs
        }
    };

    let dry_run = args.dry_run;
    let verbose = args.verbose;
    let run_config = Arc::new(RunConfig {
        cwd: dir,
        project_dir,
        layout: DirectoryLayout::new(&out_dir),
        args,
        max_jobs,
    });

    let result = if dry_run {
        run_step(&run_config, &DryRunExecutor).await
    } else {
        run_step(&run_config, &ProcessExecutor::new(verbose)).await
    };

    match result {
        Ok(checkpoint) => info!("Checkpoint: {}", checkpoint.display()),
        Err(e) => {
            error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
            std::process::exit(1);
        }
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}


fn absolute(cwd: &Path, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Resolves `--out-dir` against the working directory and makes sure it
/// exists.
fn setup_output_dir(args: &Arguments, cwd: &Path) -> Result<PathBuf> {
    let out_dir = absolute(cwd, &args.out_dir);
    fs::create_dir_all(&out_dir)?;
    Ok(out_dir)
}

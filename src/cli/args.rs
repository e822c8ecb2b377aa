use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "somatic-preprocess", version, about = "Tumor/normal WGS preprocessing: mapping, duplicate marking, indel realignment")]
pub struct Arguments {

    #[arg(short = 's', long, default_value = "mapping", help = "Step to start from: mapping or realign")]
    pub step: String,

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(long, help = "Sample TSV (7 columns for mapping, 6 columns for realign)")]
    pub sample: Option<String>,

    #[arg(long = "sample-dir", help = "Glob pattern of sample directories holding _R1_/_R2_ FASTQ pairs (mapping only)")]
    pub sample_dir: Option<String>,

    #[arg(long, action, help = "mapping: read {project-dir}/data/tsv/tiny.tsv; realign: resume from {out}/Preprocessing/NonRealigned/nonRealigned.tsv")]
    pub test: bool,

    #[arg(short = 'o', long = "out", default_value = ".", help = "Output directory root for all generated files.")]
    pub out_dir: String,

    #[arg(long = "project-dir", help = "Directory holding data/tsv/tiny.tsv; defaults to the current directory")]
    pub project_dir: Option<String>,

    #[arg(short = 'g', long, default_value = "GRCh37")]
    pub genome: String,

    #[arg(long = "genome-base", default_value = "references")]
    pub genome_base: String,

    #[arg(short = 't', long, default_value_t = 8, help = "Threads per tool invocation")]
    pub threads: usize,

    #[arg(long = "max-jobs", help = "Concurrent tool invocations per stage; defaults to physical cores / threads")]
    pub max_jobs: Option<usize>,

    #[arg(long = "no-reports", default_value_t = false)]
    pub no_reports: bool,

    #[arg(long = "dry-run", default_value_t = false, help = "Log tool command lines without running them")]
    pub dry_run: bool,

    #[arg(long = "skip-tool-check", default_value_t = false)]
    pub skip_tool_check: bool,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Arguments::parse_from(["somatic-preprocess", "--test"]);
        assert_eq!(args.step, "mapping");
        assert_eq!(args.genome, "GRCh37");
        assert_eq!(args.out_dir, ".");
        assert_eq!(args.threads, 8);
        assert!(args.test);
        assert!(args.sample.is_none());
        assert!(args.max_jobs.is_none());
    }

    #[test]
    fn test_resume_arguments() {
        let args = Arguments::parse_from([
            "somatic-preprocess",
            "--step", "realign",
            "--sample", "nonRealigned.tsv",
            "-o", "results",
            "--max-jobs", "2",
            "-v",
        ]);
        assert_eq!(args.step, "realign");
        assert_eq!(args.sample.as_deref(), Some("nonRealigned.tsv"));
        assert_eq!(args.out_dir, "results");
        assert_eq!(args.max_jobs, Some(2));
        assert!(args.verbose);
    }
}

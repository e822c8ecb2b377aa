use std::collections::HashMap;
use std::path::{Path, PathBuf};
use lazy_static::lazy_static;
use log::debug;
use crate::config::defs::PipelineError;

const BWA_INDEX_EXTS: &[&str] = &["amb", "ann", "bwt", "pac", "sa"];

/// File names of one genome build, relative to the genome base directory.
pub struct GenomeFiles {
    pub fasta: &'static str,
    pub dict: &'static str,
    pub known_indels: &'static [&'static str],
}

lazy_static! {
    static ref GENOMES: HashMap<&'static str, GenomeFiles> = {
        let mut m = HashMap::new();
        m.insert("GRCh37", GenomeFiles {
            fasta: "human_g1k_v37_decoy.fasta",
            dict: "human_g1k_v37_decoy.dict",
            known_indels: &[
                "1000G_phase1.indels.b37.vcf",
                "Mills_and_1000G_gold_standard.indels.b37.vcf",
            ],
        });
        m.insert("GRCh38", GenomeFiles {
            fasta: "Homo_sapiens_assembly38.fasta",
            dict: "Homo_sapiens_assembly38.dict",
            known_indels: &[
                "Homo_sapiens_assembly38.known_indels.vcf",
                "Mills_and_1000G_gold_standard.indels.hg38.vcf",
            ],
        });
        m.insert("smallGRCh37", GenomeFiles {
            fasta: "human_g1k_v37_decoy.small.fasta",
            dict: "human_g1k_v37_decoy.small.dict",
            known_indels: &[
                "1000G_phase1.indels.b37.small.vcf",
                "Mills_and_1000G_gold_standard.indels.b37.small.vcf",
            ],
        });
        m
    };
}

/// Absolute reference paths for one genome build.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSet {
    pub genome: String,
    pub fasta: PathBuf,
    pub fasta_index: PathBuf,
    pub dict: PathBuf,
    pub bwa_index: Vec<PathBuf>,
    pub known_indels: Vec<PathBuf>,
}

impl ReferenceSet {
    pub fn resolve(genome: &str, genome_base: &Path) -> Result<Self, PipelineError> {
        let files = GENOMES.get(genome).ok_or_else(|| {
            let mut known: Vec<&str> = GENOMES.keys().copied().collect();
            known.sort();
            PipelineError::InvalidConfig(format!(
                "Unknown genome '{}'; expected one of {}",
                genome,
                known.join(", ")
            ))
        })?;

        let fasta = genome_base.join(files.fasta);
        let fasta_index = genome_base.join(format!("{}.fai", files.fasta));
        let bwa_index = BWA_INDEX_EXTS
            .iter()
            .map(|ext| genome_base.join(format!("{}.{}", files.fasta, ext)))
            .collect();

        Ok(ReferenceSet {
            genome: genome.to_string(),
            fasta,
            fasta_index,
            dict: genome_base.join(files.dict),
            bwa_index,
            known_indels: files.known_indels.iter().map(|f| genome_base.join(f)).collect(),
        })
    }

    /// Files `bwa mem` reads.
    pub fn mapping_files(&self) -> Vec<&Path> {
        let mut files = vec![self.fasta.as_path()];
        files.extend(self.bwa_index.iter().map(PathBuf::as_path));
        files
    }

    /// Files the GATK realignment walkers read.
    pub fn realign_files(&self) -> Vec<&Path> {
        let mut files = vec![self.fasta.as_path(), self.fasta_index.as_path(), self.dict.as_path()];
        files.extend(self.known_indels.iter().map(PathBuf::as_path));
        files
    }

    pub fn validate(files: &[&Path]) -> Result<(), PipelineError> {
        for file in files {
            if !file.exists() {
                return Err(PipelineError::MissingFile(file.to_path_buf()));
            }
            debug!("Reference file present: {}", file.display());
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_known_genome() -> anyhow::Result<()> {
        let refs = ReferenceSet::resolve("GRCh37", Path::new("/refs"))?;
        assert_eq!(refs.fasta, PathBuf::from("/refs/human_g1k_v37_decoy.fasta"));
        assert_eq!(refs.fasta_index, PathBuf::from("/refs/human_g1k_v37_decoy.fasta.fai"));
        assert_eq!(refs.bwa_index.len(), 5);
        assert!(refs.bwa_index.contains(&PathBuf::from("/refs/human_g1k_v37_decoy.fasta.bwt")));
        assert_eq!(refs.known_indels.len(), 2);
        Ok(())
    }

    #[test]
    fn test_resolve_unknown_genome() {
        let err = ReferenceSet::resolve("hg19", Path::new("/refs")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
        assert!(err.to_string().contains("GRCh38"));
    }

    #[test]
    fn test_validate_reports_missing_file() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let refs = ReferenceSet::resolve("smallGRCh37", tmp.path())?;
        File::create(&refs.fasta)?;

        let err = ReferenceSet::validate(&refs.mapping_files()).unwrap_err();
        match err {
            PipelineError::MissingFile(path) => assert!(path.to_string_lossy().ends_with(".amb")),
            other => panic!("unexpected error: {other}"),
        }

        for file in &refs.bwa_index {
            File::create(file)?;
        }
        ReferenceSet::validate(&refs.mapping_files())?;
        assert!(ReferenceSet::validate(&refs.realign_files()).is_err());
        Ok(())
    }
}

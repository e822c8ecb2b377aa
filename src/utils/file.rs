use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use crate::config::defs::PipelineError;

pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1F, 0x8B]), // Gzip magic bytes
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Resolves a path field against `base` and checks that it exists and ends
/// with `extension` (case-insensitive).
///
/// # Arguments
///
/// * `raw` - Path as written in the input.
/// * `base` - Directory relative paths are resolved against.
/// * `extension` - Required suffix, e.g. ".fastq.gz".
///
/// # Returns
/// The resolved path.
pub fn validate_file_input(raw: &str, base: &Path, extension: &'static str) -> Result<PathBuf, PipelineError> {
    let path = PathBuf::from(raw);
    let path = if path.is_absolute() { path } else { base.join(path) };
    if !path.exists() {
        return Err(PipelineError::MissingFile(path));
    }
    check_file_extension(&path, extension)?;
    Ok(path)
}

pub fn check_file_extension(path: &Path, extension: &'static str) -> Result<(), PipelineError> {
    let name = path.to_string_lossy().to_lowercase();
    if name.ends_with(&extension.to_lowercase()) {
        Ok(())
    } else {
        Err(PipelineError::WrongExtension {
            path: path.to_path_buf(),
            expected: extension,
        })
    }
}

/// File name of `path` with `extension` stripped, e.g. `S1_0.md.bam` -> `S1_0.md`.
pub fn strip_extension(path: &Path, extension: &str) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(extension) {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

/// Writes `contents` to a temp file next to `path` and renames it into
/// place, so readers see either the old file or the complete new one.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| PipelineError::IOError(format!("Cannot write {}: {}", path.display(), e.error)))?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;

    #[test]
    fn test_is_gzipped() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let gz_path = tmp.path().join("reads.fastq.gz");
        let mut encoder = GzEncoder::new(File::create(&gz_path)?, Compression::default());
        encoder.write_all(b"@r1\nACGT\n+\nIIII\n")?;
        encoder.finish()?;
        assert!(is_gzipped(&gz_path)?);

        let plain = tmp.path().join("reads.fastq");
        std::fs::write(&plain, "@r1\nACGT\n+\nIIII\n")?;
        assert!(!is_gzipped(&plain)?);

        let empty = tmp.path().join("empty.fastq");
        File::create(&empty)?;
        assert!(!is_gzipped(&empty)?);
        Ok(())
    }

    #[test]
    fn test_validate_file_input() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        File::create(tmp.path().join("a_1.FASTQ.GZ"))?;
        File::create(tmp.path().join("a_1.fq.gz"))?;

        let path = validate_file_input("a_1.FASTQ.GZ", tmp.path(), ".fastq.gz")?;
        assert_eq!(path, tmp.path().join("a_1.FASTQ.GZ"));

        let err = validate_file_input("a_1.fq.gz", tmp.path(), ".fastq.gz").unwrap_err();
        assert!(matches!(err, PipelineError::WrongExtension { .. }));

        let err = validate_file_input("missing.fastq.gz", tmp.path(), ".fastq.gz").unwrap_err();
        match err {
            PipelineError::MissingFile(path) => assert!(path.ends_with("missing.fastq.gz")),
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension(Path::new("/x/S1_0.md.bam"), ".bam"), "S1_0.md");
        assert_eq!(strip_extension(Path::new("S1.cram"), ".bam"), "S1.cram");
    }

    #[test]
    fn test_write_atomically_replaces_file() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let target = tmp.path().join("nonRealigned.tsv");
        std::fs::write(&target, "old\n")?;
        write_atomically(&target, b"new\n")?;
        assert_eq!(std::fs::read_to_string(&target)?, "new\n");
        let leftovers = std::fs::read_dir(tmp.path())?.count();
        assert_eq!(leftovers, 1);
        Ok(())
    }
}

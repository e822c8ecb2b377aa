use seq_io::fastq::{Reader, Record};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use flate2::read::MultiGzDecoder;
use crate::config::defs::PipelineError;
use crate::utils::file::is_gzipped;

pub enum FastqReader {
    Uncompressed(BufReader<File>),
    Gzipped(MultiGzDecoder<File>),
}

impl Read for FastqReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FastqReader::Uncompressed(r) => r.read(buf),
            FastqReader::Gzipped(r) => r.read(buf),
        }
    }
}

pub fn fastq_reader(path: &Path) -> io::Result<Reader<FastqReader>> {
    let file = File::open(path)?;
    let reader = if is_gzipped(path)? {
        Reader::new(FastqReader::Gzipped(MultiGzDecoder::new(file)))
    } else {
        Reader::new(FastqReader::Uncompressed(BufReader::new(file)))
    };
    Ok(reader)
}

/// Flowcell id and lane from an Illumina read name (without `@`).
///
/// Seven colon-separated fields (CASAVA 1.8+,
/// `instrument:run:flowcell:lane:tile:x:y`) or five
/// (`flowcell:lane:tile:x:y`).
pub fn parse_flowcell_lane(read_id: &str) -> Result<(String, u32), String> {
    let fields: Vec<&str> = read_id.split(':').collect();
    let (flowcell, lane) = match fields.len() {
        7 => (fields[2], fields[3]),
        5 => (fields[0], fields[1]),
        n => return Err(format!("expected 5 or 7 colon-separated fields in '{}', found {}", read_id, n)),
    };
    if flowcell.is_empty() {
        return Err(format!("empty flowcell id in '{}'", read_id));
    }
    let lane = lane
        .parse::<u32>()
        .map_err(|_| format!("lane '{}' in '{}' is not a number", lane, read_id))?;
    Ok((flowcell.to_string(), lane))
}

/// Decodes flowcell and lane from the first record of a (possibly gzipped)
/// FASTQ file.
pub fn flowcell_lane_from_fastq(path: &Path) -> Result<(String, u32), PipelineError> {
    let unrecognized = |reason: String| PipelineError::UnrecognizedHeader {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = fastq_reader(path)?;
    let record = match reader.next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(unrecognized(e.to_string())),
        None => return Err(unrecognized("file contains no records".to_string())),
    };
    let id = record
        .id()
        .map_err(|e| unrecognized(format!("read name is not UTF-8: {}", e)))?;

    parse_flowcell_lane(id).map_err(unrecognized)
}

use std::path::Path;
use log::info;
use crate::config::defs::PipelineError;
use crate::samples::tsv::TsvRow;
use crate::utils::file::write_atomically;

/// Renders rows as sorted TSV lines.
pub fn render_checkpoint<T: TsvRow>(rows: &[T]) -> String {
    let mut lines: Vec<String> = rows.iter().map(TsvRow::to_line).collect();
    lines.sort();
    let mut out = String::new();
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Writes the checkpoint for a finished stage. The file is the only input a
/// later invocation needs to resume from the next step.
pub fn write_checkpoint<T: TsvRow>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    write_atomically(path, render_checkpoint(rows).as_bytes())?;
    info!("Wrote {} row(s) to checkpoint {}", rows.len(), path.display());
    Ok(())
}

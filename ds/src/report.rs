//! Run output: array files and timing summary

use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use tracing::debug;

/// Values written per line of an array file
pub const VALUES_PER_LINE: usize = 15;

pub const SHUFFLED_FILE: &str = "shuffled.txt";
pub const REFERENCE_FILE: &str = "sorted_reference.txt";
pub const DISTRIBUTED_FILE: &str = "sorted_distributed.txt";

/// Write `array` as space-separated values, [`VALUES_PER_LINE`] per line,
/// followed by a blank line
pub fn write_array<W: Write>(writer: &mut W, array: &[u64]) -> io::Result<()> {
    for (i, value) in array.iter().enumerate() {
        write!(writer, "{value} ")?;
        if (i + 1) % VALUES_PER_LINE == 0 {
            writeln!(writer)?;
        }
    }
    writeln!(writer)?;
    writeln!(writer)?;
    Ok(())
}

fn write_array_file(path: &Path, array: &[u64]) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_array(&mut writer, array).with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Paths written by [`write_run_files`]
#[derive(Debug, Clone)]
pub struct RunFiles {
    pub shuffled: PathBuf,
    pub reference: PathBuf,
    pub distributed: PathBuf,
}

/// Write the input and both sorted arrays into `dir`
pub fn write_run_files(dir: &Path, shuffled: &[u64], reference: &[u64], distributed: &[u64]) -> Result<RunFiles> {
    debug!(?dir, "write_run_files: called");
    fs::create_dir_all(dir).context("Failed to create output directory")?;

    let files = RunFiles {
        shuffled: dir.join(SHUFFLED_FILE),
        reference: dir.join(REFERENCE_FILE),
        distributed: dir.join(DISTRIBUTED_FILE),
    };
    write_array_file(&files.shuffled, shuffled)?;
    write_array_file(&files.reference, reference)?;
    write_array_file(&files.distributed, distributed)?;
    Ok(files)
}

/// Wall-clock time of both sorts
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub reference: Duration,
    pub distributed: Duration,
}

impl Timings {
    /// Seconds the distributed sort saved; negative when it was slower
    pub fn saved_secs(&self) -> f64 {
        self.reference.as_secs_f64() - self.distributed.as_secs_f64()
    }
}

impl fmt::Display for Timings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reference sort:   {:.6}s", self.reference.as_secs_f64())?;
        writeln!(f, "Distributed sort: {:.6}s", self.distributed.as_secs_f64())?;
        write!(f, "Distributed faster by {:.6}s", self.saved_secs())
    }
}

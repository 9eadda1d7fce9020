//! Batching the files of an observation into size-bounded chunks.

use std::path::PathBuf;

use log::{debug, trace};

use crate::inventory::FileRecord;

/// An ordered, non-empty batch of files to be loaded together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    /// Paths of the files, in time order
    pub files: Vec<PathBuf>,
    /// Total size of the files in mebibytes
    pub size_mib: f64,
}

impl Chunk {
    fn push(&mut self, record: &FileRecord) {
        self.files.push(record.path.clone());
        self.size_mib += record.size_mib;
    }

    /// Number of files in the chunk.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the chunk has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Split `files` into consecutive chunks of about `threshold_mib` each.
///
/// The running chunk is closed before a file is added once its size has reached
/// `threshold_mib`, so a chunk only exceeds the threshold by its last file. The final chunk is
/// kept even when it is below the threshold.
///
/// # Examples
///
/// ```rust
/// use uirapuru::{plan_chunks, FileRecord};
///
/// let no_files: Vec<FileRecord> = vec![];
/// assert!(plan_chunks(&no_files, 200.0).is_empty());
/// ```
pub fn plan_chunks<'a, I>(files: I, threshold_mib: f64) -> Vec<Chunk>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    trace!("start plan_chunks (threshold {threshold_mib} MiB)");
    let mut chunks = vec![];
    let mut running = Chunk::default();
    for record in files {
        if !running.is_empty() && running.size_mib >= threshold_mib {
            chunks.push(std::mem::take(&mut running));
        }
        running.push(record);
    }
    if !running.is_empty() {
        chunks.push(running);
    }
    debug!("planned {} chunks", chunks.len());
    chunks
}

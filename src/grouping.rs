//! Partitioning the inventory into contiguous observation sessions.

use hifitime::{Duration, Epoch, Unit};
use log::{debug, info, trace};

use crate::{
    constants::{CONTIGUOUS_GAP_TOLERANCE_SECONDS, MIB_PER_GIB},
    error::UirapuruError,
    inventory::{BucketKey, FileRecord},
};

/// A maximal run of records from one bucket with no gap of
/// [`CONTIGUOUS_GAP_TOLERANCE_SECONDS`] or more between them.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationGroup {
    /// Assigned 0, 1, 2, .. in encounter order
    pub id: usize,
    /// Start of the first file
    pub start: Epoch,
    /// Sum of the durations of all files, rounded to the second, ties to even
    pub duration: Duration,
    /// Sum of the sizes of all files in gibibytes, rounded to 2 decimals, ties to even
    pub size_gib: f64,
    /// `MINFREQ` in MHz shared by all files
    pub min_freq_mhz: f64,
    /// `MAXFREQ` in MHz shared by all files
    pub max_freq_mhz: f64,
    /// Number of channels, `NAXIS1`, shared by all files
    pub num_chans: usize,
    /// Indices of the member records in the inventory, in time order
    pub record_idxs: Vec<usize>,
}

impl ObservationGroup {
    fn from_run(id: usize, records: &[FileRecord], record_idxs: Vec<usize>) -> Self {
        let first = &records[record_idxs[0]];
        let total_delta_s: f64 = record_idxs.iter().map(|&idx| records[idx].delta_s).sum();
        let total_size_mib: f64 = record_idxs.iter().map(|&idx| records[idx].size_mib).sum();
        Self {
            id,
            start: first.start,
            duration: Unit::Second * round_half_even(total_delta_s),
            size_gib: round_half_even(total_size_mib / MIB_PER_GIB * 100.0) / 100.0,
            min_freq_mhz: first.min_freq_mhz,
            max_freq_mhz: first.max_freq_mhz,
            num_chans: first.num_chans,
            record_idxs,
        }
    }

    /// The member records of this group, in time order.
    ///
    /// `records` must be the inventory this group was computed from.
    pub fn files<'a>(&self, records: &'a [FileRecord]) -> Vec<&'a FileRecord> {
        self.record_idxs.iter().map(|&idx| &records[idx]).collect()
    }

    /// Number of files in this group.
    pub fn num_files(&self) -> usize {
        self.record_idxs.len()
    }
}

/// Round to the nearest integer, with halves going to the even neighbour.
fn round_half_even(value: f64) -> f64 {
    if (value - value.trunc()).abs() == 0.5 {
        2.0 * (value / 2.0).round()
    } else {
        value.round()
    }
}

/// The gap between the end of `prev` and the start of `next`, in seconds.
///
/// Negative when the files overlap.
pub fn gap_seconds(prev: &FileRecord, next: &FileRecord) -> f64 {
    (next.start - prev.start).to_seconds() - prev.delta_s
}

/// Whether `next` continues the observation of `prev`.
pub fn is_contiguous(prev: &FileRecord, next: &FileRecord) -> bool {
    gap_seconds(prev, next).abs() < CONTIGUOUS_GAP_TOLERANCE_SECONDS
}

/// Group an inventory into observation sessions.
///
/// Records are bucketed by [`BucketKey`], buckets are visited in the order they are first
/// encountered, and records within a bucket keep their inventory order. `records` is expected
/// to be sorted the way [`crate::build_inventory`] sorts it.
///
/// Records with no contiguous neighbour in their bucket belong to no group.
///
/// # Examples
///
/// ```rust
/// use uirapuru::group_observations;
///
/// assert!(group_observations(&[]).is_empty());
/// ```
pub fn group_observations(records: &[FileRecord]) -> Vec<ObservationGroup> {
    trace!("start group_observations ({} records)", records.len());

    // f64 keys only compare equal when read from identical header values
    let mut buckets: Vec<(BucketKey, Vec<usize>)> = vec![];
    for (idx, record) in records.iter().enumerate() {
        let key = record.bucket();
        match buckets.iter_mut().find(|(bucket_key, _)| *bucket_key == key) {
            Some((_, idxs)) => idxs.push(idx),
            None => buckets.push((key, vec![idx])),
        }
    }
    debug!("{} buckets", buckets.len());

    let mut groups = vec![];
    for (key, idxs) in buckets {
        let mut run: Vec<usize> = vec![];
        for idx in idxs {
            match run.last() {
                Some(&prev_idx) if is_contiguous(&records[prev_idx], &records[idx]) => {
                    run.push(idx);
                }
                _ => {
                    if run.len() >= 2 {
                        groups.push(ObservationGroup::from_run(groups.len(), records, run));
                    }
                    run = vec![idx];
                }
            }
        }
        if run.len() >= 2 {
            groups.push(ObservationGroup::from_run(groups.len(), records, run));
        }
        trace!("bucket {:?} done, {} groups so far", key, groups.len());
    }

    info!(
        "{} observation groups from {} records",
        groups.len(),
        records.len()
    );
    groups
}

/// The member records of the group with the given id.
///
/// # Errors
///
/// Will error with [`UirapuruError::GroupNotFound`] if no group has that id.
pub fn select_group<'a>(
    records: &'a [FileRecord],
    groups: &[ObservationGroup],
    id: usize,
) -> Result<Vec<&'a FileRecord>, UirapuruError> {
    groups
        .iter()
        .find(|group| group.id == id)
        .map(|group| group.files(records))
        .ok_or_else(|| UirapuruError::GroupNotFound {
            id,
            known: groups.iter().map(|group| group.id).collect(),
        })
}

//! Listing and downloading raw files from the instrument's HTTP archive.
//!
//! The archive is an Apache style directory index, protected by HTTP basic auth. Each row of the
//! index table has an icon, the file name, the modification time and a human readable size.
//!
//! Names follow `<prefix><YYYYMMDD>_<HHMMSS>_<mode>.<type>`, e.g.
//! `UIRAPURU_20230415_123000_59.fit`.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, info, trace, warn};
use regex::Regex;
use thiserror::Error;

use crate::{constants::MIB_PER_GIB, file_progress};

lazy_static! {
    static ref RE_FILESIZE: Regex = Regex::new(r"^(\d+(?:\.\d+)?)([A-Za-z]+)$").unwrap();
    static ref RE_FILENAME: Regex =
        Regex::new(r"^(.*)(\d{8})_(\d{6})_(\d+)\.([A-Za-z]+)").unwrap();
    static ref RE_ROW: Regex = Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap();
    static ref RE_CELL: Regex = Regex::new(r"(?is)<t[dh][^>]*>(.*?)</t[dh]>").unwrap();
    static ref RE_TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
}

#[derive(Error, Debug)]
/// Errors talking to the archive
pub enum FetchError {
    #[cfg(feature = "fetch")]
    #[error("request to {url} failed: {source}")]
    /// The HTTP request failed or returned an error status
    Http {
        /// The requested url
        url: String,
        /// The underlying error
        source: reqwest::Error,
    },

    #[error("could not write {path}: {source}")]
    /// The downloaded file could not be written
    Write {
        /// The local destination
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    #[error("{name} is not available: {reason}")]
    /// The source has no such file, e.g. the archive answered 404
    Unavailable {
        /// The remote name
        name: String,
        /// Why
        reason: String,
    },
}

/// The parts of an archive file name.
#[derive(Debug, Clone, PartialEq)]
pub struct FilenameParts {
    /// Everything before the timestamp, usually the station name
    pub prefix: String,
    /// Start of the acquisition, UTC
    pub timestamp: Epoch,
    /// Receiver mode
    pub mode: u32,
    /// Extension
    pub file_type: String,
}

/// One file in the archive index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Remote file name
    pub filename: String,
    /// Size in MiB, rounded to 2 decimals
    pub size_mib: f64,
    /// `None` when the name doesn't follow the archive convention
    pub parts: Option<FilenameParts>,
}

impl IndexEntry {
    /// The `MM/DD` label of the day this file was acquired.
    pub fn day_label(&self) -> Option<String> {
        self.parts.as_ref().map(|parts| {
            let (_, month, day, ..) = parts.timestamp.to_gregorian_utc();
            format!("{month:02}/{day:02}")
        })
    }
}

/// The files acquired on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    /// `MM/DD`
    pub day: String,
    /// Number of files
    pub num_files: usize,
    /// Total size in MiB
    pub size_mib: f64,
}

impl DaySummary {
    /// Total size in GiB.
    pub fn size_gib(&self) -> f64 {
        self.size_mib / MIB_PER_GIB
    }
}

/// Convert a human readable size like `4.2M` into MiB, rounded to 2 decimals.
///
/// # Examples
///
/// ```rust
/// use uirapuru::archive::parse_filesize_mib;
///
/// assert_eq!(parse_filesize_mib("512K"), Some(0.5));
/// assert_eq!(parse_filesize_mib("1.5g"), Some(1536.0));
/// assert_eq!(parse_filesize_mib("-"), None);
/// ```
pub fn parse_filesize_mib(size: &str) -> Option<f64> {
    let captures = RE_FILESIZE.captures(size.trim())?;
    let value: f64 = captures[1].parse().ok()?;
    let scale = match captures[2].to_ascii_uppercase().as_str() {
        "K" => 1.0 / 1024.0,
        "M" => 1.0,
        "G" => 1024.0,
        _ => return None,
    };
    Some((value * scale * 100.0).round() / 100.0)
}

/// Split an archive file name into its parts.
pub fn describe_filename(name: &str) -> Option<FilenameParts> {
    let captures = RE_FILENAME.captures(name)?;
    let date = &captures[2];
    let time = &captures[3];
    let field = |text: &str, range: std::ops::Range<usize>| text[range].parse::<u8>().ok();
    let timestamp = Epoch::maybe_from_gregorian_utc(
        date[0..4].parse().ok()?,
        field(date, 4..6)?,
        field(date, 6..8)?,
        field(time, 0..2)?,
        field(time, 2..4)?,
        field(time, 4..6)?,
        0,
    )
    .ok()?;
    Some(FilenameParts {
        prefix: captures[1].to_string(),
        timestamp,
        mode: captures[4].parse().ok()?,
        file_type: captures[5].to_string(),
    })
}

fn cell_text(cell: &str) -> String {
    RE_TAG
        .replace_all(cell, "")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Parse the rows of an archive index page.
///
/// The file name is the second cell of a row and the size the fourth. Rows without both, like
/// the header and the parent directory link, are skipped.
pub fn parse_index(html: &str) -> Vec<IndexEntry> {
    trace!("start parse_index ({} bytes)", html.len());
    let entries: Vec<IndexEntry> = RE_ROW
        .captures_iter(html)
        .filter_map(|row| {
            let cells: Vec<String> = RE_CELL
                .captures_iter(&row[1])
                .map(|cell| cell_text(&cell[1]))
                .collect();
            let filename = cells.get(1).filter(|name| !name.is_empty())?;
            let size_mib = parse_filesize_mib(cells.get(3)?)?;
            Some(IndexEntry {
                filename: filename.clone(),
                size_mib,
                parts: describe_filename(filename),
            })
        })
        .collect();
    debug!("{} entries in index", entries.len());
    entries
}

/// Count and sum the entries of each day, ordered by day label.
///
/// Entries with no timestamp in their name are left out.
pub fn summarise_days(entries: &[IndexEntry]) -> Vec<DaySummary> {
    entries
        .iter()
        .filter_map(|entry| entry.day_label().map(|day| (day, entry)))
        .into_group_map()
        .into_iter()
        .map(|(day, day_entries)| DaySummary {
            num_files: day_entries.len(),
            size_mib: day_entries.iter().map(|entry| entry.size_mib).sum(),
            day,
        })
        .sorted_by(|a, b| a.day.cmp(&b.day))
        .collect()
}

/// The names of the files acquired on the day with the given `MM/DD` label.
pub fn files_for_day(entries: &[IndexEntry], day: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.day_label().as_deref() == Some(day))
        .map(|entry| entry.filename.clone())
        .collect()
}

/// Somewhere raw files can be listed and downloaded from.
pub trait RemoteSource {
    /// The HTML of the directory index.
    ///
    /// # Errors
    ///
    /// Any failure reaching the source.
    fn index_html(&self) -> Result<String, FetchError>;

    /// Write the contents of the remote file `name` into `writer`.
    ///
    /// # Errors
    ///
    /// Any failure reaching the source or writing.
    fn copy_file(&self, name: &str, writer: &mut dyn Write) -> Result<u64, FetchError>;
}

/// Fetch and parse the index of `source`.
///
/// # Errors
///
/// See [`RemoteSource::index_html`].
pub fn fetch_index<S: RemoteSource + ?Sized>(source: &S) -> Result<Vec<IndexEntry>, FetchError> {
    let entries = parse_index(&source.index_html()?);
    info!("archive lists {} files", entries.len());
    Ok(entries)
}

/// Download each of `names` from `source` into `raw_dir`, which is created if needed.
///
/// With `dry_run` set, only logs what would be downloaded. Returns the local paths. A file which
/// fails part way is removed before the error is returned.
///
/// # Errors
///
/// - [`FetchError::Write`] if `raw_dir` or a destination file can't be written
/// - any error from [`RemoteSource::copy_file`]
pub fn fetch_files<S: RemoteSource + ?Sized>(
    source: &S,
    names: &[String],
    raw_dir: &Path,
    dry_run: bool,
    draw_progress: bool,
) -> Result<Vec<PathBuf>, FetchError> {
    trace!("start fetch_files ({} files)", names.len());
    if !dry_run {
        std::fs::create_dir_all(raw_dir).map_err(|source| FetchError::Write {
            path: raw_dir.to_path_buf(),
            source,
        })?;
    }

    let progress = file_progress(names.len(), "fetching", draw_progress && !dry_run);
    let mut paths = Vec::with_capacity(names.len());
    for name in names {
        let path = raw_dir.join(name);
        if dry_run {
            info!("would fetch {} to {}", name, path.display());
            paths.push(path);
            continue;
        }
        info!("fetching {} to {}", name, path.display());
        if let Err(err) = download(source, name, &path) {
            if path.exists() {
                if let Err(rm_err) = std::fs::remove_file(&path) {
                    warn!("could not remove partial {}: {}", path.display(), rm_err);
                }
            }
            return Err(err);
        }
        progress.inc(1);
        paths.push(path);
    }
    progress.finish();
    Ok(paths)
}

fn download<S: RemoteSource + ?Sized>(
    source: &S,
    name: &str,
    path: &Path,
) -> Result<(), FetchError> {
    let write_err = |source| FetchError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
    let num_bytes = source.copy_file(name, &mut writer)?;
    writer.flush().map_err(write_err)?;
    debug!("{}: {} bytes", path.display(), num_bytes);
    Ok(())
}

#[cfg(feature = "fetch")]
pub use self::http::HttpSource;

#[cfg(feature = "fetch")]
mod http {
    use std::{io::Write, time::Duration};

    use log::trace;
    use reqwest::{
        blocking::{Client, Response},
        StatusCode,
    };

    use super::{FetchError, RemoteSource};
    use crate::constants::ARCHIVE_TIMEOUT_SECONDS;

    /// The archive served over HTTP with basic auth.
    #[derive(Debug, Clone)]
    pub struct HttpSource {
        base_url: String,
        user: String,
        password: String,
        client: Client,
    }

    impl HttpSource {
        /// A source rooted at `base_url`.
        ///
        /// # Errors
        ///
        /// Will error with [`FetchError::Http`] if the client can't be built.
        pub fn new(base_url: &str, user: &str, password: &str) -> Result<Self, FetchError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(ARCHIVE_TIMEOUT_SECONDS))
                .build()
                .map_err(|source| FetchError::Http {
                    url: base_url.to_string(),
                    source,
                })?;
            Ok(Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                user: user.to_string(),
                password: password.to_string(),
                client,
            })
        }

        /// The url of a remote file.
        pub fn file_url(&self, name: &str) -> String {
            format!("{}/{}", self.base_url, name)
        }

        fn get(&self, url: &str) -> Result<Response, FetchError> {
            trace!("GET {}", url);
            self.client
                .get(url)
                .basic_auth(&self.user, Some(&self.password))
                .send()
                .map_err(|source| FetchError::Http {
                    url: url.to_string(),
                    source,
                })
        }
    }

    /// The error for a file the archive doesn't have, if `status` says so.
    fn unavailable(name: &str, status: StatusCode) -> Option<FetchError> {
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => Some(FetchError::Unavailable {
                name: name.to_string(),
                reason: status.to_string(),
            }),
            _ => None,
        }
    }

    impl RemoteSource for HttpSource {
        fn index_html(&self) -> Result<String, FetchError> {
            let url = format!("{}/", self.base_url);
            self.get(&url)?
                .error_for_status()
                .and_then(|response| response.text())
                .map_err(|source| FetchError::Http { url, source })
        }

        fn copy_file(&self, name: &str, writer: &mut dyn Write) -> Result<u64, FetchError> {
            let url = self.file_url(name);
            let response = self.get(&url)?;
            if let Some(err) = unavailable(name, response.status()) {
                return Err(err);
            }
            response
                .error_for_status()
                .and_then(|mut response| response.copy_to(writer))
                .map_err(|source| FetchError::Http { url, source })
        }
    }

}

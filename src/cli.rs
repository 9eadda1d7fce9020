//! Command Line Interface helpers for uirapuru

use crate::{
    archive::{fetch_files, fetch_index, files_for_day, summarise_days, HttpSource, IndexEntry},
    chunking::Chunk,
    constants::{DEFAULT_ARCHIVE_URL, DEFAULT_CHUNK_RANGE, DEFAULT_CHUNK_THRESHOLD_MIB},
    error::{
        CLIError::InvalidCommandLineArgument,
        UirapuruError::{self, ClapError, DryRun},
    },
    grouping::ObservationGroup,
    loader::LoadedSeries,
    PipelineContext,
};
use clap::{
    arg, command,
    ErrorKind::{ArgumentNotFound, DisplayHelp, DisplayVersion},
    ValueHint::DirPath,
};
use hifitime::Epoch;
use log::{debug, info, trace};
use prettytable::{cell, format as prettyformat, row, table, Table};
use std::{
    collections::HashMap,
    ffi::OsString,
    fmt::{Debug, Display},
    ops::Range,
    path::PathBuf,
    time::Duration,
};

/// What to do once the arguments are parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Print the observations found in the raw directory
    Summary,
    /// Print the chunks of one observation
    Chunks {
        /// Observation id
        group_id: usize,
    },
    /// Load a range of chunks of one observation
    Load {
        /// Observation id
        group_id: usize,
    },
    /// Print the files available in the archive, per day
    Index {
        /// Archive connection
        remote: RemoteArgs,
    },
    /// Download files from the archive into the raw directory
    Fetch {
        /// Archive connection
        remote: RemoteArgs,
        /// Which files to download
        selection: FetchSelection,
        /// Only log what would be downloaded
        dry_run: bool,
    },
}

/// How to reach the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteArgs {
    /// Index url
    pub url: String,
    /// Basic auth user
    pub user: String,
    /// Basic auth password
    pub password: String,
}

/// Which archive files to download.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchSelection {
    /// These names
    Names(Vec<String>),
    /// Every file of the `MM/DD` day
    Day(String),
    /// Everything in the index
    All,
}

/// Args for running uirapuru from the command line.
pub struct UirapuruContext {
    /// Stage parameters
    pub pipeline: PipelineContext,
    /// The selected subcommand
    pub task: Task,
}

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// Write a few lines of how this executable was compiled.
///
/// # Errors
///
/// propagates writeln! fails
pub fn fmt_build_info(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match GIT_HEAD_REF {
        Some(hr) => {
            let dirty = GIT_DIRTY.unwrap_or(false);
            writeln!(
                f,
                "Compiled on git commit hash: {}{}",
                GIT_COMMIT_HASH.unwrap_or("<unknown>"),
                if dirty { " (dirty)" } else { "" }
            )?;
            writeln!(f, "            git head ref: {hr}")?;
        }
        None => writeln!(f, "Compiled on git commit hash: <no git info>")?,
    }
    writeln!(f, "            {BUILT_TIME_UTC}")?;
    writeln!(f, "         with compiler {RUSTC_VERSION}")?;
    writeln!(f)?;
    Ok(())
}

impl Display for UirapuruContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} version {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
        )?;
        fmt_build_info(f)?;
        write!(f, "{}", self.pipeline)?;
        match &self.task {
            Task::Summary => writeln!(f, "Will summarise observations.")?,
            Task::Chunks { group_id } => {
                writeln!(f, "Will plan chunks of observation {group_id}.")?
            }
            Task::Load { group_id } => writeln!(f, "Will load observation {group_id}.")?,
            Task::Index { remote } => writeln!(f, "Will list the archive at {}.", remote.url)?,
            Task::Fetch {
                remote,
                selection,
                dry_run,
            } => writeln!(
                f,
                "Will {}fetch {} from {}.",
                if *dry_run { "pretend to " } else { "" },
                match selection {
                    FetchSelection::Names(names) => format!("{} files", names.len()),
                    FetchSelection::Day(day) => format!("the files of {day}"),
                    FetchSelection::All => "every file".to_string(),
                },
                remote.url
            )?,
        }
        Ok(())
    }
}

/// Render observation groups as a table.
pub fn group_table(groups: &[ObservationGroup]) -> Table {
    let mut table = table!([
        "id", "start (UTC)", "duration", "size [GiB]", "min [MHz]", "max [MHz]", "chans", "files"
    ]);
    table.set_format(*prettyformat::consts::FORMAT_CLEAN);
    for group in groups {
        table.add_row(row![r =>
            group.id,
            format_epoch(group.start),
            format!("{}", group.duration),
            format!("{:.2}", group.size_gib),
            format!("{:.1}", group.min_freq_mhz),
            format!("{:.1}", group.max_freq_mhz),
            group.num_chans,
            group.num_files()
        ]);
    }
    table
}

/// Render a chunk plan as a table, marking the chunks in `selected`.
pub fn chunk_table(chunks: &[Chunk], selected: &Range<usize>) -> Table {
    let mut table = table!(["chunk", "files", "size [MiB]", "first file", "s"]);
    table.set_format(*prettyformat::consts::FORMAT_CLEAN);
    for (chunk_idx, chunk) in chunks.iter().enumerate() {
        let first = chunk
            .files
            .first()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        table.add_row(row![r =>
            chunk_idx,
            chunk.len(),
            format!("{:.2}", chunk.size_mib),
            first,
            if selected.contains(&chunk_idx) {"s"} else {""}
        ]);
    }
    table
}

/// Render the per day summary of an archive index as a table.
pub fn day_table(entries: &[IndexEntry]) -> Table {
    let mut table = table!(["day", "files", "size [GiB]"]);
    table.set_format(*prettyformat::consts::FORMAT_CLEAN);
    for day in summarise_days(entries) {
        table.add_row(row![r => day.day, day.num_files, format!("{:.2}", day.size_gib())]);
    }
    table
}

fn format_epoch(epoch: Epoch) -> String {
    let (y, mo, d, h, mi, s, _) = epoch.to_gregorian_utc();
    format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}")
}

fn describe_series(series: &LoadedSeries) -> String {
    match (series.times.first(), series.times.last()) {
        (Some(&first), Some(&last)) => format!(
            "{} samples x {} channels, {} to {}, {:.1} to {:.1} MHz",
            series.num_times(),
            series.num_freqs(),
            format_epoch(first),
            format_epoch(last),
            series.freqs_mhz.first().copied().unwrap_or_default(),
            series.freqs_mhz.last().copied().unwrap_or_default(),
        ),
        _ => "nothing selected".to_string(),
    }
}

impl UirapuruContext {
    fn get_matches<I, T>(args: I) -> Result<clap::ArgMatches, UirapuruError>
    where
        I: IntoIterator<Item = T> + Debug,
        T: Into<OsString> + Clone,
    {
        let group_arg = arg!(group: <GROUP> "Observation id, as listed by summary")
            .required(true);
        let remote_args = [
            arg!(--url <URL> "Archive index url")
                .required(false)
                .default_value(DEFAULT_ARCHIVE_URL),
            arg!(--user <USER> "Archive user")
                .required(false)
                .env("WWWUSER")
                .default_value("user"),
            arg!(--password <PASSWORD> "Archive password")
                .required(false)
                .env("WWWPWD")
                .hide_env_values(true)
                .default_value("password"),
        ];

        #[allow(unused_mut)]
        let mut app = command!()
            .arg_required_else_help(true)
            .next_line_help(false)
            .about("Inventory, group, chunk and load UIRAPURU solar radio spectrometer files.")
            .args(&[
                arg!(--root <DIR> "Project root, raw files are read from <DIR>/data/raw")
                    .required(false)
                    .default_value(".")
                    .value_hint(DirPath),
                arg!(--"skip-malformed" "Leave out raw files which can't be read"),
                arg!(--"dry-run" "Just print the summary and exit"),
                arg!(--"no-draw-progress" "do not show progress bars"),
                arg!(--"chunk-threshold" <MIB> "Close chunks at <MIB> MiB [default: 200]")
                    .help_heading("CHUNKING")
                    .required(false),
                arg!(--"chunk-range" "Chunk index range [START, END) to load [default: 0 10]")
                    .help_heading("CHUNKING")
                    .value_names(&["START", "END"])
                    .required(false),
            ])
            .subcommand(clap::Command::new("summary").about("List the observations found"))
            .subcommand(
                clap::Command::new("chunks")
                    .about("List the chunks of an observation")
                    .arg(group_arg.clone()),
            )
            .subcommand(
                clap::Command::new("load")
                    .about("Load a range of chunks of an observation")
                    .arg(group_arg),
            )
            .subcommand(
                clap::Command::new("index")
                    .about("List the archive per day")
                    .args(&remote_args),
            )
            .subcommand(
                clap::Command::new("fetch")
                    .about("Download archive files into the raw directory")
                    .args(&remote_args)
                    .args(&[
                        arg!(names: [NAMES]... "Names of the files to fetch"),
                        arg!(--day <DAY> "Fetch every file of day MM/DD")
                            .required(false)
                            .conflicts_with("names"),
                        arg!(--all "Fetch every file in the index")
                            .conflicts_with_all(&["names", "day"]),
                        arg!(--"dry-run" "Only log what would be fetched"),
                    ]),
            );

        app.try_get_matches_from_mut(args).map_err(ClapError)
    }

    fn parse_group_id(matches: &clap::ArgMatches) -> Result<usize, UirapuruError> {
        matches.value_of_t::<usize>("group").map_err(|_| {
            UirapuruError::CLIError(InvalidCommandLineArgument {
                option: "<GROUP>".into(),
                expected: "a non-negative integer".into(),
                received: matches.value_of("group").unwrap_or_default().into(),
            })
        })
    }

    fn parse_remote_matches(matches: &clap::ArgMatches) -> RemoteArgs {
        RemoteArgs {
            url: matches.value_of("url").unwrap_or(DEFAULT_ARCHIVE_URL).into(),
            user: matches.value_of("user").unwrap_or_default().into(),
            password: matches.value_of("password").unwrap_or_default().into(),
        }
    }

    fn parse_task_matches(matches: &clap::ArgMatches) -> Result<Task, UirapuruError> {
        let task = match matches.subcommand() {
            Some(("chunks", sub_matches)) => Task::Chunks {
                group_id: Self::parse_group_id(sub_matches)?,
            },
            Some(("load", sub_matches)) => Task::Load {
                group_id: Self::parse_group_id(sub_matches)?,
            },
            Some(("index", sub_matches)) => Task::Index {
                remote: Self::parse_remote_matches(sub_matches),
            },
            Some(("fetch", sub_matches)) => {
                let selection = if sub_matches.is_present("all") {
                    FetchSelection::All
                } else if let Some(day) = sub_matches.value_of("day") {
                    FetchSelection::Day(day.into())
                } else if let Some(names) = sub_matches.values_of("names") {
                    FetchSelection::Names(names.map(Into::into).collect())
                } else {
                    return Err(UirapuruError::CLIError(InvalidCommandLineArgument {
                        option: "fetch".into(),
                        expected: "file names, --day <DAY> or --all".into(),
                        received: "nothing".into(),
                    }));
                };
                Task::Fetch {
                    remote: Self::parse_remote_matches(sub_matches),
                    selection,
                    dry_run: sub_matches.is_present("dry-run"),
                }
            }
            _ => Task::Summary,
        };
        Ok(task)
    }

    fn parse_pipeline_matches(
        matches: &clap::ArgMatches,
    ) -> Result<PipelineContext, UirapuruError> {
        let chunk_threshold_mib = match matches.value_of_t::<f64>("chunk-threshold") {
            Ok(threshold) if threshold.is_finite() && threshold >= 0.0 => threshold,
            Err(err) if err.kind() == ArgumentNotFound => DEFAULT_CHUNK_THRESHOLD_MIB,
            _ => {
                return Err(UirapuruError::CLIError(InvalidCommandLineArgument {
                    option: "--chunk-threshold <MIB>".into(),
                    expected: "a non-negative number".into(),
                    received: matches.value_of("chunk-threshold").unwrap_or_default().into(),
                }))
            }
        };

        let chunk_range = match matches.values_of_t::<usize>("chunk-range") {
            Ok(bounds) if bounds.len() == 2 && bounds[0] <= bounds[1] => bounds[0]..bounds[1],
            Err(err) if err.kind() == ArgumentNotFound => DEFAULT_CHUNK_RANGE,
            _ => {
                return Err(UirapuruError::CLIError(InvalidCommandLineArgument {
                    option: "--chunk-range <START> <END>".into(),
                    expected: "two integers, START <= END".into(),
                    received: matches
                        .values_of("chunk-range")
                        .map(|values| values.collect::<Vec<_>>().join(" "))
                        .unwrap_or_default(),
                }))
            }
        };

        Ok(PipelineContext {
            root: PathBuf::from(matches.value_of("root").unwrap_or(".")),
            chunk_threshold_mib,
            chunk_range,
            skip_malformed: matches.is_present("skip-malformed"),
            draw_progress: !matches.is_present("no-draw-progress"),
        })
    }

    /// Parse an iterator of arguments, `args` into a `UirapuruContext`.
    ///
    /// # Errors
    ///
    /// Can raise:
    /// - [`UirapuruError::ClapError`] if clap cannot parse `args`
    /// - [`UirapuruError::CLIError`] if the arguments are invalid.
    /// - [`UirapuruError::DryRun`] if `--dry-run` was given
    pub fn from_args<I, T>(args: I) -> Result<Self, UirapuruError>
    where
        I: IntoIterator<Item = T> + Debug,
        T: Into<OsString> + Clone,
    {
        debug!("args:\n{:?}", &args);

        let matches = Self::get_matches(args)?;
        trace!("arg matches:\n{:?}", &matches);

        let result = Self {
            pipeline: Self::parse_pipeline_matches(&matches)?,
            task: Self::parse_task_matches(&matches)?,
        };

        info!("{}", &result);

        if matches.is_present("dry-run") {
            return Err(DryRun {});
        }

        Ok(result)
    }

    /// Run the selected task, returning how long each stage took.
    ///
    /// # Errors
    ///
    /// Any error from the stages or from the archive.
    pub fn run(self) -> Result<HashMap<String, Duration>, UirapuruError> {
        let Self { pipeline, task } = self;

        // used to time large operations
        let mut durations = HashMap::<String, Duration>::new();

        match task {
            Task::Summary => {
                let records = pipeline.inventory(&mut durations)?;
                let groups = pipeline.group(&records, &mut durations);
                println!(
                    "{} observations in {} files:\n{}",
                    groups.len(),
                    records.len(),
                    group_table(&groups)
                );
            }
            Task::Chunks { group_id } => {
                let records = pipeline.inventory(&mut durations)?;
                let groups = pipeline.group(&records, &mut durations);
                let chunks = pipeline.chunks(&records, &groups, group_id, &mut durations)?;
                println!(
                    "{} chunks of observation {}:\n{}",
                    chunks.len(),
                    group_id,
                    chunk_table(&chunks, &pipeline.chunk_range)
                );
            }
            Task::Load { group_id } => {
                let series = pipeline.run(group_id, &mut durations)?;
                println!("observation {}: {}", group_id, describe_series(&series));
            }
            Task::Index { remote } => {
                let source = HttpSource::new(&remote.url, &remote.user, &remote.password)?;
                let entries = fetch_index(&source)?;
                println!("{} files:\n{}", entries.len(), day_table(&entries));
            }
            Task::Fetch {
                remote,
                selection,
                dry_run,
            } => {
                let source = HttpSource::new(&remote.url, &remote.user, &remote.password)?;
                let names = match selection {
                    FetchSelection::Names(names) => names,
                    FetchSelection::Day(day) => files_for_day(&fetch_index(&source)?, &day),
                    FetchSelection::All => fetch_index(&source)?
                        .into_iter()
                        .map(|entry| entry.filename)
                        .collect(),
                };
                let paths = fetch_files(
                    &source,
                    &names,
                    &pipeline.raw_dir(),
                    dry_run,
                    pipeline.draw_progress,
                )?;
                println!("{} files fetched to {}", paths.len(), pipeline.raw_dir().display());
            }
        }

        Ok(durations)
    }
}

/// Parse `args`, run the selected task and report how long it took. Returns the process exit
/// code.
pub fn main_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T> + Debug,
    T: Into<OsString> + Clone,
{
    let context = match UirapuruContext::from_args(args) {
        Ok(context) => context,
        Err(DryRun {}) => {
            info!("Dry run. Nothing will be read.");
            return 0;
        }
        Err(ClapError(inner)) => {
            // Swallow broken pipe errors
            trace!("clap error: {:?}", inner.kind());
            let _ = inner.print();
            match inner.kind() {
                DisplayHelp | DisplayVersion => return 0,
                _ => return 1,
            }
        }
        Err(e) => {
            eprintln!("error parsing args: {e}");
            return 1;
        }
    };

    match context.run() {
        Ok(durations) => {
            info!(
                "total duration: {:?}",
                durations
                    .into_iter()
                    .fold(Duration::ZERO, |duration_sum, (name, duration)| {
                        info!("{} duration: {:?}", name, duration);
                        duration_sum + duration
                    })
            );
            0
        }
        Err(e) => {
            eprintln!("uirapuru error: {e}");
            1
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{chunk_table, day_table, group_table};
    use crate::{
        archive::parse_index,
        chunking::plan_chunks,
        grouping::group_observations,
        test_common::{reference_epoch, synthetic_run},
    };

    #[test]
    fn test_group_table() {
        let records = synthetic_run("obs", reference_epoch(), 3, 900.0, 900.0);
        let groups = group_observations(&records);
        let rendered = group_table(&groups).to_string();
        assert!(rendered.contains("2023-04-15 12:30:00"));
        assert!(rendered.contains("1200.0"));
        assert!(rendered.contains("0.15"));
    }

    #[test]
    fn test_chunk_table() {
        let records = synthetic_run("obs", reference_epoch(), 5, 900.0, 900.0);
        let chunks = plan_chunks(&records, 100.0);
        assert_eq!(chunks.len(), 3);
        let rendered = chunk_table(&chunks, &(0..1)).to_string();
        assert!(rendered.contains("obs_000.fit"));
        assert!(rendered.contains("obs_004.fit"));
        assert!(rendered.contains("100.00"));
    }

    #[test]
    fn test_day_table() {
        let html = r#"<table>
<tr><td></td><td><a href="X_20230415_123000_59.fit">X_20230415_123000_59.fit</a></td><td>2023-04-15 12:45</td><td>512M</td></tr>
</table>"#;
        let rendered = day_table(&parse_index(html)).to_string();
        assert!(rendered.contains("04/15"));
        assert!(rendered.contains("0.50"));
    }
}

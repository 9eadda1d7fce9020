//! Running the inventory, grouping, chunking and loading stages against a project root.
use crate::{
    build_inventory, build_inventory_from_paths,
    chunking::{plan_chunks, Chunk},
    constants::{DEFAULT_CHUNK_RANGE, DEFAULT_CHUNK_THRESHOLD_MIB, RAW_DATA_SUBDIR},
    error::UirapuruError,
    grouping::{group_observations, select_group, ObservationGroup},
    inventory::{skip_malformed, FileRecord},
    io::list_raw_files,
    loader::{load_range, LoadedSeries},
    with_increment_duration,
};
use derive_builder::Builder;
use log::{info, trace};
use std::{
    collections::HashMap,
    fmt::Display,
    ops::Range,
    path::PathBuf,
    time::Duration,
};

/// Options for processing the raw files under a project root
#[derive(Builder, Debug, Clone)]
pub struct PipelineContext {
    /// The project root, raw files live in `<root>/data/raw`
    #[builder(default = "PathBuf::from(\".\")")]
    pub root: PathBuf,
    /// Chunks are closed once they reach this size in MiB
    #[builder(default = "DEFAULT_CHUNK_THRESHOLD_MIB")]
    pub chunk_threshold_mib: f64,
    /// Which chunks to load, `[start, end)`
    #[builder(default = "DEFAULT_CHUNK_RANGE")]
    pub chunk_range: Range<usize>,
    /// Whether to leave out files which can't be read instead of failing
    #[builder(default = "false")]
    pub skip_malformed: bool,
    /// Whether to draw progress bars
    #[builder(default = "true")]
    pub draw_progress: bool,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            chunk_threshold_mib: DEFAULT_CHUNK_THRESHOLD_MIB,
            chunk_range: DEFAULT_CHUNK_RANGE,
            skip_malformed: false,
            draw_progress: true,
        }
    }
}

impl Display for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Will read raw files from {}.", self.raw_dir().display())?;
        writeln!(
            f,
            "{} skip malformed files.",
            if self.skip_malformed {
                "Will"
            } else {
                "Will not"
            }
        )?;
        writeln!(
            f,
            "Will close chunks at {} MiB, and load chunks {:?}.",
            self.chunk_threshold_mib, self.chunk_range
        )?;
        Ok(())
    }
}

impl PipelineContext {
    /// Where the raw files are.
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DATA_SUBDIR)
    }

    /// Build the inventory of [`Self::raw_dir`].
    ///
    /// # Errors
    ///
    /// See [`crate::build_inventory`]. When `skip_malformed` is set, only listing the directory
    /// can fail.
    pub fn inventory(
        &self,
        durations: &mut HashMap<String, Duration>,
    ) -> Result<Vec<FileRecord>, UirapuruError> {
        trace!("start inventory");
        let raw_dir = self.raw_dir();
        let records = with_increment_duration!(durations, "inventory", {
            if self.skip_malformed {
                let (good, rejected) = skip_malformed(&list_raw_files(&raw_dir)?);
                if !rejected.is_empty() {
                    info!("left out {} malformed files", rejected.len());
                }
                build_inventory_from_paths(&good)?
            } else {
                build_inventory(&raw_dir)?
            }
        });
        Ok(records)
    }

    /// Group an inventory into observations.
    pub fn group(
        &self,
        records: &[FileRecord],
        durations: &mut HashMap<String, Duration>,
    ) -> Vec<ObservationGroup> {
        with_increment_duration!(durations, "group", group_observations(records))
    }

    /// Plan the chunks of the observation with the given id.
    ///
    /// # Errors
    ///
    /// Will error with [`UirapuruError::GroupNotFound`] if there is no such group.
    pub fn chunks(
        &self,
        records: &[FileRecord],
        groups: &[ObservationGroup],
        group_id: usize,
        durations: &mut HashMap<String, Duration>,
    ) -> Result<Vec<Chunk>, UirapuruError> {
        let files = select_group(records, groups, group_id)?;
        Ok(with_increment_duration!(
            durations,
            "chunk",
            plan_chunks(files, self.chunk_threshold_mib)
        ))
    }

    /// Load the configured range of `chunks`.
    ///
    /// # Errors
    ///
    /// See [`crate::load_range`].
    pub fn load(
        &self,
        chunks: &[Chunk],
        durations: &mut HashMap<String, Duration>,
    ) -> Result<LoadedSeries, UirapuruError> {
        let series = with_increment_duration!(
            durations,
            "load",
            load_range(chunks, self.chunk_range.clone(), self.draw_progress)?
        );
        info!(
            "loaded {} samples of {} channels",
            series.num_times(),
            series.num_freqs()
        );
        Ok(series)
    }

    /// Run every stage for one observation, from the raw directory to the loaded range.
    ///
    /// # Errors
    ///
    /// Any error from the stages.
    pub fn run(
        &self,
        group_id: usize,
        durations: &mut HashMap<String, Duration>,
    ) -> Result<LoadedSeries, UirapuruError> {
        let records = self.inventory(durations)?;
        let groups = self.group(&records, durations);
        let chunks = self.chunks(&records, &groups, group_id, durations)?;
        self.load(&chunks, durations)
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineContext, PipelineContextBuilder};
    use crate::{
        error::UirapuruError,
        io::error::IOError,
        test_common::{write_test_fit, TestFit},
    };
    use std::{collections::HashMap, path::Path};
    use tempfile::tempdir;

    fn write_session(root: &Path) {
        let raw_dir = root.join("data").join("raw");
        std::fs::create_dir_all(&raw_dir).unwrap();
        // 8 samples of 0.25 s, a new file every 2 s
        for idx in 0..4 {
            write_test_fit(
                raw_dir.join(format!("UIRAPURU_{idx:02}.fit")),
                &TestFit::starting_after(idx * 2),
            );
        }
        // a lone file with another frequency range
        write_test_fit(
            raw_dir.join("UIRAPURU_lone.fit"),
            &TestFit {
                min_freq_hz: 45e6,
                max_freq_hz: 870e6,
                ..TestFit::starting_after(600)
            },
        );
    }

    #[test]
    fn test_builder_defaults() {
        let context = PipelineContextBuilder::default().build().unwrap();
        assert_eq!(context.root, Path::new("."));
        assert_eq!(context.chunk_range, 0..10);
        assert!(!context.skip_malformed);
        assert!(context.draw_progress);
        assert_eq!(context.raw_dir(), Path::new("./data/raw"));
        let display = format!("{context}");
        assert!(display.contains("Will not skip malformed files."));
        assert!(display.contains("200 MiB"));
    }

    #[test]
    fn test_run_loads_session() {
        let tmp_dir = tempdir().unwrap();
        write_session(tmp_dir.path());

        let context = PipelineContextBuilder::default()
            .root(tmp_dir.path().to_path_buf())
            .chunk_threshold_mib(0.0)
            .draw_progress(false)
            .build()
            .unwrap();
        let mut durations = HashMap::new();

        let records = context.inventory(&mut durations).unwrap();
        assert_eq!(records.len(), 5);
        let groups = context.group(&records, &mut durations);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].num_files(), 4);

        // a zero threshold puts every file in its own chunk
        let chunks = context.chunks(&records, &groups, 0, &mut durations).unwrap();
        assert_eq!(chunks.len(), 4);

        let series = context.run(0, &mut durations).unwrap();
        assert_eq!(series.num_times(), 32);
        for stage in ["inventory", "group", "chunk", "load"] {
            assert!(durations.contains_key(stage), "missing {stage}");
        }

        let partial = PipelineContext {
            chunk_range: 1..3,
            ..context
        };
        assert_eq!(partial.run(0, &mut durations).unwrap().num_times(), 16);
    }

    #[test]
    fn test_skip_malformed_files() {
        let tmp_dir = tempdir().unwrap();
        write_session(tmp_dir.path());
        write_test_fit(
            tmp_dir.path().join("data/raw/UIRAPURU_bad.fit"),
            &TestFit {
                skip_keys: vec!["MAXFREQ"],
                ..TestFit::default()
            },
        );

        let strict = PipelineContext {
            root: tmp_dir.path().to_path_buf(),
            draw_progress: false,
            ..PipelineContext::default()
        };
        assert!(matches!(
            strict.inventory(&mut HashMap::new()),
            Err(UirapuruError::IOError(IOError::MissingHeaderField { .. }))
        ));

        let lenient = PipelineContext {
            skip_malformed: true,
            ..strict
        };
        assert_eq!(lenient.inventory(&mut HashMap::new()).unwrap().len(), 5);
        match lenient.run(3, &mut HashMap::new()) {
            Err(UirapuruError::GroupNotFound { id, .. }) => assert_eq!(id, 3),
            Err(e) => panic!("expected GroupNotFound, not {e}"),
            Ok(_) => panic!("expected error, but got Ok(_)"),
        }
    }
}

//! Writes raw spectrometer files for the integration tests.

use std::path::Path;

#[path = "../../src/test_common/fit_writer.rs"]
mod fit_writer;
use fit_writer::{write_test_fit, TestFit};

pub const NUM_TIME_SAMPLES: usize = 10;
pub const NUM_CHANS: usize = 3;

/// Write a raw file of the 1200-1500 MHz band starting at 2023-04-15 `hhmmss`.
pub fn write_raw_file(path: &Path, hhmmss: &str) {
    let fit = TestFit {
        date_obs: "2023/04/15".into(),
        time_obs: format!("{hhmmss}.000"),
        num_time_samples: NUM_TIME_SAMPLES,
        num_chans: NUM_CHANS,
        sample_interval_s: 0.1,
        ..TestFit::default()
    };
    write_test_fit(path, &fit);
}

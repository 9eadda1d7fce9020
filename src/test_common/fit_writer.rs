//! Writes raw spectrometer files in the instrument's layout. Shared by the unit tests and the
//! integration tests, so it only depends on fitsio.
#![allow(dead_code)]

use std::path::Path;

use fitsio::{
    images::{ImageDescription, ImageType},
    tables::{ColumnDataDescription, ColumnDataType, ConcreteColumnDescription},
    FitsFile,
};

/// Describes a raw file to be written by [`write_test_fit`].
#[derive(Debug, Clone)]
pub struct TestFit {
    pub date_obs: String,
    pub time_obs: String,
    /// `NAXIS2`, rows of the image
    pub num_time_samples: usize,
    /// `NAXIS1`, columns of the image
    pub num_chans: usize,
    pub min_freq_hz: f64,
    pub max_freq_hz: f64,
    /// seconds between consecutive samples
    pub sample_interval_s: f64,
    /// primary keys that should not be written
    pub skip_keys: Vec<&'static str>,
}

impl Default for TestFit {
    fn default() -> Self {
        Self {
            date_obs: "20230415".into(),
            time_obs: "123000.000000".into(),
            num_time_samples: 8,
            num_chans: 4,
            min_freq_hz: 1200e6,
            max_freq_hz: 1500e6,
            sample_interval_s: 0.25,
            skip_keys: vec![],
        }
    }
}

impl TestFit {
    /// Same file, starting `offset_s` seconds after 2023-04-15 12:30:00 UTC.
    pub fn starting_after(offset_s: u32) -> Self {
        let total_s = 12 * 3600 + 30 * 60 + offset_s;
        assert!(total_s < 24 * 3600, "test files must start on the same day");
        let (hours, minutes, seconds) = (total_s / 3600, (total_s % 3600) / 60, total_s % 60);
        Self {
            time_obs: format!("{hours:02}{minutes:02}{seconds:02}.000000"),
            ..Self::default()
        }
    }

    pub fn time_offsets(&self) -> Vec<f64> {
        (0..self.num_time_samples)
            .map(|idx| idx as f64 * self.sample_interval_s)
            .collect()
    }

    pub fn freq_axis_mhz(&self) -> Vec<f64> {
        let (min, max) = (self.min_freq_hz / 1e6, self.max_freq_hz / 1e6);
        match self.num_chans {
            0 => vec![],
            1 => vec![min],
            n => (0..n)
                .map(|idx| min + (max - min) * idx as f64 / (n - 1) as f64)
                .collect(),
        }
    }

    /// The value stored at a given channel and time sample.
    pub fn pixel(&self, chan_idx: usize, time_idx: usize) -> f32 {
        ((chan_idx * 37 + time_idx) % 251) as f32
    }
}

/// Write a raw spectrometer file: an image of `NAXIS2` time rows by `NAXIS1` channels, and a
/// table with the `TIME` and `FREQUENCY` vectors.
pub fn write_test_fit<T: AsRef<Path>>(path: T, fit: &TestFit) {
    // fitsio takes the slowest varying axis first
    let description = ImageDescription {
        data_type: ImageType::UnsignedByte,
        dimensions: &[fit.num_time_samples, fit.num_chans],
    };
    let mut fptr = FitsFile::create(path.as_ref())
        .with_custom_primary(&description)
        .open()
        .unwrap();
    let primary_hdu = fptr.primary_hdu().unwrap();

    let pixels: Vec<u8> = (0..fit.num_time_samples)
        .flat_map(|time_idx| {
            (0..fit.num_chans).map(move |chan_idx| fit.pixel(chan_idx, time_idx) as u8)
        })
        .collect();
    primary_hdu.write_image(&mut fptr, &pixels).unwrap();

    if !fit.skip_keys.contains(&"DATE-OBS") {
        primary_hdu
            .write_key(&mut fptr, "DATE-OBS", fit.date_obs.as_str())
            .unwrap();
    }
    if !fit.skip_keys.contains(&"TIME-OBS") {
        primary_hdu
            .write_key(&mut fptr, "TIME-OBS", fit.time_obs.as_str())
            .unwrap();
    }
    if !fit.skip_keys.contains(&"MINFREQ") {
        primary_hdu
            .write_key(&mut fptr, "MINFREQ", fit.min_freq_hz)
            .unwrap();
    }
    if !fit.skip_keys.contains(&"MAXFREQ") {
        primary_hdu
            .write_key(&mut fptr, "MAXFREQ", fit.max_freq_hz)
            .unwrap();
    }

    let columns = [
        ConcreteColumnDescription {
            name: "TIME".to_string(),
            data_type: ColumnDataDescription::vector(
                ColumnDataType::Double,
                fit.num_time_samples.max(1),
            ),
        },
        ConcreteColumnDescription {
            name: "FREQUENCY".to_string(),
            data_type: ColumnDataDescription::vector(ColumnDataType::Double, fit.num_chans.max(1)),
        },
    ];
    fptr.create_table("EXTNAME".to_string(), &columns).unwrap();

    let mut status = 0;
    for (col_num, mut cell) in [(1, fit.time_offsets()), (2, fit.freq_axis_mhz())] {
        if cell.is_empty() {
            continue;
        }
        unsafe {
            fitsio_sys::ffpcld(
                fptr.as_raw(),
                col_num,
                1,
                1,
                cell.len() as i64,
                cell.as_mut_ptr(),
                &mut status,
            );
        }
        fitsio::errors::check_status(status).unwrap();
    }
}

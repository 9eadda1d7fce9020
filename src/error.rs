//! Errors that can occur in uirapuru

use thiserror::Error;

use crate::io::error::IOError;

#[derive(Error, Debug)]
/// Errors relating to CLI arguments
pub enum CLIError {
    #[error("Invalid Command Line Argument {option}\nexpected: {expected}\nreceived: {received}")]
    /// When a bad CLI argument is provided
    InvalidCommandLineArgument {
        /// The argument name within the CLI
        option: String,
        /// The expected value
        expected: String,
        /// The received value
        received: String,
    },
}

#[derive(Error, Debug)]
/// All the errors that can occur in uirapuru
pub enum UirapuruError {
    #[error(transparent)]
    /// Error derived from [`crate::io::error::IOError`]
    IOError(#[from] IOError),

    #[error("no observation group with id {id}, known ids are {known:?}")]
    /// The requested observation group doesn't exist
    GroupNotFound {
        /// The requested id
        id: usize,
        /// All the ids that were found
        known: Vec<usize>,
    },

    #[error("{file}: expected {expected} channels to match the previous file, found {found}")]
    /// Files of a chunk range can't be concatenated along time
    ShapeMismatch {
        /// The file whose shape differs
        file: String,
        /// The channel count of the files read so far
        expected: usize,
        /// The channel count of this file
        found: usize,
    },

    #[cfg(feature = "fetch")]
    #[error(transparent)]
    /// Error derived from [`crate::archive::FetchError`]
    Fetch(#[from] crate::archive::FetchError),

    #[cfg(feature = "cli")]
    #[error(transparent)]
    /// Error derived from [`clap::Error`]
    ClapError(#[from] clap::Error),

    #[error(transparent)]
    /// Error derived from [`CLIError`]
    CLIError(#[from] CLIError),

    #[error("Dry run")]
    /// Dry run, nothing was done past argument parsing
    DryRun {},
}

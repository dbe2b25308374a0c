//! Crate-wide error and result types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the decoder can report.
///
/// Any of them aborts the container being processed.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown device model {0:?}")]
    UnknownModel(String),
    #[error("wrong header format: subfiles need {required} bytes, container has {actual}")]
    Format { required: u64, actual: u64 },
    #[error("subfile table exhausted after {found} of {expected} entries")]
    TruncatedTable { found: usize, expected: usize },
    #[error("unknown part number {ordinal} in table slot {slot}")]
    UnknownPart { ordinal: u32, slot: usize },
    #[error("encrypted size {0} is not a multiple of the cipher block size")]
    Alignment(u32),
    #[error("encrypted body needs {required} bytes, container has {actual}")]
    TruncatedBody { required: u64, actual: u64 },
    #[error("part {ordinal} needs {needed} bytes, only {available} remain")]
    TruncatedData { ordinal: u32, needed: u64, available: u64 },
    #[error("output directory {} is already used by another input", .0.display())]
    DuplicateOutput(PathBuf),
    #[error("invalid model profile: {0}")]
    Profile(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

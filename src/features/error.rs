use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("Expected 3 rational components, found {0}")]
    MissingComponent(usize),

    #[error("Unexpected value type for {0}")]
    UnexpectedType(&'static str),

    #[error("Invalid hemisphere reference: {0:?}")]
    InvalidReference(String),

    #[error("Coordinate out of range: {latitude}, {longitude}")]
    OutOfRange { latitude: f64, longitude: f64 },
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Malformed EXIF block")]
    Malformed(#[from] exif::Error),

    #[error("Unreadable JPEG structure: {0}")]
    Jpeg(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("No video probe executable could be found")]
    NotAvailable,

    #[error("Failed to run the video probe")]
    Spawn(#[from] std::io::Error),

    #[error("Video probe exited with {0}")]
    Failed(std::process::ExitStatus),

    #[error("Video probe did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Video probe produced invalid JSON")]
    Json(#[from] serde_json::Error),

    #[error("Exiftool failed to read the video tags")]
    Exiftool(#[from] exiftool::ExifToolError),
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Metadata container could not be processed: {0}")]
    Container(#[from] ContainerError),

    #[error("A backup already exists at {0}, refusing to overwrite it")]
    BackupExists(PathBuf),

    #[error("Could not create backup {path}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Saving {path} failed, original restored from backup")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Saving {path} failed and the backup could not be restored")]
    RollbackFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

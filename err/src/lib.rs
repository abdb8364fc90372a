//! Typed errors shared by every crate in the workspace.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad path: {0}")]
    BadPath(String),
    #[error("no such path: {0}")]
    NoSuchPath(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("parent directory is full")]
    ParentFull,
    #[error("out of space")]
    OutOfSpace,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("image is not a valid FAT12 volume: {0}")]
    BadImage(String),
    #[error("host I/O failed for {path}: {source}")]
    IoFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not flush image to {path}: {source}")]
    FlushFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

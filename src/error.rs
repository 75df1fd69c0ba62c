//! Error type of the affinity and topology operations.

use std::{ io, path::PathBuf };

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The affinity of `pid` could not be queried or changed.
    #[error("cannot access affinity of process {pid}: {source}")]
    PermissionOrNotFound {
        /// `0` means the calling thread.
        pid: u32,
        #[source]
        source: rustix::io::Errno,
    },

    /// The sibling mask file of a cpu could not be read.
    #[error("sibling mask of cpu {core} is unreadable ({}): {source}", path.display())]
    TopologySourceUnavailable {
        core: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A sibling mask holds something other than hex digits.
    #[error("invalid character {character:?} in sibling mask of cpu {core}")]
    InvalidTopologyData { core: usize, character: char },

    #[error("cpu {core} is out of range (maximum is {max})")]
    OutOfRange { core: usize, max: usize },

    #[error("invalid core list {0:?}")]
    InvalidCoreList(String),
}

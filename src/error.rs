//! The errors that can occur.

use crate::model::StreamKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors that can occur.
#[derive(Debug, Error)]
pub enum Error {
    /// An error occurred while running the runtime.
    #[error("An error occurred while running the runtime: {0}")]
    Runtime(#[from] tokio::task::JoinError),
    /// An error occurred while interacting with the file system.
    #[error("An IO error occurred: {0}")]
    IO(#[from] std::io::Error),
    /// An error occurred while calling the YouTube Data API.
    #[error("An error occurred while fetching: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// An error occurred while parsing JSON.
    #[error("An error occurred while parsing JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// An output directory could not be created.
    #[error("Failed to create directory {path:?}: {source}")]
    Filesystem {
        /// The directory that was being created.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },
    /// The channel id did not resolve to a channel.
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),
    /// The video requires age verification.
    #[error("Video is age restricted: {0}")]
    AgeRestricted(String),
    /// The video could not be resolved.
    #[error("Failed to resolve video: {0}")]
    Resolution(String),
    /// No stream of the wanted kind is available.
    #[error("No {0} stream available for video")]
    MissingStream(StreamKind),
    /// The YouTube Data API answered with an error payload.
    #[error("YouTube API error: {0}")]
    Api(String),
    /// The channel listing kept failing until the retry policy gave up.
    #[error("Listing failed after {attempts} attempts: {source}")]
    ListingExhausted {
        /// How many listing calls were made.
        attempts: u32,
        /// The last listing error.
        source: Box<Error>,
    },
    /// Transcoding the downloaded stream failed.
    #[error("Failed to transcode {0}")]
    Transcode(String),
    /// An error occurred while running a command.
    #[error("Failed to execute command: {0}")]
    Command(String),
    /// An error occurred manipulating a path.
    #[error("An invalid path was provided: {0}")]
    Path(String),
    /// An error occurred due to a timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    /// A menu answer was not one of the offered choices.
    #[error("Invalid choice: {0}")]
    InvalidChoice(String),
}

impl Error {
    /// Whether the error is a per-video age restriction.
    pub fn is_age_restricted(&self) -> bool {
        matches!(self, Error::AgeRestricted(_))
    }
}

//! The collaborators the archiver delegates to.
//!
//! Resolving and downloading streams, transcoding, and listing channels are
//! all behind these traits. The production implementations live in
//! [`crate::ytdlp`], [`crate::ffmpeg`] and [`crate::api`].

use crate::error::Result;
use crate::model::{Format, Playlist, Video};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Number of videos requested per channel listing page.
pub const PAGE_SIZE: u32 = 50;

/// Builds the watch URL of a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Resolves videos and playlists, and downloads their streams.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fetches the metadata and available streams of a video.
    ///
    /// Fails with [`crate::Error::AgeRestricted`] when the video needs age
    /// verification and [`crate::Error::Resolution`] for anything else.
    async fn resolve_video(&self, url: &str) -> Result<Video>;

    /// Lists every video of a playlist, without resolving them.
    async fn list_playlist(&self, url: &str) -> Result<Playlist>;

    /// Writes one stream of `video` to `destination` and returns the written path.
    async fn download_stream(
        &self,
        video: &Video,
        format: &Format,
        destination: &Path,
    ) -> Result<PathBuf>;
}

/// Converts a downloaded stream into the archive audio format.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encodes `source` into `destination` and returns `destination`.
    async fn transcode(&self, source: &Path, destination: &Path) -> Result<PathBuf>;
}

/// One video of a channel listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    /// The video id.
    pub id: String,
    /// The raw title, not yet sanitized.
    pub title: String,
}

/// One page of a channel listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// The videos of this page.
    pub items: Vec<SearchItem>,
    /// The cursor of the next page, `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Lists the videos uploaded by a channel.
#[async_trait]
pub trait ChannelCatalog: Send + Sync {
    /// Returns the display title of a channel.
    ///
    /// Fails with [`crate::Error::ChannelNotFound`] when the id is unknown.
    async fn resolve_channel_title(&self, channel_id: &str) -> Result<String>;

    /// Returns the page of videos starting at `cursor`.
    async fn search_channel_videos(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<SearchPage>;
}

//! In-memory collaborators for the archiver tests.

use crate::error::{Error, Result};
use crate::media::{ChannelCatalog, MediaSource, SearchItem, SearchPage, Transcoder, watch_url};
use crate::model::{Format, Playlist, PlaylistEntry, Video};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub fn video(id: &str, title: &str, duration: u64, formats: Vec<Format>) -> Video {
    Video {
        id: id.to_string(),
        title: title.to_string(),
        duration: Some(duration as f64),
        age_limit: 0,
        formats,
    }
}

pub fn audio_format(id: &str, ext: &str, abr: f64) -> Format {
    Format {
        format_id: id.to_string(),
        ext: ext.to_string(),
        vcodec: Some("none".to_string()),
        acodec: Some("mp4a.40.2".to_string()),
        width: None,
        height: None,
        fps: None,
        abr: Some(abr),
        tbr: Some(abr),
    }
}

pub fn progressive_format(id: &str, ext: &str, height: u32) -> Format {
    Format {
        format_id: id.to_string(),
        ext: ext.to_string(),
        vcodec: Some("avc1.64001F".to_string()),
        acodec: Some("mp4a.40.2".to_string()),
        width: Some(height * 16 / 9),
        height: Some(height),
        fps: Some(30.0),
        abr: None,
        tbr: None,
    }
}

/// A channel video with one audio stream of `duration` seconds.
pub fn song(id: &str, title: &str, duration: u64) -> Video {
    video(
        id,
        title,
        duration,
        vec![
            audio_format("140", "m4a", 129.0),
            progressive_format("18", "mp4", 360),
        ],
    )
}

pub fn item(id: &str, title: &str) -> SearchItem {
    SearchItem {
        id: id.to_string(),
        title: title.to_string(),
    }
}

pub fn page(items: Vec<SearchItem>, next_cursor: Option<&str>) -> SearchPage {
    SearchPage {
        items,
        next_cursor: next_cursor.map(str::to_string),
    }
}

enum Resolved {
    Video(Video),
    AgeRestricted,
    Broken,
}

/// Resolves registered URLs and writes a few bytes for every download.
#[derive(Default)]
pub struct FakeMedia {
    videos: HashMap<String, Resolved>,
    playlist: Option<Playlist>,
    resolved: Mutex<Vec<String>>,
    downloads: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeMedia {
    pub fn with_video(mut self, url: &str, video: Video) -> Self {
        self.videos.insert(url.to_string(), Resolved::Video(video));
        self
    }

    /// Registers `video` under its watch URL.
    pub fn with_videos(mut self, videos: impl IntoIterator<Item = Video>) -> Self {
        for video in videos {
            self.videos
                .insert(watch_url(&video.id), Resolved::Video(video));
        }
        self
    }

    pub fn with_age_restricted(mut self, video_id: &str) -> Self {
        self.videos
            .insert(watch_url(video_id), Resolved::AgeRestricted);
        self
    }

    pub fn with_broken(mut self, video_id: &str) -> Self {
        self.videos.insert(watch_url(video_id), Resolved::Broken);
        self
    }

    pub fn with_playlist(mut self, title: &str, entries: &[(&str, Option<&str>)]) -> Self {
        self.playlist = Some(Playlist {
            id: "PLfake".to_string(),
            title: title.to_string(),
            entries: entries
                .iter()
                .map(|(id, title)| PlaylistEntry {
                    id: id.to_string(),
                    title: title.map(str::to_string),
                })
                .collect(),
        });
        self
    }

    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<PathBuf> {
        let downloads = self.downloads.lock().unwrap();
        downloads.iter().map(|(_, path)| path.clone()).collect()
    }

    pub fn downloaded_formats(&self) -> Vec<String> {
        let downloads = self.downloads.lock().unwrap();
        downloads.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl MediaSource for FakeMedia {
    async fn resolve_video(&self, url: &str) -> Result<Video> {
        self.resolved.lock().unwrap().push(url.to_string());

        match self.videos.get(url) {
            Some(Resolved::Video(video)) => Ok(video.clone()),
            Some(Resolved::AgeRestricted) => Err(Error::AgeRestricted(url.to_string())),
            Some(Resolved::Broken) => Err(Error::Resolution(format!("{url}: broken"))),
            None => Err(Error::Resolution(format!("{url}: unavailable"))),
        }
    }

    async fn list_playlist(&self, url: &str) -> Result<Playlist> {
        self.playlist
            .clone()
            .ok_or_else(|| Error::Resolution(format!("{url}: not a playlist")))
    }

    async fn download_stream(
        &self,
        _video: &Video,
        format: &Format,
        destination: &Path,
    ) -> Result<PathBuf> {
        self.downloads
            .lock()
            .unwrap()
            .push((format.format_id.clone(), destination.to_path_buf()));

        tokio::fs::write(destination, b"stream").await?;
        Ok(destination.to_path_buf())
    }
}

/// Writes a placeholder MP3, or fails every call.
#[derive(Default)]
pub struct FakeTranscoder {
    fail: bool,
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeTranscoder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, source: &Path, destination: &Path) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((source.to_path_buf(), destination.to_path_buf()));

        if self.fail {
            return Err(Error::Transcode(format!("{}: encoder crashed", source.display())));
        }

        tokio::fs::write(destination, b"mp3").await?;
        Ok(destination.to_path_buf())
    }
}

/// Serves queued listing pages, a queued failure fails one call.
#[derive(Default)]
pub struct FakeCatalog {
    title: Option<String>,
    pages: Mutex<VecDeque<std::result::Result<SearchPage, String>>>,
    cursors: Mutex<Vec<Option<String>>>,
}

impl FakeCatalog {
    pub fn new(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn with_page(self, page: SearchPage) -> Self {
        self.pages.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// The cursor of every listing call, in order.
    pub fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelCatalog for FakeCatalog {
    async fn resolve_channel_title(&self, channel_id: &str) -> Result<String> {
        self.title
            .clone()
            .ok_or_else(|| Error::ChannelNotFound(channel_id.to_string()))
    }

    async fn search_channel_videos(
        &self,
        _channel_id: &str,
        cursor: Option<&str>,
        _page_size: u32,
    ) -> Result<SearchPage> {
        self.cursors
            .lock()
            .unwrap()
            .push(cursor.map(str::to_string));

        match self.pages.lock().unwrap().pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(Error::Api(message)),
            None => Err(Error::Api("503 backend error".to_string())),
        }
    }
}

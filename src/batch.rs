//! Playlist downloads and channel scans.
//!
//! A channel scan pages through the uploads of a channel and decides for every
//! video whether to keep it. In music mode a video is kept when its title is
//! not a karaoke or demo, it has an audio stream, it lasts between
//! [`MIN_DURATION`] and [`MAX_DURATION`] seconds, and no video with the same
//! title was kept earlier in the scan. Playlists keep everything.

use crate::error::{Error, Result};
use crate::fs::{ensure_directory, sanitize};
use crate::media::{ChannelCatalog, MediaSource, PAGE_SIZE, SearchPage, Transcoder, watch_url};
use crate::model::StreamKind;
use crate::request::MediaKind;
use crate::Archiver;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Shortest kept music video, in seconds.
pub const MIN_DURATION: u64 = 61;
/// Longest kept music video, in seconds.
pub const MAX_DURATION: u64 = 420;
/// Lowercase title fragments that exclude a channel video.
pub const EXCLUDED_KEYWORDS: [&str; 2] = ["karaoke", "demo"];

/// Whether a channel video is excluded by its title.
pub fn is_excluded(title: &str) -> bool {
    let title = title.to_lowercase();
    EXCLUDED_KEYWORDS
        .iter()
        .any(|keyword| title.contains(keyword))
}

/// Whether a music video is long enough and short enough to be kept.
pub fn accepts_duration(seconds: u64) -> bool {
    (MIN_DURATION..=MAX_DURATION).contains(&seconds)
}

/// Why a video was not downloaded.
#[derive(Debug)]
pub enum Skip {
    /// The title names a karaoke or demo version.
    Excluded,
    /// The video needs age verification.
    AgeRestricted,
    /// Music mode found no audio-only stream.
    MissingAudioStream,
    /// Music mode found the video too short or too long, in seconds.
    DurationOutOfRange(u64),
    /// A video with the same title was kept earlier in the scan.
    AlreadyDownloaded,
    /// Resolving, downloading or transcoding failed.
    Failed(Error),
}

impl Skip {
    /// Whether the video was skipped because something went wrong.
    pub fn is_failure(&self) -> bool {
        matches!(self, Skip::Failed(_))
    }
}

impl From<Error> for Skip {
    fn from(error: Error) -> Self {
        match error {
            Error::AgeRestricted(_) => Skip::AgeRestricted,
            Error::MissingStream(StreamKind::Audio) => Skip::MissingAudioStream,
            other => Skip::Failed(other),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::Excluded => write!(f, "excluded karaoke or demo"),
            Skip::AgeRestricted => write!(f, "age restricted"),
            Skip::MissingAudioStream => write!(f, "no audio stream"),
            Skip::DurationOutOfRange(seconds) => write!(f, "duration of {seconds}s out of range"),
            Skip::AlreadyDownloaded => write!(f, "already downloaded"),
            Skip::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// What a run did.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// The finished files, in download order.
    pub downloaded: Vec<PathBuf>,
    /// The title or URL of every video that was not downloaded, with the reason.
    pub skipped: Vec<(String, Skip)>,
    /// The number of listing pages read.
    pub pages: u32,
}

impl ScanReport {
    /// The number of videos that failed rather than being filtered out.
    pub fn failures(&self) -> usize {
        self.skipped
            .iter()
            .filter(|(_, skip)| skip.is_failure())
            .count()
    }
}

pub(crate) fn log_skip(title: &str, skip: &Skip) {
    match skip {
        Skip::Excluded => log::info!("Bỏ qua video '{}' vì là video Karaoke/Demo.", title),
        Skip::AgeRestricted => log::warn!(
            "Video '{}' bị hạn chế độ tuổi và sẽ không được tải xuống.",
            title
        ),
        Skip::MissingAudioStream => {
            log::warn!("Không tìm thấy stream âm thanh cho video '{}'.", title)
        }
        Skip::DurationOutOfRange(seconds) => log::info!(
            "Video '{}' có thời lượng không phù hợp ({} giây) và sẽ không được tải xuống.",
            title,
            seconds
        ),
        Skip::AlreadyDownloaded => log::info!("Video '{}' đã được tải xuống. Bỏ qua...", title),
        Skip::Failed(e) => log::error!("Lỗi khi xử lý video '{}': {}", title, e),
    }
}

impl<M, C, T> Archiver<M, C, T>
where
    M: MediaSource,
    C: ChannelCatalog,
    T: Transcoder,
{
    /// Downloads every video of a playlist into `parent/playlist/<title>/`.
    ///
    /// Videos are not filtered nor deduplicated, a failing video is logged
    /// and the next one is tried.
    pub async fn download_playlist(
        &self,
        url: &str,
        parent: &Path,
        kind: MediaKind,
    ) -> Result<ScanReport> {
        let playlist = self.media.list_playlist(url).await?;
        let directory = ensure_directory(parent, "playlist", sanitize(&playlist.title))?;
        log::info!(
            "Tải xuống playlist '{}' ({} video)",
            playlist.title,
            playlist.entries.len()
        );

        let mut report = ScanReport {
            pages: 1,
            ..ScanReport::default()
        };

        for entry in &playlist.entries {
            let label = entry.title.clone().unwrap_or_else(|| entry.id.clone());
            self.progress.set_message(label.clone());
            log::info!("Tải xuống video: {}", label);

            match self.download_single(&watch_url(&entry.id), &directory, kind).await {
                Ok(path) => report.downloaded.push(path),
                Err(e) => {
                    let skip = Skip::from(e);
                    log_skip(&label, &skip);
                    report.skipped.push((label, skip));
                }
            }
            self.progress.inc(1);
        }

        Ok(report)
    }

    /// Scans every upload of a channel into `parent/channel/<title>/`.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelNotFound`] when the channel does not resolve, before
    /// any directory is created, and [`Error::ListingExhausted`] when a
    /// listing page keeps failing past the retry policy. Per-video problems
    /// are reported, never returned.
    pub async fn scan_channel(
        &self,
        channel_id: &str,
        parent: &Path,
        kind: MediaKind,
    ) -> Result<ScanReport> {
        let channel_title = match self.catalog.resolve_channel_title(channel_id).await {
            Ok(title) => sanitize(&title),
            Err(e) => {
                log::error!(
                    "Lỗi khi truy cập kênh: {}. Vui lòng đảm bảo rằng channel_id là hợp lệ và khóa API có quyền truy cập vào YouTube Data API v3.",
                    e
                );
                return Err(match e {
                    Error::ChannelNotFound(id) => Error::ChannelNotFound(id),
                    other => Error::ChannelNotFound(format!("{channel_id}: {other}")),
                });
            }
        };

        let directory = ensure_directory(parent, "channel", &channel_title)?;
        log::info!("Quét kênh '{}' vào {:?}", channel_title, directory);

        let mut report = ScanReport::default();
        // Titles saved so far: duplicates are skipped in music mode, renamed in video mode.
        let mut registry = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.list_page(channel_id, cursor.as_deref()).await?;
            report.pages += 1;
            log::debug!("Trang {}: {} video", report.pages, page.items.len());

            for item in page.items {
                let title = sanitize(&item.title);
                self.progress.set_message(title.clone());

                let outcome = self
                    .keep_channel_video(&item.id, &title, &directory, kind, &mut registry)
                    .await;

                match outcome {
                    Ok(path) => {
                        report.downloaded.push(path);
                        match kind {
                            MediaKind::Music => log::info!(
                                "{}. Đã tải bài --> {}",
                                report.downloaded.len(),
                                title
                            ),
                            MediaKind::Video => log::info!("Đã tải xuống video: {}", title),
                        }
                    }
                    Err(skip) => {
                        log_skip(&title, &skip);
                        report.skipped.push((title, skip));
                    }
                }
                self.progress.inc(1);
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        log::info!(
            "Đã quét {} trang, tải {} tệp, bỏ qua {}.",
            report.pages,
            report.downloaded.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Fetches one listing page, retrying the same cursor per the retry policy.
    async fn list_page(&self, channel_id: &str, cursor: Option<&str>) -> Result<SearchPage> {
        let mut attempts = 0;

        loop {
            match self
                .catalog
                .search_channel_videos(channel_id, cursor, PAGE_SIZE)
                .await
            {
                Ok(page) => return Ok(page),
                Err(e) => {
                    attempts += 1;
                    if !self.retry.allows_retry(attempts) {
                        log::error!("Lỗi: {}. Đã thử {} lần, dừng quét kênh.", e, attempts);
                        return Err(Error::ListingExhausted {
                            attempts,
                            source: Box::new(e),
                        });
                    }

                    let delay = self.retry.delay_for(attempts);
                    log::warn!("Lỗi: {}. Thử lại sau {} giây.", e, delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Applies the channel filters to one video and downloads it when it passes.
    async fn keep_channel_video(
        &self,
        video_id: &str,
        title: &str,
        directory: &Path,
        kind: MediaKind,
        registry: &mut HashSet<String>,
    ) -> std::result::Result<PathBuf, Skip> {
        if is_excluded(title) {
            return Err(Skip::Excluded);
        }

        let video = self.media.resolve_video(&watch_url(video_id)).await?;

        match kind {
            MediaKind::Video => {
                // Same-titled uploads are all kept, the later ones under their id.
                let stem = if registry.contains(title) {
                    let stem = format!("{title} [{video_id}]");
                    log::info!("Video '{}' trùng tên, lưu thành '{}'.", title, stem);
                    stem
                } else {
                    title.to_string()
                };

                let path = self.save_video(&video, &stem, directory).await?;
                registry.insert(title.to_string());
                Ok(path)
            }
            MediaKind::Music => {
                let format = video
                    .best_audio_format()
                    .ok_or(Skip::MissingAudioStream)?;

                let length = video.length();
                if !accepts_duration(length) {
                    return Err(Skip::DurationOutOfRange(length));
                }

                if registry.contains(title) {
                    return Err(Skip::AlreadyDownloaded);
                }

                let path = self
                    .save_audio(&video, format, video_id, title, directory)
                    .await?;
                registry.insert(title.to_string());
                Ok(path)
            }
        }
    }
}

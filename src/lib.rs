use {
    crate::batch::{ScanReport, Skip, log_skip},
    crate::config::RetryPolicy,
    crate::fs::ensure_directory,
    crate::media::{ChannelCatalog, MediaSource, Transcoder},
    crate::request::{Invocation, MediaRequest},
    indicatif::ProgressBar,
    std::path::PathBuf,
};

pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod executor;
pub mod ffmpeg;
pub mod fs;
pub mod media;
pub mod model;
pub mod request;
pub mod single;
pub mod ytdlp;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

/// Downloads playlists, channels and single videos into a local archive.
///
/// Every network and encoding step goes through the three collaborators, so
/// the decision logic can run against fakes. The archive is laid out as
/// `<output_dir>/<video|music>/<playlist|channel>/<name>/`.
pub struct Archiver<M, C, T> {
    media: M,
    catalog: C,
    transcoder: T,
    output_dir: PathBuf,
    retry: RetryPolicy,
    progress: ProgressBar,
}

impl<M, C, T> Archiver<M, C, T>
where
    M: MediaSource,
    C: ChannelCatalog,
    T: Transcoder,
{
    pub fn new(media: M, catalog: C, transcoder: T, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            media,
            catalog,
            transcoder,
            output_dir: output_dir.into(),
            retry: RetryPolicy::default(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reports scan progress on `progress` instead of a hidden bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    /// Runs one invocation.
    ///
    /// A failing single video is logged and reported, never returned as an
    /// error. Directory failures, unknown channels and exhausted listing
    /// retries abort the run.
    pub async fn run(&self, invocation: &Invocation) -> Result<ScanReport> {
        let kind = invocation.kind;
        let parent = ensure_directory(&self.output_dir, kind.category(), "")?;

        let report = match &invocation.request {
            MediaRequest::Playlist(url) => self.download_playlist(url, &parent, kind).await?,
            MediaRequest::Channel(channel_id) => {
                self.scan_channel(channel_id, &parent, kind).await?
            }
            MediaRequest::SingleVideo(url) => {
                let mut report = ScanReport::default();
                match self.download_single(url, &parent, kind).await {
                    Ok(path) => report.downloaded.push(path),
                    Err(e) => {
                        let skip = Skip::from(e);
                        match &skip {
                            Skip::Failed(e) => log::error!(
                                "Lỗi khi xử lý đa phương tiện từ URL '{}': {}",
                                url,
                                e
                            ),
                            other => log_skip(url, other),
                        }
                        report.skipped.push((url.clone(), skip));
                    }
                }
                report
            }
        };

        self.progress.finish_and_clear();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MediaKind;
    use crate::testing::{FakeCatalog, FakeMedia, FakeTranscoder, progressive_format, video};

    #[tokio::test]
    async fn failing_single_video_is_reported_not_returned() {
        let root = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(
            FakeMedia::default(),
            FakeCatalog::default(),
            FakeTranscoder::default(),
            root.path(),
        );
        let invocation = Invocation {
            kind: MediaKind::Music,
            request: MediaRequest::SingleVideo("https://www.youtube.com/watch?v=gone".to_string()),
        };

        let report = archiver.run(&invocation).await.unwrap();

        assert!(report.downloaded.is_empty());
        assert_eq!(report.failures(), 1);
        assert!(root.path().join("music").is_dir());
    }

    #[tokio::test]
    async fn single_video_without_audio_is_a_typed_skip() {
        let root = tempfile::tempdir().unwrap();
        let url = "https://www.youtube.com/watch?v=clip";
        let media = FakeMedia::default().with_video(
            url,
            video("clip", "Clip", 200, vec![progressive_format("18", "mp4", 360)]),
        );
        let archiver = Archiver::new(
            media,
            FakeCatalog::default(),
            FakeTranscoder::default(),
            root.path(),
        );
        let invocation = Invocation {
            kind: MediaKind::Music,
            request: MediaRequest::SingleVideo(url.to_string()),
        };

        let report = archiver.run(&invocation).await.unwrap();

        assert_eq!(report.failures(), 0);
        assert!(matches!(
            report.skipped.as_slice(),
            [(label, Skip::MissingAudioStream)] if label == url
        ));
    }

    #[tokio::test]
    async fn unknown_channel_aborts_the_run() {
        let root = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(
            FakeMedia::default(),
            FakeCatalog::default(),
            FakeTranscoder::default(),
            root.path(),
        );
        let invocation = Invocation {
            kind: MediaKind::Video,
            request: MediaRequest::Channel("UCmissing".to_string()),
        };

        let err = archiver.run(&invocation).await.unwrap_err();

        assert!(matches!(err, Error::ChannelNotFound(_)));
        assert!(!root.path().join("video").join("channel").exists());
    }
}

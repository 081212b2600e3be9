//! Downloading one video, as an mp4 or as an MP3.

use crate::error::{Error, Result};
use crate::fs::{TempFile, sanitize};
use crate::media::{ChannelCatalog, MediaSource, Transcoder};
use crate::model::{Format, StreamKind, Video};
use crate::request::MediaKind;
use crate::Archiver;
use std::path::{Path, PathBuf};

/// Path of the intermediate stream, never the same as the finished MP3.
pub(crate) fn temp_path(directory: &Path, stem: &str, format: &Format) -> PathBuf {
    if format.ext.eq_ignore_ascii_case("mp3") {
        directory.join(format!("{stem}.source.mp3"))
    } else {
        directory.join(format!("{stem}.{}", format.ext))
    }
}

impl<M, C, T> Archiver<M, C, T>
where
    M: MediaSource,
    C: ChannelCatalog,
    T: Transcoder,
{
    /// Downloads one URL into `directory` and returns the finished file.
    ///
    /// Video keeps the tallest progressive mp4 stream as `<title>.mp4`. Music
    /// downloads the best audio-only stream next to the target and transcodes
    /// it to `<title>.mp3`, the intermediate file is always removed.
    ///
    /// # Errors
    ///
    /// Resolution errors from the media source, [`Error::MissingStream`] when
    /// no suitable stream exists, and any download or transcode failure.
    pub async fn download_single(
        &self,
        url: &str,
        directory: &Path,
        kind: MediaKind,
    ) -> Result<PathBuf> {
        let video = self.media.resolve_video(url).await?;
        let title = sanitize(&video.title);

        let path = match kind {
            MediaKind::Video => self.save_video(&video, &title, directory).await?,
            MediaKind::Music => {
                let format = video
                    .best_audio_format()
                    .ok_or_else(|| Error::MissingStream(StreamKind::Audio))?;
                self.save_audio(&video, format, &title, &title, directory)
                    .await?
            }
        };

        match kind {
            MediaKind::Video => log::info!("Đã tải xuống video: {}", title),
            MediaKind::Music => log::info!("Đã tải và chuyển đổi nhạc: {}", title),
        }

        Ok(path)
    }

    /// Saves the best progressive stream as `<stem>.<ext>`.
    pub(crate) async fn save_video(
        &self,
        video: &Video,
        stem: &str,
        directory: &Path,
    ) -> Result<PathBuf> {
        let format = video
            .best_progressive_format()
            .ok_or_else(|| Error::MissingStream(StreamKind::Progressive))?;

        let destination = directory.join(format!("{stem}.{}", format.ext));
        self.media.download_stream(video, format, &destination).await
    }

    /// Downloads `format` to a temporary `<temp_stem>.<ext>` and transcodes it to `<title>.mp3`.
    pub(crate) async fn save_audio(
        &self,
        video: &Video,
        format: &Format,
        temp_stem: &str,
        title: &str,
        directory: &Path,
    ) -> Result<PathBuf> {
        let temp = TempFile::new(temp_path(directory, temp_stem, format));
        let destination = directory.join(format!("{title}.mp3"));

        self.media.download_stream(video, format, temp.path()).await?;
        self.transcoder.transcode(temp.path(), &destination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeCatalog, FakeMedia, FakeTranscoder, audio_format, progressive_format, video,
    };
    use pretty_assertions::assert_eq;

    fn archiver(media: FakeMedia, root: &Path) -> Archiver<FakeMedia, FakeCatalog, FakeTranscoder> {
        Archiver::new(media, FakeCatalog::default(), FakeTranscoder::default(), root)
    }

    fn files(directory: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(directory)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn music_is_transcoded_and_the_stream_removed() {
        let root = tempfile::tempdir().unwrap();
        let media = FakeMedia::default().with_video(
            "https://youtu.be/abc",
            video("abc", "Tình Yêu: Bản Mới?", 200, vec![audio_format("140", "m4a", 129.0)]),
        );
        let archiver = archiver(media, root.path());

        let path = archiver
            .download_single("https://youtu.be/abc", root.path(), MediaKind::Music)
            .await
            .unwrap();

        assert_eq!(path, root.path().join("Tình Yêu- Bản Mới-.mp3"));
        assert_eq!(files(root.path()), vec!["Tình Yêu- Bản Mới-.mp3"]);
        assert_eq!(
            archiver.media().downloads(),
            vec![root.path().join("Tình Yêu- Bản Mới-.m4a")]
        );
    }

    #[tokio::test]
    async fn video_keeps_the_tallest_mp4() {
        let root = tempfile::tempdir().unwrap();
        let media = FakeMedia::default().with_video(
            "https://youtu.be/abc",
            video(
                "abc",
                "Clip",
                900,
                vec![
                    progressive_format("18", "mp4", 360),
                    progressive_format("22", "mp4", 720),
                    progressive_format("43", "webm", 1080),
                ],
            ),
        );
        let archiver = archiver(media, root.path());

        let path = archiver
            .download_single("https://youtu.be/abc", root.path(), MediaKind::Video)
            .await
            .unwrap();

        assert_eq!(path, root.path().join("Clip.mp4"));
        assert_eq!(archiver.media().downloaded_formats(), vec!["22"]);
        assert!(archiver.transcoder().calls().is_empty());
    }

    #[tokio::test]
    async fn missing_audio_stream_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let media = FakeMedia::default().with_video(
            "https://youtu.be/abc",
            video("abc", "Clip", 200, vec![progressive_format("18", "mp4", 360)]),
        );
        let archiver = archiver(media, root.path());

        let err = archiver
            .download_single("https://youtu.be/abc", root.path(), MediaKind::Music)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingStream(StreamKind::Audio)));
        assert!(files(root.path()).is_empty());
    }

    #[tokio::test]
    async fn stream_is_removed_when_transcoding_fails() {
        let root = tempfile::tempdir().unwrap();
        let media = FakeMedia::default().with_video(
            "https://youtu.be/abc",
            video("abc", "Song", 200, vec![audio_format("140", "m4a", 129.0)]),
        );
        let archiver = Archiver::new(
            media,
            FakeCatalog::default(),
            FakeTranscoder::failing(),
            root.path(),
        );

        let err = archiver
            .download_single("https://youtu.be/abc", root.path(), MediaKind::Music)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transcode(_)));
        assert_eq!(archiver.media().downloads().len(), 1);
        assert!(files(root.path()).is_empty());
    }

    #[test]
    fn mp3_streams_get_a_distinct_temp_name() {
        let format = audio_format("x", "mp3", 128.0);

        assert_eq!(
            temp_path(Path::new("out"), "Song", &format),
            Path::new("out").join("Song.source.mp3")
        );
    }
}

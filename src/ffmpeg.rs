//! [`Transcoder`] backed by the 'ffmpeg' executable.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::media::Transcoder;
use async_trait::async_trait;
use lofty::{
    config::WriteOptions,
    error::LoftyError,
    file::{AudioFile, TaggedFileExt},
    read_from_path,
    tag::{Accessor, Tag},
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Encodes downloaded streams to MP3 with 'ffmpeg' and tags the result.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    /// The path to the 'ffmpeg' executable.
    pub executable: PathBuf,
    /// The arguments passed before the input, e.g. '-threads 2'.
    pub args: Vec<String>,
    /// The MP3 bitrate, e.g. '192k'.
    pub bitrate: String,
    /// The timeout of one transcode.
    pub timeout: Duration,
}

impl Ffmpeg {
    /// Creates a transcoder for the given executable.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            bitrate: String::from("192k"),
            timeout: Duration::from_secs(60 * 60),
        }
    }

    /// Creates a transcoder from the archiver settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bitrate: settings.bitrate.clone(),
            timeout: settings.download_timeout,
            ..Self::new(settings.ffmpeg.clone())
        }
    }

    fn arguments(&self, source: &str, destination: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend(
            [
                "-hide_banner",
                "-loglevel",
                "error",
                "-y",
                "-i",
                source,
                "-vn",
                "-codec:a",
                "libmp3lame",
                "-b:a",
                self.bitrate.as_str(),
                destination,
            ]
            .map(String::from),
        );
        args
    }
}

/// Writes the title tag, creating a tag when the file has none.
fn tag_title(path: &Path, title: &str) -> std::result::Result<(), LoftyError> {
    let mut tagged_file = read_from_path(path)?;

    if tagged_file.primary_tag().is_none() {
        let tag_type = tagged_file.primary_tag_type();
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    if let Some(tag) = tagged_file.primary_tag_mut() {
        tag.set_title(title.to_string());
    }

    let write_options = WriteOptions::new()
        .use_id3v23(true)
        .remove_others(false)
        .respect_read_only(false);

    tagged_file.save_to_path(path, write_options)
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn transcode(&self, source: &Path, destination: &Path) -> Result<PathBuf> {
        log::debug!("Transcoding {:?} into {:?}", source, destination);

        let input = source
            .to_str()
            .ok_or(Error::Path("Invalid source path".to_string()))?;
        let output = destination
            .to_str()
            .ok_or(Error::Path("Invalid destination path".to_string()))?;

        let executor = Executor {
            executable_path: self.executable.clone(),
            timeout: self.timeout,
            args: self.arguments(input, output),
        };

        executor.execute().await.map_err(|e| match e {
            Error::Command(message) => Error::Transcode(format!("{input}: {message}")),
            other => other,
        })?;

        if let Some(title) = destination.file_stem().and_then(|stem| stem.to_str()) {
            if let Err(e) = tag_title(destination, title) {
                log::warn!("Failed to tag {:?}: {}", destination, e);
            }
        }

        Ok(destination.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arguments_encode_to_mp3_at_the_configured_bitrate() {
        let mut ffmpeg = Ffmpeg::new("ffmpeg");
        ffmpeg.bitrate = String::from("320k");

        let args = ffmpeg.arguments("in.m4a", "out.mp3");

        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-loglevel",
                "error",
                "-y",
                "-i",
                "in.m4a",
                "-vn",
                "-codec:a",
                "libmp3lame",
                "-b:a",
                "320k",
                "out.mp3"
            ]
        );
    }

    /// Runs `script` through `sh` in place of 'ffmpeg'.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, script: &str) -> Ffmpeg {
        let path = dir.join("ffmpeg.sh");
        std::fs::write(&path, script).unwrap();

        let mut ffmpeg = Ffmpeg::new("sh");
        ffmpeg.args = vec![path.to_string_lossy().into_owned()];
        ffmpeg
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn untaggable_output_is_still_returned() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), r#"eval "last=\${$#}"; printf 'not audio' > "$last""#);
        let source = dir.path().join("abc.m4a");
        let destination = dir.path().join("Song A.mp3");

        let written = ffmpeg.transcode(&source, &destination).await.unwrap();

        assert_eq!(written, destination);
        assert_eq!(std::fs::read(&destination).unwrap(), b"not audio");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_encode_is_a_transcode_error() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "echo 'Invalid data found' >&2; exit 1");

        let err = ffmpeg
            .transcode(&dir.path().join("abc.m4a"), &dir.path().join("Song A.mp3"))
            .await
            .unwrap_err();

        match err {
            Error::Transcode(message) => assert!(message.contains("Invalid data found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

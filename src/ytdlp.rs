//! [`MediaSource`] backed by the 'yt-dlp' executable.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::fs::try_name;
use crate::media::{MediaSource, watch_url};
use crate::model::{Format, Playlist, Video};
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// Messages 'yt-dlp' prints when YouTube wants the viewer to sign in to confirm their age.
static AGE_GATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)confirm your age|age[- ]restricted|inappropriate for some users")
        .expect("age gate pattern is valid")
});

/// A video fetcher that uses 'yt-dlp' to resolve videos and download their streams.
#[derive(Clone, Debug)]
pub struct YtDlp {
    /// The path to the 'yt-dlp' executable.
    pub executable: PathBuf,
    /// The arguments passed before every command.
    pub args: Vec<String>,
    /// The timeout of metadata commands.
    pub timeout: Duration,
    /// The timeout of download commands.
    pub download_timeout: Duration,
}

impl fmt::Display for YtDlp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "YtDlp: executable={:?}, args={:?}",
            self.executable, self.args
        )
    }
}

impl YtDlp {
    /// Creates a fetcher for the given executable.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60 * 60),
        }
    }

    /// Creates a fetcher from the archiver settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut fetcher = Self::new(settings.yt_dlp.clone());
        fetcher
            .with_args(settings.yt_dlp_args.clone())
            .with_timeout(settings.timeout);
        fetcher.download_timeout = settings.download_timeout;
        fetcher
    }

    /// Appends arguments passed to every 'yt-dlp' command.
    pub fn with_args(&mut self, mut args: Vec<String>) -> &mut Self {
        self.args.append(&mut args);
        self
    }

    /// Sets the timeout of metadata commands.
    pub fn with_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    fn executor(&self, args: Vec<String>, timeout: Duration) -> Executor {
        let mut final_args = self.args.clone();
        final_args.extend(args);

        Executor {
            executable_path: self.executable.clone(),
            timeout,
            args: final_args,
        }
    }
}

/// Turns a failed metadata call into a resolution error, spotting age gates.
fn classify_failure(url: &str, error: Error) -> Error {
    match error {
        Error::Command(message) if AGE_GATE.is_match(&message) => Error::AgeRestricted(url.to_string()),
        Error::Command(message) => Error::Resolution(format!("{url}: {message}")),
        Error::Serde(e) => Error::Resolution(format!("{url}: unreadable metadata: {e}")),
        other => other,
    }
}

/// Age restricted videos sometimes resolve without any stream instead of failing.
fn check_playable(url: &str, video: Video) -> Result<Video> {
    if video.formats.is_empty() && video.age_limit >= 18 {
        return Err(Error::AgeRestricted(url.to_string()));
    }

    Ok(video)
}

/// Escapes a path for use as a 'yt-dlp' output template.
fn output_template(destination: &Path) -> Result<String> {
    let destination = destination
        .to_str()
        .ok_or(Error::Path(format!("{:?} is not valid UTF-8", destination)))?;

    Ok(destination.replace('%', "%%"))
}

#[async_trait]
impl MediaSource for YtDlp {
    async fn resolve_video(&self, url: &str) -> Result<Video> {
        log::debug!("Fetching video information for {}", url);

        let args = vec![
            "--no-progress".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--dump-json".to_string(),
            url.to_string(),
        ];

        let output = self
            .executor(args, self.timeout)
            .execute()
            .await
            .map_err(|e| classify_failure(url, e))?;
        let video: Video =
            serde_json::from_str(&output.stdout).map_err(|e| classify_failure(url, e.into()))?;

        check_playable(url, video)
    }

    async fn list_playlist(&self, url: &str) -> Result<Playlist> {
        log::debug!("Listing playlist {}", url);

        let args = vec![
            "--no-warnings".to_string(),
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            url.to_string(),
        ];

        let output = self
            .executor(args, self.timeout)
            .execute()
            .await
            .map_err(|e| classify_failure(url, e))?;

        serde_json::from_str(&output.stdout).map_err(|e| classify_failure(url, e.into()))
    }

    async fn download_stream(
        &self,
        video: &Video,
        format: &Format,
        destination: &Path,
    ) -> Result<PathBuf> {
        log::debug!("Downloading {} of {} to {:?}", format, video.id, destination);

        let args = vec![
            "--no-progress".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--no-part".to_string(),
            "--force-overwrites".to_string(),
            "-f".to_string(),
            format.format_id.clone(),
            "-o".to_string(),
            output_template(destination)?,
            watch_url(&video.id),
        ];

        self.executor(args, self.download_timeout).execute().await?;

        if !destination.exists() {
            return Err(Error::Command(format!(
                "yt-dlp finished without writing {}",
                try_name(destination)?
            )));
        }

        Ok(destination.to_path_buf())
    }
}

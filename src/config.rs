//! Runtime settings of the archiver.
//!
//! There is no configuration file, the binary fills [`Settings`] from its
//! command line flags.

use crate::fs::find_executable;
use std::path::PathBuf;
use std::time::Duration;

/// Default root of the archive.
pub const DEFAULT_OUTPUT_DIR: &str = "data_download";

/// How a failed channel listing call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The wait before the first retry.
    pub initial_delay: Duration,
    /// The factor applied to the wait after each retry.
    pub multiplier: u32,
    /// The longest wait between two attempts.
    pub max_delay: Duration,
    /// The maximum number of calls for one page, `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            multiplier: 2,
            max_delay: Duration::from_secs(60),
            max_attempts: Some(5),
        }
    }
}

impl RetryPolicy {
    /// A fixed five second wait, retried until the listing succeeds.
    pub fn unbounded() -> Self {
        Self {
            multiplier: 1,
            max_delay: Duration::from_secs(5),
            max_attempts: None,
            ..Self::default()
        }
    }

    /// Whether another call is allowed after `attempts` failed calls.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }

    /// The wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);

        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay.max(self.initial_delay))
    }
}

/// Everything the archiver needs to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// The root of the archive.
    pub output_dir: PathBuf,
    /// The path to the 'yt-dlp' executable.
    pub yt_dlp: PathBuf,
    /// The path to the 'ffmpeg' executable.
    pub ffmpeg: PathBuf,
    /// Extra arguments passed to every 'yt-dlp' call, e.g. '--cookies'.
    pub yt_dlp_args: Vec<String>,
    /// The key of the YouTube Data API, only needed for channel scans.
    pub api_key: Option<String>,
    /// The MP3 bitrate, e.g. '192k'.
    pub bitrate: String,
    /// The timeout of metadata calls.
    pub timeout: Duration,
    /// The timeout of stream downloads and transcodes.
    pub download_timeout: Duration,
    /// The retry policy of channel listing calls.
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            yt_dlp: PathBuf::from(find_executable("yt-dlp")),
            ffmpeg: PathBuf::from(find_executable("ffmpeg")),
            yt_dlp_args: Vec::new(),
            api_key: None,
            bitrate: String::from("192k"),
            timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

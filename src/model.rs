//! The models used to represent the data fetched by 'yt-dlp'.
//!
//! Only the fields the archiver reads are modelled, everything else in the
//! `--dump-json` output is ignored.

use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;

/// Codec value 'yt-dlp' uses for an absent track.
const NO_CODEC: &str = "none";

/// Represents a YouTube video, the output of 'yt-dlp --dump-json'.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Video {
    /// The ID of the video.
    pub id: String,
    /// The title of the video.
    pub title: String,
    /// The duration in seconds, missing for live streams.
    #[serde(default)]
    pub duration: Option<f64>,
    /// If the video is age restricted, the age limit is different from 0.
    #[serde(default)]
    pub age_limit: i64,
    /// The available formats of the video.
    #[serde(default)]
    pub formats: Vec<Format>,
}

/// The kind of stream a download needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// An audio-only stream, transcoded to MP3.
    Audio,
    /// A progressive stream in an mp4 container.
    Progressive,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Progressive => write!(f, "progressive mp4"),
        }
    }
}

/// Represents one downloadable stream of a video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Format {
    /// The 'yt-dlp' format selector for this stream.
    pub format_id: String,
    /// The container extension, e.g. 'mp4', 'webm', 'm4a'.
    pub ext: String,
    /// The video codec, 'none' for audio-only streams.
    #[serde(default)]
    pub vcodec: Option<String>,
    /// The audio codec, 'none' for video-only streams.
    #[serde(default)]
    pub acodec: Option<String>,
    /// The width of the video track.
    #[serde(default)]
    pub width: Option<u32>,
    /// The height of the video track.
    #[serde(default)]
    pub height: Option<u32>,
    /// The frame rate of the video track.
    #[serde(default)]
    pub fps: Option<f64>,
    /// The audio bitrate in kbps.
    #[serde(default)]
    pub abr: Option<f64>,
    /// The total bitrate in kbps.
    #[serde(default)]
    pub tbr: Option<f64>,
}

/// A playlist listed with '--flat-playlist'.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Playlist {
    /// The ID of the playlist.
    pub id: String,
    /// The title of the playlist.
    pub title: String,
    /// The unresolved videos of the playlist.
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
}

/// An unresolved video of a playlist.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaylistEntry {
    /// The ID of the video.
    pub id: String,
    /// The title of the video, missing for deleted or private entries.
    #[serde(default)]
    pub title: Option<String>,
}

impl Format {
    fn has_track(codec: &Option<String>) -> bool {
        codec.as_deref().is_some_and(|c| c != NO_CODEC)
    }

    /// Whether the stream carries a video track.
    pub fn has_video(&self) -> bool {
        Self::has_track(&self.vcodec)
    }

    /// Whether the stream carries an audio track.
    pub fn has_audio(&self) -> bool {
        Self::has_track(&self.acodec)
    }

    /// Whether audio and video are multiplexed in this stream.
    pub fn is_progressive(&self) -> bool {
        self.has_video() && self.has_audio()
    }

    /// Whether the stream only carries audio.
    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }
}

impl Video {
    /// The length of the video in whole seconds, 0 when unknown.
    pub fn length(&self) -> u64 {
        self.duration.map(|d| d.max(0.0) as u64).unwrap_or(0)
    }

    /// Returns the highest resolution progressive stream in an mp4 container.
    pub fn best_progressive_format(&self) -> Option<&Format> {
        self.formats
            .iter()
            .filter(|f| f.is_progressive() && f.ext == "mp4")
            .max_by(|a, b| compare_video_formats(a, b))
    }

    /// Returns the best audio-only stream.
    pub fn best_audio_format(&self) -> Option<&Format> {
        self.formats
            .iter()
            .filter(|f| f.is_audio_only())
            .max_by(|a, b| compare_audio_formats(a, b))
    }
}

fn compare_floats(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(0.0).total_cmp(&b.unwrap_or(0.0))
}

/// Compares two video formats.
/// Formats sorting : "video resolution", "fps", "total bitrate"
pub fn compare_video_formats(a: &Format, b: &Format) -> Ordering {
    a.height
        .unwrap_or(0)
        .cmp(&b.height.unwrap_or(0))
        .then_with(|| compare_floats(a.fps, b.fps))
        .then_with(|| compare_floats(a.tbr, b.tbr))
}

/// Compares two audio formats.
/// Formats sorting : "audio bitrate", "total bitrate"
pub fn compare_audio_formats(a: &Format, b: &Format) -> Ordering {
    compare_floats(a.abr, b.abr).then_with(|| compare_floats(a.tbr, b.tbr))
}

impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Video(id = {}, title = \"{}\", duration = {}, formats = {})",
            self.id,
            self.title,
            self.length(),
            self.formats.len()
        )
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Format(id = {}, ext = {}", self.format_id, self.ext)?;
        if let Some(height) = self.height {
            write!(f, ", {}p", height)?;
        }
        if let Some(abr) = self.abr {
            write!(f, ", {:.0}k", abr)?;
        }
        write!(f, ")")
    }
}

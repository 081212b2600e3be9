//! What the user asked for, parsed once at the boundary.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::LazyLock;

static CHANNEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^UC[A-Za-z0-9_-]{22}$").expect("channel id pattern is valid"));

static API_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{39}$").expect("api key pattern is valid"));

/// Whether the archive keeps video files or MP3s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Progressive mp4 files.
    Video,
    /// Audio transcoded to MP3.
    Music,
}

impl MediaKind {
    /// The archive directory of this kind.
    pub fn category(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Music => "music",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category())
    }
}

/// Where the videos come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRequest {
    /// Every video of a playlist.
    Playlist(String),
    /// Every video uploaded by a channel id.
    Channel(String),
    /// One video URL.
    SingleVideo(String),
}

/// One run of the archiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// What to keep.
    pub kind: MediaKind,
    /// Where to take it from.
    pub request: MediaRequest,
}

impl Invocation {
    /// The message printed once the run is over.
    pub fn completion_message(&self) -> &'static str {
        match (self.kind, &self.request) {
            (MediaKind::Video, MediaRequest::Playlist(_)) => {
                "Tải và chuyển đổi video từ playlist hoàn tất."
            }
            (MediaKind::Video, MediaRequest::Channel(_)) => {
                "Tải và chuyển đổi video từ kênh YouTube hoàn tất."
            }
            (MediaKind::Video, MediaRequest::SingleVideo(_)) => {
                "Tải và chuyển đổi video từ URL cụ thể hoàn tất."
            }
            (MediaKind::Music, MediaRequest::Playlist(_)) => {
                "Tải và chuyển đổi nhạc từ playlist hoàn tất."
            }
            (MediaKind::Music, MediaRequest::Channel(_)) => {
                "Tải và chuyển đổi nhạc từ kênh YouTube hoàn tất."
            }
            (MediaKind::Music, MediaRequest::SingleVideo(_)) => {
                "Tải và chuyển đổi nhạc từ URL cụ thể hoàn tất."
            }
        }
    }
}

/// Printed when a menu answer is not one of the choices.
pub const INVALID_CHOICE: &str = "Lựa chọn không hợp lệ.";

const KIND_MENU: &str = "Bạn muốn tải video hay nhạc?\n1. Video\n2. Nhạc\nChọn: ";
const SOURCE_MENU: &str = "Bạn muốn tải từ playlist hay từ kênh YouTube, hoặc từ URL cụ thể?\n1. Playlist\n2. Kênh YouTube\n3. URL cụ thể\nChọn: ";
const PLAYLIST_PROMPT: &str = "Nhập link danh sách phát YouTube: ";
const CHANNEL_PROMPT: &str = "Nhập ID của kênh YouTube: ";
const URL_PROMPT: &str = "Nhập URL cụ thể của video YouTube: ";
const API_KEY_HELP: &str = "No YouTube Data API key found, please enter one:\n If you don't have one, here is a guide: https://developers.google.com/youtube/v3/getting-started";
const API_KEY_PROMPT: &str = "Enter API key: ";
const INVALID_API_KEY: &str =
    "Invalid API key. It must be a 39-character string of letters, digits, '-' and '_'.";

/// Parses a menu answer, accepting only integers in `1..=max`.
pub fn parse_choice(input: &str, max: u8) -> Result<u8> {
    let trimmed = input.trim();
    match trimmed.parse::<u8>() {
        Ok(choice) if (1..=max).contains(&choice) => Ok(choice),
        _ => Err(Error::InvalidChoice(trimmed.to_string())),
    }
}

/// Maps the first menu answer to a media kind.
pub fn parse_kind(input: &str) -> Result<MediaKind> {
    match parse_choice(input, 2)? {
        1 => Ok(MediaKind::Video),
        _ => Ok(MediaKind::Music),
    }
}

/// Whether `id` has the shape of a channel id, e.g. 'UCX6OQ3DkcsbYNE6H8uQQuVA'.
///
/// Handles and custom URLs do not match, they are not accepted by the listing API.
pub fn is_channel_id(id: &str) -> bool {
    CHANNEL_ID.is_match(id)
}

/// Whether `key` has the shape of a Data API key.
pub fn is_api_key(key: &str) -> bool {
    API_KEY.is_match(key)
}

/// Asks a question and returns the trimmed answer.
pub fn ask(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Asks for the media kind.
pub fn prompt_kind(input: &mut impl BufRead, output: &mut impl Write) -> Result<MediaKind> {
    parse_kind(&ask(input, output, KIND_MENU)?)
}

/// Asks for the source kind and then its URL or channel id.
pub fn prompt_request(input: &mut impl BufRead, output: &mut impl Write) -> Result<MediaRequest> {
    match parse_choice(&ask(input, output, SOURCE_MENU)?, 3)? {
        1 => Ok(MediaRequest::Playlist(ask(input, output, PLAYLIST_PROMPT)?)),
        2 => Ok(MediaRequest::Channel(ask(input, output, CHANNEL_PROMPT)?)),
        _ => Ok(MediaRequest::SingleVideo(ask(input, output, URL_PROMPT)?)),
    }
}

/// Asks for a Data API key until a well-formed one is entered.
///
/// # Errors
///
/// An [`Error::IO`] of kind `UnexpectedEof` when the input ends first.
pub fn prompt_api_key(input: &mut impl BufRead, output: &mut impl Write) -> Result<String> {
    writeln!(output, "{API_KEY_HELP}")?;

    let mut key = String::new();
    loop {
        write!(output, "{API_KEY_PROMPT}")?;
        output.flush()?;
        key.clear();
        if input.read_line(&mut key)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no API key given").into());
        }
        if is_api_key(key.trim()) {
            return Ok(key.trim().to_string());
        }
        writeln!(output, "{INVALID_API_KEY}")?;
    }
}

/// Runs the whole interactive menu.
pub fn prompt_invocation(input: &mut impl BufRead, output: &mut impl Write) -> Result<Invocation> {
    let kind = prompt_kind(input, output)?;
    let request = prompt_request(input, output)?;
    Ok(Invocation { kind, request })
}

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{LevelFilter, error, info, warn};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use ytvault::{
    Archiver, Error,
    api::DataApi,
    config::{DEFAULT_OUTPUT_DIR, RetryPolicy, Settings},
    ffmpeg::Ffmpeg,
    fs::find_executable,
    request::{
        INVALID_CHOICE, Invocation, MediaKind, MediaRequest, is_channel_id, prompt_api_key,
        prompt_invocation,
    },
    ytdlp::YtDlp,
};

#[derive(Parser, Clone)]
#[command(version, about = "Archive YouTube playlists, channels and videos as mp4 or MP3")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(long = "output-dir", short, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    #[arg(long = "yt-dlp")]
    pub yt_dlp: Option<PathBuf>,

    #[arg(long = "ffmpeg")]
    pub ffmpeg: Option<PathBuf>,

    #[arg(long = "api-key", env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(
        long = "bitrate",
        short,
        default_value = "192k",
        value_parser = clap::builder::PossibleValuesParser::new([
            "8k", "16k", "24k", "32k", "40k", "48k", "64k", "80k", "96k", "112k", "128k", "160k", "192k", "224k", "256k", "320k"
        ])
    )]
    pub bitrate: String,

    /// Seconds allowed for one metadata call.
    #[arg(long = "timeout", short, default_value_t = 30)]
    pub timeout: u64,

    /// Calls made for one channel listing page before giving up.
    #[arg(long = "max-list-retries", default_value_t = 5)]
    pub max_list_retries: u32,

    /// Retry a failing channel listing every 5 seconds until it succeeds.
    #[arg(long = "retry-forever", action = clap::ArgAction::SetTrue, conflicts_with = "max_list_retries")]
    pub retry_forever: bool,

    /// Extra argument passed to every 'yt-dlp' call, repeatable.
    #[arg(long = "yt-dlp-arg", allow_hyphen_values = true)]
    pub yt_dlp_args: Vec<String>,

    #[arg(
        long = "verbosity",
        short,
        default_value = "info",
        value_parser = clap::builder::PossibleValuesParser::new([
            "info", "debug", "error", "none", "full"
        ])
    )]
    pub verbosity: String,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Download every video of a playlist.
    Playlist {
        url: String,
        #[arg(long, value_enum, default_value_t = Kind::Music)]
        kind: Kind,
    },
    /// Download the uploads of a channel, by channel id.
    Channel {
        channel_id: String,
        #[arg(long, value_enum, default_value_t = Kind::Music)]
        kind: Kind,
    },
    /// Download one video.
    Url {
        url: String,
        #[arg(long, value_enum, default_value_t = Kind::Music)]
        kind: Kind,
    },
}

#[derive(ValueEnum, Clone, Copy)]
pub enum Kind {
    Video,
    Music,
}

impl From<Kind> for MediaKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Video => MediaKind::Video,
            Kind::Music => MediaKind::Music,
        }
    }
}

impl Command {
    fn into_invocation(self) -> Invocation {
        let (kind, request) = match self {
            Command::Playlist { url, kind } => (kind, MediaRequest::Playlist(url)),
            Command::Channel { channel_id, kind } => (kind, MediaRequest::Channel(channel_id)),
            Command::Url { url, kind } => (kind, MediaRequest::SingleVideo(url)),
        };

        Invocation {
            kind: kind.into(),
            request,
        }
    }
}

impl Cli {
    fn settings(&self) -> Settings {
        let retry = if self.retry_forever {
            RetryPolicy::unbounded()
        } else {
            RetryPolicy {
                max_attempts: Some(self.max_list_retries.max(1)),
                ..RetryPolicy::default()
            }
        };

        Settings {
            output_dir: self.output_dir.clone(),
            yt_dlp: self
                .yt_dlp
                .clone()
                .unwrap_or_else(|| PathBuf::from(find_executable("yt-dlp"))),
            ffmpeg: self
                .ffmpeg
                .clone()
                .unwrap_or_else(|| PathBuf::from(find_executable("ffmpeg"))),
            yt_dlp_args: self.yt_dlp_args.clone(),
            api_key: self.api_key.clone().filter(|key| !key.trim().is_empty()),
            bitrate: self.bitrate.clone(),
            timeout: Duration::from_secs(self.timeout),
            retry,
            ..Settings::default()
        }
    }
}

fn level_filter(verbosity: &str) -> LevelFilter {
    match verbosity {
        "none" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "debug" => LevelFilter::Debug,
        "full" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn init_logging(level: LevelFilter) -> Result<MultiProgress, Box<dyn std::error::Error + Send + Sync>> {
    let logger = env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .build();
    let multi = MultiProgress::new();

    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(level);

    Ok(multi)
}

fn spinner(multi: &MultiProgress, level: LevelFilter) -> ProgressBar {
    if level == LevelFilter::Off {
        return ProgressBar::hidden();
    }

    let spinner = multi.add(ProgressBar::new_spinner());
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{pos}] {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Cli::parse();
    let level = level_filter(&args.verbosity);
    let multi = init_logging(level)?;
    let mut settings = args.settings();

    let invocation = match args.command {
        Some(command) => command.into_invocation(),
        None => {
            let mut input = io::stdin().lock();
            let mut output = io::stdout();
            match prompt_invocation(&mut input, &mut output) {
                Ok(invocation) => invocation,
                Err(Error::InvalidChoice(_)) => {
                    println!("{}", INVALID_CHOICE);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    if let MediaRequest::Channel(channel_id) = &invocation.request {
        if !is_channel_id(channel_id) {
            warn!("'{}' does not look like a channel id (UC...).", channel_id);
        }
        if settings.api_key.is_none() {
            settings.api_key = Some(prompt_api_key(&mut io::stdin().lock(), &mut io::stdout())?);
        }
    }

    let archiver = Archiver::new(
        YtDlp::from_settings(&settings),
        DataApi::new(settings.api_key.clone().unwrap_or_default()),
        Ffmpeg::from_settings(&settings),
        settings.output_dir.clone(),
    )
    .with_retry_policy(settings.retry)
    .with_progress(spinner(&multi, level));

    match archiver.run(&invocation).await {
        Ok(report) => {
            info!(
                "{} downloaded, {} skipped, {} failed",
                report.downloaded.len(),
                report.skipped.len() - report.failures(),
                report.failures()
            );
            println!("{}", invocation.completion_message());
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;

/// Command-line arguments for Duet Monitor Capture.
///
/// Every option can also be supplied through a `DMC_*` environment variable,
/// which keeps container and systemd deployments free of long command lines.
/// Numeric options given without a value (`--skip`) take the value `1`.
#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about = "Duet Monitor Capture - capture a still on every Z change and build a timelapse when the print completes",
    long_about = None
)]
pub struct Args {
    /// Input video source (e.g. /dev/video0)
    #[arg(short, long, env = "DMC_CAMERA")]
    pub camera: String,

    /// Printer URL or IP address (e.g. http://192.168.1.30 or http://printer_network_name)
    #[arg(short, long, env = "DMC_PRINTER")]
    pub printer: String,

    /// Verbose output, useful for troubleshooting
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the first N Z changes of a print (useful to skip bed probing)
    #[arg(
        short,
        long,
        env = "DMC_SKIP",
        default_value_t = 0,
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub skip: u32,

    /// Seconds to sleep between printer status polls
    #[arg(
        short,
        long,
        env = "DMC_TIMER",
        default_value_t = 30,
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub timer: u64,

    /// Seconds each still is shown in the assembled video
    #[arg(
        short,
        long,
        env = "DMC_FRAMERATE",
        default_value_t = 0.15,
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub framerate: f64,

    /// Number of frames ffmpeg grabs per snapshot (the last one is kept)
    #[arg(
        short,
        long,
        env = "DMC_IMAGECOUNT",
        default_value_t = 1,
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub imagecount: u32,

    /// Directory holding the numbered stills and finished videos
    #[arg(short, long, env = "DMC_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// TrueType font used for the watermark
    #[arg(long, env = "DMC_FONT", default_value = constants::DEFAULT_FONT_PATH)]
    pub font: PathBuf,

    /// Watermark text drawn in the bottom-right corner of every still
    #[arg(long, env = "DMC_WATERMARK", default_value = constants::DEFAULT_WATERMARK_TEXT)]
    pub watermark: String,

    /// Save stills without a watermark
    #[arg(long)]
    pub no_watermark: bool,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Video4Linux device handed to ffmpeg.
    pub camera: String,

    /// Printer base URL without a trailing slash.
    pub printer_url: String,

    pub verbose: bool,

    /// Number of Z-change events ignored at the start of each print.
    pub skip_count: u32,

    /// Sleep between status polls.
    pub poll_interval: Duration,

    /// Seconds per still in the output video; ffmpeg reads at `1/frame_rate` fps.
    pub frame_rate: f64,

    /// Frames grabbed by ffmpeg per capture.
    pub image_count: u32,

    pub output_dir: PathBuf,

    /// Font for the watermark, `None` when watermarking is disabled.
    pub font: Option<PathBuf>,

    pub watermark_text: String,
}

impl Config {
    /// Parse arguments from the process command line and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(Args::parse())
    }

    /// Validate and normalise parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - `framerate` is not a positive, finite number
    /// - `imagecount` is zero
    /// - `camera` or `printer` is empty
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if !args.framerate.is_finite() || args.framerate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "framerate".to_string(),
                value: args.framerate.to_string(),
                reason: "must be a positive number of seconds".to_string(),
            });
        }

        if args.imagecount == 0 {
            return Err(ConfigError::InvalidValue {
                field: "imagecount".to_string(),
                value: args.imagecount.to_string(),
                reason: "ffmpeg needs to grab at least one frame".to_string(),
            });
        }

        if args.camera.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "camera".to_string(),
                value: args.camera,
                reason: "a video device is required".to_string(),
            });
        }

        let printer_url = args.printer.trim().trim_end_matches('/').to_string();
        if printer_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "printer".to_string(),
                value: args.printer,
                reason: "a printer URL is required".to_string(),
            });
        }

        Ok(Config {
            camera: args.camera,
            printer_url,
            verbose: args.verbose,
            skip_count: args.skip,
            poll_interval: Duration::from_secs(args.timer),
            frame_rate: args.framerate,
            image_count: args.imagecount,
            output_dir: args.output_dir,
            font: (!args.no_watermark).then_some(args.font),
            watermark_text: args.watermark,
        })
    }
}

/// Application constants used throughout the system.
pub mod constants {
    /// Duet endpoint reporting machine status and coordinates.
    pub const STATUS_PATH: &str = "/rr_status?type=2";

    /// Duet endpoint describing the file being printed.
    pub const FILE_INFO_PATH: &str = "/rr_fileinfo?type=1";

    /// Timeout for the preflight reachability check, in seconds.
    pub const PREFLIGHT_TIMEOUT_SECONDS: u64 = 10;

    /// External tool used for both capture and encoding.
    pub const FFMPEG: &str = "ffmpeg";

    /// Capture and encode resolution.
    pub const RESOLUTION: &str = "1920x1080";

    /// x264 constant rate factor for the assembled video.
    pub const VIDEO_CRF: &str = "25";

    /// Prefix and suffix of numbered stills; the index is zero-padded to 15 digits.
    pub const FRAME_PREFIX: &str = "image-";
    pub const FRAME_SUFFIX: &str = ".jpg";
    pub const FRAME_INDEX_WIDTH: usize = 15;

    /// ffmpeg input pattern matching the numbered stills.
    pub const FRAME_PATTERN: &str = "image-%015d.jpg";

    /// Fixed name ffmpeg writes the video to before it is renamed.
    pub const VIDEO_FILE: &str = "print.mp4";

    /// Timestamp appended to finished videos.
    pub const VIDEO_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

    pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/freefont/FreeMonoBold.ttf";

    pub const DEFAULT_WATERMARK_TEXT: &str = "DMCv2 - https://www.dr-b.io";

    /// Watermark glyph height in pixels.
    pub const WATERMARK_FONT_SIZE: f32 = 50.0;

    /// Gap between the watermark box and the bottom edge of the frame.
    pub const WATERMARK_MARGIN: u32 = 50;

    /// Horizontal padding inside the watermark box.
    pub const WATERMARK_PADDING: u32 = 30;

    /// Opacity of the watermark box (0-255).
    pub const WATERMARK_ALPHA: u8 = 100;
}

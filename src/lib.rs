//! Duet Monitor Capture - timelapse recording for Duet/RepRap 3D printers.
//!
//! The printer's HTTP status endpoint is polled at a fixed interval. While a
//! print is running, every change of the Z position triggers a still capture
//! through ffmpeg, which is then watermarked. When the printer drops back to
//! idle the stills are assembled into a timestamped video and deleted.
//!
//! # Core Components
//!
//! * [`config`] - Command-line arguments, validation and constants
//! * [`printer`] - Duet HTTP API client and status snapshots
//! * [`session`] - Print lifecycle state machine
//! * [`monitor`] - Poll loop that performs the state machine's actions
//! * [`ffmpeg`] - Capture and video assembly through ffmpeg
//! * [`watermark`] - Caption overlay for captured stills
//! * [`frames`] - Numbered still files and the finished video
//! * [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use duet_capture::*;
//! use std::sync::atomic::AtomicBool;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let mut monitor = Monitor::new(
//!     PrinterService::new(config.printer_url.clone())?,
//!     FfmpegCapture::new(config.camera.clone(), config.image_count),
//!     FfmpegEncoder::new(config.frame_rate),
//!     FrameStore::new(&config.output_dir),
//!     config.skip_count,
//!     config.poll_interval,
//! );
//! monitor.run(&AtomicBool::new(true))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod frames;
pub mod monitor;
pub mod printer;
pub mod session;
pub mod watermark;

// Re-export commonly used types for convenience
pub use config::{Args, Config};
pub use ffmpeg::{FfmpegCapture, FfmpegEncoder, FrameCapture, VideoEncoder};
pub use frames::FrameStore;
pub use monitor::Monitor;
pub use printer::{PrinterApi, PrinterService, PrinterSnapshot, StatusCode};
pub use session::{Action, PrintSession, PrinterState, transition};
pub use watermark::Watermarker;

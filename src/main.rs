use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info};

use duet_capture::config::{Config, constants};
use duet_capture::{
    FfmpegCapture, FfmpegEncoder, FrameStore, Monitor, PrinterService, Watermarker, ffmpeg,
};

/// Duet Monitor Capture - timelapse recording for Duet/RepRap printers.
///
/// Captures a still from a webcam every time the Z position changes during a
/// print and compiles the stills into an mp4 once the print completes.
///
/// # Usage
///
/// ```bash
/// duet-capture --camera /dev/video0 --printer http://192.168.1.30 --skip 3
///
/// # or through the environment:
/// export DMC_CAMERA=/dev/video0
/// export DMC_PRINTER=http://printer.local
/// ./duet-capture -v
/// ```
fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    // RUST_LOG wins; otherwise --verbose selects debug output
    let default_level = if config.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stdout)
        .filter_level(
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|level| level.parse().ok())
                .unwrap_or(default_level),
        )
        .init();

    let watermark = match preflight(&config) {
        Ok(watermark) => watermark,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    debug!("Defined variables: {:#?}", config);
    debug!("Pre-tests complete, start processing");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Interrupted, shutting down");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut monitor = Monitor::new(
        PrinterService::new(config.printer_url.clone())?,
        FfmpegCapture::new(config.camera.clone(), config.image_count),
        FfmpegEncoder::new(config.frame_rate),
        FrameStore::new(&config.output_dir),
        config.skip_count,
        config.poll_interval,
    );
    if let Some(watermark) = watermark {
        monitor = monitor.with_watermark(watermark);
    }

    info!("Duet Monitor Capture started, watching {}", config.printer_url);
    info!("Press CTRL+C to exit");

    monitor.run(&running)
}

/// One-shot checks before the poll loop: ffmpeg, printer, watermark font.
fn preflight(config: &Config) -> Result<Option<Watermarker>> {
    debug!("Testing ffmpeg availability");
    ffmpeg::check_available()?;

    debug!("Testing printer http availability");
    PrinterService::new(config.printer_url.clone())?
        .check_online(Duration::from_secs(constants::PREFLIGHT_TIMEOUT_SECONDS))?;
    debug!("Printer online");

    std::fs::create_dir_all(&config.output_dir)?;
    FrameStore::new(&config.output_dir).report_leftovers()?;

    config
        .font
        .as_deref()
        .map(|font| {
            debug!("Loading watermark font {}", font.display());
            Watermarker::load(font, config.watermark_text.clone())
        })
        .transpose()
}

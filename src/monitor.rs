use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info};

use crate::config::constants;
use crate::ffmpeg::{FrameCapture, VideoEncoder};
use crate::frames::FrameStore;
use crate::printer::PrinterApi;
use crate::session::{Action, PrintSession, transition};
use crate::watermark::Watermarker;

/// Longest uninterrupted sleep between checks of the shutdown flag.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// Drives the poll loop: observe, transition, perform.
///
/// Generic over the printer and the external tools so the loop can be run
/// against fakes.
pub struct Monitor<P, C, E> {
    printer: P,
    capture: C,
    encoder: E,
    watermark: Option<Watermarker>,
    frames: FrameStore,
    skip_count: u32,
    poll_interval: Duration,
    session: PrintSession,
}

impl<P, C, E> Monitor<P, C, E>
where
    P: PrinterApi,
    C: FrameCapture,
    E: VideoEncoder,
{
    pub fn new(
        printer: P,
        capture: C,
        encoder: E,
        frames: FrameStore,
        skip_count: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            printer,
            capture,
            encoder,
            watermark: None,
            frames,
            skip_count,
            poll_interval,
            session: PrintSession::default(),
        }
    }

    /// Stamp every captured still with `watermark`.
    pub fn with_watermark(mut self, watermark: Watermarker) -> Self {
        self.watermark = Some(watermark);
        self
    }

    pub fn session(&self) -> &PrintSession {
        &self.session
    }

    pub fn printer(&self) -> &P {
        &self.printer
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Poll until `running` is cleared.
    ///
    /// Any error from a cycle ends the loop and is returned; nothing is
    /// cleaned up on the way out. A cycle that fails after `running` was
    /// cleared counts as interrupted, since Ctrl+C also kills the ffmpeg child.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        while running.load(Ordering::SeqCst) {
            if let Err(e) = self.run_cycle() {
                if !running.load(Ordering::SeqCst) {
                    debug!("Cycle interrupted during shutdown: {:#}", e);
                    return Ok(());
                }
                return Err(e);
            }
            debug!("Sleeping {} seconds", self.poll_interval.as_secs());
            sleep_while(running, self.poll_interval);
        }
        Ok(())
    }

    /// Run a single poll cycle without sleeping.
    pub fn run_cycle(&mut self) -> Result<()> {
        debug!("Getting printer status");
        let snapshot = self.printer.status()?;
        debug!("Z position: {}", snapshot.z);
        debug!("Printer status: {}", snapshot.status);

        let (session, actions) =
            transition(std::mem::take(&mut self.session), &snapshot, self.skip_count);
        self.session = session;

        for action in actions {
            self.perform(action)?;
        }

        Ok(())
    }

    fn perform(&mut self, action: Action) -> Result<()> {
        match action {
            Action::FetchPrintName => {
                let name = self.printer.print_name()?;
                info!("Print started: {}", name);
                self.session.name = Some(name);
            }
            Action::Capture { index } => {
                let path = self.frames.frame_path(index);
                debug!("Z position changed, capturing {}", path.display());
                self.capture.capture(&path)?;

                if let Some(watermark) = &self.watermark {
                    debug!("Image captured, inserting watermark");
                    watermark.apply(&path)?;
                }
                info!("Saved image {}", index);
            }
            Action::Skip { skipped, of } => {
                debug!("Z position changed, skipped {} of {} images", skipped, of);
            }
            Action::AssembleVideo { name, frames } => {
                info!(
                    "Printer just completed a print job, creating video from {} stills",
                    frames
                );
                let video = self.frames.video_path();
                self.encoder.encode(&self.frames, &video)?;

                let timestamp = chrono::Local::now()
                    .format(constants::VIDEO_TIMESTAMP_FORMAT)
                    .to_string();
                let target = self.frames.finalize_video(&name, &timestamp)?;
                info!("Video saved to {}", target.display());

                let removed = self.frames.clear()?;
                debug!("Deleted {} still images", removed);
            }
        }
        Ok(())
    }
}

/// Sleep for `duration`, returning early once `running` is cleared.
fn sleep_while(running: &AtomicBool, duration: Duration) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_returns_immediately_when_stopped() {
        let running = AtomicBool::new(false);
        let start = Instant::now();
        sleep_while(&running, Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn sleep_waits_for_short_intervals() {
        let running = AtomicBool::new(true);
        let start = Instant::now();
        sleep_while(&running, Duration::from_millis(50));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use log::debug;

use crate::config::constants;
use crate::error::{CaptureError, PreflightError};
use crate::frames::FrameStore;

/// Grab one still from the camera.
pub trait FrameCapture {
    /// Write a single JPEG to `path`.
    fn capture(&mut self, path: &Path) -> Result<()>;
}

/// Turn the stills of a [`FrameStore`] into a video.
pub trait VideoEncoder {
    /// Encode every still in `frames`, in sequence order, into `output`.
    fn encode(&mut self, frames: &FrameStore, output: &Path) -> Result<()>;
}

/// Verify that ffmpeg can be spawned.
///
/// # Errors
///
/// Returns [`PreflightError::ToolUnavailable`] if the binary is missing, not
/// executable, or exits unsuccessfully for `-version`.
pub fn check_available() -> Result<()> {
    let unavailable = |reason: String| PreflightError::ToolUnavailable {
        tool: constants::FFMPEG.to_string(),
        reason,
    };

    let status = Command::new(constants::FFMPEG)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| unavailable(e.to_string()))?;

    if !status.success() {
        return Err(unavailable(format!("`ffmpeg -version` exited with {}", status)).into());
    }

    Ok(())
}

/// Run an ffmpeg command with its output discarded.
fn run(mut command: Command, step: &str) -> Result<()> {
    debug!("Running {:?}", command);
    let status = command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to start ffmpeg for {}", step))?;

    if !status.success() {
        return Err(CaptureError::ToolFailed {
            step: step.to_string(),
            status: status.to_string(),
        }
        .into());
    }

    Ok(())
}

/// Captures stills from a Video4Linux device.
#[derive(Debug, Clone)]
pub struct FfmpegCapture {
    camera: String,
    image_count: u32,
}

impl FfmpegCapture {
    pub fn new(camera: String, image_count: u32) -> Self {
        Self {
            camera,
            image_count,
        }
    }

    pub fn command(&self, path: &Path) -> Command {
        let mut command = Command::new(constants::FFMPEG);
        command
            .args(["-f", "video4linux2", "-video_size", constants::RESOLUTION, "-i"])
            .arg(&self.camera)
            .args(["-f", "image2", "-frames:v"])
            .arg(self.image_count.to_string())
            .args(["-update", "1", "-y"])
            .arg(path);
        command
    }
}

impl FrameCapture for FfmpegCapture {
    fn capture(&mut self, path: &Path) -> Result<()> {
        run(self.command(path), "capture")?;

        if !path.exists() {
            return Err(CaptureError::OutputMissing {
                path: path.display().to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Assembles the numbered stills into an H.264 video.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    frame_rate: f64,
}

impl FfmpegEncoder {
    /// `frame_rate` is the number of seconds each still stays on screen.
    pub fn new(frame_rate: f64) -> Self {
        Self { frame_rate }
    }

    /// The command runs inside the frame directory so the input pattern stays relative.
    pub fn command(&self, frames: &FrameStore, output: &Path) -> Command {
        let mut command = Command::new(constants::FFMPEG);
        command
            .current_dir(frames.dir())
            .arg("-r")
            .arg(format!("1/{}", self.frame_rate))
            .args(["-s", constants::RESOLUTION, "-i", constants::FRAME_PATTERN])
            .args(["-vcodec", "libx264", "-crf", constants::VIDEO_CRF])
            .args(["-pix_fmt", "yuv420p", "-y"])
            .arg(output.file_name().unwrap_or(output.as_os_str()));
        command
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode(&mut self, frames: &FrameStore, output: &Path) -> Result<()> {
        run(self.command(frames, output), "video assembly")?;

        if !output.exists() {
            return Err(CaptureError::OutputMissing {
                path: output.display().to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn capture_command_targets_device_and_frame() {
        let capture = FfmpegCapture::new("/dev/video2".to_string(), 3);
        let command = capture.command(Path::new("image-000000000000007.jpg"));

        assert_eq!(command.get_program(), OsStr::new("ffmpeg"));
        assert_eq!(
            args(&command),
            vec![
                "-f",
                "video4linux2",
                "-video_size",
                "1920x1080",
                "-i",
                "/dev/video2",
                "-f",
                "image2",
                "-frames:v",
                "3",
                "-update",
                "1",
                "-y",
                "image-000000000000007.jpg",
            ]
        );
    }

    #[test]
    fn encoder_reads_pattern_at_inverse_rate() {
        let frames = FrameStore::new("/tmp/prints");
        let encoder = FfmpegEncoder::new(0.15);
        let command = encoder.command(&frames, &frames.video_path());

        assert_eq!(command.get_current_dir(), Some(Path::new("/tmp/prints")));
        assert_eq!(
            args(&command),
            vec![
                "-r",
                "1/0.15",
                "-s",
                "1920x1080",
                "-i",
                "image-%015d.jpg",
                "-vcodec",
                "libx264",
                "-crf",
                "25",
                "-pix_fmt",
                "yuv420p",
                "-y",
                "print.mp4",
            ]
        );
    }
}

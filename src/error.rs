use std::fmt;

/// Custom error types for the Duet capture application.
///
/// Functions throughout the crate return `anyhow::Result`; these enums are
/// what actually gets raised inside them, so callers and tests can downcast
/// to the failing stage.

/// Errors related to command-line and environment configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A value was supplied but is outside the accepted range.
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors raised by the one-shot checks that run before the poll loop.
#[derive(Debug)]
pub enum PreflightError {
    /// An external tool could not be invoked.
    ToolUnavailable { tool: String, reason: String },

    /// The printer did not answer with HTTP 200 in time.
    PrinterOffline { url: String, reason: String },

    /// The watermark font could not be loaded.
    FontUnavailable { path: String, reason: String },
}

/// Errors specific to the Duet HTTP API.
#[derive(Debug)]
pub enum PrinterError {
    /// The printer answered with a non-success status.
    ApiError { endpoint: String, status: u16 },

    /// The response body did not have the expected shape.
    MalformedResponse { endpoint: String, reason: String },
}

/// Errors from the external capture and encode steps.
#[derive(Debug)]
pub enum CaptureError {
    /// The tool ran but exited unsuccessfully.
    ToolFailed { step: String, status: String },

    /// The tool reported success but the expected file is not on disk.
    OutputMissing { path: String },
}

/// Errors from the watermark overlay step.
#[derive(Debug)]
pub enum WatermarkError {
    /// The font file was read but could not be parsed.
    InvalidFont { path: String },

    /// The captured frame could not be decoded or re-encoded.
    ImageFailed { path: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for option '{}': {}",
                    value, field, reason
                )
            }
        }
    }
}

impl fmt::Display for PreflightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreflightError::ToolUnavailable { tool, reason } => {
                write!(
                    f,
                    "{} is required but could not be loaded ({}). Please make sure {} is correctly installed and the current user has access to it.",
                    tool, reason, tool
                )
            }
            PreflightError::PrinterOffline { url, reason } => {
                write!(
                    f,
                    "{} offline, please verify URL and try again ({})",
                    url, reason
                )
            }
            PreflightError::FontUnavailable { path, reason } => {
                write!(
                    f,
                    "Watermark font '{}' could not be loaded: {}",
                    path, reason
                )
            }
        }
    }
}

impl fmt::Display for PrinterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterError::ApiError { endpoint, status } => {
                write!(f, "Printer API error at '{}' (HTTP {})", endpoint, status)
            }
            PrinterError::MalformedResponse { endpoint, reason } => {
                write!(
                    f,
                    "Unexpected response from '{}': {}",
                    endpoint, reason
                )
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::ToolFailed { step, status } => {
                write!(f, "ffmpeg {} failed: {}", step, status)
            }
            CaptureError::OutputMissing { path } => {
                write!(f, "Expected output file was not created: {}", path)
            }
        }
    }
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkError::InvalidFont { path } => {
                write!(f, "Not a usable TrueType font: {}", path)
            }
            WatermarkError::ImageFailed { path, reason } => {
                write!(f, "Failed to watermark '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for PreflightError {}
impl std::error::Error for PrinterError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for WatermarkError {}

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode as HttpStatus;
use serde::Deserialize;

use crate::config::constants;
use crate::error::{PreflightError, PrinterError};

/// Machine status letter reported by `rr_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode {
    /// `I`
    Idle,
    /// `P`
    Printing,
    /// Any other letter (paused, busy, simulating, ...).
    Other(String),
}

impl StatusCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "I" => StatusCode::Idle,
            "P" => StatusCode::Printing,
            other => StatusCode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Idle => write!(f, "I"),
            StatusCode::Printing => write!(f, "P"),
            StatusCode::Other(code) => write!(f, "{}", code),
        }
    }
}

/// One poll's worth of printer state.
#[derive(Debug, Clone, PartialEq)]
pub struct PrinterSnapshot {
    pub status: StatusCode,
    pub z: f64,
}

impl PrinterSnapshot {
    pub fn new(status: StatusCode, z: f64) -> Self {
        Self { status, z }
    }

    /// Parse the body of `rr_status?type=2`.
    ///
    /// Only `status` and the third element of `coords.xyz` are read; the rest
    /// of the (large) document is ignored.
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawStatus =
            serde_json::from_str(body).map_err(|e| PrinterError::MalformedResponse {
                endpoint: constants::STATUS_PATH.to_string(),
                reason: e.to_string(),
            })?;

        let z = raw
            .coords
            .xyz
            .get(2)
            .copied()
            .ok_or_else(|| PrinterError::MalformedResponse {
                endpoint: constants::STATUS_PATH.to_string(),
                reason: format!("coords.xyz has {} axes, expected 3", raw.coords.xyz.len()),
            })?;

        Ok(Self::new(StatusCode::from_code(&raw.status), z))
    }
}

#[derive(Deserialize)]
struct RawStatus {
    status: String,
    coords: RawCoords,
}

#[derive(Deserialize)]
struct RawCoords {
    xyz: Vec<f64>,
}

#[derive(Deserialize)]
struct RawFileInfo {
    #[serde(rename = "fileName")]
    file_name: String,
}

/// Turn the `fileName` reported by `rr_fileinfo` into a print name.
///
/// Duet reports a volume path such as `0:/gcodes/Benchy.gcode`; only the last
/// segment is kept, lowercased, with `.gcode` removed.
pub fn print_name_from_file(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    base.to_lowercase().replace(".gcode", "")
}

/// Read-only view of the printer used by the poll loop.
pub trait PrinterApi {
    /// Fetch the current status code and Z position.
    fn status(&mut self) -> Result<PrinterSnapshot>;

    /// Fetch the name of the file being printed.
    fn print_name(&mut self) -> Result<String>;
}

/// HTTP client for the Duet (RepRapFirmware) web API.
pub struct PrinterService {
    pub api_url: String,
    client: reqwest::blocking::Client,
}

impl PrinterService {
    /// Create a new PrinterService for the given base URL.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Base URL of the printer (e.g., "http://192.168.1.30")
    ///
    /// Status and file-info requests wait for the printer indefinitely; only
    /// [`check_online`](Self::check_online) sets a timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(api_url: String) -> Result<Self> {
        // The blocking client otherwise gives up after 30 seconds
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()?;
        Ok(Self { api_url, client })
    }

    /// Check that the printer answers with HTTP 200 within `timeout`.
    ///
    /// This is a one-shot gate; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::PrinterOffline`] if:
    /// - The request cannot be sent or times out
    /// - The printer answers with anything other than 200
    pub fn check_online(&self, timeout: Duration) -> Result<()> {
        let offline = |reason: String| PreflightError::PrinterOffline {
            url: self.api_url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.api_url)
            .timeout(timeout)
            .send()
            .map_err(|e| offline(e.to_string()))?;

        if response.status() != HttpStatus::OK {
            return Err(offline(format!("HTTP {}", response.status())).into());
        }

        Ok(())
    }

    fn get(&self, path: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}{}", self.api_url, path))
            .send()?;

        if !response.status().is_success() {
            return Err(PrinterError::ApiError {
                endpoint: path.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        Ok(response.text()?)
    }
}

impl PrinterApi for PrinterService {
    /// Get the current printer status.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails
    /// - The printer returns an error status
    /// - The body is not a status document with three coordinates
    fn status(&mut self) -> Result<PrinterSnapshot> {
        let body = self.get(constants::STATUS_PATH)?;
        PrinterSnapshot::from_json(&body)
    }

    fn print_name(&mut self) -> Result<String> {
        let body = self.get(constants::FILE_INFO_PATH)?;
        let info: RawFileInfo =
            serde_json::from_str(&body).map_err(|e| PrinterError::MalformedResponse {
                endpoint: constants::FILE_INFO_PATH.to_string(),
                reason: e.to_string(),
            })?;
        Ok(print_name_from_file(&info.file_name))
    }
}

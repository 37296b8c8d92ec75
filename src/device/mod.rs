/*
 *  device/mod.rs
 *
 *  vestamon - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Board device abstraction - read and write the flap grid
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub mod local;
pub mod mock;

use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::future::Future;

use crate::grid::CharacterGrid;

pub use local::LocalClient;
pub use mock::{MockBoard, MockBoardState};

/// Error type for all device operations
#[derive(Debug)]
pub enum DeviceError {
    /// Network level failure (connect, reset, DNS)
    Transport(String),

    /// No answer within the request bound
    Timeout,

    /// Device rejected the credential (HTTP 401/403)
    Unauthorized(u16),

    /// Any other non-success status
    Status(u16),

    /// Body did not decode as a grid
    InvalidResponse(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Transport(msg) => write!(f, "Device transport error: {}", msg),
            DeviceError::Timeout => write!(f, "Device request timed out"),
            DeviceError::Unauthorized(code) => write!(f, "Device rejected credentials (HTTP {})", code),
            DeviceError::Status(code) => write!(f, "Device returned HTTP {}", code),
            DeviceError::InvalidResponse(msg) => write!(f, "Invalid device response: {}", msg),
        }
    }
}

impl Error for DeviceError {}

impl From<reqwest::Error> for DeviceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DeviceError::Timeout
        } else if let Some(status) = err.status() {
            DeviceError::from_status(status.as_u16())
        } else if err.is_decode() {
            DeviceError::InvalidResponse(err.to_string())
        } else {
            DeviceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DeviceError {
    fn from(err: serde_json::Error) -> Self {
        DeviceError::InvalidResponse(err.to_string())
    }
}

impl DeviceError {
    pub fn from_status(code: u16) -> Self {
        match code {
            401 | 403 => DeviceError::Unauthorized(code),
            _ => DeviceError::Status(code),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, DeviceError::Unauthorized(_))
    }
}

/// Flap animation the device plays while transitioning to a new grid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WriteOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_interval_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_size: Option<u32>,
}

/// A board reachable for reads and writes.
///
/// Implementations hold no layering state of their own; the coordinator
/// serializes every call against a single device.
pub trait BoardDevice: Send + Sync {
    /// Current grid, or `None` when the device answered without one.
    fn read_message(&self) -> impl Future<Output = Result<Option<CharacterGrid>, DeviceError>> + Send;

    /// Replace the board contents.
    fn write_message(
        &self,
        grid: &CharacterGrid,
        options: Option<&WriteOptions>,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(DeviceError::from_status(401).is_auth());
        assert!(DeviceError::from_status(403).is_auth());
        assert!(!DeviceError::from_status(500).is_auth());
        assert_eq!(DeviceError::from_status(503).to_string(), "Device returned HTTP 503");
    }

    #[test]
    fn test_write_options_serialize_sparse() {
        let opts = WriteOptions {
            strategy: Some("column".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&opts).unwrap(), r#"{"strategy":"column"}"#);
    }
}

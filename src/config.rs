//! Client configuration.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```
//! use venue_client::ClientConfig;
//!
//! let json = r#"{ "max_requests": 50, "request_interval_ms": 1000 }"#;
//! let config = ClientConfig::from_json(json).unwrap();
//! assert_eq!(config.max_requests, 50);
//! assert_eq!(config.max_client_version, 151);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::{DEFAULT_MAX_FRAME_SIZE, MAX_CLIENT_VERSION, MIN_CLIENT_VERSION};
use crate::rate_limiter::{DEFAULT_MAX_REQUESTS, DEFAULT_REQUEST_INTERVAL};
use crate::transport::DEFAULT_READ_BUFFER_SIZE;

/// Default time allowed to reach the ready state.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default capacity of the command channel to the session task.
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Requests allowed per interval.
    pub max_requests: usize,
    /// Sliding window length for `max_requests`.
    #[serde(rename = "request_interval_ms", with = "millis")]
    pub request_interval: Duration,
    pub min_client_version: i32,
    pub max_client_version: i32,
    /// Used when `connect` is called without an explicit timeout.
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,
    /// Largest inbound frame body accepted before the connection is dropped.
    pub max_frame_size: u32,
    pub read_buffer_size: usize,
    pub command_capacity: usize,
    /// Sent with the start-API request to servers that support it.
    pub optional_capabilities: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            min_client_version: MIN_CLIENT_VERSION,
            max_client_version: MAX_CLIENT_VERSION,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            optional_capabilities: String::new(),
        }
    }
}

impl ClientConfig {
    /// Load a configuration from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

//! Session and link configuration, overridable through environment variables.
//!
//! | Variable           | Default        |
//! |--------------------|----------------|
//! | `HVCP_PORT`        | `/dev/ttyUSB0` |
//! | `HVCP_BAUD`        | `921600`       |
//! | `HVCP_TIMEOUT_MS`  | `2000`         |
//! | `HVCP_MAX_PAYLOAD` | `1048576`      |

use std::time::Duration;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 921_600;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Largest payload accepted from a response header. The biggest legitimate
/// response (a full 320x240 image plus records) is well below this.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Per-read timeout for every framing step.
    pub read_timeout: Duration,
    pub max_payload_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_TIMEOUT,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            read_timeout: Duration::from_millis(read_env_u64(
                "HVCP_TIMEOUT_MS",
                DEFAULT_TIMEOUT.as_millis() as u64,
            )),
            max_payload_len: read_env_u64("HVCP_MAX_PAYLOAD", DEFAULT_MAX_PAYLOAD_LEN as u64)
                as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SerialConfig {
    pub fn from_env() -> Self {
        Self {
            port: read_env_string("HVCP_PORT", DEFAULT_PORT),
            baud_rate: read_env_u32("HVCP_BAUD", DEFAULT_BAUD_RATE),
            timeout: Duration::from_millis(read_env_u64(
                "HVCP_TIMEOUT_MS",
                DEFAULT_TIMEOUT.as_millis() as u64,
            )),
        }
    }
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    parse_u64(std::env::var(name).ok(), default)
}

fn read_env_u32(name: &str, default: u32) -> u32 {
    parse_u32(std::env::var(name).ok(), default)
}

fn read_env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_u64(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

fn parse_u32(value: Option<String>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

use std::{fmt, path::PathBuf, time::Duration};

use anyhow::{Context, Result};

/// Device address used for snapshots when the event doesn't carry one.
pub const DEFAULT_DEVICE_IP: &str = "192.168.3.68";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub device: DeviceConfig,
    pub resolver: ResolverConfig,
}

/// How to reach the door camera.
#[derive(Clone)]
pub struct DeviceConfig {
    pub username: String,
    pub password: String,
    pub default_ip: String,
    pub timeout: Duration,
}

// Keeps the password out of logs.
impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("default_ip", &self.default_ip)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// How to run the face recognition program.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub program: String,
    /// Leading arguments, the snapshot path is appended after them.
    pub args: Vec<String>,
    pub timeout: Duration,
    pub snapshot_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let millis = |key: &str, default: &str| -> Result<Duration> {
            let value = var(key, default);
            let millis = value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{key} must be a number of milliseconds, got '{value}'"))?;
            Ok(Duration::from_millis(millis))
        };

        let port = var("PORT", "3000");
        let port = port
            .trim()
            .parse::<u16>()
            .with_context(|| format!("PORT must be a valid port number, got '{port}'"))?;

        Ok(Self {
            port,
            device: DeviceConfig {
                username: var("CAMERA_USER", ""),
                password: var("CAMERA_PASS", ""),
                default_ip: var("CAMERA_DEFAULT_IP", DEFAULT_DEVICE_IP),
                timeout: millis("CAMERA_TIMEOUT_MS", "5000")?,
            },
            resolver: ResolverConfig {
                program: var("FACE_RESOLVER_PROGRAM", "python3"),
                args: var("FACE_RESOLVER_ARGS", "-u face_recognition.py")
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect(),
                timeout: millis("FACE_RESOLVER_TIMEOUT_MS", "15000")?,
                snapshot_dir: lookup("SNAPSHOT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(std::env::temp_dir),
            },
        })
    }
}

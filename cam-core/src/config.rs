/// Device configuration structures that can be tested independently
///
/// Everything here is compiled into the firmware; nothing is persisted.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    pub network: NetworkConfig,
    pub pins: PinConfig,
    pub camera: CameraConfig,
    pub server: ServerConfig,
    pub input: InputConfig,
    /// Pause between tearing down the serving tasks and starting the update listener
    pub shutdown_grace_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            pins: PinConfig::default(),
            camera: CameraConfig::default(),
            server: ServerConfig::default(),
            input: InputConfig::default(),
            shutdown_grace_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub hostname: String,
    pub retry: RetryPolicy,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            hostname: "esp32-cam".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// GPIO assignments for the AI-Thinker ESP32-CAM board
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinConfig {
    pub flash_led: u8,
    /// Red LED on the back of the board, active low
    pub status_led: u8,
    pub button: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            flash_led: 4,
            status_led: 33,
            button: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FrameSize {
    Qqvga,
    Qvga,
    Vga,
    Svga,
    Xga,
    Sxga,
    Uxga,
}

impl FrameSize {
    pub fn dimensions(self) -> (u16, u16) {
        match self {
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qvga => (320, 240),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraConfig {
    pub frame_size: FrameSize,
    /// 10-63, lower is better quality and bigger frames
    pub jpeg_quality: u8,
    pub xclk_freq_hz: u32,
    pub frame_buffers: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        // QVGA keeps latency low for the remote frame consumer
        Self {
            frame_size: FrameSize::Qvga,
            jpeg_quality: 15,
            xclk_freq_hz: 20_000_000,
            frame_buffers: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub command_port: u16,
    pub stream_port: u16,
    pub stream_path: String,
    pub update_port: u16,
    /// Sleep of the command server task between stop-flag checks
    pub yield_ms: u64,
    /// Delay between frames of the legacy `/` multipart stream
    pub legacy_frame_interval_ms: u64,
    pub stream_frame_interval_ms: u64,
    /// A stream viewer that accepts no data for this long is dropped
    pub stream_write_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command_port: 80,
            stream_port: 8554,
            stream_path: "/mjpeg/1".to_string(),
            update_port: 8080,
            yield_ms: 10,
            legacy_frame_interval_ms: 150,
            stream_frame_interval_ms: 100,
            stream_write_timeout_ms: 2000,
        }
    }
}

impl ServerConfig {
    pub fn yield_interval(&self) -> Duration {
        Duration::from_millis(self.yield_ms)
    }

    pub fn legacy_frame_interval(&self) -> Duration {
        Duration::from_millis(self.legacy_frame_interval_ms)
    }

    pub fn stream_frame_interval(&self) -> Duration {
        Duration::from_millis(self.stream_frame_interval_ms)
    }

    pub fn stream_write_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_write_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputConfig {
    pub debounce_ms: u64,
    pub double_click_ms: u64,
    pub long_press_ms: u64,
    /// Main loop cadence; presses shorter than this can be missed
    pub poll_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            double_click_ms: 400,
            long_press_ms: 800,
            poll_interval_ms: 100,
        }
    }
}

impl InputConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Upper bound on the main loop cadence for reliable click detection
pub const MAX_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptySsid,
    InvalidJpegQuality(u8),
    NoFrameBuffers,
    DoubleClickWindowTooShort { debounce_ms: u64, double_click_ms: u64 },
    PollIntervalTooSlow(u64),
    InvalidStreamPath(String),
    PortConflict(u16),
    ZeroWriteTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptySsid => write!(f, "WiFi SSID cannot be empty"),
            ConfigError::InvalidJpegQuality(q) => {
                write!(f, "JPEG quality {} outside of 10..=63", q)
            }
            ConfigError::NoFrameBuffers => write!(f, "camera needs at least one frame buffer"),
            ConfigError::DoubleClickWindowTooShort {
                debounce_ms,
                double_click_ms,
            } => write!(
                f,
                "double click window {}ms must be longer than debounce {}ms",
                double_click_ms, debounce_ms
            ),
            ConfigError::PollIntervalTooSlow(ms) => write!(
                f,
                "poll interval {}ms exceeds {}ms, button presses would be missed",
                ms, MAX_POLL_INTERVAL_MS
            ),
            ConfigError::InvalidStreamPath(path) => {
                write!(f, "stream path '{}' must start with '/'", path)
            }
            ConfigError::PortConflict(port) => {
                write!(f, "command server and stream server both use port {}", port)
            }
            ConfigError::ZeroWriteTimeout => write!(f, "stream write timeout must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl DeviceConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.wifi_ssid.is_empty() {
            return Err(ConfigError::EmptySsid);
        }

        if !(10..=63).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::InvalidJpegQuality(self.camera.jpeg_quality));
        }
        if self.camera.frame_buffers == 0 {
            return Err(ConfigError::NoFrameBuffers);
        }

        if self.input.double_click_ms <= self.input.debounce_ms {
            return Err(ConfigError::DoubleClickWindowTooShort {
                debounce_ms: self.input.debounce_ms,
                double_click_ms: self.input.double_click_ms,
            });
        }
        if self.input.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::PollIntervalTooSlow(self.input.poll_interval_ms));
        }

        if !self.server.stream_path.starts_with('/') {
            return Err(ConfigError::InvalidStreamPath(self.server.stream_path.clone()));
        }
        if self.server.command_port == self.server.stream_port {
            return Err(ConfigError::PortConflict(self.server.command_port));
        }
        if self.server.stream_write_timeout_ms == 0 {
            return Err(ConfigError::ZeroWriteTimeout);
        }

        Ok(())
    }
}

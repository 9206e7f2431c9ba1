//! Camera Core - Hardware-independent logic for the ESP32-CAM stream firmware
//!
//! This crate contains the button, mode, routing and streaming logic so it
//! can be tested on the host platform without an ESP32 board.

pub mod announce;
pub mod command;
pub mod config;
pub mod frame;
pub mod gesture;
pub mod mjpeg;
pub mod mode;
pub mod retry;
pub mod routes;
pub mod signal;
pub mod update;
pub mod viewer;

pub use command::{CommandHandler, Exchange, FlashOutput, PinError, Served};
pub use config::{ConfigError, DeviceConfig};
pub use frame::{CaptureError, Frame, FrameSource};
pub use gesture::{ClickDetector, ClickTiming, Gesture};
pub use mjpeg::{ResponseWriter, StreamEnd, StreamSummary};
pub use mode::{
    CommandService, DeviceMode, ModeController, ServiceError, StreamingService, SystemControl,
    Transition, UpdateListener, UpdatePoll,
};
pub use retry::RetryPolicy;
pub use routes::{Method, Route};
pub use signal::{join_within, StopSignal};
pub use viewer::TcpViewer;

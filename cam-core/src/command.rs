/// Command server request handling
///
/// `CommandHandler` owns the flash output and a camera handle and serves
/// one resolved request at a time. The HTTP binding only has to provide an
/// `Exchange` that can open a response and hand back a body writer.
use std::fmt;
use std::time::Duration;

use crate::frame::FrameSource;
use crate::mjpeg::{self, ResponseWriter, StreamSummary};
use crate::routes::{self, Method, Route};
use crate::signal::StopSignal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinError {
    pub pin: u8,
    pub reason: String,
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}: {}", self.pin, self.reason)
    }
}

impl std::error::Error for PinError {}

/// The flash LED output. Written, never read back.
pub trait FlashOutput {
    fn set_flash(&mut self, on: bool) -> Result<(), PinError>;
}

/// One pending HTTP request, before the response head has been sent
pub trait Exchange {
    type Error: fmt::Debug;
    type Writer: ResponseWriter<Error = Self::Error>;

    /// Whether the peer is still there before anything is sent. Exchanges
    /// that cannot tell report `true`; the first failed body write then
    /// marks the client as gone.
    fn is_open(&self) -> bool {
        true
    }

    fn respond(self, status: u16, headers: &[(&str, &str)]) -> Result<Self::Writer, Self::Error>;
}

/// What a request ended up doing, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Text(u16),
    Jpeg(usize),
    Stream(StreamSummary),
    /// Peer left before the response was complete
    Aborted,
}

pub struct CommandHandler<F, C> {
    flash: F,
    camera: C,
    frame_interval: Duration,
    stop: StopSignal,
}

impl<F, C> CommandHandler<F, C>
where
    F: FlashOutput,
    C: FrameSource,
{
    pub fn new(flash: F, camera: C, frame_interval: Duration, stop: StopSignal) -> Self {
        Self {
            flash,
            camera,
            frame_interval,
            stop,
        }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn handle<X: Exchange>(&mut self, method: Method, uri: &str, exchange: X) -> Result<Served, X::Error> {
        match Route::resolve(method, uri) {
            Some(Route::FlashOn) => self.switch_flash(true, exchange),
            Some(Route::FlashOff) => self.switch_flash(false, exchange),
            Some(Route::Snapshot) => self.snapshot(exchange),
            Some(Route::MjpegStream) => self.stream(exchange),
            None => {
                log::debug!("No route for {:?} {}", method, uri);
                text_reply(exchange, 404, routes::NOT_FOUND_BODY)
            }
        }
    }

    fn switch_flash<X: Exchange>(&mut self, on: bool, exchange: X) -> Result<Served, X::Error> {
        if let Err(e) = self.flash.set_flash(on) {
            log::error!("Failed to drive flash: {}", e);
        }
        let body = if on {
            routes::FLASH_ON_BODY
        } else {
            routes::FLASH_OFF_BODY
        };
        log::info!("CMD: {}", body);
        text_reply(exchange, 200, body)
    }

    fn snapshot<X: Exchange>(&mut self, exchange: X) -> Result<Served, X::Error> {
        let frame = match self.camera.capture() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Snapshot failed: {}", e);
                return text_reply(exchange, 500, "Camera capture failed");
            }
        };

        if !exchange.is_open() {
            log::debug!("Snapshot client gone, dropping {} byte frame", frame.len());
            return Ok(Served::Aborted);
        }

        let length = frame.len().to_string();
        let mut writer = exchange.respond(
            200,
            &[
                ("Content-Type", routes::IMAGE_JPEG),
                ("Content-Disposition", routes::SNAPSHOT_DISPOSITION),
                ("Content-Length", length.as_str()),
            ],
        )?;
        if let Err(e) = writer.write_all(frame.as_bytes()) {
            log::debug!("Snapshot client gone mid-body: {:?}", e);
            return Ok(Served::Aborted);
        }
        Ok(Served::Jpeg(frame.len()))
    }

    fn stream<X: Exchange>(&mut self, exchange: X) -> Result<Served, X::Error> {
        let mut writer = exchange.respond(
            200,
            &[
                ("Content-Type", mjpeg::STREAM_CONTENT_TYPE),
                ("Cache-Control", "no-cache"),
            ],
        )?;
        log::info!("Preview stream started");
        let summary = mjpeg::stream_frames(&mut self.camera, &mut writer, self.frame_interval, &self.stop);
        log::info!(
            "Preview stream ended ({:?}) after {} frames",
            summary.end,
            summary.frames_sent
        );
        Ok(Served::Stream(summary))
    }
}

fn text_reply<X: Exchange>(exchange: X, status: u16, body: &str) -> Result<Served, X::Error> {
    let mut writer = exchange.respond(status, &[("Content-Type", routes::TEXT_PLAIN)])?;
    writer.write_all(body.as_bytes())?;
    Ok(Served::Text(status))
}

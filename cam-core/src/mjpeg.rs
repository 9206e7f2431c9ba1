/// Multipart JPEG ("MJPEG over HTTP") framing and the shared stream loop
///
/// Used by both the legacy `/` preview on the command server and the
/// dedicated streaming service.
use std::fmt;
use std::thread;
use std::time::Duration;

use crate::frame::{Frame, FrameSource};
use crate::signal::StopSignal;

pub const BOUNDARY: &str = "frame";
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";
pub const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
pub const PART_TRAILER: &[u8] = b"\r\n";

/// Response head for raw socket viewers of the streaming service
pub const STREAM_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: multipart/x-mixed-replace; boundary=frame\r\n\
Cache-Control: no-cache\r\n\
Connection: close\r\n\r\n";

pub const NOT_FOUND_RESPONSE: &[u8] = b"HTTP/1.1 404 Not Found\r\n\
Content-Type: text/plain\r\n\
Content-Length: 9\r\n\
Connection: close\r\n\r\n\
Not Found";

/// Sink for an in-flight HTTP response body
pub trait ResponseWriter {
    type Error: fmt::Debug;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Whether the peer is still connected. Writers that cannot tell
    /// report `true` and rely on write errors instead.
    fn is_open(&self) -> bool {
        true
    }
}

/// Write one multipart part: boundary header, JPEG bytes, CRLF
pub fn write_part<W: ResponseWriter + ?Sized>(writer: &mut W, frame: &Frame) -> Result<(), W::Error> {
    writer.write_all(PART_HEADER)?;
    writer.write_all(frame.as_bytes())?;
    writer.write_all(PART_TRAILER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    ClientGone,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames_sent: u32,
    pub capture_failures: u32,
    pub end: StreamEnd,
}

/// Push frames until the viewer leaves or `stop` is raised.
///
/// Liveness is checked before every capture, so nothing is captured once
/// the disconnect has been seen. Capture failures are skipped.
pub fn stream_frames<C, W>(
    camera: &mut C,
    writer: &mut W,
    interval: Duration,
    stop: &StopSignal,
) -> StreamSummary
where
    C: FrameSource + ?Sized,
    W: ResponseWriter + ?Sized,
{
    let mut frames_sent = 0u32;
    let mut capture_failures = 0u32;

    let end = loop {
        if stop.is_raised() {
            break StreamEnd::Stopped;
        }
        if !writer.is_open() {
            break StreamEnd::ClientGone;
        }

        match camera.capture() {
            Ok(frame) => {
                if let Err(e) = write_part(writer, &frame) {
                    log::debug!("Stream write failed after {} frames: {:?}", frames_sent, e);
                    break StreamEnd::ClientGone;
                }
                frames_sent = frames_sent.wrapping_add(1);
            }
            Err(e) => {
                capture_failures = capture_failures.saturating_add(1);
                log::warn!("Camera capture failed: {}", e);
            }
        }

        if !interval.is_zero() {
            thread::sleep(interval);
        }
    };

    StreamSummary {
        frames_sent,
        capture_failures,
        end,
    }
}

/// True once the request head terminator has been received
pub fn head_complete(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n")
}

/// Method and target of an HTTP request line, e.g. `("GET", "/mjpeg/1")`
pub fn request_line(head: &[u8]) -> Option<(&str, &str)> {
    let end = head.windows(2).position(|w| w == b"\r\n").unwrap_or(head.len());
    let line = std::str::from_utf8(&head[..end]).ok()?;
    let mut parts = line.split_ascii_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    parts.next()?.starts_with("HTTP/").then_some((method, target))
}

/// Whether a raw request asks for the stream published at `path`
pub fn is_stream_request(head: &[u8], path: &str) -> bool {
    match request_line(head) {
        Some(("GET", target)) => target.split_once('?').map_or(target, |(p, _)| p) == path,
        _ => false,
    }
}

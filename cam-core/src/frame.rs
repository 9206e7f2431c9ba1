/// Captured JPEG frames and the camera abstraction
use std::fmt;

/// One encoded JPEG image. Consumers copy or transmit it and drop it;
/// nothing keeps frames around.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// JPEG streams start with the SOI marker
    pub fn has_jpeg_marker(&self) -> bool {
        self.data.starts_with(&[0xFF, 0xD8])
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("len", &self.data.len()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// Driver returned no frame buffer
    NoFrame,
    /// Driver returned an empty buffer
    Empty,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoFrame => write!(f, "camera returned no frame buffer"),
            CaptureError::Empty => write!(f, "camera returned an empty frame"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Anything that can produce JPEG frames on demand
///
/// # Implementations
/// - **Production:** `EspCamera` (esp32-camera driver)
/// - **Testing:** scripted fakes in the test modules
pub trait FrameSource {
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        (**self).capture()
    }
}

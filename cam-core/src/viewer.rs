/// Raw TCP viewer of the streaming service
use std::io::{self, ErrorKind, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::mjpeg::ResponseWriter;

/// Viewer socket after the request head has been read.
///
/// Liveness is a non-blocking peek for FIN. A write that cannot make
/// progress within the write timeout fails, so a viewer that stays
/// connected but stops reading ends the stream like a hang-up.
pub struct TcpViewer {
    stream: TcpStream,
}

impl TcpViewer {
    pub fn new(stream: TcpStream, write_timeout: Duration) -> io::Result<Self> {
        stream.set_nonblocking(false)?;
        stream.set_write_timeout(Some(write_timeout))?;
        Ok(Self { stream })
    }

    fn peer_closed(&self) -> bool {
        if self.stream.set_nonblocking(true).is_err() {
            return true;
        }
        let mut buf = [0u8; 1];
        let closed = match self.stream.peek(&mut buf) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(_) => true,
        };
        closed || self.stream.set_nonblocking(false).is_err()
    }
}

impl ResponseWriter for TcpViewer {
    type Error = io::Error;

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    fn is_open(&self) -> bool {
        !self.peer_closed()
    }
}

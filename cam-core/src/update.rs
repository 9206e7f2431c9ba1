/// Firmware upload bookkeeping for the update listener
///
/// Tracks size, progress and SHA-256 of one incoming image. Writing to the
/// OTA partition is left to the firmware; this only decides whether the
/// bytes seen so far are acceptable.
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

pub const MAX_IMAGE_SIZE: usize = 4 * 1024 * 1024;
pub const CHUNK_SIZE: usize = 4096;
pub const DIGEST_HEADER: &str = "X-Firmware-Sha256";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    MissingLength,
    EmptyImage,
    TooLarge { size: usize, max: usize },
    InvalidDigest(String),
    Overrun { expected: usize, received: usize },
    Incomplete { expected: usize, received: usize },
    DigestMismatch { expected: String, actual: String },
    Flash(String),
}

impl UpdateError {
    /// HTTP status reported to the uploader
    pub fn status_code(&self) -> u16 {
        match self {
            UpdateError::Flash(_) => 500,
            _ => 400,
        }
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::MissingLength => write!(f, "Content-Length header required"),
            UpdateError::EmptyImage => write!(f, "Firmware image is empty"),
            UpdateError::TooLarge { size, max } => {
                write!(f, "Firmware image of {} bytes exceeds {} bytes", size, max)
            }
            UpdateError::InvalidDigest(value) => {
                write!(f, "Invalid {} value '{}'", DIGEST_HEADER, value)
            }
            UpdateError::Overrun { expected, received } => {
                write!(f, "Received {} bytes, expected {}", received, expected)
            }
            UpdateError::Incomplete { expected, received } => {
                write!(f, "Upload ended after {} of {} bytes", received, expected)
            }
            UpdateError::DigestMismatch { expected, actual } => {
                write!(f, "SHA-256 mismatch: expected {}, got {}", expected, actual)
            }
            UpdateError::Flash(reason) => write!(f, "Flash write failed: {}", reason),
        }
    }
}

impl std::error::Error for UpdateError {}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn parse_digest(value: &str) -> Result<[u8; 32], UpdateError> {
    let value = value.trim();
    let invalid = || UpdateError::InvalidDigest(value.to_string());
    if value.len() != 64 || !value.is_ascii() {
        return Err(invalid());
    }
    let mut digest = [0u8; 32];
    for (i, byte) in digest.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&value[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
    }
    Ok(digest)
}

pub struct UpdateSession {
    expected: usize,
    received: usize,
    hasher: Sha256,
    expected_digest: Option<[u8; 32]>,
    last_milestone: u8,
}

impl UpdateSession {
    /// Validate the request head before anything is written to flash
    pub fn begin(content_length: Option<usize>, digest: Option<&str>) -> Result<Self, UpdateError> {
        let expected = content_length.ok_or(UpdateError::MissingLength)?;
        if expected == 0 {
            return Err(UpdateError::EmptyImage);
        }
        if expected > MAX_IMAGE_SIZE {
            return Err(UpdateError::TooLarge {
                size: expected,
                max: MAX_IMAGE_SIZE,
            });
        }
        let expected_digest = digest.map(parse_digest).transpose()?;

        Ok(Self {
            expected,
            received: 0,
            hasher: Sha256::new(),
            expected_digest,
            last_milestone: 0,
        })
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn remaining(&self) -> usize {
        self.expected - self.received
    }

    pub fn progress(&self) -> u8 {
        ((self.received as u64 * 100) / self.expected as u64) as u8
    }

    /// Account for one chunk. Returns the 10% milestone just crossed, if any.
    pub fn record(&mut self, chunk: &[u8]) -> Result<Option<u8>, UpdateError> {
        let received = self.received + chunk.len();
        if received > self.expected {
            return Err(UpdateError::Overrun {
                expected: self.expected,
                received,
            });
        }
        self.received = received;
        self.hasher.update(chunk);

        let milestone = self.progress() / 10 * 10;
        if milestone > self.last_milestone {
            self.last_milestone = milestone;
            Ok(Some(milestone))
        } else {
            Ok(None)
        }
    }

    /// Check completeness and digest. Returns the image SHA-256 as hex.
    pub fn finish(self) -> Result<String, UpdateError> {
        if self.received != self.expected {
            return Err(UpdateError::Incomplete {
                expected: self.expected,
                received: self.received,
            });
        }
        let actual: [u8; 32] = self.hasher.finalize().into();
        if let Some(expected) = self.expected_digest {
            if expected != actual {
                return Err(UpdateError::DigestMismatch {
                    expected: to_hex(&expected),
                    actual: to_hex(&actual),
                });
            }
        }
        Ok(to_hex(&actual))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UpdateStatus {
    Idle,
    Receiving { progress: u8 },
    Complete,
    Failed { reason: String },
}

/// Body of `GET /api/system` on the update listener
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub version: String,
    pub partition: String,
    pub mode: String,
    pub update: UpdateStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_size_bounds() {
        assert_eq!(
            UpdateSession::begin(None, None).err(),
            Some(UpdateError::MissingLength)
        );
        assert_eq!(
            UpdateSession::begin(Some(0), None).err(),
            Some(UpdateError::EmptyImage)
        );
        assert!(matches!(
            UpdateSession::begin(Some(MAX_IMAGE_SIZE + 1), None),
            Err(UpdateError::TooLarge { .. })
        ));
        assert!(UpdateSession::begin(Some(MAX_IMAGE_SIZE), None).is_ok());
    }

    #[test]
    fn test_progress_milestones() {
        let mut session = UpdateSession::begin(Some(1000), None).unwrap();
        let mut milestones = Vec::new();
        for chunk in vec![0u8; 1000].chunks(30) {
            if let Some(m) = session.record(chunk).unwrap() {
                milestones.push(m);
            }
        }
        assert_eq!(milestones, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert_eq!(session.progress(), 100);
        assert_eq!(session.remaining(), 0);
    }

    #[test]
    fn test_large_chunk_reports_highest_milestone() {
        let mut session = UpdateSession::begin(Some(100), None).unwrap();
        assert_eq!(session.record(&[0; 45]).unwrap(), Some(40));
        assert_eq!(session.record(&[0; 4]).unwrap(), None);
        assert_eq!(session.record(&[0; 51]).unwrap(), Some(100));
    }

    #[test]
    fn test_digest_match() {
        let mut session = UpdateSession::begin(Some(3), Some(ABC_SHA256)).unwrap();
        session.record(b"abc").unwrap();
        assert_eq!(session.finish().unwrap(), ABC_SHA256);
    }

    #[test]
    fn test_digest_mismatch_rejected() {
        let mut session = UpdateSession::begin(Some(3), Some(ABC_SHA256)).unwrap();
        session.record(b"abd").unwrap();
        let err = session.finish().unwrap_err();
        assert!(matches!(err, UpdateError::DigestMismatch { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_invalid_digest_header() {
        assert!(matches!(
            UpdateSession::begin(Some(3), Some("abc")),
            Err(UpdateError::InvalidDigest(_))
        ));
        let not_hex = "zz".repeat(32);
        assert!(parse_digest(&not_hex).is_err());
        assert_eq!(to_hex(&parse_digest(&ABC_SHA256.to_uppercase()).unwrap()), ABC_SHA256);
    }

    #[test]
    fn test_overrun_and_incomplete() {
        let mut session = UpdateSession::begin(Some(4), None).unwrap();
        assert_eq!(
            session.record(&[0; 5]),
            Err(UpdateError::Overrun {
                expected: 4,
                received: 5
            })
        );
        session.record(&[0; 2]).unwrap();
        assert_eq!(
            session.finish(),
            Err(UpdateError::Incomplete {
                expected: 4,
                received: 2
            })
        );
    }

    #[test]
    fn test_flash_errors_are_server_errors() {
        assert_eq!(UpdateError::Flash("write".into()).status_code(), 500);
    }

    #[test]
    fn test_system_info_json() {
        let info = SystemInfo {
            hostname: "esp32-cam".into(),
            version: "0.1.0".into(),
            partition: "ota_0".into(),
            mode: "update".into(),
            update: UpdateStatus::Receiving { progress: 40 },
        };
        let value: serde_json::Value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["hostname"], "esp32-cam");
        assert_eq!(value["mode"], "update");
        assert_eq!(value["update"]["state"], "receiving");
        assert_eq!(value["update"]["progress"], 40);
    }
}

//! Types for NFC tag scanning

use std::fmt;

/// Longest NFCID the scanner accepts (ISO14443A double-size UID)
pub const MAX_UID_LEN: usize = 7;

/// Unique identifier of a detected tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagUid {
    bytes: [u8; MAX_UID_LEN],
    len: u8,
}

impl TagUid {
    /// Build a UID from raw bytes. Fails when empty or longer than [`MAX_UID_LEN`].
    pub fn new(uid: &[u8]) -> Result<Self, NfcError> {
        if uid.is_empty() || uid.len() > MAX_UID_LEN {
            return Err(NfcError::InvalidResponse(format!(
                "UID length {} outside 1..={}",
                uid.len(),
                MAX_UID_LEN
            )));
        }

        let mut bytes = [0u8; MAX_UID_LEN];
        bytes[..uid.len()].copy_from_slice(uid);
        Ok(Self {
            bytes,
            len: uid.len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload published for this tag, e.g. `"04 A3 FF 12"`
    pub fn to_hex(&self) -> String {
        bytes_to_hex(self.as_bytes())
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Version information reported by `GetFirmwareVersion`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// IC type, 0x32 for a PN532
    pub ic: u8,
    pub version: u8,
    pub revision: u8,
    /// Supported protocol bitmask
    pub support: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PN5{:X} firmware {}.{}", self.ic, self.version, self.revision)
    }
}

/// Errors that can occur while talking to the NFC reader
#[derive(Debug, thiserror::Error)]
pub enum NfcError {
    /// Transport layer error (I2C, serial, etc.)
    #[error("transport error: {0}")]
    Transport(String),
    /// Invalid parameter passed to a function
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Invalid response received from the reader
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The reader did not answer in time
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    /// The reader answered with an application error frame
    #[error("reader reported application error")]
    Application,
}

/// Convert bytes to uppercase hex pairs separated by single spaces
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

use embedded_hal::digital::OutputPin;
use log::{debug, error, warn};
use std::time::{Duration, Instant};

use crate::transport::Pn532Transport;
use crate::types::{FirmwareVersion, NfcError, TagUid};

pub struct Pn532<T: Pn532Transport> {
    transport: T,
}

impl<T: Pn532Transport> Pn532<T> {
    // Frame constants
    const PREAMBLE: u8 = 0x00;
    const START_CODE: [u8; 2] = [0x00, 0xFF];
    const POSTAMBLE: u8 = 0x00;
    const HOST_TO_PN532: u8 = 0xD4;
    const PN532_TO_HOST: u8 = 0xD5;
    const ERROR_TFI: u8 = 0x7F;
    const ACK: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];

    // Command codes
    const GET_FIRMWARE_VERSION: u8 = 0x02;
    const SAM_CONFIGURATION: u8 = 0x14;
    const IN_LIST_PASSIVE_TARGET: u8 = 0x4A;

    // InListPassiveTarget baud rate / modulation: 106 kbps type A (ISO14443A)
    const BRTY_ISO14443A: u8 = 0x00;

    const ACK_TIMEOUT_MS: u32 = 100;
    const RESPONSE_TIMEOUT_MS: u32 = 1000;
    const READ_SLICE_MS: u32 = 50;

    /// Create a new reader instance with the given transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Get firmware version. Fails when no PN532 answers.
    pub fn get_firmware_version(&mut self) -> Result<FirmwareVersion, NfcError> {
        let data = self.exec(Self::GET_FIRMWARE_VERSION, &[])?;

        match data.as_slice() {
            [ic, version, revision, support, ..] => Ok(FirmwareVersion {
                ic: *ic,
                version: *version,
                revision: *revision,
                support: *support,
            }),
            _ => Err(NfcError::InvalidResponse(format!(
                "Firmware response too short: {:02X?}",
                data
            ))),
        }
    }

    /// Configure the Secure Access Module for normal mode with the IRQ line enabled.
    /// Must run once before the first target detection.
    pub fn sam_config(&mut self) -> Result<(), NfcError> {
        // normal mode, virtual card timeout 20 * 50 ms, use IRQ pin
        self.exec(Self::SAM_CONFIGURATION, &[0x01, 0x14, 0x01])?;
        Ok(())
    }

    /// Ask the reader to look for one ISO14443A target without waiting for it.
    ///
    /// Only the ACK is read here. The reader pulls its IRQ line low once a target
    /// is in the field; collect it with [`Pn532::read_detected_passive_target`].
    pub fn start_passive_target_detection(&mut self) -> Result<(), NfcError> {
        self.send_command(
            Self::IN_LIST_PASSIVE_TARGET,
            &[0x01, Self::BRTY_ISO14443A],
        )
    }

    /// Read the response of a detection started by
    /// [`Pn532::start_passive_target_detection`].
    ///
    /// Returns `Ok(None)` when the reader reports no target.
    pub fn read_detected_passive_target(&mut self) -> Result<Option<TagUid>, NfcError> {
        let data = self.read_response(Self::IN_LIST_PASSIVE_TARGET, Self::RESPONSE_TIMEOUT_MS)?;
        Self::parse_target(&data)
    }

    fn parse_target(data: &[u8]) -> Result<Option<TagUid>, NfcError> {
        let Some(&targets) = data.first() else {
            return Err(NfcError::InvalidResponse("Empty target response".into()));
        };

        match targets {
            0 => return Ok(None),
            1 => {}
            n => {
                return Err(NfcError::InvalidResponse(format!(
                    "Expected at most one target, reader reported {}",
                    n
                )));
            }
        }

        // Tg, SENS_RES (2), SEL_RES, NFCIDLength, NFCID...
        if data.len() < 6 {
            return Err(NfcError::InvalidResponse(format!(
                "Target response too short: {:02X?}",
                data
            )));
        }

        let uid_len = data[5] as usize;
        let uid = data.get(6..6 + uid_len).ok_or_else(|| {
            NfcError::InvalidResponse(format!(
                "NFCID length claims {} bytes but response only has {} bytes",
                uid_len,
                data.len() - 6
            ))
        })?;

        TagUid::new(uid).map(Some)
    }

    fn exec(&mut self, command: u8, params: &[u8]) -> Result<Vec<u8>, NfcError> {
        self.send_command(command, params)?;
        self.read_response(command, Self::RESPONSE_TIMEOUT_MS)
    }

    fn send_command(&mut self, command: u8, params: &[u8]) -> Result<(), NfcError> {
        let frame = Self::create_command(command, params);

        self.transport
            .clear_input()
            .map_err(|e| NfcError::Transport(format!("{:?}", e)))?;
        debug!("Sending command: {:02X?}", frame);
        let written = self
            .transport
            .write(&frame)
            .map_err(|e| NfcError::Transport(format!("{:?}", e)))?;
        debug!("Wrote {} bytes", written);

        self.read_ack()
    }

    fn read_ack(&mut self) -> Result<(), NfcError> {
        let mut ack = [0u8; 6];
        let mut received = 0;
        let start = Instant::now();
        let timeout = Duration::from_millis(Self::ACK_TIMEOUT_MS as u64);

        while received < ack.len() {
            match self.transport.read(&mut ack[received..], Self::READ_SLICE_MS) {
                Ok(bytes_read) if bytes_read > 0 => received += bytes_read,
                Ok(_) => {
                    if start.elapsed() > timeout {
                        return Err(NfcError::Timeout("ACK"));
                    }
                }
                Err(e) => {
                    error!("Read error: {:?}", e);
                    return Err(NfcError::Transport(format!("{:?}", e)));
                }
            }
        }

        if ack == Self::ACK {
            Ok(())
        } else {
            warn!("Unexpected ACK frame: {:02X?}", ack);
            Err(NfcError::InvalidResponse(format!("Invalid ACK: {:02X?}", ack)))
        }
    }

    fn read_response(&mut self, command: u8, timeout_ms: u32) -> Result<Vec<u8>, NfcError> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms as u64);
        let mut buffer = Vec::new();

        loop {
            let mut temp_buf = [0u8; 64];

            match self.transport.read(&mut temp_buf, Self::READ_SLICE_MS) {
                Ok(bytes_read) if bytes_read > 0 => {
                    buffer.extend_from_slice(&temp_buf[..bytes_read]);
                    debug!("Received {} bytes: {:02X?}", bytes_read, &temp_buf[..bytes_read]);

                    if let Some(body) = Self::parse_frame(&buffer)? {
                        return Self::check_response(command, &body);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Read error: {:?}", e);
                    return Err(NfcError::Transport(format!("{:?}", e)));
                }
            }

            if start.elapsed() > timeout {
                return Err(NfcError::Timeout("response"));
            }
        }
    }

    /// Extract TFI + data from the first complete information frame in `buf`.
    /// ACK and NACK frames in front of it are skipped. `Ok(None)` means more bytes are needed.
    pub(crate) fn parse_frame(buf: &[u8]) -> Result<Option<Vec<u8>>, NfcError> {
        let Some(start) = buf.windows(2).position(|w| w == Self::START_CODE) else {
            return Ok(None);
        };
        let rest = &buf[start + 2..];
        if rest.len() < 2 {
            return Ok(None);
        }

        let (len, lcs) = (rest[0], rest[1]);
        if (len, lcs) == (0x00, 0xFF) || (len, lcs) == (0xFF, 0x00) {
            return Self::parse_frame(&rest[2..]);
        }
        if len.wrapping_add(lcs) != 0 {
            return Err(NfcError::InvalidResponse(format!(
                "Length checksum mismatch: LEN={:02X} LCS={:02X}",
                len, lcs
            )));
        }

        let body_end = 2 + len as usize;
        if rest.len() <= body_end {
            return Ok(None);
        }

        let body = &rest[2..body_end];
        let dcs = rest[body_end];
        let sum = body.iter().fold(dcs, |acc, &b| acc.wrapping_add(b));
        if sum != 0 {
            return Err(NfcError::InvalidResponse(format!(
                "Data checksum mismatch in frame {:02X?}",
                &rest[..=body_end]
            )));
        }

        Ok(Some(body.to_vec()))
    }

    fn check_response(command: u8, body: &[u8]) -> Result<Vec<u8>, NfcError> {
        if body == [Self::ERROR_TFI].as_slice() {
            return Err(NfcError::Application);
        }

        if body.len() >= 2 && body[0] == Self::PN532_TO_HOST && body[1] == command.wrapping_add(1) {
            Ok(body[2..].to_vec())
        } else {
            Err(NfcError::InvalidResponse(format!(
                "Unexpected response to command {:02X}: {:02X?}",
                command, body
            )))
        }
    }

    pub(crate) fn create_command(command: u8, params: &[u8]) -> Vec<u8> {
        // LEN counts TFI + command + params
        let len = (params.len() + 2) as u8;
        let lcs = (!len).wrapping_add(1);

        let sum = [Self::HOST_TO_PN532, command]
            .iter()
            .chain(params.iter())
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        let dcs = (!sum).wrapping_add(1);

        let mut cmd = vec![
            Self::PREAMBLE,
            Self::START_CODE[0],
            Self::START_CODE[1],
            len,
            lcs,
            Self::HOST_TO_PN532,
            command,
        ];
        cmd.extend_from_slice(params);
        cmd.push(dcs);
        cmd.push(Self::POSTAMBLE);
        cmd
    }
}

/// Pulse the reader's reset line: high, low for 400 ms, then high with 10 ms to settle.
pub fn hard_reset<P: OutputPin>(reset: &mut P) -> Result<(), NfcError> {
    let transport_err = |e: P::Error| NfcError::Transport(format!("reset line: {:?}", e));

    reset.set_high().map_err(transport_err)?;
    reset.set_low().map_err(transport_err)?;
    std::thread::sleep(Duration::from_millis(400));
    reset.set_high().map_err(transport_err)?;
    std::thread::sleep(Duration::from_millis(10));
    Ok(())
}

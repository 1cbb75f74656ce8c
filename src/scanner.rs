//! Edge-triggered tag scanning with a cooldown between reads

use embedded_hal::digital::InputPin;
use log::{info, warn};
use std::time::{Duration, Instant};

use crate::reader::Pn532;
use crate::transport::Pn532Transport;
use crate::types::{FirmwareVersion, NfcError, TagUid};

/// Where the scanner is in its read cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    /// Detection is armed and the IRQ line is sampled every poll
    Listening,
    /// A read was attempted recently; nothing happens until the cooldown expires
    Cooldown,
}

/// Falling-edge detector over successive level samples
#[derive(Debug, Clone, Copy)]
pub struct EdgeDetector {
    prev_high: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self { prev_high: true }
    }

    /// Forget the previous sample and assume the line was idle (high)
    pub fn reset(&mut self) {
        self.prev_high = true;
    }

    /// Feed one sample; true only on a high-to-low transition
    pub fn sample(&mut self, high: bool) -> bool {
        let falling = self.prev_high && !high;
        self.prev_high = high;
        falling
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// PN532 tag scanner driven by a level-polled IRQ line.
///
/// The PN532 pulls IRQ low when a response is ready. The line is sampled once
/// per [`TagScanner::poll`]; no hardware interrupt is wired.
pub struct TagScanner<T: Pn532Transport, P: InputPin> {
    reader: Pn532<T>,
    irq: P,
    edge: EdgeDetector,
    state: ScannerState,
    last_attempt: Option<Instant>,
    cooldown: Duration,
}

impl<T: Pn532Transport, P: InputPin> TagScanner<T, P> {
    pub fn new(reader: Pn532<T>, irq: P, cooldown: Duration) -> Self {
        Self {
            reader,
            irq,
            edge: EdgeDetector::new(),
            state: ScannerState::Cooldown,
            last_attempt: None,
            cooldown,
        }
    }

    /// Bring the reader up and start listening.
    ///
    /// A reader that does not report its firmware version is unusable, so the
    /// error is returned for the caller to treat as fatal.
    pub fn begin(&mut self) -> Result<FirmwareVersion, NfcError> {
        let firmware = self.reader.get_firmware_version()?;
        info!("Found chip PN5{:X}", firmware.ic);
        info!("Firmware ver. {}.{}", firmware.version, firmware.revision);

        self.reader.sam_config()?;
        self.arm()?;
        Ok(firmware)
    }

    /// Reset edge detection and ask the reader to look for a card.
    pub fn arm(&mut self) -> Result<(), NfcError> {
        self.edge.reset();
        self.reader.start_passive_target_detection()?;
        self.state = ScannerState::Listening;
        info!("Present an ISO14443A card ...");
        Ok(())
    }

    /// Sample the IRQ line once. True on a falling edge.
    pub fn poll_edge(&mut self) -> bool {
        match self.irq.is_high() {
            Ok(high) => self.edge.sample(high),
            Err(e) => {
                warn!("IRQ line read failed: {:?}", e);
                false
            }
        }
    }

    /// Collect the detected target after an IRQ edge.
    ///
    /// Success and failure both start the cooldown, timed from `now`.
    pub fn on_edge_detected(&mut self, now: Instant) -> Option<TagUid> {
        let result = self.reader.read_detected_passive_target();
        self.last_attempt = Some(now);
        self.state = ScannerState::Cooldown;

        match result {
            Ok(Some(uid)) => {
                info!("Read successful");
                info!("Card ID HEX Value: {}", uid);
                Some(uid)
            }
            Ok(None) => {
                info!("Read failed (not a card?)");
                None
            }
            Err(e) => {
                warn!("Read failed: {}", e);
                None
            }
        }
    }

    /// True once the cooldown has strictly elapsed since the last read attempt
    pub fn cooldown_expired(&self, now: Instant) -> bool {
        match self.last_attempt {
            Some(at) => now.saturating_duration_since(at) > self.cooldown,
            None => true,
        }
    }

    /// One scanner step of the main loop. Returns a UID when a tag was read.
    pub fn poll(&mut self, now: Instant) -> Option<TagUid> {
        match self.state {
            ScannerState::Cooldown => {
                if self.cooldown_expired(now) {
                    if let Err(e) = self.arm() {
                        // retry after another cooldown instead of hammering the bus
                        warn!("Failed to start detection: {}", e);
                        self.last_attempt = Some(now);
                    }
                }
                None
            }
            ScannerState::Listening => {
                if self.poll_edge() {
                    self.on_edge_detected(now)
                } else {
                    None
                }
            }
        }
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }
}

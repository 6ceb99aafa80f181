//! Serial port handling
//!
//! Port settings and opening for the buzzer controller.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serialport::{DataBits, FlowControl, SerialPort, StopBits};
use tracing::{debug, info};

use crate::{FeedError, Result};

/// Default device name
#[cfg(windows)]
pub const DEFAULT_DEVICE: &str = "COM1";
/// Default device name
#[cfg(not(windows))]
pub const DEFAULT_DEVICE: &str = "/dev/ttyACM0";

/// Default baud rate for the controller
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Write timeout. Frames are at most 257 bytes, so this only trips on a
/// stalled device.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl FromStr for Parity {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N" => Ok(Parity::None),
            "O" => Ok(Parity::Odd),
            "E" => Ok(Parity::Even),
            _ => Err(FeedError::InvalidParity(s.to_string())),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Parity::None => "N",
            Parity::Odd => "O",
            Parity::Even => "E",
        };
        f.write_str(code)
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    /// Device path (e.g., "/dev/ttyACM0" or "COM3")
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits, 5 to 8
    pub data_bits: u8,
    /// Stop bits, 1 or 2
    pub stop_bits: u8,
    /// Parity
    pub parity: Parity,
    /// Pause after opening, for boards that reboot when the port opens
    pub reset_delay: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            reset_delay: Duration::ZERO,
        }
    }
}

impl PortSettings {
    /// Check the framing values without touching the device
    pub fn validate(&self) -> Result<()> {
        data_bits(self.data_bits)?;
        stop_bits(self.stop_bits)?;
        Ok(())
    }
}

impl fmt::Display for PortSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}{}{}",
            self.device, self.baud_rate, self.data_bits, self.parity, self.stop_bits
        )
    }
}

fn data_bits(bits: u8) -> Result<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(FeedError::InvalidDataBits(other)),
    }
}

fn stop_bits(bits: u8) -> Result<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(FeedError::InvalidStopBits(other)),
    }
}

/// Open and configure the device.
///
/// Flow control is off and the modem lines are released. The underlying
/// cause of a failure is only logged at debug level.
pub fn open_port(settings: &PortSettings) -> Result<Box<dyn SerialPort>> {
    let port_error = |reason: String| {
        debug!(device = %settings.device, %reason, "open failed");
        FeedError::PortOpen {
            device: settings.device.clone(),
            reason,
        }
    };

    let bits = data_bits(settings.data_bits)?;
    let stop = stop_bits(settings.stop_bits)?;

    let mut port = serialport::new(settings.device.as_str(), settings.baud_rate)
        .data_bits(bits)
        .stop_bits(stop)
        .parity(settings.parity.into())
        .flow_control(FlowControl::None)
        .timeout(WRITE_TIMEOUT)
        .open()
        .map_err(|e| port_error(e.to_string()))?;

    if let Err(e) = port.write_data_terminal_ready(false) {
        debug!("failed to clear DTR: {} (continuing)", e);
    }
    if let Err(e) = port.write_request_to_send(false) {
        debug!("failed to clear RTS: {} (continuing)", e);
    }

    if !settings.reset_delay.is_zero() {
        info!("Waiting for reset...");
        std::thread::sleep(settings.reset_delay);
        info!("done.");
    }

    debug!(settings = %settings, "port open");
    Ok(port)
}

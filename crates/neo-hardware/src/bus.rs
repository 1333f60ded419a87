//! Servo bus abstraction and the Telemetrix serial implementation.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use serialport::SerialPort;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::HardwareError;

/// Minimum servo pulse width in microseconds.
pub const MIN_PULSE_US: u16 = 544;
/// Maximum servo pulse width in microseconds.
pub const MAX_PULSE_US: u16 = 2400;
/// Line speed of the Telemetrix firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

const SERVO_ATTACH: u8 = 7;
const SERVO_WRITE: u8 = 8;
const SERVO_DETACH: u8 = 9;

/// Commands a servo board understands.
pub trait ServoBus: Send {
    /// Configure `pin` for servo output.
    fn attach(&mut self, pin: u8) -> Result<(), HardwareError>;
    /// Move the servo on `pin` to `angle` degrees.
    fn write(&mut self, pin: u8, angle: u8) -> Result<(), HardwareError>;
    fn detach(&mut self, pin: u8) -> Result<(), HardwareError>;
    /// Flush and stop accepting commands. Closing twice is a no-op.
    fn close(&mut self) -> Result<(), HardwareError>;
}

/// A bus shared by the joints of one arm.
pub type SharedBus = Arc<Mutex<dyn ServoBus>>;

/// Telemetrix-style command framing over a byte stream.
///
/// Every command is sent as `[len, cmd, args..]` where `len` counts the
/// bytes after itself. Device reports are never read.
pub struct TelemetrixBus<S: Read + Write + Send> {
    port: S,
    closed: bool,
}

impl TelemetrixBus<Box<dyn SerialPort>> {
    /// Open a serial port such as `/dev/ttyUSB0` or `COM3` in raw 8N1 mode
    /// at `baud_rate`.
    pub fn open(device: &str, baud_rate: u32) -> Result<Self, HardwareError> {
        let port = serialport::new(device, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|err| HardwareError::BusUnavailable {
                device: device.to_string(),
                source: err.into(),
            })?;
        debug!(baud_rate, "Opened servo bus at {device}");
        Ok(Self::new(port))
    }
}

impl<S: Read + Write + Send> TelemetrixBus<S> {
    pub fn new(port: S) -> Self {
        Self {
            port,
            closed: false,
        }
    }

    /// The underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.port
    }

    fn send(&mut self, command: u8, args: &[u8]) -> Result<(), HardwareError> {
        if self.closed {
            return Err(HardwareError::Closed);
        }
        let len = u8::try_from(args.len() + 1).map_err(|_| {
            HardwareError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "command frame too long",
            ))
        })?;
        let mut frame = Vec::with_capacity(args.len() + 2);
        frame.push(len);
        frame.push(command);
        frame.extend_from_slice(args);
        trace!("servo frame {:02X?}", frame);
        self.port.write_all(&frame)?;
        Ok(())
    }
}

impl<S: Read + Write + Send> ServoBus for TelemetrixBus<S> {
    fn attach(&mut self, pin: u8) -> Result<(), HardwareError> {
        let [min_hi, min_lo] = MIN_PULSE_US.to_be_bytes();
        let [max_hi, max_lo] = MAX_PULSE_US.to_be_bytes();
        self.send(SERVO_ATTACH, &[pin, min_hi, min_lo, max_hi, max_lo])
    }

    fn write(&mut self, pin: u8, angle: u8) -> Result<(), HardwareError> {
        self.send(SERVO_WRITE, &[pin, angle])
    }

    fn detach(&mut self, pin: u8) -> Result<(), HardwareError> {
        self.send(SERVO_DETACH, &[pin])
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.port.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn bus() -> TelemetrixBus<Cursor<Vec<u8>>> {
        TelemetrixBus::new(Cursor::new(Vec::new()))
    }

    #[test]
    fn test_attach_frame() {
        let mut bus = bus();
        bus.attach(9).unwrap();
        assert_eq!(bus.get_ref().get_ref(), &[6, 7, 9, 0x02, 0x20, 0x09, 0x60]);
    }

    #[test]
    fn test_write_and_detach_frames() {
        let mut bus = bus();
        bus.write(10, 90).unwrap();
        bus.detach(10).unwrap();
        assert_eq!(bus.get_ref().get_ref(), &[3, 8, 10, 90, 2, 9, 10]);
    }

    #[test]
    fn test_closed_bus_rejects_commands() {
        let mut bus = bus();
        bus.close().unwrap();
        bus.close().unwrap();
        assert!(matches!(bus.write(9, 0), Err(HardwareError::Closed)));
    }

    #[test]
    fn test_open_missing_device() {
        let err = TelemetrixBus::open("/nonexistent/neo-robot-tty", DEFAULT_BAUD_RATE)
            .err()
            .unwrap();
        assert!(matches!(err, HardwareError::BusUnavailable { .. }));
        assert!(err.to_string().contains("/nonexistent/neo-robot-tty"));
    }

    #[cfg(unix)]
    #[test]
    fn test_open_rejects_non_terminal() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let err = TelemetrixBus::open(&path, DEFAULT_BAUD_RATE).err().unwrap();
        assert!(matches!(err, HardwareError::BusUnavailable { .. }));
    }
}

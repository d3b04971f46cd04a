//! Serial link to the turntable/laser controller.

use crate::motor::MotorChannel;
use crate::source::CaptureError;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

/// Write-only serial channel, 8N1 without flow control.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialChannel {
    /// Open a serial port
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Baud rate (e.g., 9600)
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, CaptureError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()?;

        info!("Opened serial port: {} at {} baud", path, baud_rate);
        Ok(Self {
            port,
            path: path.to_string(),
        })
    }
}

impl MotorChannel for SerialChannel {
    fn send_command(&mut self, payload: &[u8]) -> Result<(), CaptureError> {
        self.port.write_all(payload)?;
        self.port.flush()?;
        debug!(
            "Sent {:?} to {}",
            String::from_utf8_lossy(payload),
            self.path
        );
        Ok(())
    }
}

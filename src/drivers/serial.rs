use std::io::{self, Read, Write};
use std::time::Duration;
use anyhow::{Context, Result};
use log::info;
use serialport::{ClearBuffer, SerialPort};
use crate::config::SerialSettings;
use crate::drivers::{ByteSource, EmgError};
/// Byte source backed by a real serial port.
pub struct SerialSource {
    port_name: String,
    port: Box<dyn SerialPort>,
}
impl SerialSource {
    /// Opens the configured port and flushes anything left in its buffers.
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let port_name = settings
            .port
            .clone()
            .context("no serial port selected")?;
        let port = serialport::new(&port_name, settings.baud_rate)
            .data_bits(settings.data_bits()?)
            .parity(settings.parity.into())
            .stop_bits(settings.stop_bits.into())
            .timeout(Duration::from_millis(settings.timeout_ms))
            .open()
            .with_context(|| format!("failed to open {port_name}"))?;
        port.clear(ClearBuffer::All)
            .with_context(|| format!("failed to flush {port_name}"))?;
        info!("opened {port_name} at {} baud", settings.baud_rate);
        Ok(Self { port_name, port })
    }
}
impl ByteSource for SerialSource {
    fn read_available(&mut self, out: &mut Vec<u8>) -> Result<usize, EmgError> {
        let pending = self.port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(0);
        }
        let start = out.len();
        out.resize(start + pending, 0);
        match self.port.read(&mut out[start..]) {
            Ok(n) => {
                out.truncate(start + n);
                Ok(n)
            }
            Err(err) if is_transient(err.kind()) => {
                out.truncate(start);
                Ok(0)
            }
            Err(err) => {
                out.truncate(start);
                Err(err.into())
            }
        }
    }
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), EmgError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
    fn describe(&self) -> String {
        self.port_name.clone()
    }
}
/// Read outcomes that only mean "nothing right now".
fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
/// Names of the serial ports currently present on the host.
pub fn available_port_names() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(err) => {
            log::warn!("failed to enumerate serial ports: {err}");
            Vec::new()
        }
    }
}

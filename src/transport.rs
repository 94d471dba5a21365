use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, warn};
use serial::core::prelude::*;

use crate::error::Error;

pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// A byte pipe to the reader. Opening is deferred until `connect` so that
/// the baud rate and timeouts can be set first.
pub trait Transport {
    fn open(&mut self, timeout: Duration) -> Result<(), Error>;
    fn close(&mut self);
    fn is_open(&self) -> bool;
    fn is_serial(&self) -> bool;
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Error>;
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), Error>;
    /// Fills `buf` completely or fails; running out of time is `Error::Timeout`.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), Error>;
}

fn read_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout,
        _ => Error::Io(e),
    }
}

pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    port: Option<serial::SystemPort>,
}

impl SerialTransport {
    pub fn new(path: &str) -> SerialTransport {
        SerialTransport {
            path: path.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            port: None,
        }
    }

    fn configure(port: &mut serial::SystemPort, baud: u32) -> Result<(), Error> {
        port.reconfigure(&|settings| {
            settings.set_baud_rate(serial::BaudRate::from_speed(baud as usize))?;
            settings.set_char_size(serial::Bits8);
            settings.set_parity(serial::ParityNone);
            settings.set_stop_bits(serial::Stop1);
            settings.set_flow_control(serial::FlowNone);
            Ok(())
        })
        .map_err(|e| format!("Failed to configure serial port: {}", e))?;
        Ok(())
    }

    fn port(&mut self) -> Result<&mut serial::SystemPort, Error> {
        self.port.as_mut().ok_or(Error::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, timeout: Duration) -> Result<(), Error> {
        if self.port.is_some() {
            return Ok(());
        }
        debug!("Opening {} at {} baud", self.path, self.baud_rate);
        let mut port = serial::open(&self.path).map_err(io::Error::from)?;
        SerialTransport::configure(&mut port, self.baud_rate)?;
        port.set_timeout(timeout)
            .map_err(|e| format!("Failed to set serial port timeout: {}", e))?;
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed {}", self.path);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn is_serial(&self) -> bool {
        true
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Error> {
        self.baud_rate = baud;
        if let Some(port) = self.port.as_mut() {
            SerialTransport::configure(port, baud)?;
        }
        Ok(())
    }

    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), Error> {
        let port = self.port()?;
        port.set_timeout(timeout)
            .map_err(|e| format!("Failed to set serial port timeout: {}", e))?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), Error> {
        let port = self.port()?;
        port.set_timeout(timeout)
            .map_err(|e| format!("Failed to set serial port timeout: {}", e))?;
        port.read_exact(buf).map_err(read_error)
    }
}

/// The framed protocol carried over TCP through a serial device server.
pub struct TcpTransport {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16) -> TcpTransport {
        TcpTransport {
            host: host.to_string(),
            port,
            stream: None,
        }
    }

    fn stream(&mut self) -> Result<&mut TcpStream, Error> {
        self.stream.as_mut().ok_or(Error::NotConnected)
    }
}

impl Transport for TcpTransport {
    fn open(&mut self, timeout: Duration) -> Result<(), Error> {
        if self.stream.is_some() {
            return Ok(());
        }
        debug!("Connecting to {}:{}", self.host, self.port);
        let mut last_err = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(match last_err {
            Some(e) => read_error(e),
            None => Error::Program(format!("{} did not resolve to any address", self.host)),
        })
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Closed connection to {}:{}", self.host, self.port);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn is_serial(&self) -> bool {
        false
    }

    fn set_baud_rate(&mut self, _baud: u32) -> Result<(), Error> {
        Ok(())
    }

    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), Error> {
        let stream = self.stream()?;
        stream.set_write_timeout(Some(timeout))?;
        stream.write_all(data).map_err(read_error)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), Error> {
        let stream = self.stream()?;
        stream.set_read_timeout(Some(timeout))?;
        stream.read_exact(buf).map_err(read_error)
    }
}

/// Observer of every frame crossing the transport.
pub trait TransportListener {
    fn message(&mut self, tx: bool, data: &[u8], timeout: Duration);
}

/// Prints frames as hex, sixteen bytes to a line.
pub struct HexDumpListener<W: Write> {
    out: W,
}

impl HexDumpListener<io::Stdout> {
    pub fn stdout() -> HexDumpListener<io::Stdout> {
        HexDumpListener { out: io::stdout() }
    }
}

impl<W: Write> HexDumpListener<W> {
    pub fn new(out: W) -> HexDumpListener<W> {
        HexDumpListener { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn hex_dump(tx: bool, data: &[u8]) -> String {
    let mut line = String::from(if tx { "Sending: " } else { "Received:" });
    for (i, b) in data.iter().enumerate() {
        if i > 0 && i % 16 == 0 {
            line.push_str("\n         ");
        }
        line.push_str(&format!(" {:02x}", b));
    }
    line
}

impl<W: Write> TransportListener for HexDumpListener<W> {
    fn message(&mut self, tx: bool, data: &[u8], _timeout: Duration) {
        if let Err(e) = writeln!(self.out, "{}", hex_dump(tx, data)) {
            warn!("Transport listener output failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(true, &[0xFF, 0x00, 0x03, 0x1D, 0x0C]), "Sending:  ff 00 03 1d 0c");
        assert_eq!(hex_dump(false, &[]), "Received:");
    }

    #[test]
    fn test_hex_dump_wraps() {
        let data: Vec<u8> = (0..18).collect();
        let dump = hex_dump(false, &data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Received: 00 01"));
        assert!(lines[0].ends_with(" 0f"));
        assert_eq!(lines[1], "          10 11");
    }

    #[test]
    fn test_listener_writes_lines() {
        let mut listener = HexDumpListener::new(Vec::new());
        listener.message(true, &[0x01], Duration::from_millis(10));
        listener.message(false, &[0x02], Duration::from_millis(10));
        let out = String::from_utf8(listener.into_inner()).unwrap();
        assert_eq!(out, "Sending:  01\nReceived: 02\n");
    }

    #[test]
    fn test_unopened_transports() {
        let mut serial = SerialTransport::new("/dev/null-reader");
        assert!(serial.is_serial());
        assert!(!serial.is_open());
        serial.set_baud_rate(9600).unwrap();
        match serial.send(&[0], Duration::from_millis(10)) {
            Err(Error::NotConnected) => {}
            other => panic!("unexpected {:?}", other),
        }

        let mut tcp = TcpTransport::new("localhost", 4001);
        assert!(!tcp.is_serial());
        let mut buf = [0u8; 1];
        assert!(tcp.receive(&mut buf, Duration::from_millis(10)).is_err());
    }
}

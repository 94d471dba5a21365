//! Reader connection speaking the framed embedded protocol over any
//! [`Transport`].

use std::time::Duration;

use log::{debug, trace};

use crate::error::Error;
use crate::param::{product_group_name, Param, ParamValue};
use crate::protocol::{Command, Opcode, Response, VersionInfo, CRC_LEN, RESPONSE_HEADER_LEN, SYNC};
use crate::reader::Reader;
use crate::region::Region;
use crate::transport::{Transport, TransportListener, DEFAULT_BAUD_RATE};

/// Rates tried in order when the reader ignores the default one.
pub const DEFAULT_PROBE_BAUD_RATES: [u32; 8] =
    [9600, 115200, 921600, 19200, 38400, 57600, 230400, 460800];
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_millis(1000);
const PROBE_TIMEOUT: Duration = Duration::from_millis(250);
const MAX_SYNC_SKIP: usize = 256;

const SERIAL_NUMBER_OPTION: [u8; 2] = [0x00, 0x40];
const OPTIONAL_PARAMS_READ: u8 = 0x01;
const PRODUCT_GROUP_ID_KEY: u8 = 0x12;
const PRODUCT_ID_KEY: u8 = 0x13;

pub struct TmrReader<T: Transport> {
    uri: String,
    transport: T,
    listeners: Vec<Box<dyn TransportListener>>,
    baud_rate: u32,
    probe_baud_rates: Vec<u32>,
    timeout: Duration,
    description: String,
    version: Option<VersionInfo>,
}

impl<T: Transport> TmrReader<T> {
    pub fn new(uri: &str, transport: T) -> TmrReader<T> {
        TmrReader {
            uri: uri.to_string(),
            transport,
            listeners: Vec::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            probe_baud_rates: DEFAULT_PROBE_BAUD_RATES.to_vec(),
            timeout: DEFAULT_TRANSPORT_TIMEOUT,
            description: String::new(),
            version: None,
        }
    }

    /// Version data captured by the last successful `connect`.
    pub fn version(&self) -> Option<&VersionInfo> {
        self.version.as_ref()
    }

    fn notify(&mut self, tx: bool, data: &[u8], timeout: Duration) {
        for listener in self.listeners.iter_mut() {
            listener.message(tx, data, timeout);
        }
    }

    fn send_receive(&mut self, cmd: Command, timeout: Duration) -> Result<Vec<u8>, Error> {
        let opcode = cmd.opcode;
        let bytes = cmd.to_bytes();
        trace!("Command: {:02x?}", bytes);
        self.notify(true, &bytes, timeout);
        self.transport.send(&bytes, timeout)?;

        let mut frame = vec![0u8; RESPONSE_HEADER_LEN];
        self.receive_sync(timeout)?;
        frame[0] = SYNC;
        self.transport.receive(&mut frame[1..], timeout)?;
        let header_len = frame.len();
        frame.resize(header_len + frame[1] as usize + CRC_LEN, 0);
        self.transport.receive(&mut frame[header_len..], timeout)?;
        trace!("Response: {:02x?}", frame);
        self.notify(false, &frame, timeout);

        Response::from_bytes(&frame)?.into_data(opcode)
    }

    /// Discards bytes until the sync byte arrives. A line that never produces
    /// one is no different from a silent one.
    fn receive_sync(&mut self, timeout: Duration) -> Result<(), Error> {
        let mut byte = [0u8; 1];
        let mut skipped = 0;
        loop {
            self.transport.receive(&mut byte, timeout)?;
            if byte[0] == SYNC {
                break;
            }
            skipped += 1;
            if skipped > MAX_SYNC_SKIP {
                debug!("No sync byte in {} bytes from {}", skipped, self.uri);
                return Err(Error::Timeout);
            }
        }
        if skipped > 0 {
            trace!("Skipped {} bytes before sync", skipped);
        }
        Ok(())
    }

    fn command(&mut self, opcode: Opcode, data: Vec<u8>) -> Result<Vec<u8>, Error> {
        let timeout = self.timeout;
        self.send_receive(Command::new(opcode, data), timeout)
    }

    fn connected_version(&self) -> Result<VersionInfo, Error> {
        self.version.ok_or(Error::NotConnected)
    }

    fn serial_number(&mut self) -> Result<String, Error> {
        let data = self.command(Opcode::HardwareInfo, SERIAL_NUMBER_OPTION.to_vec())?;
        if data.len() < SERIAL_NUMBER_OPTION.len() || data[..2] != SERIAL_NUMBER_OPTION {
            return Err(Error::Protocol("serial number reply without option echo".to_string()));
        }
        let text = String::from_utf8_lossy(&data[2..]);
        Ok(text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
    }

    fn optional_param(&mut self, key: u8) -> Result<u32, Error> {
        let data = self.command(Opcode::GetReaderOptionalParams, vec![OPTIONAL_PARAMS_READ, key])?;
        if data.len() < 4 || data[0] != OPTIONAL_PARAMS_READ || data[1] != key {
            return Err(Error::Protocol(format!(
                "malformed reply for optional parameter 0x{:02x}",
                key
            )));
        }
        Ok(u16::from_be_bytes([data[2], data[3]]) as u32)
    }

    fn region(&mut self) -> Result<Region, Error> {
        let data = self.command(Opcode::GetRegion, Vec::new())?;
        match data.first() {
            Some(code) => Region::from_code(*code),
            None => Err(Error::Protocol("empty region reply".to_string())),
        }
    }

    fn supported_regions(&mut self) -> Result<Vec<Region>, Error> {
        let data = self.command(Opcode::GetAvailableRegions, Vec::new())?;
        data.iter().map(|code| Region::from_code(*code)).collect()
    }
}

impl<T: Transport> Reader for TmrReader<T> {
    fn connect(&mut self) -> Result<(), Error> {
        self.transport.set_baud_rate(self.baud_rate)?;
        self.transport.open(self.timeout)?;
        let data = match self.command(Opcode::Version, Vec::new()) {
            Ok(data) => data,
            // A module running at another baud rate answers with noise.
            Err(Error::Protocol(msg)) => {
                debug!("Garbled handshake from {}: {}", self.uri, msg);
                return Err(Error::Timeout);
            }
            Err(e) => return Err(e),
        };
        let version = VersionInfo::from_bytes(&data)?;
        debug!(
            "Connected to {} ({}, hardware {})",
            self.uri,
            version.model(),
            version.hardware_string()
        );
        self.version = Some(version);
        Ok(())
    }

    fn is_serial(&self) -> bool {
        self.transport.is_serial()
    }

    fn probe_baud_rate(&mut self) -> Result<u32, Error> {
        if !self.transport.is_serial() {
            return Err(Error::Program(format!(
                "{} is not a serial reader, nothing to probe",
                self.uri
            )));
        }
        self.transport.open(self.timeout)?;
        let rates = self.probe_baud_rates.clone();
        for baud in rates.iter().copied() {
            self.transport.set_baud_rate(baud)?;
            debug!("Probing {} at {} baud", self.uri, baud);
            match self.send_receive(Command::new(Opcode::Version, Vec::new()), PROBE_TIMEOUT) {
                Ok(_) => {
                    debug!("Reader answered at {} baud", baud);
                    return Ok(baud);
                }
                // A wrong rate shows up as silence or as line noise.
                Err(ref e) if e.is_timeout() => {}
                Err(Error::Protocol(msg)) => trace!("Garbage at {} baud: {}", baud, msg),
                Err(e) => return Err(e),
            }
        }
        Err(Error::BaudProbeFailed(rates))
    }

    fn param_get(&mut self, param: Param) -> Result<ParamValue, Error> {
        if !param.is_host_side() {
            self.connected_version()?;
        }
        let value = match param {
            Param::ReaderUri => ParamValue::Str(self.uri.clone()),
            Param::Description => ParamValue::Str(self.description.clone()),
            Param::BaudRate => ParamValue::Int(self.baud_rate),
            Param::ProbeBaudRates => ParamValue::Ints(self.probe_baud_rates.clone()),
            Param::TransportTimeout => ParamValue::from_duration(self.timeout),
            Param::VersionHardware => ParamValue::Str(self.connected_version()?.hardware_string()),
            Param::VersionSoftware => ParamValue::Str(self.connected_version()?.software_string()),
            Param::VersionModel => ParamValue::Str(self.connected_version()?.model().to_string()),
            Param::VersionSerial => ParamValue::Str(self.serial_number()?),
            Param::ProductGroupId => ParamValue::Int(self.optional_param(PRODUCT_GROUP_ID_KEY)?),
            Param::ProductGroup => {
                let id = self.optional_param(PRODUCT_GROUP_ID_KEY)?;
                ParamValue::Str(product_group_name(id).to_string())
            }
            Param::ProductId => ParamValue::Int(self.optional_param(PRODUCT_ID_KEY)?),
            Param::RegionId => ParamValue::Region(self.region()?),
            Param::SupportedRegions => ParamValue::Regions(self.supported_regions()?),
        };
        Ok(value)
    }

    fn param_set(&mut self, param: Param, value: ParamValue) -> Result<(), Error> {
        match param {
            Param::BaudRate => {
                let baud = value.as_int(param)?;
                if self.version.is_some() {
                    self.command(Opcode::SetBaudRate, baud.to_be_bytes().to_vec())?;
                }
                self.transport.set_baud_rate(baud)?;
                self.baud_rate = baud;
            }
            Param::ProbeBaudRates => {
                let rates = value.as_ints(param)?;
                if rates.is_empty() {
                    return Err(Error::Program("probe baud rate list is empty".to_string()));
                }
                self.probe_baud_rates = rates.to_vec();
            }
            Param::TransportTimeout => {
                self.timeout = Duration::from_millis(value.as_int(param)? as u64);
            }
            Param::Description => {
                self.description = value.as_str(param)?.to_string();
            }
            Param::RegionId => {
                let region = value.as_region(param)?;
                self.connected_version()?;
                if region == Region::Unspec {
                    return Err(Error::Program("cannot set region to UNSPEC".to_string()));
                }
                self.command(Opcode::SetRegion, vec![region.code()])?;
                debug!("Region set to {}", region);
            }
            Param::ReaderUri
            | Param::VersionHardware
            | Param::VersionSerial
            | Param::VersionModel
            | Param::VersionSoftware
            | Param::ProductGroupId
            | Param::ProductGroup
            | Param::ProductId
            | Param::SupportedRegions => return Err(Error::ReadOnlyParam(param.to_string())),
        }
        Ok(())
    }

    fn add_transport_listener(&mut self, listener: Box<dyn TransportListener>) {
        self.listeners.push(listener);
    }

    fn destroy(&mut self) {
        self.version = None;
        if self.transport.is_open() {
            self.transport.close();
        }
    }
}

//! Framing for the embedded reader serial protocol.
//!
//! Every command goes out as `FF len opcode data.. crc crc` and every answer
//! comes back as `FF len opcode status status data.. crc crc`, where `len`
//! counts only the data bytes and the CRC covers everything between the sync
//! byte and the checksum itself.

use crc16::{State, AUG_CCITT};
use num_enum::TryFromPrimitive;

use crate::error::Error;

pub const SYNC: u8 = 0xFF;
/// Sync, length, opcode and the two status bytes.
pub const RESPONSE_HEADER_LEN: usize = 5;
pub const CRC_LEN: usize = 2;

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Opcode {
    Version = 0x03,
    SetBaudRate = 0x06,
    HardwareInfo = 0x10,
    GetRegion = 0x67,
    GetReaderOptionalParams = 0x6A,
    GetAvailableRegions = 0x71,
    SetRegion = 0x97,
}

/// Non-zero status words the reader can answer with.
#[derive(Copy, Clone, PartialEq, Debug, TryFromPrimitive)]
#[repr(u16)]
pub enum ResponseStatus {
    WrongNumberOfData = 0x0100,
    InvalidOpcode = 0x0101,
    UnimplementedOpcode = 0x0102,
    PowerTooHigh = 0x0103,
    InvalidFrequency = 0x0104,
    InvalidParameterValue = 0x0105,
    PowerTooLow = 0x0106,
    UnimplementedFeature = 0x0109,
    InvalidBaudRate = 0x010A,
    InvalidRegion = 0x010B,
    NoTagsFound = 0x0400,
    SystemUnknownError = 0x7F00,
    AssertFailed = 0x7F01,
}

impl ResponseStatus {
    pub fn from_code(code: u16) -> Option<ResponseStatus> {
        ResponseStatus::try_from_primitive(code).ok()
    }
}

/// CRC-CCITT as the reader computes it: data bits are shifted straight into
/// the register and no zero bytes are appended. That equals the AUG-CCITT sum
/// of everything but the last two bytes, xor'd with those two bytes. Frames
/// always cover at least the length and opcode bytes.
pub fn crc(data: &[u8]) -> u16 {
    let (head, tail) = data.split_at(data.len().saturating_sub(2));
    let tail = tail.iter().fold(0u16, |acc, b| (acc << 8) | *b as u16);
    State::<AUG_CCITT>::calculate(head) ^ tail
}

#[derive(PartialEq, Debug)]
pub struct Command {
    pub opcode: Opcode,
    pub data: Vec<u8>,
}

impl Command {
    pub fn new(opcode: Opcode, data: Vec<u8>) -> Command {
        Command { opcode, data }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pkt: Vec<u8> = Vec::with_capacity(self.data.len() + 5);
        pkt.push(SYNC);
        pkt.push(self.data.len() as u8);
        pkt.push(self.opcode as u8);
        pkt.extend_from_slice(&self.data);
        let crc = crc(&pkt[1..]);
        pkt.extend_from_slice(&crc.to_be_bytes());
        pkt
    }
}

#[derive(PartialEq, Debug)]
pub struct Response {
    pub opcode: u8,
    pub status: u16,
    pub data: Vec<u8>,
}

impl Response {
    pub fn from_bytes(bytes: &[u8]) -> Result<Response, Error> {
        if bytes.len() < RESPONSE_HEADER_LEN + CRC_LEN {
            return Err(Error::Protocol(format!("short frame of {} bytes", bytes.len())));
        }
        if bytes[0] != SYNC {
            return Err(Error::Protocol(format!("bad sync byte 0x{:02x}", bytes[0])));
        }
        let data_len = bytes[1] as usize;
        if bytes.len() != RESPONSE_HEADER_LEN + data_len + CRC_LEN {
            return Err(Error::Protocol(format!(
                "length byte says {} data bytes, frame holds {}",
                data_len,
                bytes.len() - RESPONSE_HEADER_LEN - CRC_LEN
            )));
        }
        let body_end = bytes.len() - CRC_LEN;
        let expected = crc(&bytes[1..body_end]);
        let received = u16::from_be_bytes([bytes[body_end], bytes[body_end + 1]]);
        if expected != received {
            return Err(Error::Protocol(format!(
                "CRC mismatch: computed 0x{:04x}, received 0x{:04x}",
                expected, received
            )));
        }
        Ok(Response {
            opcode: bytes[2],
            status: u16::from_be_bytes([bytes[3], bytes[4]]),
            data: bytes[RESPONSE_HEADER_LEN..body_end].to_vec(),
        })
    }

    /// Checks the response answers `opcode` with a success status and hands
    /// back its data.
    pub fn into_data(self, opcode: Opcode) -> Result<Vec<u8>, Error> {
        if self.opcode != opcode as u8 {
            return Err(Error::Protocol(format!(
                "expected reply to opcode 0x{:02x}, got 0x{:02x}",
                opcode as u8, self.opcode
            )));
        }
        if self.status != 0 {
            return Err(Error::from(self.status));
        }
        Ok(self.data)
    }
}

/// Decoded answer to the Version command.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct VersionInfo {
    pub bootloader: [u8; 4],
    pub hardware: [u8; 4],
    pub firmware_date: [u8; 4],
    pub firmware: [u8; 4],
    pub protocols: u32,
}

impl VersionInfo {
    pub fn from_bytes(data: &[u8]) -> Result<VersionInfo, Error> {
        if data.len() < 16 {
            return Err(Error::Protocol(format!(
                "version reply too short: {} bytes",
                data.len()
            )));
        }
        let quad = |at: usize| [data[at], data[at + 1], data[at + 2], data[at + 3]];
        // Older modules stop after the firmware version.
        let protocols = if data.len() >= 20 {
            u32::from_be_bytes(quad(16))
        } else {
            0
        };
        Ok(VersionInfo {
            bootloader: quad(0),
            hardware: quad(4),
            firmware_date: quad(8),
            firmware: quad(12),
            protocols,
        })
    }

    pub fn hardware_string(&self) -> String {
        dotted(&self.hardware)
    }

    pub fn software_string(&self) -> String {
        format!(
            "{}-{}-BL{}",
            dotted(&self.firmware),
            dotted(&self.firmware_date),
            dotted(&self.bootloader)
        )
    }

    pub fn model(&self) -> &'static str {
        match self.hardware[0] {
            0x00 => "M5e",
            0x01 => "M5e Compact",
            0x02 => "M5e-I",
            0x03 => "M4e",
            0x18 => "M6e",
            0x19 => "M6e-PRC",
            0x20 => "M6e Micro",
            0x30 => "M6e Nano",
            _ => "Unknown",
        }
    }
}

fn dotted(bytes: &[u8; 4]) -> String {
    format!(
        "{:02X}.{:02X}.{:02X}.{:02X}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Builds a reply frame the way the reader would.
#[cfg(test)]
pub(crate) fn response_frame(opcode: u8, status: u16, data: &[u8]) -> Vec<u8> {
    let mut frame = vec![SYNC, data.len() as u8, opcode];
    frame.extend_from_slice(&status.to_be_bytes());
    frame.extend_from_slice(data);
    let crc = crc(&frame[1..]);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame
}

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Error;

/// Regulatory operating region, by its wire code.
#[derive(Copy, Clone, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Region {
    Unspec = 0x00,
    NA = 0x01,
    EU = 0x02,
    KR = 0x03,
    IN = 0x04,
    JP = 0x05,
    PRC = 0x06,
    EU2 = 0x07,
    EU3 = 0x08,
    KR2 = 0x09,
    PRC2 = 0x0A,
    AU = 0x0B,
    NZ = 0x0C,
    Open = 0xFF,
}

impl Region {
    pub fn from_code(code: u8) -> Result<Region, Error> {
        Region::try_from_primitive(code)
            .map_err(|_| Error::Protocol(format!("unknown region code 0x{:02x}", code)))
    }

    pub fn code(self) -> u8 {
        self.into()
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::Unspec => "UNSPEC",
            Region::NA => "NA",
            Region::EU => "EU",
            Region::KR => "KR",
            Region::IN => "IN",
            Region::JP => "JP",
            Region::PRC => "PRC",
            Region::EU2 => "EU2",
            Region::EU3 => "EU3",
            Region::KR2 => "KR2",
            Region::PRC2 => "PRC2",
            Region::AU => "AU",
            Region::NZ => "NZ",
            Region::Open => "OPEN",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Region::from_code(0x00).unwrap(), Region::Unspec);
        assert_eq!(Region::from_code(0xFF).unwrap(), Region::Open);
        assert_eq!(Region::EU3.code(), 0x08);
        assert!(Region::from_code(0x42).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Region::PRC2.to_string(), "PRC2");
        assert_eq!(Region::Unspec.to_string(), "UNSPEC");
    }
}

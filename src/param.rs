use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::region::Region;

/// Reader parameters, addressed by path.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Param {
    VersionHardware,
    VersionSerial,
    VersionModel,
    VersionSoftware,
    ReaderUri,
    ProductGroupId,
    ProductGroup,
    ProductId,
    Description,
    BaudRate,
    ProbeBaudRates,
    TransportTimeout,
    RegionId,
    SupportedRegions,
}

const PATHS: [(Param, &str); 14] = [
    (Param::VersionHardware, "/reader/version/hardware"),
    (Param::VersionSerial, "/reader/version/serial"),
    (Param::VersionModel, "/reader/version/model"),
    (Param::VersionSoftware, "/reader/version/software"),
    (Param::ReaderUri, "/reader/uri"),
    (Param::ProductGroupId, "/reader/version/productGroupID"),
    (Param::ProductGroup, "/reader/version/productGroup"),
    (Param::ProductId, "/reader/version/productID"),
    (Param::Description, "/reader/description"),
    (Param::BaudRate, "/reader/baudRate"),
    (Param::ProbeBaudRates, "/reader/probeBaudRates"),
    (Param::TransportTimeout, "/reader/transportTimeout"),
    (Param::RegionId, "/reader/region/id"),
    (Param::SupportedRegions, "/reader/region/supportedRegions"),
];

impl Param {
    pub fn path(self) -> &'static str {
        PATHS
            .iter()
            .find(|(p, _)| *p == self)
            .map(|(_, path)| *path)
            .unwrap_or("")
    }

    /// Parameters answered from host-side state, without talking to the reader.
    pub fn is_host_side(self) -> bool {
        matches!(
            self,
            Param::ReaderUri
                | Param::Description
                | Param::BaudRate
                | Param::ProbeBaudRates
                | Param::TransportTimeout
        )
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Param {
    type Err = Error;

    // Paths compare case-insensitively.
    fn from_str(s: &str) -> Result<Param, Error> {
        PATHS
            .iter()
            .find(|(_, path)| path.eq_ignore_ascii_case(s))
            .map(|(p, _)| *p)
            .ok_or_else(|| Error::UnsupportedParam(s.to_string()))
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum ParamValue {
    Str(String),
    Int(u32),
    Region(Region),
    Regions(Vec<Region>),
    Ints(Vec<u32>),
}

impl ParamValue {
    pub fn as_str(&self, param: Param) -> Result<&str, Error> {
        match self {
            ParamValue::Str(s) => Ok(s.as_str()),
            _ => Err(Error::WrongType(param.to_string())),
        }
    }

    pub fn as_int(&self, param: Param) -> Result<u32, Error> {
        match self {
            ParamValue::Int(v) => Ok(*v),
            _ => Err(Error::WrongType(param.to_string())),
        }
    }

    pub fn as_region(&self, param: Param) -> Result<Region, Error> {
        match self {
            ParamValue::Region(r) => Ok(*r),
            _ => Err(Error::WrongType(param.to_string())),
        }
    }

    pub fn as_regions(&self, param: Param) -> Result<&[Region], Error> {
        match self {
            ParamValue::Regions(r) => Ok(r.as_slice()),
            _ => Err(Error::WrongType(param.to_string())),
        }
    }

    pub fn as_ints(&self, param: Param) -> Result<&[u32], Error> {
        match self {
            ParamValue::Ints(v) => Ok(v.as_slice()),
            _ => Err(Error::WrongType(param.to_string())),
        }
    }

    pub fn from_duration(d: Duration) -> ParamValue {
        ParamValue::Int(d.as_millis().min(u32::MAX as u128) as u32)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter, items: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            f.write_str("]")
        }
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Region(r) => write!(f, "{}", r),
            ParamValue::Regions(r) => list(f, r),
            ParamValue::Ints(v) => list(f, v),
        }
    }
}

pub fn product_group_name(id: u32) -> &'static str {
    match id {
        0 => "Embedded Reader",
        1 => "Ruggedized Reader",
        2 => "USB Reader",
        _ => "Unknown",
    }
}

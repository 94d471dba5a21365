//! Client for UHF RFID reader modules that speak the framed TMR serial
//! protocol, directly over a serial port or through a TCP serial bridge.

pub mod error;
pub mod info;
pub mod param;
pub mod protocol;
pub mod reader;
pub mod region;
pub mod tmr;
pub mod transport;
pub mod uri;

pub use crate::error::Error;
pub use crate::param::{Param, ParamValue};
pub use crate::reader::{create, Reader, ReaderGuard};
pub use crate::region::Region;
pub use crate::tmr::TmrReader;
pub use crate::transport::{HexDumpListener, TransportListener};

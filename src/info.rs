//! The reader-info session: connect (falling back to baud probing), make
//! sure a region is configured, then print the identity parameters.

use std::io::{self, Write};

use log::{debug, warn};

use crate::error::Error;
use crate::param::{Param, ParamValue};
use crate::reader::{Reader, ReaderGuard};
use crate::region::Region;
use crate::transport::HexDumpListener;

/// Labels and parameters printed, in order.
pub const INFO_PARAMS: [(&str, Param); 9] = [
    ("Hardware Version", Param::VersionHardware),
    ("Serial Version", Param::VersionSerial),
    ("Model Version", Param::VersionModel),
    ("Software Version", Param::VersionSoftware),
    ("Reader Uri", Param::ReaderUri),
    ("Reader Product GroupId", Param::ProductGroupId),
    ("Reader Product Group", Param::ProductGroup),
    ("Reader Product Id", Param::ProductId),
    ("Reader Description", Param::Description),
];

/// Connects at the configured baud rate. A serial reader that times out gets
/// one more attempt at whatever rate probing finds.
pub fn connect_with_fallback<R: Reader + ?Sized>(reader: &mut R) -> Result<(), Error> {
    match reader.connect() {
        Ok(()) => Ok(()),
        Err(e) if e.is_timeout() && reader.is_serial() => {
            warn!("Connect at default baud rate failed ({}), probing", e);
            let baud = reader.probe_baud_rate()?;
            reader.param_set(Param::BaudRate, ParamValue::Int(baud))?;
            reader.connect()
        }
        Err(e) => Err(e),
    }
}

/// Picks the first supported region when none is configured.
pub fn ensure_region<R: Reader + ?Sized>(reader: &mut R) -> Result<(), Error> {
    let current = reader.param_get(Param::RegionId)?.as_region(Param::RegionId)?;
    if current != Region::Unspec {
        debug!("Region already set to {}", current);
        return Ok(());
    }
    let supported = reader.param_get(Param::SupportedRegions)?;
    let first = match supported.as_regions(Param::SupportedRegions)?.first() {
        Some(region) => *region,
        None => return Err(Error::NoSupportedRegions),
    };
    debug!("Region unspecified, selecting {}", first);
    reader.param_set(Param::RegionId, ParamValue::Region(first))
}

/// Prints one `<label> :<value>` line per parameter. A failed read puts the
/// error message where the value would go.
pub fn print_info<R: Reader + ?Sized, W: Write>(reader: &mut R, out: &mut W) -> io::Result<()> {
    for (label, param) in INFO_PARAMS.iter() {
        match reader.param_get(*param) {
            Ok(value) => writeln!(out, "{} :{}", label, value)?,
            Err(e) => {
                debug!("Reading {} failed: {}", param, e);
                writeln!(out, "{} :{}", label, e)?
            }
        }
    }
    Ok(())
}

/// Runs the whole session against an already created reader. The reader is
/// destroyed on every path out.
pub fn run<R: Reader, W: Write>(reader: R, verbose: bool, out: &mut W) -> Result<(), Error> {
    let mut reader = ReaderGuard::new(reader);
    if verbose {
        reader.add_transport_listener(Box::new(HexDumpListener::stdout()));
    }
    connect_with_fallback(&mut *reader)?;
    ensure_region(&mut *reader)?;
    print_info(&mut *reader, out)?;
    Ok(())
}

use std::ops::{Deref, DerefMut};

use log::debug;

use crate::error::Error;
use crate::param::{Param, ParamValue};
use crate::tmr::TmrReader;
use crate::transport::{SerialTransport, TcpTransport, TransportListener};
use crate::uri::ReaderUri;

/// Operations every reader connection offers, whatever carries its bytes.
pub trait Reader {
    /// Opens the transport and performs the initial handshake.
    fn connect(&mut self) -> Result<(), Error>;

    /// True when the reader sits behind a local serial port.
    fn is_serial(&self) -> bool;

    /// Walks the probe baud rate list until the reader answers, returning the
    /// rate it answered at. Only meaningful for serial readers.
    fn probe_baud_rate(&mut self) -> Result<u32, Error>;

    fn param_get(&mut self, param: Param) -> Result<ParamValue, Error>;

    fn param_set(&mut self, param: Param, value: ParamValue) -> Result<(), Error>;

    fn add_transport_listener(&mut self, listener: Box<dyn TransportListener>);

    /// Releases the connection. Safe to call more than once.
    fn destroy(&mut self);
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn connect(&mut self) -> Result<(), Error> {
        (**self).connect()
    }

    fn is_serial(&self) -> bool {
        (**self).is_serial()
    }

    fn probe_baud_rate(&mut self) -> Result<u32, Error> {
        (**self).probe_baud_rate()
    }

    fn param_get(&mut self, param: Param) -> Result<ParamValue, Error> {
        (**self).param_get(param)
    }

    fn param_set(&mut self, param: Param, value: ParamValue) -> Result<(), Error> {
        (**self).param_set(param, value)
    }

    fn add_transport_listener(&mut self, listener: Box<dyn TransportListener>) {
        (**self).add_transport_listener(listener)
    }

    fn destroy(&mut self) {
        (**self).destroy()
    }
}

/// Builds an unconnected reader for `uri`.
pub fn create(uri: &str) -> Result<Box<dyn Reader>, Error> {
    let reader: Box<dyn Reader> = match ReaderUri::parse(uri)? {
        ReaderUri::Serial { path } => {
            debug!("{} is a serial reader on {}", uri, path);
            Box::new(TmrReader::new(uri, SerialTransport::new(&path)))
        }
        ReaderUri::Network { host, port } => {
            debug!("{} is a network reader at {}:{}", uri, host, port);
            Box::new(TmrReader::new(uri, TcpTransport::new(&host, port)))
        }
    };
    Ok(reader)
}

/// Owns a reader and destroys it when dropped.
pub struct ReaderGuard<R: Reader> {
    reader: R,
}

impl<R: Reader> ReaderGuard<R> {
    pub fn new(reader: R) -> ReaderGuard<R> {
        ReaderGuard { reader }
    }
}

impl<R: Reader> Deref for ReaderGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.reader
    }
}

impl<R: Reader> DerefMut for ReaderGuard<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

impl<R: Reader> Drop for ReaderGuard<R> {
    fn drop(&mut self) {
        self.reader.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counting {
        destroyed: Rc<Cell<u32>>,
    }

    impl Reader for Counting {
        fn connect(&mut self) -> Result<(), Error> {
            Err(Error::Timeout)
        }
        fn is_serial(&self) -> bool {
            false
        }
        fn probe_baud_rate(&mut self) -> Result<u32, Error> {
            Err(Error::Timeout)
        }
        fn param_get(&mut self, param: Param) -> Result<ParamValue, Error> {
            Err(Error::UnsupportedParam(param.to_string()))
        }
        fn param_set(&mut self, param: Param, _value: ParamValue) -> Result<(), Error> {
            Err(Error::UnsupportedParam(param.to_string()))
        }
        fn add_transport_listener(&mut self, _listener: Box<dyn TransportListener>) {}
        fn destroy(&mut self) {
            self.destroyed.set(self.destroyed.get() + 1);
        }
    }

    fn failing_session(reader: Counting) -> Result<(), Error> {
        let mut guard = ReaderGuard::new(reader);
        guard.connect()?;
        Ok(())
    }

    #[test]
    fn test_guard_destroys_on_error_path() {
        let destroyed = Rc::new(Cell::new(0));
        let result = failing_session(Counting { destroyed: destroyed.clone() });
        assert!(result.is_err());
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn test_guard_over_boxed_reader() {
        let destroyed = Rc::new(Cell::new(0));
        {
            let boxed: Box<dyn Reader> = Box::new(Counting { destroyed: destroyed.clone() });
            let guard = ReaderGuard::new(boxed);
            assert!(!guard.is_serial());
        }
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn test_create() {
        let reader = create("tmr:///dev/ttyUSB0").unwrap();
        assert!(reader.is_serial());
        let reader = create("tmr://reader.local:4001").unwrap();
        assert!(!reader.is_serial());
        assert!(create("bogus").is_err());
    }

    #[test]
    fn test_create_keeps_uri() {
        let mut reader = create("tmr:///COM4").unwrap();
        assert_eq!(
            reader.param_get(Param::ReaderUri).unwrap(),
            ParamValue::Str("tmr:///COM4".to_string())
        );
    }
}

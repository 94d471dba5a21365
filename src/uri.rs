use crate::error::Error;

/// Port of the serial device server when a network URI names none.
pub const DEFAULT_NETWORK_PORT: u16 = 4001;

/// Where a reader lives, as named by a `tmr://` or `eapi://` URI.
#[derive(Clone, PartialEq, Debug)]
pub enum ReaderUri {
    Serial { path: String },
    Network { host: String, port: u16 },
}

impl ReaderUri {
    pub fn parse(uri: &str) -> Result<ReaderUri, Error> {
        let invalid = |why: &str| Error::InvalidUri(uri.to_string(), why.to_string());

        let (scheme, rest) = uri.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        let serial_only = match scheme.to_ascii_lowercase().as_str() {
            "tmr" => false,
            "eapi" => true,
            _ => return Err(invalid("scheme must be tmr or eapi")),
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };

        if authority.is_empty() {
            return serial_path(path).ok_or_else(|| invalid("empty device path"));
        }
        if serial_only {
            return Err(invalid("eapi URIs name a local serial device"));
        }

        let (host, port) = split_host_port(authority).ok_or_else(|| invalid("bad host or port"))?;
        Ok(ReaderUri::Network { host, port })
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, ReaderUri::Serial { .. })
    }
}

fn serial_path(path: &str) -> Option<ReaderUri> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    // tmr:///COM3 names a Windows port, not a file under the root.
    let is_com = match (trimmed.get(..3), trimmed.get(3..)) {
        (Some(prefix), Some(number)) => {
            prefix.eq_ignore_ascii_case("com")
                && !number.is_empty()
                && number.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    };
    let path = if is_com { trimmed.to_string() } else { path.to_string() };
    Some(ReaderUri::Serial { path })
}

fn split_host_port(authority: &str) -> Option<(String, u16)> {
    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let end = rest.find(']')?;
        let host = &rest[..end];
        match &rest[end + 1..] {
            "" => (host, None),
            tail => (host, Some(tail.strip_prefix(':')?)),
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };
    if host.is_empty() {
        return None;
    }
    let port = match port {
        Some(p) => p.parse::<u16>().ok().filter(|p| *p != 0)?,
        None => DEFAULT_NETWORK_PORT,
    };
    Some((host.to_string(), port))
}

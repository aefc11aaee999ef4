//! Data source names.

use std::fmt;

use url::form_urlencoded;

use crate::cluster::spec::ConnectionSpec;

/// Formatted connection string for one node.
///
/// Renders as `user:password@tcp(host)/database`, with
/// `?parseTime=true&loc=<timezone>` appended when time parsing is requested.
/// `Debug` masks the password; `Display` does not.
#[derive(Clone, PartialEq, Eq)]
pub struct DataSourceName {
    spec: ConnectionSpec,
}

impl DataSourceName {
    pub fn new(spec: ConnectionSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    pub fn host(&self) -> &str {
        &self.spec.host
    }

    /// Split `host[:port]`. Bracketed IPv6 literals are unwrapped.
    pub fn host_and_port(&self) -> (&str, Option<u16>) {
        split_host_port(&self.spec.host)
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, password: &str) -> fmt::Result {
        let s = &self.spec;
        write!(f, "{}:{}@tcp({})/{}", s.user, password, s.host, s.database)?;
        if s.parse_time {
            let loc: String = form_urlencoded::byte_serialize(s.timezone.as_bytes()).collect();
            write!(f, "?parseTime=true&loc={}", loc)?;
        }
        Ok(())
    }
}

impl fmt::Display for DataSourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, &self.spec.password)
    }
}

impl fmt::Debug for DataSourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataSourceName(")?;
        self.write(f, "***")?;
        f.write_str(")")
    }
}

impl From<ConnectionSpec> for DataSourceName {
    fn from(spec: ConnectionSpec) -> Self {
        Self::new(spec)
    }
}

fn split_host_port(host: &str) -> (&str, Option<u16>) {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some((addr, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (addr, port);
        }
    }
    match host.rsplit_once(':') {
        // More than one colon without brackets is a bare IPv6 address.
        Some((h, p)) if !h.contains(':') => match p.parse() {
            Ok(port) => (h, Some(port)),
            Err(_) => (host, None),
        },
        _ => (host, None),
    }
}

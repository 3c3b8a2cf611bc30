//! Endpoints: where to bind, where to connect.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IpAddrParsingError;

/// IP version of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => Self::Ipv4,
            SocketAddr::V6(_) => Self::Ipv6,
        }
    }

    pub(crate) fn domain(self) -> socket2::Domain {
        match self {
            Self::Ipv4 => socket2::Domain::IPV4,
            Self::Ipv6 => socket2::Domain::IPV6,
        }
    }
}

/// The address part of an [`Endpoint`].
///
/// Either a literal (`"192.168.0.7"`, `"::1"`), or one of the well-known
/// wildcard/loopback addresses of a family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    Literal(String),
    AnyV4,
    LoopbackV4,
    AnyV6,
    LoopbackV6,
}

impl Host {
    /// Parses the host into an IP address.
    ///
    /// The family of a literal is decided by its shape: a `:` means IPv6, a
    /// `.` means IPv4. Host names are not resolved.
    pub fn resolve(&self) -> Result<IpAddr, IpAddrParsingError> {
        let literal = match self {
            Self::AnyV4 => return Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            Self::LoopbackV4 => return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            Self::AnyV6 => return Ok(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
            Self::LoopbackV6 => return Ok(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            Self::Literal(literal) => literal.trim(),
        };

        let invalid = || IpAddrParsingError::InvalidFormat {
            input: literal.to_string(),
        };
        if literal.is_empty() {
            Err(IpAddrParsingError::Empty)
        } else if literal.contains(':') {
            literal.parse::<Ipv6Addr>().map(IpAddr::V6).map_err(|_| invalid())
        } else if literal.contains('.') {
            literal.parse::<Ipv4Addr>().map(IpAddr::V4).map_err(|_| invalid())
        } else {
            Err(IpAddrParsingError::UnknownFamily {
                input: literal.to_string(),
            })
        }
    }

    pub fn family(&self) -> Result<AddressFamily, IpAddrParsingError> {
        Ok(match self.resolve()? {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        })
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => f.write_str(literal),
            Self::AnyV4 => f.write_str("0.0.0.0"),
            Self::LoopbackV4 => f.write_str("127.0.0.1"),
            Self::AnyV6 => f.write_str("::"),
            Self::LoopbackV6 => f.write_str("::1"),
        }
    }
}

/// A host plus a port (host byte order).
///
/// In configuration files an endpoint is the usual string form,
/// `"127.0.0.1:60001"` or `"[::1]:60001"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    pub host: Host,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: Host, port: u16) -> Self {
        Self { host, port }
    }

    pub fn loopback_v4(port: u16) -> Self {
        Self::new(Host::LoopbackV4, port)
    }

    pub fn any_v4(port: u16) -> Self {
        Self::new(Host::AnyV4, port)
    }

    pub fn resolve(&self) -> Result<SocketAddr, IpAddrParsingError> {
        Ok(SocketAddr::new(self.host.resolve()?, self.port))
    }

    pub fn family(&self) -> Result<AddressFamily, IpAddrParsingError> {
        self.host.family()
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(Host::Literal(addr.ip().to_string()), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.host.to_string();
        if host.contains(':') {
            write!(f, "[{host}]:{}", self.port)
        } else {
            write!(f, "{host}:{}", self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = IpAddrParsingError;

    /// Accepts `host:port` or `[v6-host]:port`. The host is validated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IpAddrParsingError::Empty);
        }
        let invalid = || IpAddrParsingError::InvalidFormat {
            input: s.to_string(),
        };

        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        let endpoint = Self::new(Host::Literal(host.to_string()), port);
        endpoint.resolve()?;
        Ok(endpoint)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = IpAddrParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// Maps IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) to plain IPv4, so
/// the same peer compares equal whichever socket family observed it.
pub fn canonical_addr(addr: SocketAddr) -> SocketAddr {
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}

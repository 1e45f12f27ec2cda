use crate::{ConfigError, FromEnv, env_parse_or};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 8090;

/// Listen address of the HTTP API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.address().fmt(f)
    }
}

impl FromEnv for ServerConfig {
    /// `HOST` (all interfaces when unset) and `PORT` (8090 when unset).
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_parse_or("HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: env_parse_or("PORT", DEFAULT_PORT)?,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
    }
}

//! Settings for the two socket demonstrations.
//!
//! The defaults reproduce the classic setup: one scatter/gather server on
//! port 8088 and a selector watching ports 8081 to 8085.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{Error, Result};

pub const SCATTER_PORT: u16 = 8088;
pub const SEGMENT_SIZES: [usize; 3] = [5, 10, 15];
pub const REPLY_CAPACITY: usize = 128;

pub const SELECTOR_PORTS: [u16; 5] = [8081, 8082, 8083, 8084, 8085];
pub const SELECTOR_READ_BUFFER: usize = 16;

/// Chunk size for file reads and copies.
pub const FILE_CHUNK_SIZE: usize = 1024;

/// Settings for [`crate::scatter::ScatterGatherServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScatterConfig {
    pub addr: SocketAddr,
    /// Capacity of each scatter segment, in read order.
    pub segments: Vec<usize>,
    pub reply_capacity: usize,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), SCATTER_PORT),
            segments: SEGMENT_SIZES.to_vec(),
            reply_capacity: REPLY_CAPACITY,
        }
    }
}

impl ScatterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(Error::Config("at least one segment is required".into()));
        }
        if self.segments.contains(&0) {
            return Err(Error::Config("segment sizes must be non-zero".into()));
        }
        if self.reply_capacity == 0 {
            return Err(Error::Config("reply capacity must be non-zero".into()));
        }
        Ok(())
    }

    /// Bytes collected per round.
    pub fn round_size(&self) -> usize {
        self.segments.iter().sum()
    }
}

/// Settings for [`crate::selector::Selector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    pub addrs: Vec<SocketAddr>,
    /// Per-connection read buffer capacity.
    pub read_buffer_size: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self::on_host(IpAddr::V4(Ipv4Addr::UNSPECIFIED), &SELECTOR_PORTS)
    }
}

impl SelectorConfig {
    /// One listener per port on `host`.
    pub fn on_host(host: IpAddr, ports: &[u16]) -> Self {
        Self {
            addrs: ports.iter().map(|&port| SocketAddr::new(host, port)).collect(),
            read_buffer_size: SELECTOR_READ_BUFFER,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.addrs.is_empty() {
            return Err(Error::Config("at least one listen address is required".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::Config("read buffer size must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_setup() {
        let scatter = ScatterConfig::default();
        assert_eq!(scatter.addr.port(), 8088);
        assert_eq!(scatter.round_size(), 30);
        assert!(scatter.validate().is_ok());

        let selector = SelectorConfig::default();
        let ports: Vec<u16> = selector.addrs.iter().map(SocketAddr::port).collect();
        assert_eq!(ports, vec![8081, 8082, 8083, 8084, 8085]);
        assert_eq!(selector.read_buffer_size, 16);
        assert!(selector.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_sizes() {
        let zero_segment = ScatterConfig {
            segments: vec![5, 0],
            ..ScatterConfig::default()
        };
        assert!(matches!(zero_segment.validate(), Err(Error::Config(_))));

        let no_segments = ScatterConfig {
            segments: Vec::new(),
            ..ScatterConfig::default()
        };
        assert!(no_segments.validate().is_err());

        let no_addrs = SelectorConfig {
            addrs: Vec::new(),
            ..SelectorConfig::default()
        };
        assert!(no_addrs.validate().is_err());

        let no_buffer = SelectorConfig {
            read_buffer_size: 0,
            ..SelectorConfig::default()
        };
        assert!(no_buffer.validate().is_err());
    }
}

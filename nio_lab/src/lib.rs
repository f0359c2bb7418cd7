//! Buffer and non-blocking I/O demonstrations.
//!
//! The crate packages a handful of small, independent experiments around one
//! cursor-based buffer type:
//!
//! - [`buffer`]: fixed-capacity buffers and scatter/gather over `std::io`
//! - [`channel`]: reading a file head and copying a file chunk by chunk
//! - [`scatter`]: a blocking server that scatter-reads fixed-size rounds
//! - [`selector`]: a single-threaded `mio` readiness loop over several ports
//! - [`config`]: defaults and validation for the two servers
//! - [`telemetry`]: metric names and the Prometheus exporter

pub mod buffer;
pub mod channel;
pub mod config;
pub mod error;
pub mod scatter;
pub mod selector;
pub mod telemetry;

pub use buffer::{Buffer, ByteBuffer, IntBuffer};
pub use error::{Error, Result};

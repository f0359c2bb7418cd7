//! Fixed-capacity buffers.
//!
//! A [`Buffer`] tracks a position and a limit inside its capacity. Data is
//! `put` while filling, then `flip` switches the same region over to reading.
//! [`ByteBuffer`] adds reads from and writes to any `std::io` stream, plus
//! scatter/gather across several buffers at once.

#[allow(clippy::module_inception)]
pub mod buffer;
pub mod vectored;

pub use buffer::{Buffer, ByteBuffer, Drain, IntBuffer};
pub use vectored::{gather_write, gather_write_all, scatter_read, total_remaining};

/// Default capacity for the random integer demonstration.
pub const DEFAULT_INT_CAPACITY: usize = 10;

/// Values are drawn from `0..DEFAULT_INT_BOUND`.
pub const DEFAULT_INT_BOUND: i32 = 20;

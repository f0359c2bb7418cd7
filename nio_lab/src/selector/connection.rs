use std::net::SocketAddr;

use mio::Interest;
use mio::net::TcpStream;

use crate::buffer::ByteBuffer;
use crate::error::Result;

/// Which readiness the connection is currently registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Waiting for bytes from the peer.
    Reading,
    /// Holding bytes that still have to reach the sink.
    Writing,
}

impl Phase {
    pub(crate) fn interest(self) -> Interest {
        match self {
            Self::Reading => Interest::READABLE,
            Self::Writing => Interest::WRITABLE,
        }
    }
}

/// An accepted socket with its own read buffer.
pub(crate) struct Connection {
    pub(crate) stream: TcpStream,
    pub(crate) peer: SocketAddr,
    pub(crate) local_port: u16,
    pub(crate) buffer: ByteBuffer,
    pub(crate) phase: Phase,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr, buffer_size: usize) -> Result<Self> {
        let local_port = stream.local_addr()?.port();
        Ok(Self {
            stream,
            peer,
            local_port,
            buffer: ByteBuffer::allocate(buffer_size),
            phase: Phase::Reading,
        })
    }
}

//! A blocking TCP server that scatter-reads fixed-size rounds.
//!
//! Each round fills a set of segment buffers from the peer, gathers them into
//! a sink in one vectored write, and answers with a timestamped reply.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{SystemTime, UNIX_EPOCH};

use metrics::counter;

use crate::buffer::{ByteBuffer, gather_write_all, scatter_read, total_remaining};
use crate::config::ScatterConfig;
use crate::error::Result;
use crate::telemetry;

/// Prefix of every reply sent after a round.
pub const REPLY_PREFIX: &str = "Return reply. Current time: ";

/// Totals for one served connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub rounds: u64,
    pub bytes: u64,
}

/// Blocking listener that serves one peer at a time.
pub struct ScatterGatherServer {
    listener: TcpListener,
    config: ScatterConfig,
}

impl ScatterGatherServer {
    /// Validates `config` and binds a blocking listener on `config.addr`.
    ///
    /// Port 0 asks the OS for a free port; [`Self::local_addr`] reports it.
    ///
    /// # Arguments
    ///
    /// * `config` - Listen address, segment sizes and reply capacity
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] when `config` fails validation, or an
    /// I/O error if the address cannot be bound.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let server = ScatterGatherServer::bind(ScatterConfig::default())?;
    /// let mut sink = File::create("http.txt")?;
    /// let report = server.serve(&mut sink)?;
    /// ```
    pub fn bind(config: ScatterConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.addr)?;
        log::info!("scatter server listening on {}", listener.local_addr()?);

        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Blocks until a peer connects.
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept()?;
        counter!(telemetry::CONNECTIONS_ACCEPTED).increment(1);
        log::info!("accepted {peer}");

        Ok((stream, peer))
    }

    /// Accepts one connection and serves it until the peer closes.
    ///
    /// # Returns
    ///
    /// The rounds completed and bytes written to `sink` for that peer.
    pub fn serve<W: Write>(&self, sink: &mut W) -> Result<SessionReport> {
        let (mut stream, peer) = self.accept()?;
        let report = serve_stream(&mut stream, &self.config, sink)?;
        log::info!(
            "{peer} closed after {} rounds, {} bytes",
            report.rounds,
            report.bytes
        );

        Ok(report)
    }
}

/// Runs scatter/gather rounds on `stream` until it reaches end of stream.
///
/// A round ends when every segment is full or the peer stops sending. Rounds
/// that carried data are gathered into `sink` and answered on `stream`.
pub fn serve_stream<S, W>(stream: &mut S, config: &ScatterConfig, sink: &mut W) -> Result<SessionReport>
where
    S: Read + Write,
    W: Write,
{
    config.validate()?;
    let mut segments: Vec<ByteBuffer> = config
        .segments
        .iter()
        .map(|&size| ByteBuffer::allocate(size))
        .collect();
    let mut reply = ByteBuffer::allocate(config.reply_capacity);
    let round_size = config.round_size();
    let mut report = SessionReport::default();

    loop {
        let mut filled = 0;
        let mut closed = false;
        while filled < round_size {
            // Blocks until the peer sends something.
            match scatter_read(stream, &mut segments)? {
                Some(n) => {
                    filled += n;
                    log::debug!("round {}: {filled}/{round_size} bytes", report.rounds + 1);
                }
                None => {
                    closed = true;
                    break;
                }
            }
        }
        debug_assert_eq!(round_size - filled, total_remaining(&segments));

        if filled > 0 {
            for segment in &mut segments {
                segment.flip();
            }
            let written = gather_write_all(sink, &mut segments)?;
            sink.flush()?;
            for segment in &mut segments {
                segment.clear();
            }

            report.rounds += 1;
            report.bytes += written as u64;
            counter!(telemetry::ROUNDS).increment(1);
            counter!(telemetry::BYTES_READ).increment(written as u64);
            log::info!("round {} written to sink ({written} bytes)", report.rounds);

            match send_reply(stream, &mut reply) {
                Err(e) if closed && e.is_disconnect() => {
                    log::debug!("peer gone before final reply: {e}");
                }
                other => other?,
            }
        }

        if closed {
            return Ok(report);
        }
    }
}

fn send_reply<S: Write>(stream: &mut S, reply: &mut ByteBuffer) -> Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    reply.clear();
    reply.put_slice(format!("{REPLY_PREFIX}{now}").as_bytes())?;
    reply.flip();
    let n = reply.write_all_to(stream)?;
    stream.flush()?;
    counter!(telemetry::BYTES_WRITTEN).increment(n as u64);

    Ok(())
}

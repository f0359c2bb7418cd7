use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};

use super::connection::{Connection, Phase};
use super::{SelectorHandle, SelectorStats};
use crate::config::SelectorConfig;
use crate::error::{Error, Result};
use crate::telemetry;

/// Reserved for the shutdown waker; listener and connection tokens count up from 0.
const WAKE_TOKEN: Token = Token(usize::MAX);

enum Source {
    Listener(TcpListener),
    Connection(Connection),
}

/// What a single poll event reported for a token.
struct Readiness {
    token: Token,
    readable: bool,
    writable: bool,
}

/// Single-threaded readiness loop over several listening ports.
///
/// Bytes read from any accepted connection are written to `sink`, one
/// connection buffer at a time.
pub struct Selector<W> {
    poll: Poll,
    events: Events,
    sources: HashMap<Token, Source>,
    next_token: usize,
    sink: W,
    read_buffer_size: usize,
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
    stats: SelectorStats,
}

impl<W: Write> Selector<W> {
    /// Binds every configured address and registers it for accept readiness.
    ///
    /// Listeners get tokens in configuration order, starting at 0. Accepted
    /// connections take the tokens after them, and a `mio::Waker` sits on a
    /// reserved token so [`SelectorHandle::shutdown`] can interrupt the wait.
    ///
    /// # Arguments
    ///
    /// * `config` - Listen addresses and the per-connection buffer size
    /// * `sink` - Destination for every byte read from any connection
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `config` fails validation, or an I/O
    /// error if the poll cannot be created or any address cannot be bound.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let file = File::create("selector.txt")?;
    /// let mut selector = Selector::bind(&SelectorConfig::default(), file)?;
    /// selector.run()?;
    /// ```
    pub fn bind(config: &SelectorConfig, sink: W) -> Result<Self> {
        config.validate()?;

        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        let mut sources = HashMap::with_capacity(config.addrs.len());

        for (id, &addr) in config.addrs.iter().enumerate() {
            // mio listeners are already non-blocking.
            let mut listener = TcpListener::bind(addr)?;
            let token = Token(id);
            poll.registry()
                .register(&mut listener, token, Interest::READABLE)?;
            log::info!("selector listening on {}", listener.local_addr()?);
            sources.insert(token, Source::Listener(listener));
        }

        Ok(Self {
            poll,
            events: Events::with_capacity(1024),
            sources,
            next_token: config.addrs.len(),
            sink,
            read_buffer_size: config.read_buffer_size,
            shutdown: Arc::new(AtomicBool::new(false)),
            waker,
            stats: SelectorStats::default(),
        })
    }

    /// Bound listener addresses, in configuration order.
    pub fn local_addrs(&self) -> Result<Vec<SocketAddr>> {
        let mut listeners: Vec<(Token, &TcpListener)> = self
            .sources
            .iter()
            .filter_map(|(&token, source)| match source {
                Source::Listener(listener) => Some((token, listener)),
                Source::Connection(_) => None,
            })
            .collect();
        listeners.sort_by_key(|(token, _)| *token);

        listeners
            .into_iter()
            .map(|(_, listener)| listener.local_addr().map_err(Error::from))
            .collect()
    }

    pub fn handle(&self) -> SelectorHandle {
        SelectorHandle::new(self.shutdown.clone(), self.waker.clone())
    }

    pub fn stats(&self) -> SelectorStats {
        self.stats
    }

    /// Number of accepted connections still open.
    pub fn connection_count(&self) -> usize {
        self.sources
            .values()
            .filter(|source| matches!(source, Source::Connection(_)))
            .count()
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Runs until [`SelectorHandle::shutdown`] is called.
    pub fn run(&mut self) -> Result<SelectorStats> {
        while !self.shutdown.load(Ordering::Acquire) {
            self.turn(None)?;
        }
        log::info!("selector stopped: {:?}", self.stats);

        Ok(self.stats)
    }

    /// Waits for readiness once and dispatches every ready token.
    ///
    /// Listeners drain their backlog, reading connections fill their buffer
    /// and switch to write readiness, writing connections flush their buffer
    /// into the sink and switch back to read readiness.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Upper bound on the wait; `None` blocks until something is ready
    ///
    /// # Returns
    ///
    /// The number of events handled, `0` on timeout or an interrupted wait.
    ///
    /// # Errors
    ///
    /// Fails when the poll itself fails or the sink rejects a write. A
    /// failing connection is closed and does not surface here.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(e) => return Err(e.into()),
        }

        let ready: Vec<Readiness> = self
            .events
            .iter()
            .map(|event| Readiness {
                token: event.token(),
                readable: event.is_readable() || event.is_read_closed() || event.is_error(),
                writable: event.is_writable(),
            })
            .collect();
        if !ready.is_empty() {
            log::debug!("{} keys ready", ready.len());
        }

        for readiness in &ready {
            self.dispatch(readiness)?;
        }

        Ok(ready.len())
    }

    fn dispatch(&mut self, readiness: &Readiness) -> Result<()> {
        if readiness.token == WAKE_TOKEN {
            return Ok(());
        }

        let phase = match self.sources.get(&readiness.token) {
            Some(Source::Listener(_)) => None,
            Some(Source::Connection(conn)) => Some(conn.phase),
            // Closed earlier in this batch.
            None => return Ok(()),
        };

        match phase {
            None => self.accept(readiness.token),
            Some(Phase::Reading) if readiness.readable => self.on_readable(readiness.token),
            Some(Phase::Writing) if readiness.writable => self.on_writable(readiness.token),
            Some(_) => Ok(()),
        }
    }

    fn accept(&mut self, token: Token) -> Result<()> {
        let Some(Source::Listener(listener)) = self.sources.get_mut(&token) else {
            return Ok(());
        };

        let (accepted, failure) = accept_pending(|| listener.accept());
        if let Some(e) = failure {
            log::warn!("accept failed: {e}");
            // Registrations are edge-triggered; re-arm so peers still in the
            // backlog produce another event.
            self.poll
                .registry()
                .reregister(listener, token, Interest::READABLE)?;
        }

        for (stream, peer) in accepted {
            self.admit(stream, peer);
        }

        Ok(())
    }

    /// Registers an accepted stream. A failure drops only that stream.
    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) {
        let mut conn = match Connection::new(stream, peer, self.read_buffer_size) {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("dropping {peer}: {e}");
                return;
            }
        };

        let conn_token = Token(self.next_token);
        self.next_token += 1;
        if let Err(e) = self
            .poll
            .registry()
            .register(&mut conn.stream, conn_token, conn.phase.interest())
        {
            log::warn!("dropping {peer}: register failed: {e}");
            return;
        }
        log::info!("event=accept peer={peer} port={}", conn.local_port);

        self.stats.accepted += 1;
        counter!(telemetry::CONNECTIONS_ACCEPTED).increment(1);
        gauge!(telemetry::CONNECTIONS_OPEN).increment(1.0);
        self.sources.insert(conn_token, Source::Connection(conn));
    }

    fn on_readable(&mut self, token: Token) -> Result<()> {
        let Some(Source::Connection(conn)) = self.sources.get_mut(&token) else {
            return Ok(());
        };

        conn.buffer.clear();
        match conn.buffer.read_from(&mut conn.stream) {
            Ok(Some(n)) => {
                log::debug!(
                    "event=read peer={} port={} bytes={n}",
                    conn.peer,
                    conn.local_port
                );
                self.stats.reads += 1;
                self.stats.bytes_in += n as u64;
                counter!(telemetry::BYTES_READ).increment(n as u64);

                conn.phase = Phase::Writing;
                self.poll
                    .registry()
                    .reregister(&mut conn.stream, token, conn.phase.interest())?;
            }
            Ok(None) => self.close(token, "closed by peer"),
            Err(e) if e.is_would_block() => {}
            Err(e) => {
                log::warn!("read failed: {e}");
                self.close(token, "read error");
            }
        }

        Ok(())
    }

    fn on_writable(&mut self, token: Token) -> Result<()> {
        let Some(Source::Connection(conn)) = self.sources.get_mut(&token) else {
            return Ok(());
        };

        conn.buffer.flip();
        let n = conn.buffer.write_all_to(&mut self.sink)?;
        self.sink.flush()?;
        conn.buffer.clear();
        log::debug!(
            "event=write peer={} port={} bytes={n}",
            conn.peer,
            conn.local_port
        );
        self.stats.writes += 1;
        self.stats.bytes_out += n as u64;
        counter!(telemetry::BYTES_WRITTEN).increment(n as u64);

        conn.phase = Phase::Reading;
        self.poll
            .registry()
            .reregister(&mut conn.stream, token, conn.phase.interest())?;

        Ok(())
    }

    fn close(&mut self, token: Token, reason: &str) {
        let Some(Source::Connection(mut conn)) = self.sources.remove(&token) else {
            return;
        };

        if let Err(e) = self.poll.registry().deregister(&mut conn.stream) {
            log::debug!("deregister {} failed: {e}", conn.peer);
        }
        self.stats.closed += 1;
        gauge!(telemetry::CONNECTIONS_OPEN).decrement(1.0);
        log::info!(
            "event=close peer={} port={} ({reason})",
            conn.peer,
            conn.local_port
        );
    }
}

/// Calls `accept` until the backlog is empty.
///
/// Aborted handshakes and interrupted calls are skipped. Any other error
/// stops the drain and is returned next to the connections already taken.
fn accept_pending<T>(mut accept: impl FnMut() -> io::Result<T>) -> (Vec<T>, Option<io::Error>) {
    let mut accepted = Vec::new();
    loop {
        match accept() {
            Ok(pair) => accepted.push(pair),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return (accepted, None),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                ) =>
            {
                log::debug!("accept skipped: {e}");
            }
            Err(e) => return (accepted, Some(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::net::{IpAddr, Ipv4Addr, Shutdown, TcpStream};
    use std::rc::Rc;
    use std::time::Instant;

    fn loopback(ports: usize) -> SelectorConfig {
        SelectorConfig::on_host(IpAddr::V4(Ipv4Addr::LOCALHOST), &vec![0; ports])
    }

    fn pump_until<W: Write>(selector: &mut Selector<W>, done: impl Fn(&Selector<W>) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(selector) {
            assert!(Instant::now() < deadline, "selector made no progress");
            selector.turn(Some(Duration::from_millis(20))).unwrap();
        }
    }

    #[test]
    fn binds_every_port() {
        let selector = Selector::bind(&loopback(3), Vec::new()).unwrap();
        let addrs = selector.local_addrs().unwrap();

        assert_eq!(addrs.len(), 3);
        assert!(addrs.iter().all(|addr| addr.port() != 0));
        assert_eq!(selector.connection_count(), 0);
    }

    #[test]
    fn echoes_each_port_into_sink() {
        let mut selector = Selector::bind(&loopback(2), Vec::new()).unwrap();
        let addrs = selector.local_addrs().unwrap();

        let mut first = TcpStream::connect(addrs[0]).unwrap();
        first.write_all(b"from the first port").unwrap();
        pump_until(&mut selector, |s| s.sink().len() == 19);

        let mut second = TcpStream::connect(addrs[1]).unwrap();
        second.write_all(b"second").unwrap();
        pump_until(&mut selector, |s| s.sink().len() == 25);

        assert_eq!(selector.sink().as_slice(), b"from the first portsecond");
        let stats = selector.stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.bytes_in, 25);
        assert_eq!(stats.bytes_out, 25);
        // 19 bytes need two 16-byte reads.
        assert!(stats.reads >= 3);
    }

    #[test]
    fn closes_on_peer_shutdown() {
        let mut selector = Selector::bind(&loopback(1), Vec::new()).unwrap();
        let addr = selector.local_addrs().unwrap()[0];

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"bye").unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        pump_until(&mut selector, |s| s.stats().closed == 1);
        assert_eq!(selector.connection_count(), 0);
        assert_eq!(selector.into_sink(), b"bye");
    }

    #[test]
    fn shutdown_before_run_returns_immediately() {
        let mut selector = Selector::bind(&loopback(1), Vec::new()).unwrap();
        let handle = selector.handle();

        handle.shutdown().unwrap();
        assert!(handle.is_shutdown());
        assert_eq!(selector.run().unwrap(), SelectorStats::default());
    }

    fn scripted(
        results: Vec<io::Result<u32>>,
    ) -> (impl FnMut() -> io::Result<u32>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut queue: VecDeque<io::Result<u32>> = results.into();
        let accept = move || {
            counter.set(counter.get() + 1);
            queue
                .pop_front()
                .unwrap_or_else(|| Err(io::ErrorKind::WouldBlock.into()))
        };
        (accept, calls)
    }

    #[test]
    fn accept_skips_aborted_handshakes() {
        let (accept, _) = scripted(vec![
            Ok(1),
            Err(io::ErrorKind::ConnectionAborted.into()),
            Err(io::ErrorKind::Interrupted.into()),
            Ok(2),
        ]);

        let (accepted, failure) = accept_pending(accept);
        assert_eq!(accepted, vec![1, 2]);
        assert!(failure.is_none());
    }

    #[test]
    fn accept_stops_on_hard_error() {
        let (accept, calls) = scripted(vec![
            Ok(1),
            Err(io::Error::other("too many open files")),
            Ok(3),
        ]);

        let (accepted, failure) = accept_pending(accept);
        assert_eq!(accepted, vec![1]);
        assert_eq!(failure.unwrap().to_string(), "too many open files");
        // The connection behind the error stays queued for the next event.
        assert_eq!(calls.get(), 2);
    }
}

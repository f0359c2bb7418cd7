use std::fs;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, Shutdown, TcpStream};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use nio_lab::config::SelectorConfig;
use nio_lab::selector::Selector;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn wait_for_len(path: &Path, len: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while fs::read(path).unwrap().len() < len {
        assert!(Instant::now() < deadline, "sink never reached {len} bytes");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn five_ports_share_one_sink() {
    let sink = NamedTempFile::new().unwrap();
    let config = SelectorConfig::on_host(IpAddr::V4(Ipv4Addr::LOCALHOST), &[0; 5]);
    let mut selector = Selector::bind(&config, sink.as_file().try_clone().unwrap()).unwrap();

    let addrs = selector.local_addrs().unwrap();
    assert_eq!(addrs.len(), 5);
    let handle = selector.handle();
    let worker = thread::spawn(move || selector.run());

    let mut expected = String::new();
    for (i, addr) in addrs.iter().enumerate() {
        // Longer than one 16-byte read buffer.
        let message = format!("message for listener number {i};");
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(message.as_bytes()).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        expected.push_str(&message);
        wait_for_len(sink.path(), expected.len());
    }

    handle.shutdown().unwrap();
    let stats = worker.join().unwrap().unwrap();

    assert_eq!(fs::read_to_string(sink.path()).unwrap(), expected);
    assert_eq!(stats.accepted, 5);
    assert_eq!(stats.bytes_in, expected.len() as u64);
    assert_eq!(stats.bytes_out, expected.len() as u64);
}

#[test]
fn interleaved_clients_keep_their_own_buffers() {
    let config = SelectorConfig {
        read_buffer_size: 4,
        ..SelectorConfig::on_host(IpAddr::V4(Ipv4Addr::LOCALHOST), &[0, 0])
    };
    let mut selector = Selector::bind(&config, Vec::new()).unwrap();
    let addrs = selector.local_addrs().unwrap();

    let mut first = TcpStream::connect(addrs[0]).unwrap();
    let mut second = TcpStream::connect(addrs[1]).unwrap();
    first.write_all(b"aaaa").unwrap();
    second.write_all(b"bbbb").unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while selector.sink().len() < 8 {
        assert!(Instant::now() < deadline, "selector made no progress");
        selector.turn(Some(Duration::from_millis(20))).unwrap();
    }

    // Each 4-byte chunk reaches the sink whole, whatever the order.
    let sink = selector.into_sink();
    assert!(sink == b"aaaabbbb" || sink == b"bbbbaaaa", "{sink:?}");
}

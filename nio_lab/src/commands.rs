//! Subcommand implementations

use std::fs::File;
use std::io::BufWriter;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use anyhow::{Context, Result};

use nio_lab::config::{ScatterConfig, SelectorConfig};
use nio_lab::scatter::ScatterGatherServer;
use nio_lab::selector::Selector;
use nio_lab::{ByteBuffer, IntBuffer, channel};

use crate::cli::Commands;

pub fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Ints { capacity, bound } => ints(capacity, bound),
        Commands::Head { path, capacity } => head(&path, capacity),
        Commands::Copy {
            from,
            to,
            chunk_size,
        } => copy(&from, &to, chunk_size),
        Commands::ReadOnly { text } => read_only(&text),
        Commands::Scatter {
            addr,
            segments,
            output,
            reply_capacity,
        } => scatter(
            ScatterConfig {
                addr,
                segments,
                reply_capacity,
            },
            &output,
        ),
        Commands::Select {
            host,
            ports,
            output,
            buffer_size,
        } => select(host, &ports, buffer_size, &output),
    }
}

fn ints(capacity: usize, bound: i32) -> Result<()> {
    let mut buffer = IntBuffer::fill_random(capacity, bound, &mut rand::rng())?;
    for value in buffer.drain() {
        println!("{value}");
    }
    Ok(())
}

fn head(path: &Path, capacity: usize) -> Result<()> {
    let text = channel::read_head(path, capacity)
        .with_context(|| format!("failed to read {}", path.display()))?;
    println!("{text}");
    Ok(())
}

fn copy(from: &Path, to: &Path, chunk_size: usize) -> Result<()> {
    let report = channel::copy_file(from, to, chunk_size)
        .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
    println!(
        "copied {} bytes in {} chunks, elapsed: {} ms",
        report.bytes,
        report.chunks,
        report.elapsed.as_millis()
    );
    Ok(())
}

fn read_only(text: &str) -> Result<()> {
    let mut view = ByteBuffer::wrap(text.as_bytes().to_vec()).as_read_only();
    match view.put(1) {
        Err(e) => println!("write rejected as expected: {e}"),
        Ok(()) => anyhow::bail!("read-only buffer accepted a write"),
    }
    Ok(())
}

fn scatter(config: ScatterConfig, output: &Path) -> Result<()> {
    let server = ScatterGatherServer::bind(config)?;
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut sink = BufWriter::new(file);

    // Keep the port open: serve peers one after another.
    loop {
        match server.serve(&mut sink) {
            Ok(report) => println!(
                "session finished: {} rounds, {} bytes written to {}",
                report.rounds,
                report.bytes,
                output.display()
            ),
            Err(e) if e.is_disconnect() => log::warn!("session aborted: {e}"),
            Err(e) => return Err(e.into()),
        }
    }
}

fn select(host: IpAddr, ports: &[u16], buffer_size: usize, output: &Path) -> Result<()> {
    let config = SelectorConfig {
        read_buffer_size: buffer_size,
        ..SelectorConfig::on_host(host, ports)
    };
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let mut selector = Selector::bind(&config, file)?;
    let addrs: Vec<String> = selector
        .local_addrs()?
        .iter()
        .map(SocketAddr::to_string)
        .collect();
    println!("selector watching {}", addrs.join(", "));

    let stats = selector.run()?;
    println!("{stats:?}");
    Ok(())
}

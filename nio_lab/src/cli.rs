//! Root CLI structure for nio_lab

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nio_lab")]
#[command(about = "Buffer, scatter/gather and readiness-selector demonstrations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Serve Prometheus metrics on 127.0.0.1:<PORT>/metrics
    #[arg(long, value_name = "PORT", env = "NIO_LAB_METRICS_PORT", global = true)]
    pub metrics_port: Option<u16>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fill an integer buffer with random values and drain it
    Ints {
        #[arg(long, default_value_t = nio_lab::buffer::DEFAULT_INT_CAPACITY)]
        capacity: usize,

        /// Values are drawn from 0..BOUND
        #[arg(long, default_value_t = nio_lab::buffer::DEFAULT_INT_BOUND)]
        bound: i32,
    },

    /// Print the first bytes of a file as text
    Head {
        #[arg(long, default_value = "pom.xml", env = "NIO_LAB_HEAD_PATH")]
        path: PathBuf,

        #[arg(long, default_value_t = nio_lab::config::FILE_CHUNK_SIZE)]
        capacity: usize,
    },

    /// Copy a file through a fixed-size buffer and report the time taken
    Copy {
        #[arg(long, default_value = "pom.xml", env = "NIO_LAB_COPY_FROM")]
        from: PathBuf,

        #[arg(long, default_value = "pom_new.xml", env = "NIO_LAB_COPY_TO")]
        to: PathBuf,

        #[arg(long, default_value_t = nio_lab::config::FILE_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Wrap text in a read-only buffer and attempt a write
    ReadOnly {
        #[arg(long, default_value = "hello world!")]
        text: String,
    },

    /// Serve connections one at a time, scatter-reading fixed-size rounds into a file
    Scatter {
        #[arg(long, default_value = "0.0.0.0:8088", env = "NIO_LAB_SCATTER_ADDR")]
        addr: SocketAddr,

        /// Segment capacities, in read order
        #[arg(long, value_delimiter = ',', default_value = "5,10,15")]
        segments: Vec<usize>,

        #[arg(long, default_value = "http.txt", env = "NIO_LAB_SCATTER_OUTPUT")]
        output: PathBuf,

        #[arg(long, default_value_t = nio_lab::config::REPLY_CAPACITY)]
        reply_capacity: usize,
    },

    /// Watch several ports with one readiness selector and append what arrives to a file
    Select {
        #[arg(long, default_value = "0.0.0.0", env = "NIO_LAB_SELECT_HOST")]
        host: IpAddr,

        #[arg(
            long,
            value_delimiter = ',',
            default_value = "8081,8082,8083,8084,8085",
            env = "NIO_LAB_SELECT_PORTS"
        )]
        ports: Vec<u16>,

        #[arg(long, default_value = "selector.txt", env = "NIO_LAB_SELECT_OUTPUT")]
        output: PathBuf,

        /// Per-connection read buffer size
        #[arg(long, default_value_t = nio_lab::config::SELECTOR_READ_BUFFER)]
        buffer_size: usize,
    },
}

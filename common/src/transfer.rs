use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing::instrument;

use crate::config::{Destination, ProgressSettings, Protocol};
use crate::error::Error;
use crate::{format, progress};

/// Readable input to send line by line
pub struct Source {
    name: String,
    reader: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
    total_size: u64,
}

impl Source {
    /// `total_size` of 0 means unknown, progress then omits the percentage
    pub fn new(
        name: impl Into<String>,
        reader: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
        total_size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            reader,
            total_size,
        }
    }

    /// Opens a file, its size is known only if it is a regular file
    #[instrument]
    pub async fn open(path: &std::path::Path) -> Result<Self, Error> {
        let name = display_name(path);
        let open_error = |source| Error::Open {
            name: path.display().to_string(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(open_error)?;
        let metadata = file.metadata().await.map_err(open_error)?;
        if metadata.is_dir() {
            return Err(open_error(std::io::Error::other("is a directory")));
        }
        let total_size = if metadata.is_file() { metadata.len() } else { 0 };
        tracing::debug!("opened {:?}, size: {}", path, format::bytes(total_size));
        Ok(Self::new(name, Box::new(file), total_size))
    }

    /// Process standard input
    pub fn stdin(total_size: u64) -> Self {
        Self::new("stdin", Box::new(tokio::io::stdin()), total_size)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("total_size", &self.total_size)
            .finish()
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Open transport to the destination, released on drop
#[derive(Debug)]
enum Connection {
    Tcp(tokio::net::TcpStream),
    Udp(tokio::net::UdpSocket),
}

impl Connection {
    async fn connect(destination: &Destination) -> std::io::Result<Self> {
        match destination.protocol {
            Protocol::Tcp => {
                let stream = tokio::net::TcpStream::connect(destination.address.as_str()).await?;
                // every line is its own write, don't let Nagle merge them
                stream.set_nodelay(true)?;
                Ok(Connection::Tcp(stream))
            }
            Protocol::Udp => {
                let mut last_error = None;
                for addr in tokio::net::lookup_host(destination.address.as_str()).await? {
                    match Self::connect_udp(addr).await {
                        Ok(socket) => return Ok(Connection::Udp(socket)),
                        Err(error) => {
                            tracing::debug!("udp connect to {addr} failed: {error}");
                            last_error = Some(error);
                        }
                    }
                }
                Err(last_error.unwrap_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "could not resolve to any address",
                    )
                }))
            }
        }
    }

    async fn connect_udp(addr: std::net::SocketAddr) -> std::io::Result<tokio::net::UdpSocket> {
        let bind_addr: std::net::SocketAddr = if addr.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = tokio::net::UdpSocket::bind(bind_addr).await?;
        socket.connect(addr).await?;
        Ok(socket)
    }

    /// One write per line for TCP, one datagram per line for UDP
    async fn send(&mut self, payload: &[u8]) -> std::io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.write_all(payload).await,
            Connection::Udp(socket) => socket.send(payload).await.map(|_| ()),
        }
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Connection::Tcp(stream) => stream.flush().await,
            Connection::Udp(_) => Ok(()),
        }
    }
}

/// Result of one successful transfer
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub lines_sent: u64,
    /// Payload bytes plus one delimiter per line
    pub bytes_sent: u64,
    pub elapsed: std::time::Duration,
}

impl Summary {
    /// Lines per second, `None` when no time has elapsed
    pub fn rate(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            Some(self.lines_sent as f64 / secs)
        } else {
            None
        }
    }
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            lines_sent: self.lines_sent + other.lines_sent,
            bytes_sent: self.bytes_sent + other.bytes_sent,
            elapsed: self.elapsed + other.elapsed,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "lines sent: {}\n\
            bytes sent: {}\n\
            elapsed: {:.2?}",
            self.lines_sent,
            bytesize::ByteSize(self.bytes_sent),
            self.elapsed
        )
    }
}

/// Final line printed once a source is fully sent
pub fn completion_message(name: &str, summary: &Summary) -> String {
    let rate = summary
        .rate()
        .map_or_else(|| "n/a".to_string(), |rate| format!("{rate:.2}"));
    format!(
        "\rtransfer: Successfully sent '{}' ({} packets in {:.2?}) {} pkt/sec",
        name, summary.lines_sent, summary.elapsed, rate
    )
}

/// Strips the newline and an optional carriage return before it
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn send_lines(
    name: &str,
    reader: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
    connection: &mut Connection,
    destination: &Destination,
    limiter: &throttle::Limiter,
    stats: &progress::TransferStats,
) -> Result<(), Error> {
    let mut reader = tokio::io::BufReader::new(reader);
    let mut line = Vec::new();
    let write_error = |source| Error::Write {
        destination: destination.to_string(),
        lines_sent: stats.lines(),
        source,
    };
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|source| Error::Read {
                name: name.to_string(),
                source,
            })?;
        if read == 0 {
            break;
        }
        let payload = strip_line_ending(&line);
        limiter.take().await;
        connection.send(payload).await.map_err(write_error)?;
        stats.add_line(payload.len() as u64 + 1);
    }
    connection.flush().await.map_err(write_error)
}

/// Sends every line of `source` to `destination`, one write (or datagram) per line
///
/// Each line is paced through `limiter` and goes out without its line terminator. Progress is
/// rendered in the background while the transfer runs, and a completion line is printed at the
/// end. The connection is not retried: any connect, read or write failure ends this transfer.
#[instrument(skip(source, limiter, progress), fields(source = %source.name))]
pub async fn transfer(
    source: Source,
    destination: &Destination,
    limiter: &throttle::Limiter,
    progress: &ProgressSettings,
) -> Result<Summary, Error> {
    let Source {
        name,
        reader,
        total_size,
    } = source;
    let mut connection = Connection::connect(destination)
        .await
        .map_err(|source| Error::Connect {
            destination: destination.to_string(),
            source,
        })?;
    tracing::debug!("connected to {}", destination);
    let stats = std::sync::Arc::new(progress::TransferStats::new(total_size));
    let cancel = tokio_util::sync::CancellationToken::new();
    let reporter = progress.enabled.then(|| {
        progress::spawn_reporter(name.clone(), stats.clone(), *progress, cancel.clone())
    });
    let result = send_lines(&name, reader, &mut connection, destination, limiter, &stats).await;
    let elapsed = stats.get_duration();
    cancel.cancel();
    let renders = match reporter {
        Some(reporter) => reporter.await.unwrap_or_else(|error| {
            tracing::debug!("progress reporter failed: {error}");
            0
        }),
        None => 0,
    };
    if let Err(error) = result {
        if renders > 0 {
            // finish the progress line before errors get logged
            print_stdout("");
        }
        return Err(error);
    }
    let summary = Summary {
        lines_sent: stats.lines(),
        bytes_sent: stats.bytes(),
        elapsed,
    };
    print_stdout(&completion_message(&name, &summary));
    Ok(summary)
}

/// Writes one line, a closed or full stdout must not fail the transfer
fn print_stdout(line: &str) {
    if let Err(error) = write_line(&mut std::io::stdout().lock(), line) {
        tracing::debug!("failed to print to stdout: {error}");
    }
}

fn write_line(out: &mut impl std::io::Write, line: &str) -> std::io::Result<()> {
    writeln!(out, "{line}")?;
    out.flush()
}

use tokio::io::AsyncReadExt;

/// Accepts a single TCP connection and resolves to everything received on it
pub async fn tcp_sink() -> anyhow::Result<(String, tokio::task::JoinHandle<anyhow::Result<Vec<u8>>>)>
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?.to_string();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await?;
        Ok(received)
    });
    Ok((address, server))
}

/// Accepts any number of TCP connections, collecting the bytes of each one in accept order
pub async fn tcp_collector() -> anyhow::Result<(
    String,
    std::sync::Arc<tokio::sync::Mutex<Vec<Vec<u8>>>>,
    tokio::task::JoinHandle<()>,
)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?.to_string();
    let received = std::sync::Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let server = {
        let received = received.clone();
        tokio::spawn(async move {
            // connections are handled one at a time, sources are sent sequentially
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut data = Vec::new();
                if stream.read_to_end(&mut data).await.is_ok() {
                    received.lock().await.push(data);
                }
            }
        })
    };
    Ok((address, received, server))
}

/// Receives `count` datagrams
pub async fn udp_sink(
    count: usize,
) -> anyhow::Result<(String, tokio::task::JoinHandle<anyhow::Result<Vec<Vec<u8>>>>)> {
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await?;
    let address = socket.local_addr()?.to_string();
    let server = tokio::spawn(async move {
        let mut datagrams = Vec::with_capacity(count);
        let mut buf = vec![0u8; 64 * 1024];
        while datagrams.len() < count {
            let len = tokio::time::timeout(std::time::Duration::from_secs(5), socket.recv(&mut buf))
                .await??;
            datagrams.push(buf[..len].to_vec());
        }
        Ok(datagrams)
    });
    Ok((address, server))
}

/// Address of a port that nothing listens on
pub async fn unused_tcp_address() -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?.to_string();
    drop(listener);
    Ok(address)
}

/// Address of a UDP port that nothing listens on, sends to it get ICMP port unreachable
pub async fn unused_udp_address() -> anyhow::Result<String> {
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await?;
    let address = socket.local_addr()?.to_string();
    drop(socket);
    Ok(address)
}

/// Reader that always fails
pub struct FailingReader;

impl tokio::io::AsyncRead for FailingReader {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        _buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Err(std::io::Error::other("simulated read failure")))
    }
}

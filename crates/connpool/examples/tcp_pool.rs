//! TCP connection pool demo.
//!
//! Starts a local echo listener, drives a pool of four connections against
//! it with keepalive probing enabled, and performs a retried round trip.
//!
//! ```bash
//! cargo run -p connpool --example tcp_pool
//! ```

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use connpool::{retry, Connector, Pool, PoolConfig, RetryPolicy};

struct TcpConnector {
    addr: SocketAddr,
}

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpStream;
    type Error = io::Error;

    async fn connect(&self) -> Option<TcpStream> {
        match TcpStream::connect(self.addr).await {
            Ok(stream) => Some(stream),
            Err(err) => {
                tracing::debug!(error = %err, "endpoint not ready");
                None
            }
        }
    }

    async fn probe(&self, conn: &mut TcpStream) -> io::Result<()> {
        conn.write_all(b"ping\n").await?;
        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).await?;
        Ok(())
    }
}

async fn serve_echo(listener: TcpListener) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else {
            break;
        };
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 || socket.write_all(&buf[..n]).await.is_err() {
                    break;
                }
            }
        });
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(serve_echo(listener));

    let config = PoolConfig::new(4).keepalive(Duration::from_secs(8));
    let pool = Pool::new(TcpConnector { addr }, config)?;

    let policy = RetryPolicy::new()
        .max_failures(3)
        .interval(Duration::from_millis(250))
        .on_retry(|name, err: &io::Error| {
            eprintln!("retrying {name}: {err}");
        });

    let reply = retry("echo", &policy, || {
        let pool = pool.clone();
        async move {
            let mut conn = pool.acquire().await.map_err(io::Error::other)?;
            let outcome = async {
                conn.write_all(b"hello\n").await?;
                let mut buf = [0u8; 6];
                conn.read_exact(&mut buf).await?;
                Ok(String::from_utf8_lossy(&buf).into_owned())
            }
            .await;
            conn.release(outcome)
        }
    })
    .await?;

    println!("echoed: {}", reply.trim_end());
    println!("status: {:?}", pool.status());

    pool.close();
    Ok(())
}

//! Scripted HTTP server for exercising the network clients

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the server does with one request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Status code and JSON body
    Json(u16, String),
    /// Read the request and never answer
    Hang,
}

impl Reply {
    pub fn ok(body: serde_json::Value) -> Self {
        Self::Json(200, body.to_string())
    }

    pub fn status(status: u16, body: serde_json::Value) -> Self {
        Self::Json(status, body.to_string())
    }
}

/// Serves replies in order, one per connection; the last reply repeats
pub struct HttpStub {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl HttpStub {
    pub async fn serve(replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "stub needs at least one reply");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let reply = replies[n.min(replies.len() - 1)].clone();
                tokio::spawn(answer(stream, reply));
            }
        });

        Self { addr, hits }
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:PORT`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn answer(mut stream: TcpStream, reply: Reply) {
    if read_request(&mut stream).await.is_err() {
        return;
    }

    match reply {
        Reply::Json(status, body) => {
            let response = format!(
                "HTTP/1.1 {} Stub\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
}

/// Consume the request head and its content-length body
async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(())
}

//! Mock mail-provider HTTP server for transport tests.
//!
//! Serves a scripted sequence of responses: the first connection gets the
//! first script entry, the second the next, and the final entry repeats
//! for any further connections. Each response closes the connection so
//! every attempt is observable as one hit.

#![allow(dead_code)] // Test utility module - not all methods used in every test

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

/// One scripted provider response.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub body: String,
    pub retry_after: Option<u64>,
}

impl ScriptedResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            retry_after: None,
        }
    }

    pub fn with_body(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(status: u16, retry_after: u64) -> Self {
        Self {
            status,
            body: String::new(),
            retry_after: Some(retry_after),
        }
    }
}

pub struct MockProvider {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Bind a listener and start serving the script.
    pub async fn start(script: Vec<ScriptedResponse>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));

        let task_hits = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let hit = task_hits.fetch_add(1, Ordering::SeqCst);
                let response = script[hit.min(script.len() - 1)].clone();
                if handle_connection(stream, &response).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { addr, hits })
    }

    /// Endpoint URL for pointing the transport at this server.
    pub fn url(&self) -> String {
        format!("http://{}/v3/mail/send", self.addr)
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn handle_connection(
    stream: TcpStream,
    response: &ScriptedResponse,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    // Consume request headers, remembering the body length.
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        let lower = trimmed.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    // Drain the request body.
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    let reason = match response.status {
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Response",
    };

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason,
        response.body.len()
    );
    if let Some(secs) = response.retry_after {
        head.push_str(&format!("Retry-After: {secs}\r\n"));
    }
    head.push_str("\r\n");

    let mut stream = reader.into_inner();
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(response.body.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

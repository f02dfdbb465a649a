//! Webhook listener for AINVR alert notifications.
//!
//! The server POSTs alerts to `/alert...` with a JSON body and optional
//! query parameters. Each accepted alert is logged and handed to the
//! caller through [`AlertHandle`].

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const MAX_HEADER_BYTES: usize = 8192;
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
const ALERT_PATH_PREFIX: &str = "/alert";

#[derive(Clone, Debug)]
pub struct AlertConfig {
    pub addr: String,
    /// Budget for reading one whole request, headers and body together.
    pub request_timeout: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:7777".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// One received alert.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    pub path: String,
    /// Decoded query parameters in request order; keys may repeat.
    pub query: Vec<(String, String)>,
    pub body: serde_json::Value,
}

#[derive(Debug)]
pub struct AlertHandle {
    pub addr: SocketAddr,
    alerts: Receiver<Alert>,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl AlertHandle {
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Alert> {
        match self.alerts.recv_timeout(timeout) {
            Ok(alert) => Some(alert),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<Alert> {
        match self.alerts.try_recv() {
            Ok(alert) => Some(alert),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("alert receiver thread panicked"))?;
        }
        Ok(())
    }
}

pub struct AlertReceiver {
    cfg: AlertConfig,
}

impl AlertReceiver {
    pub fn new(cfg: AlertConfig) -> Self {
        Self { cfg }
    }

    pub fn spawn(self) -> Result<AlertHandle> {
        let configured_addr: SocketAddr = self
            .cfg
            .addr
            .parse()
            .map_err(|e| anyhow!("invalid alert address '{}': {}", self.cfg.addr, e))?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let (tx, rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let request_timeout = self.cfg.request_timeout;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_receiver(listener, tx, shutdown_thread, request_timeout) {
                log::error!("alert receiver stopped: {}", err);
            }
        });

        Ok(AlertHandle {
            addr,
            alerts: rx,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_receiver(
    listener: TcpListener,
    tx: Sender<Alert>,
    shutdown: Arc<AtomicBool>,
    request_timeout: Duration,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                let deadline = Instant::now() + request_timeout;
                if let Err(err) = handle_connection(stream, &tx, deadline) {
                    log::warn!("alert request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, tx: &Sender<Alert>, deadline: Instant) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(Some(Duration::from_secs(2)))?;
    let (request, leftover) = read_head(&mut stream, deadline)?;
    if request.method != "POST" {
        write_response(&mut stream, 405, "Method Not Allowed")?;
        return Ok(());
    }
    log::info!("alert received...");
    if !request.path.starts_with(ALERT_PATH_PREFIX) {
        write_response(&mut stream, 404, "Not Found")?;
        return Ok(());
    }

    let query = request.query_pairs();
    for (key, value) in &query {
        log::info!("{} = {}", key, value);
    }

    let content_len = match request.content_length() {
        Some(len) => len,
        None => {
            write_response(&mut stream, 411, "Length Required")?;
            return Err(anyhow!("missing or invalid Content-Length"));
        }
    };
    if content_len > MAX_BODY_BYTES {
        write_response(&mut stream, 413, "Payload Too Large")?;
        return Err(anyhow!("alert body of {} bytes exceeds limit", content_len));
    }
    let body = read_body(&mut stream, leftover, content_len, deadline)?;
    let body: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            write_response(&mut stream, 400, "Bad Request")?;
            return Err(anyhow!("alert body is not valid JSON: {}", err));
        }
    };
    log::info!("{}", body);

    write_response(&mut stream, 200, "OK")?;
    let alert = Alert {
        path: request.path,
        query,
        body,
    };
    if tx.send(alert).is_err() {
        log::debug!("alert handle dropped; alert not delivered");
    }
    Ok(())
}

/// Reads once, with the socket timeout cut to whatever is left before
/// `deadline`.
fn read_before(stream: &mut TcpStream, buf: &mut [u8], deadline: Instant) -> Result<usize> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or_else(|| anyhow!("request deadline exceeded"))?;
    stream.set_read_timeout(Some(remaining))?;
    match stream.read(buf) {
        Ok(n) => Ok(n),
        Err(err)
            if err.kind() == std::io::ErrorKind::WouldBlock
                || err.kind() == std::io::ErrorKind::TimedOut =>
        {
            Err(anyhow!("request deadline exceeded"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Reads up to the end of the header block. Returns the parsed request and
/// any body bytes that arrived with the headers.
fn read_head(stream: &mut TcpStream, deadline: Instant) -> Result<(HttpRequest, Vec<u8>)> {
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        let n = read_before(stream, &mut buf, deadline)?;
        if n == 0 {
            return Err(anyhow!("connection closed before end of headers"));
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(anyhow!("request headers too large"));
        }
    };
    let leftover = data.split_off(header_end + 4);
    let text = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok((
        HttpRequest {
            method: method.to_string(),
            path,
            headers,
            raw_path: raw_path.to_string(),
        },
        leftover,
    ))
}

fn read_body(
    stream: &mut TcpStream,
    mut body: Vec<u8>,
    content_len: usize,
    deadline: Instant,
) -> Result<Vec<u8>> {
    let mut buf = [0u8; 4096];
    while body.len() < content_len {
        let want = (content_len - body.len()).min(buf.len());
        let n = read_before(stream, &mut buf[..want], deadline)?;
        if n == 0 {
            return Err(anyhow!("connection closed before end of body"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_len);
    Ok(body)
}

fn write_response(stream: &mut TcpStream, status: u16, reason: &str) -> Result<()> {
    let header = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status = status,
        reason = reason
    );
    stream.write_all(header.as_bytes())?;
    stream.flush()?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    raw_path: String,
}

impl HttpRequest {
    fn content_length(&self) -> Option<usize> {
        self.headers
            .get("content-length")
            .and_then(|value| value.parse().ok())
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        match self.raw_path.split_once('?') {
            Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            None => Vec::new(),
        }
    }
}

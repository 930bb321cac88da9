//! Local stand-in for the gateway firmware's web server.
//!
//! Serves the same four endpoints with the firmware's queue semantics so the
//! client can be exercised without hardware:
//!
//! - incoming messages sit in a queue of at most [`QUEUE_CAPACITY`];
//! - each `GET /messages` drains at most [`MAX_BATCH`] of them;
//! - `POST /send` is forwarded to (simulated) radio peers and, unless echo is
//!   enabled, never comes back through `/messages`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rand::Rng;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::api::{Message, WifiInfo, MESSAGES_PATH, PEERS_PATH, SEND_PATH, WIFI_INFO_PATH};
use crate::error::{MeshError, Result};
use crate::form::parse_form;

pub const QUEUE_CAPACITY: usize = 50;
pub const MAX_BATCH: usize = 10;
/// Firmware truncates decoded messages to this many bytes.
pub const MAX_MESSAGE_BYTES: usize = 255;

const MAX_HEADERS: usize = 32;
const MAX_REQUEST_BYTES: usize = 16 * 1024;

/// Options for a mock gateway.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub wifi: WifiInfo,
    /// Number of simulated radio peers.
    pub peers: usize,
    /// Queue sent messages back as if received from the gateway itself.
    pub echo: bool,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            wifi: WifiInfo {
                ssid: "ESP32-Mesh-NOW".to_string(),
                password: "meshnow123".to_string(),
                channel: 1,
            },
            peers: 2,
            echo: false,
        }
    }
}

/// Format six bytes as `aa:bb:cc:dd:ee:ff`.
pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn random_mac<R: Rng>(rng: &mut R) -> [u8; 6] {
    let mut mac: [u8; 6] = rng.gen();
    // Locally administered unicast.
    mac[0] = (mac[0] | 0x02) & 0xfe;
    mac
}

/// Queue and peer table of one mock gateway.
#[derive(Debug)]
pub struct GatewayState {
    queue: VecDeque<Message>,
    peers: Vec<String>,
    own_mac: String,
    wifi: WifiInfo,
    echo: bool,
    started: Instant,
}

impl GatewayState {
    pub fn new(options: GatewayOptions) -> Self {
        let mut rng = rand::thread_rng();
        let own_mac = format_mac(&random_mac(&mut rng));
        let peers = (0..options.peers)
            .map(|_| format_mac(&random_mac(&mut rng)))
            .collect();
        Self {
            queue: VecDeque::with_capacity(QUEUE_CAPACITY),
            peers,
            own_mac,
            wifi: options.wifi,
            echo: options.echo,
            started: Instant::now(),
        }
    }

    /// Milliseconds since the gateway started, the firmware's message clock.
    pub fn uptime_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Queue a message as received from `sender`. Returns `false` (message
    /// dropped) when the queue is full.
    pub fn receive(&mut self, sender: impl Into<String>, content: &str) -> bool {
        if self.queue.len() >= QUEUE_CAPACITY {
            warn!(queued = self.queue.len(), "mock gateway queue full, dropping message");
            return false;
        }
        let timestamp = self.uptime_ms();
        self.queue
            .push_back(Message::new(sender, truncate_bytes(content, MAX_MESSAGE_BYTES), timestamp));
        true
    }

    /// Handle a locally submitted message.
    pub fn submit(&mut self, content: &str) {
        info!(peers = self.peers.len(), "mock gateway broadcasting message");
        if self.echo {
            let own = self.own_mac.clone();
            self.receive(own, content);
        }
    }

    /// Take up to [`MAX_BATCH`] queued messages, oldest first.
    pub fn drain_batch(&mut self) -> Vec<Message> {
        let n = self.queue.len().min(MAX_BATCH);
        self.queue.drain(..n).collect()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn own_mac(&self) -> &str {
        &self.own_mac
    }

    pub fn wifi(&self) -> &WifiInfo {
        &self.wifi
    }
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shared gateway state.
pub type SharedGateway = Arc<Mutex<GatewayState>>;

pub fn new_gateway(options: GatewayOptions) -> SharedGateway {
    Arc::new(Mutex::new(GatewayState::new(options)))
}

/// A routed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_string(),
        }
    }
}

/// Route one request against the gateway state.
pub fn route(state: &SharedGateway, method: &str, path: &str, body: &str) -> Reply {
    let Ok(mut gw) = state.lock() else {
        return Reply::text(500, "state unavailable");
    };
    match (method, path) {
        ("GET", "/") => Reply::text(200, "Mesh-NOW mock gateway"),
        ("POST", SEND_PATH) => {
            if let Some(message) = parse_form(body).get("message") {
                gw.submit(message);
            }
            Reply::text(200, "OK")
        }
        ("GET", MESSAGES_PATH) => Reply::json(json!({ "messages": gw.drain_batch() })),
        ("GET", PEERS_PATH) => Reply::json(json!({ "peers": gw.peers() })),
        ("GET", WIFI_INFO_PATH) => {
            let wifi = gw.wifi();
            Reply::json(json!({
                "ssid": wifi.ssid,
                "password": wifi.password,
                "channel": wifi.channel,
            }))
        }
        _ => Reply::text(404, "Not Found"),
    }
}

/// Accept connections until the listener fails.
pub async fn serve(listener: TcpListener, state: SharedGateway) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock gateway listening");
    }
    loop {
        let (stream, peer) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                debug!(%peer, error = %e, "connection error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: SharedGateway) -> Result<()> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    // Read until the header block parses, then until the body is complete.
    let (method, path, body_start, content_length) = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_REQUEST_BYTES {
            return write_reply(&mut stream, &Reply::text(413, "Payload Too Large")).await;
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(&buf) {
            Ok(httparse::Status::Complete(header_len)) => {
                let content_length = req
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("content-length"))
                    .and_then(|h| std::str::from_utf8(h.value).ok())
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                let method = req.method.unwrap_or("GET").to_string();
                let path = req.path.unwrap_or("/").to_string();
                break (method, path, header_len, content_length);
            }
            Ok(httparse::Status::Partial) => continue,
            Err(e) => {
                let _ = write_reply(&mut stream, &Reply::text(400, "Bad Request")).await;
                return Err(MeshError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    e.to_string(),
                )));
            }
        }
    };

    let body_len = match body_start.checked_add(content_length) {
        Some(total) if total <= MAX_REQUEST_BYTES => total,
        _ => {
            debug!(content_length, "rejecting oversized request body");
            return write_reply(&mut stream, &Reply::text(413, "Payload Too Large")).await;
        }
    };
    while buf.len() < body_len {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(body_len);
    let body = String::from_utf8_lossy(&buf[body_start..body_end]);

    let path = path.split('?').next().unwrap_or("/");
    let reply = route(&state, &method, path, &body);
    debug!(%method, %path, status = reply.status, "mock gateway request");
    write_reply(&mut stream, &reply).await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        _ => "Internal Server Error",
    }
}

async fn write_reply(stream: &mut TcpStream, reply: &Reply) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason(reply.status),
        reply.content_type,
        reply.body.len(),
        reply.body,
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

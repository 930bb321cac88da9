//! The chat application: initial sync, sending, both poll loops, and the
//! devtools commands, all driven from one UI task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::view::{ChatView, Surface, SystemKind, SELF_SENDER};
use crate::api::{Message, WifiInfo};
use crate::client::MeshClient;
use crate::config::ClientConfig;
use crate::devtools::buffer::now_ms;
use crate::devtools::{Devtools, DevtoolsPanel, LogArg};
use crate::error::{MeshError, Result};
use crate::transport::Transport;

pub const CONNECTED_FALLBACK: &str = "Connected to ESP32 Mesh Network";
pub const SEND_FAILED: &str = "Failed to send message";
pub const NETWORK_ERROR: &str = "Network error";
pub const DRAFT_TOO_LONG: &str = "Message too long";

/// Longest draft accepted for sending, in characters.
pub const MAX_DRAFT_CHARS: usize = 200;

/// Ctrl+` arrives as NUL on most terminals.
pub const DEVTOOLS_SHORTCUT: char = '\u{0}';

/// What a line typed into the input row asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A chat draft to send.
    Message(String),
    ToggleDevtools,
    ClearDevtools,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        if line.contains(DEVTOOLS_SHORTCUT) {
            return Command::ToggleDevtools;
        }
        match line.trim() {
            "/devtools" | "/dt" => Command::ToggleDevtools,
            "/clear" => Command::ClearDevtools,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Message(line.to_string()),
        }
    }
}

/// Result of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Draft was blank; nothing was sent.
    Empty,
    /// Draft exceeded [`MAX_DRAFT_CHARS`]; nothing was sent.
    TooLong,
    Sent,
    /// The gateway answered with this non-2xx status.
    Rejected(u16),
    /// The gateway never answered.
    Failed,
}

/// Results coming back from spawned request tasks.
#[derive(Debug)]
pub enum Update {
    Messages(Result<Vec<Message>>),
    Peers(Result<usize>),
    Sent { text: String, result: Result<()> },
}

/// Chat client state owned by the UI task.
pub struct ChatApp<T, S> {
    client: Arc<MeshClient<T>>,
    devtools: Devtools,
    view: ChatView<S>,
    panel: DevtoolsPanel,
    input: String,
    message_poll: Duration,
    peer_poll: Duration,
    open_panel_at_start: bool,
    drawn_revision: Option<u64>,
    panel_refresh: Duration,
    last_panel_draw: Option<Instant>,
}

impl<T: Transport, S: Surface> ChatApp<T, S> {
    pub fn new(client: MeshClient<T>, devtools: Devtools, surface: S, config: &ClientConfig) -> Self {
        Self {
            client: Arc::new(client),
            devtools,
            view: ChatView::new(surface, config.max_messages),
            panel: DevtoolsPanel::new(),
            input: String::new(),
            message_poll: config.message_poll_interval(),
            peer_poll: config.peer_poll_interval(),
            open_panel_at_start: config.devtools_open,
            drawn_revision: None,
            panel_refresh: config.panel_refresh_interval(),
            last_panel_draw: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn client(&self) -> &MeshClient<T> {
        &self.client
    }

    pub fn view(&self) -> &ChatView<S> {
        &self.view
    }

    pub fn panel(&self) -> &DevtoolsPanel {
        &self.panel
    }

    pub fn devtools(&self) -> &Devtools {
        &self.devtools
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    // -----------------------------------------------------------------------
    // Chat operations
    // -----------------------------------------------------------------------

    /// Draw the header, then pull WiFi info and the peer count once.
    ///
    /// Never fails: a missing `/wifi-info` falls back to a generic
    /// connection notice.
    pub async fn initialize(&mut self) {
        self.view.draw_header();
        if self.open_panel_at_start {
            self.toggle_devtools();
        }
        let wifi = self.client.fetch_wifi_info().await;
        self.apply_wifi(wifi);
        let peers = self.client.fetch_peers().await;
        self.apply_peers(peers);
    }

    pub fn apply_wifi(&mut self, result: Result<WifiInfo>) {
        match result {
            Ok(info) => {
                debug!(?info, "wifi info");
                self.view.append_system(
                    format!("{CONNECTED_FALLBACK} \"{}\" on channel {}", info.ssid, info.channel),
                    SystemKind::Info,
                );
            }
            Err(e) => {
                self.devtools
                    .warn(&["WiFi info unavailable:".into(), LogArg::error(&e)]);
                self.view.append_system(CONNECTED_FALLBACK, SystemKind::Info);
            }
        }
    }

    /// Send the trimmed input draft and wait for the gateway's answer.
    pub async fn send_message(&mut self) -> SendOutcome {
        let text = match self.take_draft() {
            Ok(text) => text,
            Err(outcome) => return outcome,
        };
        let result = self.client.send(&text).await;
        self.apply_sent(text, result)
    }

    /// The trimmed draft, or why it cannot be sent. An over-long draft is
    /// kept for editing and announced with a system notice.
    fn take_draft(&mut self) -> std::result::Result<String, SendOutcome> {
        let text = self.input.trim();
        if text.is_empty() {
            return Err(SendOutcome::Empty);
        }
        let chars = text.chars().count();
        if chars > MAX_DRAFT_CHARS {
            debug!(chars, limit = MAX_DRAFT_CHARS, "draft rejected");
            self.view.append_system(
                format!("{DRAFT_TOO_LONG} ({chars}/{MAX_DRAFT_CHARS} characters)"),
                SystemKind::Error,
            );
            return Err(SendOutcome::TooLong);
        }
        Ok(text.to_string())
    }

    /// Handle a finished send: optimistic append on success, a system
    /// notice otherwise. The draft is cleared only if it still holds `text`.
    pub fn apply_sent(&mut self, text: String, result: Result<()>) -> SendOutcome {
        match result {
            Ok(()) => {
                if self.input.trim() == text {
                    self.input.clear();
                }
                self.view.append_message(SELF_SENDER, text, now_ms());
                SendOutcome::Sent
            }
            Err(MeshError::Http { status, .. }) => {
                self.view.append_system(SEND_FAILED, SystemKind::Error);
                SendOutcome::Rejected(status)
            }
            Err(e) => {
                self.devtools.error(&["Send error:".into(), LogArg::error(&e)]);
                self.view.append_system(NETWORK_ERROR, SystemKind::Error);
                SendOutcome::Failed
            }
        }
    }

    /// One `/messages` poll; returns how many lines were appended.
    pub async fn poll_messages(&mut self) -> usize {
        let result = self.client.fetch_messages().await;
        self.apply_messages(result)
    }

    /// Append every delivered message. Failures go to devtools only.
    pub fn apply_messages(&mut self, result: Result<Vec<Message>>) -> usize {
        match result {
            Ok(messages) => {
                let count = messages.len();
                for msg in messages {
                    self.view.append(msg.into());
                }
                count
            }
            Err(e) => {
                self.devtools.log(&["Poll error:".into(), LogArg::error(&e)]);
                0
            }
        }
    }

    /// One `/peers` poll; `None` when the label was left stale.
    pub async fn update_peer_count(&mut self) -> Option<usize> {
        let result = self.client.fetch_peers().await;
        self.apply_peers(result)
    }

    pub fn apply_peers(&mut self, result: Result<usize>) -> Option<usize> {
        match result {
            Ok(count) => {
                self.view.set_peer_count(count);
                Some(count)
            }
            Err(e) => {
                debug!(
                    error = %e,
                    network = e.is_network(),
                    "peer count refresh failed, keeping last label"
                );
                None
            }
        }
    }

    pub fn apply(&mut self, update: Update) {
        match update {
            Update::Messages(result) => {
                self.apply_messages(result);
            }
            Update::Peers(result) => {
                self.apply_peers(result);
            }
            Update::Sent { text, result } => {
                self.apply_sent(text, result);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Devtools
    // -----------------------------------------------------------------------

    /// Show or tear down the panel; returns `true` when it is now open.
    pub fn toggle_devtools(&mut self) -> bool {
        let open = self.panel.toggle(&self.devtools);
        self.redraw_panel();
        open
    }

    /// Empty the log buffer and re-render the panel.
    pub fn clear_devtools(&mut self) {
        self.panel.clear(&self.devtools);
        if self.panel.is_open() {
            self.redraw_panel();
        }
    }

    /// Re-render the open panel if the buffer changed since the last draw.
    pub fn refresh_devtools(&mut self) {
        if !self.panel.is_open() || self.drawn_revision == Some(self.devtools.revision()) {
            return;
        }
        self.panel.render(&self.devtools);
        self.redraw_panel();
    }

    fn redraw_panel(&mut self) {
        self.drawn_revision = self.panel.is_open().then(|| self.devtools.revision());
        self.last_panel_draw = Some(Instant::now());
        self.view.surface_mut().draw_panel(self.panel.rows());
    }

    /// Earliest moment a buffer change may redraw the panel again.
    fn next_panel_redraw(&self) -> Instant {
        let now = Instant::now();
        self.last_panel_draw
            .map_or(now, |last| (last + self.panel_refresh).max(now))
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Run until `/quit`, end of input, or `shutdown` resolves.
    ///
    /// Timer ticks spawn request tasks whose results come back over a
    /// channel, so slow requests overlap the next tick instead of delaying
    /// it. All view mutation stays on this task.
    pub async fn run<L, F>(&mut self, mut lines: L, shutdown: F) -> Result<()>
    where
        L: Stream<Item = std::io::Result<String>> + Unpin,
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Update>();
        let start = Instant::now();
        let mut message_ticker = interval_at(start + self.message_poll, self.message_poll);
        message_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut peer_ticker = interval_at(start + self.peer_poll, self.peer_poll);
        peer_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut changes = self.devtools.subscribe();
        // Buffer changes arm one pending redraw; later changes ride along.
        let redraw = tokio::time::sleep(Duration::ZERO);
        let mut redraw_pending = false;
        tokio::pin!(shutdown);
        tokio::pin!(redraw);

        info!(
            message_poll_ms = self.message_poll.as_millis() as u64,
            peer_poll_ms = self.peer_poll.as_millis() as u64,
            panel_refresh_ms = self.panel_refresh.as_millis() as u64,
            "polling started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = message_ticker.tick() => {
                    let client = Arc::clone(&self.client);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(Update::Messages(client.fetch_messages().await));
                    });
                }
                _ = peer_ticker.tick() => {
                    let client = Arc::clone(&self.client);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(Update::Peers(client.fetch_peers().await));
                    });
                }
                line = lines.next() => match line {
                    Some(Ok(line)) => {
                        if !self.handle_line(&line, &tx) {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "input read failed");
                        return Err(e.into());
                    }
                    None => {
                        info!("input closed");
                        break;
                    }
                },
                Some(update) = rx.recv() => self.apply(update),
                Ok(()) = changes.changed() => {
                    if !redraw_pending {
                        redraw.as_mut().reset(self.next_panel_redraw());
                        redraw_pending = true;
                    }
                }
                () = &mut redraw, if redraw_pending => {
                    redraw_pending = false;
                    self.refresh_devtools();
                }
            }
        }
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    fn handle_line(&mut self, line: &str, tx: &mpsc::UnboundedSender<Update>) -> bool {
        match Command::parse(line) {
            Command::Message(text) => {
                self.input = text;
                self.spawn_send(tx);
            }
            Command::ToggleDevtools => {
                self.toggle_devtools();
            }
            Command::ClearDevtools => self.clear_devtools(),
            Command::Quit => return false,
        }
        true
    }

    fn spawn_send(&mut self, tx: &mpsc::UnboundedSender<Update>) {
        let Ok(text) = self.take_draft() else {
            return;
        };
        let client = Arc::clone(&self.client);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = client.send(&text).await;
            let _ = tx.send(Update::Sent { text, result });
        });
    }
}

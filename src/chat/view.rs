//! Chat view model and the render surface it draws on.

use std::collections::VecDeque;

use crate::api::Message;
use crate::devtools::PanelRow;

/// Sender label for optimistically appended local messages.
pub const SELF_SENDER: &str = "You";
pub const TITLE: &str = "Mesh-NOW";
pub const STATUS_CONNECTED: &str = "● Connected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemKind {
    Info,
    Error,
}

/// One line of the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    /// A peer-originated (or own, optimistically appended) message.
    Peer {
        sender: String,
        content: String,
        timestamp: u64,
    },
    /// A client-generated notification.
    System { content: String, kind: SystemKind },
}

impl ChatLine {
    pub fn peer(sender: impl Into<String>, content: impl Into<String>, timestamp: u64) -> Self {
        ChatLine::Peer {
            sender: sender.into(),
            content: content.into(),
            timestamp,
        }
    }

    pub fn system(content: impl Into<String>, kind: SystemKind) -> Self {
        ChatLine::System {
            content: content.into(),
            kind,
        }
    }

    pub fn sender(&self) -> Option<&str> {
        match self {
            ChatLine::Peer { sender, .. } => Some(sender),
            ChatLine::System { .. } => None,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatLine::Peer { content, .. } | ChatLine::System { content, .. } => content,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, ChatLine::System { .. })
    }
}

impl From<Message> for ChatLine {
    fn from(msg: Message) -> Self {
        ChatLine::Peer {
            sender: msg.sender,
            content: msg.content,
            timestamp: msg.timestamp,
        }
    }
}

/// `<n> peer` / `<n> peers`.
pub fn format_peer_count(count: usize) -> String {
    format!("{count} peer{}", if count == 1 { "" } else { "s" })
}

/// Fixed-capacity message list; oldest lines are evicted first.
#[derive(Debug, Clone)]
pub struct MessageList {
    lines: VecDeque<ChatLine>,
    capacity: usize,
}

impl MessageList {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Append a line; returns how many old lines were evicted.
    pub fn push(&mut self, line: ChatLine) -> usize {
        let mut evicted = 0;
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
            evicted += 1;
        }
        self.lines.push_back(line);
        evicted
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&ChatLine> {
        self.lines.back()
    }
}

/// Where the chat view and the devtools panel get drawn.
pub trait Surface {
    /// Header row: title, connection status and the peer label.
    fn draw_header(&mut self, title: &str, status: &str, peer_label: &str);

    fn append_line(&mut self, line: &ChatLine);

    /// Keep the newest line visible.
    fn scroll_to_bottom(&mut self) {}

    fn set_peer_label(&mut self, label: &str);

    /// Full panel redraw; `None` when the panel was torn down.
    fn draw_panel(&mut self, rows: Option<&[PanelRow]>);
}

/// Chat state plus the surface it renders to.
pub struct ChatView<S> {
    surface: S,
    messages: MessageList,
    peer_label: String,
}

impl<S: Surface> ChatView<S> {
    pub fn new(surface: S, max_messages: usize) -> Self {
        Self {
            surface,
            messages: MessageList::new(max_messages),
            peer_label: format_peer_count(0),
        }
    }

    pub fn draw_header(&mut self) {
        self.surface
            .draw_header(TITLE, STATUS_CONNECTED, &self.peer_label);
    }

    pub fn append(&mut self, line: ChatLine) {
        self.surface.append_line(&line);
        self.messages.push(line);
        self.surface.scroll_to_bottom();
    }

    pub fn append_message(&mut self, sender: impl Into<String>, content: impl Into<String>, timestamp: u64) {
        self.append(ChatLine::peer(sender, content, timestamp));
    }

    pub fn append_system(&mut self, content: impl Into<String>, kind: SystemKind) {
        self.append(ChatLine::system(content, kind));
    }

    /// Update the peer label; the surface is only told when the text changes.
    pub fn set_peer_count(&mut self, count: usize) {
        let label = format_peer_count(count);
        if label != self.peer_label {
            self.peer_label = label;
            self.surface.set_peer_label(&self.peer_label);
        }
    }

    pub fn peer_label(&self) -> &str {
        &self.peer_label
    }

    pub fn messages(&self) -> &MessageList {
        &self.messages
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

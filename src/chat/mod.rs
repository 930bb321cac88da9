//! Chat client: view model, render surface, and the polling application.

pub mod app;
pub mod view;

pub use app::{ChatApp, Command, SendOutcome, Update};
pub use view::{format_peer_count, ChatLine, ChatView, MessageList, Surface, SystemKind};

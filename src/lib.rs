//! # mesh-now
//!
//! Terminal chat client for ESP32 Mesh-NOW gateways, with an embedded
//! devtools overlay for debugging on devices without an inspector.
//!
//! The client polls the gateway's HTTP API (`/messages` every second,
//! `/peers` every five), renders into a bounded message list, and posts
//! typed messages to `/send`. Logging and networking are injected: every
//! component that logs takes a [`devtools::Devtools`] handle, and every
//! request goes through a [`transport::Transport`], which the binary wraps
//! in [`transport::LoggingTransport`] so the overlay sees each exchange.

pub mod api;
pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod devtools;
pub mod error;
pub mod form;
pub mod gateway;
pub mod terminal;
pub mod transport;

pub use client::MeshClient;
pub use config::ClientConfig;
pub use error::{MeshError, Result};

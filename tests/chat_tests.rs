//! Chat app tests against a scripted transport: sending, polling, the peer
//! label, initial sync, devtools commands and the poll loop.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use mesh_now::chat::app::{
    CONNECTED_FALLBACK, DRAFT_TOO_LONG, MAX_DRAFT_CHARS, NETWORK_ERROR, SEND_FAILED,
};
use mesh_now::chat::{ChatApp, ChatLine, SendOutcome, Surface, SystemKind};
use mesh_now::devtools::{Devtools, LogLevel, PanelRow};
use mesh_now::error::{MeshError, Result};
use mesh_now::transport::{HttpRequest, HttpResponse, Method, Transport};
use mesh_now::{ClientConfig, MeshClient};
use tokio_stream::StreamExt;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Answers by path; paths without a script are refused.
#[derive(Default)]
struct Scripted {
    routes: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl Scripted {
    fn with(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .get_mut()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

impl Transport for Scripted {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let route = self.routes.lock().unwrap().get(&request.path).cloned();
        match route {
            Some((status, body)) => Ok(HttpResponse::new(status, body.into_bytes())),
            None => Err(MeshError::Connect {
                url: request.path,
                detail: "connection refused".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct Recording {
    headers: usize,
    lines: Vec<ChatLine>,
    labels: Vec<String>,
    panels: Vec<Option<usize>>,
}

impl Surface for Recording {
    fn draw_header(&mut self, _title: &str, _status: &str, _peer_label: &str) {
        self.headers += 1;
    }
    fn append_line(&mut self, line: &ChatLine) {
        self.lines.push(line.clone());
    }
    fn set_peer_label(&mut self, label: &str) {
        self.labels.push(label.to_string());
    }
    fn draw_panel(&mut self, rows: Option<&[PanelRow]>) {
        self.panels.push(rows.map(<[PanelRow]>::len));
    }
}

const ONE_MESSAGE: &str = r#"{"messages":[{"sender":"X","content":"hi","timestamp":1}]}"#;

fn app(transport: Scripted) -> ChatApp<Scripted, Recording> {
    app_with(transport, ClientConfig::default())
}

fn app_with(transport: Scripted, config: ClientConfig) -> ChatApp<Scripted, Recording> {
    ChatApp::new(
        MeshClient::new(transport),
        Devtools::new(config.log_capacity),
        Recording::default(),
        &config,
    )
}

/// An input row nobody types into.
fn no_input() -> impl tokio_stream::Stream<Item = std::io::Result<String>> + Unpin {
    tokio_stream::pending()
}

fn last_line(app: &ChatApp<Scripted, Recording>) -> ChatLine {
    app.view().messages().last().cloned().expect("a line")
}

// ---------------------------------------------------------------------------
// Send
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_send_posts_trimmed_urlencoded_once() {
    let mut app = app(Scripted::default().with("/send", 200, "OK"));
    app.set_input("  hello mesh & co  ");
    assert_eq!(app.send_message().await, SendOutcome::Sent);

    let requests = app.client().transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].path, "/send");
    assert_eq!(requests[0].body.as_deref(), Some("message=hello%20mesh%20%26%20co"));
}

#[tokio::test]
async fn test_send_success_clears_input_and_appends_as_you() {
    let mut app = app(Scripted::default().with("/send", 200, "OK"));
    app.set_input("hi");
    app.send_message().await;
    assert_eq!(app.input(), "");
    let line = last_line(&app);
    assert_eq!(line.sender(), Some("You"));
    assert_eq!(line.content(), "hi");
}

#[tokio::test]
async fn test_send_empty_or_whitespace_makes_no_request() {
    let mut app = app(Scripted::default().with("/send", 200, "OK"));
    for draft in ["", "   ", "\t\n"] {
        app.set_input(draft);
        assert_eq!(app.send_message().await, SendOutcome::Empty);
    }
    assert!(app.client().transport().requests().is_empty());
    assert!(app.view().messages().is_empty());
}

#[tokio::test]
async fn test_send_over_length_draft_is_refused_locally() {
    let mut app = app(Scripted::default().with("/send", 200, "OK"));
    let draft = "x".repeat(MAX_DRAFT_CHARS + 1);
    app.set_input(draft.clone());
    assert_eq!(app.send_message().await, SendOutcome::TooLong);
    assert!(app.client().transport().requests().is_empty());
    assert_eq!(app.input(), draft);
    let line = last_line(&app);
    assert!(line.is_system());
    assert!(line.content().starts_with(DRAFT_TOO_LONG), "{}", line.content());
}

#[tokio::test]
async fn test_send_limit_counts_characters_not_bytes() {
    let mut app = app(Scripted::default().with("/send", 200, "OK"));
    app.set_input(format!("  {}  ", "é".repeat(MAX_DRAFT_CHARS)));
    assert_eq!(app.send_message().await, SendOutcome::Sent);
    assert_eq!(app.client().transport().requests().len(), 1);
}

#[tokio::test]
async fn test_send_rejected_shows_error_and_keeps_draft() {
    let mut app = app(Scripted::default().with("/send", 500, "nope"));
    app.set_input("hello");
    assert_eq!(app.send_message().await, SendOutcome::Rejected(500));
    assert_eq!(app.input(), "hello");
    assert_eq!(last_line(&app), ChatLine::system(SEND_FAILED, SystemKind::Error));
}

#[tokio::test]
async fn test_send_network_failure_shows_error_and_logs() {
    let mut app = app(Scripted::default());
    app.set_input("hello");
    assert_eq!(app.send_message().await, SendOutcome::Failed);
    assert_eq!(last_line(&app), ChatLine::system(NETWORK_ERROR, SystemKind::Error));
    let entries = app.devtools().entries_newest_first();
    assert_eq!(entries[0].level, LogLevel::Error);
    assert!(entries[0].message.starts_with("Send error:"), "{}", entries[0].message);
}

#[tokio::test]
async fn test_own_message_echo_is_not_deduplicated() {
    let echo = r#"{"messages":[{"sender":"You","content":"hi","timestamp":5}]}"#;
    let mut app = app(
        Scripted::default()
            .with("/send", 200, "OK")
            .with("/messages", 200, echo),
    );
    app.set_input("hi");
    app.send_message().await;
    app.poll_messages().await;
    let his: Vec<_> = app
        .view()
        .messages()
        .iter()
        .filter(|l| l.content() == "hi")
        .collect();
    assert_eq!(his.len(), 2);
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_poll_appends_exactly_one_entry() {
    let mut app = app(Scripted::default().with("/messages", 200, ONE_MESSAGE));
    let before = app.view().messages().len();
    assert_eq!(app.poll_messages().await, 1);
    assert_eq!(app.view().messages().len(), before + 1);
    let line = last_line(&app);
    assert_eq!(line.sender(), Some("X"));
    assert_eq!(line.content(), "hi");
    assert_eq!(app.view().surface().lines.len(), 1);
}

#[tokio::test]
async fn test_poll_appends_unconditionally() {
    let mut app = app(Scripted::default().with("/messages", 200, ONE_MESSAGE));
    app.poll_messages().await;
    app.poll_messages().await;
    assert_eq!(app.view().messages().len(), 2);
}

#[tokio::test]
async fn test_poll_empty_response_appends_nothing() {
    let mut app = app(Scripted::default().with("/messages", 200, r#"{"messages":[]}"#));
    assert_eq!(app.poll_messages().await, 0);
    assert!(app.view().messages().is_empty());
}

#[tokio::test]
async fn test_poll_failure_is_logged_not_surfaced() {
    let mut app = app(Scripted::default().with("/messages", 200, "not json"));
    assert_eq!(app.poll_messages().await, 0);
    assert!(app.view().messages().is_empty());
    let entries = app.devtools().entries_newest_first();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].message.starts_with("Poll error:"));
    assert!(entries[0].message.contains("/messages"));
}

#[tokio::test]
async fn test_message_list_is_bounded() {
    let mut config = ClientConfig::default();
    config.max_messages = 3;
    let many = r#"{"messages":[
        {"sender":"a","content":"1"},{"sender":"a","content":"2"},
        {"sender":"a","content":"3"},{"sender":"a","content":"4"},
        {"sender":"a","content":"5"}]}"#;
    let mut app = app_with(Scripted::default().with("/messages", 200, many), config);
    app.poll_messages().await;
    let contents: Vec<_> = app.view().messages().iter().map(ChatLine::content).collect();
    assert_eq!(contents, vec!["3", "4", "5"]);
}

// ---------------------------------------------------------------------------
// Peer count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_peer_count_from_id_list() {
    let mut app = app(Scripted::default().with("/peers", 200, r#"{"peers":["a","b"]}"#));
    assert_eq!(app.update_peer_count().await, Some(2));
    assert_eq!(app.view().peer_label(), "2 peers");
}

#[tokio::test]
async fn test_peer_count_singular() {
    let mut app = app(Scripted::default().with("/peers", 200, r#"{"peers":["a"]}"#));
    app.update_peer_count().await;
    assert_eq!(app.view().peer_label(), "1 peer");
    assert_eq!(app.view().surface().labels, vec!["1 peer"]);
}

#[tokio::test]
async fn test_peer_count_failure_keeps_stale_label() {
    let mut app = app(Scripted::default().with("/peers", 200, r#"{"peers":3}"#));
    app.update_peer_count().await;
    app.client().transport().routes.lock().unwrap().remove("/peers");
    assert_eq!(app.update_peer_count().await, None);
    assert_eq!(app.view().peer_label(), "3 peers");
    assert!(app.view().messages().is_empty());
}

// ---------------------------------------------------------------------------
// Initialize
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_initialize_wifi_failure_falls_back() {
    let mut app = app(Scripted::default().with("/peers", 200, r#"{"peers":[]}"#));
    app.initialize().await;
    assert_eq!(app.view().surface().headers, 1);
    assert_eq!(
        app.view().messages().iter().next().cloned(),
        Some(ChatLine::system(CONNECTED_FALLBACK, SystemKind::Info))
    );
    assert_eq!(app.view().peer_label(), "0 peers");
}

#[tokio::test]
async fn test_initialize_wifi_http_error_falls_back() {
    let mut app = app(Scripted::default().with("/wifi-info", 404, "Not Found"));
    app.initialize().await;
    let first = app.view().messages().iter().next().cloned().unwrap();
    assert_eq!(first.content(), CONNECTED_FALLBACK);
}

#[tokio::test]
async fn test_initialize_wifi_success_names_ssid() {
    let mut app = app(
        Scripted::default()
            .with("/wifi-info", 200, r#"{"ssid":"MeshLab","password":"x","channel":6}"#)
            .with("/peers", 200, r#"{"peers":["a","b"]}"#),
    );
    app.initialize().await;
    let first = app.view().messages().iter().next().cloned().unwrap();
    assert!(first.is_system());
    assert!(first.content().contains("MeshLab"));
    assert!(first.content().contains("channel 6"));
    assert_eq!(app.view().peer_label(), "2 peers");
}

#[tokio::test]
async fn test_initialize_opens_panel_when_configured() {
    let mut config = ClientConfig::default();
    config.devtools_open = true;
    let mut app = app_with(Scripted::default(), config);
    app.initialize().await;
    assert!(app.panel().is_open());
}

// ---------------------------------------------------------------------------
// Devtools commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_clear_empties_buffer_and_panel() {
    let mut app = app(Scripted::default());
    app.poll_messages().await;
    app.poll_messages().await;
    assert!(app.toggle_devtools());
    assert_eq!(app.panel().rows().unwrap().len(), 2);
    app.clear_devtools();
    assert!(app.devtools().is_empty());
    assert_eq!(app.panel().rows().unwrap().len(), 0);
    assert_eq!(app.view().surface().panels.last(), Some(&Some(0)));
}

#[test]
fn test_toggle_draws_and_tears_down() {
    let mut app = app(Scripted::default());
    assert!(app.toggle_devtools());
    assert!(!app.toggle_devtools());
    assert!(app.panel().rows().is_none());
    assert_eq!(app.view().surface().panels, vec![Some(0), None]);
}

#[test]
fn test_refresh_only_redraws_on_change() {
    let mut app = app(Scripted::default());
    app.toggle_devtools();
    app.refresh_devtools();
    assert_eq!(app.view().surface().panels.len(), 1);
    app.devtools().warn(&["late".into()]);
    app.refresh_devtools();
    assert_eq!(app.view().surface().panels, vec![Some(0), Some(1)]);
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_run_loop_polls_on_schedule_and_sends_input() {
    let mut app = app(
        Scripted::default()
            .with("/send", 200, "OK")
            .with("/messages", 200, ONE_MESSAGE)
            .with("/peers", 200, r#"{"peers":["a"]}"#),
    );
    let lines = tokio_stream::iter(vec![Ok::<_, std::io::Error>("hello".to_string())])
        .chain(tokio_stream::pending());
    app.run(lines, tokio::time::sleep(Duration::from_millis(5_500)))
        .await
        .unwrap();

    let transport = app.client().transport();
    assert_eq!(transport.count(Method::Post, "/send"), 1);
    assert_eq!(transport.count(Method::Get, "/messages"), 5);
    assert_eq!(transport.count(Method::Get, "/peers"), 1);

    let contents: Vec<_> = app.view().messages().iter().map(ChatLine::content).collect();
    assert_eq!(contents.iter().filter(|c| **c == "hello").count(), 1);
    assert_eq!(contents.iter().filter(|c| **c == "hi").count(), 5);
    assert_eq!(app.view().peer_label(), "1 peer");
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_quit_command_stops() {
    let mut app = app(Scripted::default());
    let lines = tokio_stream::iter(vec![Ok::<_, std::io::Error>("/quit".to_string())])
        .chain(tokio_stream::pending());
    app.run(lines, std::future::pending::<()>()).await.unwrap();
    assert!(app.client().transport().requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_stops_when_input_closes() {
    let mut app = app(Scripted::default());
    let lines = tokio_stream::iter(Vec::<std::io::Result<String>>::new());
    app.run(lines, std::future::pending::<()>()).await.unwrap();
    assert!(app.view().messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_toggle_command_opens_panel() {
    let mut app = app(Scripted::default());
    let lines = tokio_stream::iter(vec![
        Ok::<_, std::io::Error>("/devtools".to_string()),
        Ok("/quit".to_string()),
    ]);
    app.run(lines, std::future::pending::<()>()).await.unwrap();
    assert!(app.panel().is_open());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_coalesces_panel_redraws() {
    // Every `/messages` poll fails and logs, once per second.
    let mut app = app(Scripted::default());
    app.toggle_devtools();
    app.run(no_input(), tokio::time::sleep(Duration::from_millis(5_500)))
        .await
        .unwrap();

    assert_eq!(app.devtools().len(), 5);
    // Opened at 0 ms, then at most one redraw per 2000 ms window: 2000, 4000.
    assert_eq!(app.view().surface().panels.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_zero_refresh_redraws_every_change() {
    let config = ClientConfig {
        panel_refresh_ms: 0,
        ..ClientConfig::default()
    };
    let mut app = app_with(Scripted::default(), config);
    app.toggle_devtools();
    app.run(no_input(), tokio::time::sleep(Duration::from_millis(5_500)))
        .await
        .unwrap();

    assert_eq!(app.view().surface().panels.len(), 6);
    assert_eq!(app.view().surface().panels.last(), Some(&Some(5)));
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_closed_panel_is_never_redrawn() {
    let mut app = app(Scripted::default());
    app.run(no_input(), tokio::time::sleep(Duration::from_millis(3_500)))
        .await
        .unwrap();
    assert_eq!(app.devtools().len(), 3);
    assert!(app.view().surface().panels.is_empty());
}

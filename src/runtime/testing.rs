//! Mock implementations for testing
//!
//! These mocks drive a real [`SessionRuntime`] without a network: the
//! connector hands each new connection's far end to the test as a
//! [`MockPeer`], and renders/alerts are captured on channels.

use super::traits::{Alerter, Renderer};
use super::{SessionHandle, SessionRuntime};
use crate::history::{HistoryClient, HistoryEntry, HistoryError};
use crate::protocol::OutboundRequest;
use crate::session::{AlertLevel, ContextKey, Message, SessionController};
use crate::transport::{Connection, Connector, FixedDelay, ReconnectPolicy, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TEST_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Mock Transport
// ============================================================================

struct MockConnectorInner {
    peers: mpsc::UnboundedSender<MockPeer>,
    attempts: AtomicU32,
    failures: AtomicU32,
}

/// Connector whose connections terminate in test-controlled peers
#[derive(Clone)]
pub struct MockConnector {
    inner: Arc<MockConnectorInner>,
}

impl MockConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let connector = Self {
            inner: Arc::new(MockConnectorInner {
                peers,
                attempts: AtomicU32::new(0),
                failures: AtomicU32::new(0),
            }),
        };
        (connector, peer_rx)
    }

    /// Refuse the next `count` connection attempts
    pub fn fail_next_connects(&self, count: u32) {
        self.inner.failures.store(count, Ordering::SeqCst);
    }

    /// Connection attempts made so far, failed ones included
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Conn = MockConnection;

    async fn connect(&self, url: &str) -> Result<MockConnection, TransportError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .inner
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let _ = self.inner.peers.send(MockPeer {
            url: url.to_string(),
            requests: request_rx,
            frames: frame_tx,
        });
        Ok(MockConnection {
            outbound: request_tx,
            inbound: frame_rx,
        })
    }
}

pub struct MockConnection {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .map_err(|_| TransportError::Closed("peer dropped".to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }
}

/// Server end of a mock connection. Dropping it closes the connection.
pub struct MockPeer {
    pub url: String,
    requests: mpsc::UnboundedReceiver<String>,
    frames: mpsc::UnboundedSender<String>,
}

impl MockPeer {
    /// Next request the client sent, decoded
    pub async fn next_request(&mut self) -> Option<OutboundRequest> {
        let text = tokio::time::timeout(TEST_TIMEOUT, self.requests.recv())
            .await
            .ok()??;
        serde_json::from_str(&text).ok()
    }

    /// Deliver a raw text frame to the client
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.frames.send(frame.into());
    }

    pub fn push_json(&self, frame: &serde_json::Value) {
        self.push(frame.to_string());
    }
}

// ============================================================================
// Recording Collaborators
// ============================================================================

/// Renderer that forwards every render to a channel
pub struct RecordingRenderer {
    renders: mpsc::UnboundedSender<(ContextKey, Vec<Message>)>,
}

impl Renderer for RecordingRenderer {
    fn render(&self, context: &ContextKey, messages: &[Message]) {
        let _ = self.renders.send((context.clone(), messages.to_vec()));
    }
}

/// Alerter that forwards every alert to a channel
pub struct RecordingAlerter {
    alerts: mpsc::UnboundedSender<(AlertLevel, String)>,
}

impl Alerter for RecordingAlerter {
    fn alert(&self, level: AlertLevel, message: &str) {
        let _ = self.alerts.send((level, message.to_string()));
    }
}

/// History client with canned entries
#[derive(Default)]
pub struct MockHistoryClient {
    entries: Vec<HistoryEntry>,
    clears: AtomicU32,
}

impl MockHistoryClient {
    pub fn with_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries,
            clears: AtomicU32::new(0),
        }
    }

    pub fn clear_count(&self) -> u32 {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryClient for MockHistoryClient {
    async fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.entries.clone())
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Test Session Builder
// ============================================================================

/// Builder for a runtime wired to mocks
pub struct TestSessionBuilder {
    context: ContextKey,
    model: String,
    policy: Box<dyn ReconnectPolicy>,
    history: Option<Arc<MockHistoryClient>>,
    failed_connects: u32,
}

impl TestSessionBuilder {
    pub fn context(mut self, context: &str) -> Self {
        self.context = ContextKey::new(context);
        self
    }

    pub fn policy(mut self, policy: impl ReconnectPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn history(mut self, history: Arc<MockHistoryClient>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn failed_connects(mut self, count: u32) -> Self {
        self.failed_connects = count;
        self
    }

    pub fn start(self) -> TestSession {
        let (connector, peers) = MockConnector::new();
        connector.fail_next_connects(self.failed_connects);
        let (render_tx, renders) = mpsc::unbounded_channel();
        let (alert_tx, alerts) = mpsc::unbounded_channel();
        let (handle, command_rx) = SessionHandle::channel();

        let mut runtime = SessionRuntime::new(
            "ws://mock/chatbot/get-answer",
            SessionController::new(self.context, self.model),
            connector.clone(),
            self.policy,
            RecordingRenderer { renders: render_tx },
            RecordingAlerter { alerts: alert_tx },
            command_rx,
        );
        if let Some(history) = self.history {
            runtime = runtime.with_history(history);
        }
        let task = tokio::spawn(runtime.run());

        TestSession {
            handle,
            connector,
            peers,
            renders,
            alerts,
            task,
        }
    }
}

/// A running session plus the far ends of all its mocks
pub struct TestSession {
    pub handle: SessionHandle,
    pub connector: MockConnector,
    peers: mpsc::UnboundedReceiver<MockPeer>,
    renders: mpsc::UnboundedReceiver<(ContextKey, Vec<Message>)>,
    alerts: mpsc::UnboundedReceiver<(AlertLevel, String)>,
    task: JoinHandle<()>,
}

impl TestSession {
    pub fn builder() -> TestSessionBuilder {
        TestSessionBuilder {
            context: ContextKey::new("postgresql"),
            model: "test-model".to_string(),
            policy: Box::new(FixedDelay::new(Duration::from_millis(20))),
            history: None,
            failed_connects: 0,
        }
    }

    pub async fn next_peer(&mut self) -> MockPeer {
        tokio::time::timeout(TEST_TIMEOUT, self.peers.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    pub async fn next_render(&mut self) -> (ContextKey, Vec<Message>) {
        tokio::time::timeout(TEST_TIMEOUT, self.renders.recv())
            .await
            .expect("timed out waiting for a render")
            .expect("runtime stopped")
    }

    pub async fn next_alert(&mut self) -> (AlertLevel, String) {
        tokio::time::timeout(TEST_TIMEOUT, self.alerts.recv())
            .await
            .expect("timed out waiting for an alert")
            .expect("runtime stopped")
    }

    /// True when no alert is waiting to be read
    pub fn no_pending_alert(&mut self) -> bool {
        self.alerts.try_recv().is_err()
    }

    /// Drop the handle and wait for the runtime to stop
    pub async fn shutdown(self) {
        let TestSession { handle, task, .. } = self;
        drop(handle);
        tokio::time::timeout(TEST_TIMEOUT, task)
            .await
            .expect("runtime did not stop")
            .expect("runtime panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MessageStatus, Side};
    use crate::session::message::LOADING_TEXT;
    use serde_json::json;

    fn texts(messages: &[Message]) -> Vec<(Side, String)> {
        messages.iter().map(|m| (m.side, m.text.clone())).collect()
    }

    #[tokio::test]
    async fn test_mock_connector_counts_and_refuses() {
        let (connector, mut peers) = MockConnector::new();
        connector.fail_next_connects(1);
        assert!(connector.connect("ws://a").await.is_err());
        assert!(connector.connect("ws://a").await.is_ok());
        assert_eq!(connector.attempts(), 2);
        assert_eq!(peers.recv().await.unwrap().url, "ws://a");
    }

    /// Integration test: streamed answer replaces the loading placeholder
    #[tokio::test]
    async fn test_streamed_answer_scenario() {
        let mut session = TestSession::builder().context("postgresql").start();
        let mut peer = session.next_peer().await;

        session.handle.ask("What is Postgres?").await.unwrap();
        let (context, messages) = session.next_render().await;
        assert_eq!(context, ContextKey::new("postgresql"));
        assert_eq!(
            texts(&messages),
            vec![
                (Side::User, "What is Postgres?".to_string()),
                (Side::Bot, LOADING_TEXT.to_string()),
            ]
        );

        let request = peer.next_request().await.unwrap();
        assert_eq!(request.knowledge_base, "postgresql");
        assert_eq!(request.model, "test-model");
        assert_eq!(messages[1].id, Some(request.id));

        peer.push_json(&json!({ "id": request.id, "partial_result": "Post" }));
        let (_, messages) = session.next_render().await;
        assert_eq!(messages[1].text, "Post");

        peer.push_json(&json!({ "id": request.id, "partial_result": "gresQL is..." }));
        let (_, messages) = session.next_render().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "PostgresQL is...");
        assert_eq!(messages[1].status, MessageStatus::Streaming);

        session.shutdown().await;
    }

    /// Integration test: a dropped connection is reopened, and a request that
    /// never got an answer keeps its placeholder
    #[tokio::test]
    async fn test_reconnect_leaves_stalled_placeholder() {
        let mut session = TestSession::builder().start();
        let mut peer = session.next_peer().await;

        session.handle.ask("first").await.unwrap();
        session.next_render().await;
        let stalled = peer.next_request().await.unwrap();
        drop(peer);

        let mut peer = session.next_peer().await;
        assert_eq!(session.connector.attempts(), 2);

        session.handle.ask("second").await.unwrap();
        let (_, messages) = session.next_render().await;
        let placeholder = messages.iter().find(|m| m.id == Some(stalled.id)).unwrap();
        assert_eq!(placeholder.text, LOADING_TEXT);
        assert_eq!(placeholder.status, MessageStatus::Loading);

        let resent = peer.next_request().await.unwrap();
        assert_eq!(resent.question, "second");
        assert_ne!(resent.id, stalled.id);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_and_stray_frames_are_dropped() {
        let mut session = TestSession::builder().start();
        let mut peer = session.next_peer().await;

        session.handle.ask("q").await.unwrap();
        session.next_render().await;
        let request = peer.next_request().await.unwrap();

        peer.push("not json at all");
        peer.push_json(&json!({ "partial_result": "no id" }));
        peer.push_json(&json!({ "id": request.id }));
        peer.push_json(&json!({ "id": 987_654, "result": "stray" }));
        peer.push_json(&json!({ "id": request.id, "result": "answer" }));

        let (_, messages) = session.next_render().await;
        assert_eq!(messages[1].text, "answer");
        assert_eq!(messages[1].status, MessageStatus::Complete);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_failure_removes_placeholder_and_alerts() {
        let mut session = TestSession::builder().start();
        let mut peer = session.next_peer().await;

        session.handle.ask("q").await.unwrap();
        session.next_render().await;
        let request = peer.next_request().await.unwrap();

        peer.push_json(&json!({ "id": request.id, "error": "model overloaded" }));
        let (_, messages) = session.next_render().await;
        assert_eq!(texts(&messages), vec![(Side::User, "q".to_string())]);
        assert_eq!(
            session.next_alert().await,
            (AlertLevel::Error, "model overloaded".to_string())
        );

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_ask_while_disconnected_fails_request() {
        let mut session = TestSession::builder()
            .policy(FixedDelay::new(Duration::from_secs(60)))
            .failed_connects(1)
            .start();

        session.handle.ask("anyone there?").await.unwrap();
        let (_, first) = session.next_render().await;
        assert_eq!(first.len(), 2);
        let (_, after) = session.next_render().await;
        assert_eq!(texts(&after), vec![(Side::User, "anyone there?".to_string())]);

        let (level, message) = session.next_alert().await;
        assert_eq!(level, AlertLevel::Error);
        assert!(message.contains("not connected"));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_gives_up_after_policy_limit() {
        let mut session = TestSession::builder()
            .policy(FixedDelay::new(Duration::from_millis(5)).with_max_attempts(2))
            .failed_connects(10)
            .start();

        let (level, message) = session.next_alert().await;
        assert_eq!(level, AlertLevel::Error);
        assert!(message.contains("could not reconnect"));
        assert_eq!(session.connector.attempts(), 3);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_gave_up_session_stays_offline_quietly() {
        let mut session = TestSession::builder()
            .policy(FixedDelay::new(Duration::from_millis(5)).with_max_attempts(1))
            .failed_connects(10)
            .start();

        let (_, message) = session.next_alert().await;
        assert!(message.contains("could not reconnect"));

        for question in ["one", "two"] {
            session.handle.ask(question).await.unwrap();
            session.next_render().await;
            session.next_render().await;
            let (level, message) = session.next_alert().await;
            assert_eq!(level, AlertLevel::Error);
            assert!(message.starts_with("Could not send question"));
            assert!(session.no_pending_alert());
        }
        assert_eq!(session.connector.attempts(), 2);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_switch_context_posts_notice() {
        let mut session = TestSession::builder().context("postgresql").start();
        session.next_peer().await;

        session.handle.switch_context("rust").await.unwrap();
        let (context, messages) = session.next_render().await;
        assert_eq!(context, ContextKey::new("rust"));
        assert_eq!(
            texts(&messages),
            vec![(Side::System, "You are now chatting about rust".to_string())]
        );

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_seed_and_clear_history() {
        let history = Arc::new(MockHistoryClient::with_entries(vec![
            HistoryEntry {
                side: Side::User,
                brain: None,
                content: "hi".to_string(),
                knowledge_base: "rust".to_string(),
            },
            HistoryEntry {
                side: Side::Bot,
                brain: None,
                content: "hello".to_string(),
                knowledge_base: "rust".to_string(),
            },
        ]));
        let mut session = TestSession::builder()
            .context("postgresql")
            .history(history.clone())
            .start();

        session.handle.seed_history().await.unwrap();
        let (context, messages) = session.next_render().await;
        assert_eq!(context, ContextKey::new("rust"));
        assert_eq!(
            texts(&messages),
            vec![
                (Side::User, "hi".to_string()),
                (Side::Bot, "hello".to_string())
            ]
        );

        session.handle.clear_history().await.unwrap();
        let (context, messages) = session.next_render().await;
        assert_eq!(context, ContextKey::new("postgresql"));
        assert!(messages.is_empty());
        assert_eq!(history.clear_count(), 1);

        session.shutdown().await;
    }
}

//! chat-session - terminal client for the streaming chatbot
//!
//! Reads questions and slash commands from stdin, prints the active
//! conversation thread to stdout and alerts to stderr.

use chat_session::config::SessionConfig;
use chat_session::history::HttpHistoryClient;
use chat_session::runtime::{Alerter, Renderer, SessionHandle, SessionRuntime};
use chat_session::session::{AlertLevel, ContextKey, Message, SessionController, Side};
use chat_session::transport::WsConnector;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints the active context's thread; renders of other contexts are skipped
struct TerminalRenderer {
    active: Mutex<ContextKey>,
}

impl TerminalRenderer {
    fn set_active(&self, context: ContextKey) {
        if let Ok(mut active) = self.active.lock() {
            *active = context;
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&self, context: &ContextKey, messages: &[Message]) {
        let is_active = self.active.lock().map(|a| *a == *context).unwrap_or(false);
        if !is_active {
            tracing::debug!(%context, "Skipping render of inactive context");
            return;
        }

        if let Err(e) = write_thread(&mut std::io::stdout().lock(), context, messages) {
            tracing::debug!(error = %e, "Failed to write thread to stdout");
        }
    }
}

fn write_thread(
    out: &mut impl Write,
    context: &ContextKey,
    messages: &[Message],
) -> std::io::Result<()> {
    writeln!(out, "--- {context} ---")?;
    for message in messages {
        let speaker = match message.side {
            Side::User => "you",
            Side::Bot => "bot",
            Side::System => "*",
        };
        let marker = if message.is_open() { " ..." } else { "" };
        writeln!(out, "{speaker}> {}{marker}", message.text)?;
    }
    out.flush()
}

struct StderrAlerter;

impl Alerter for StderrAlerter {
    fn alert(&self, level: AlertLevel, message: &str) {
        eprintln!("[{level}] {message}");
    }
}

/// Route one input line. Returns false on `/quit`.
async fn dispatch_line(
    line: &str,
    handle: &SessionHandle,
    renderer: &TerminalRenderer,
) -> Result<bool, Box<dyn std::error::Error>> {
    let line = line.trim();
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" => return Ok(false),
        "/kb" if !arg.is_empty() => {
            let context = ContextKey::new(arg);
            renderer.set_active(context.clone());
            handle.switch_context(context).await?;
        }
        "/model" if !arg.is_empty() => handle.select_model(arg).await?,
        "/history" => handle.seed_history().await?,
        "/clear" => handle.clear_history().await?,
        "/kb" | "/model" => eprintln!("usage: {command} NAME"),
        _ => handle.ask(line).await?,
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_session=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = SessionConfig::from_env();
    tracing::info!(
        url = %config.ws_url,
        model = %config.model,
        knowledge_base = %config.knowledge_base,
        history = ?config.history_url,
        "Starting chat session"
    );

    let renderer = Arc::new(TerminalRenderer {
        active: Mutex::new(config.knowledge_base.clone()),
    });
    let (handle, command_rx) = SessionHandle::channel();
    let mut runtime = SessionRuntime::new(
        config.ws_url.clone(),
        SessionController::new(config.knowledge_base.clone(), config.model.clone()),
        WsConnector,
        config.reconnect.policy(),
        renderer.clone(),
        StderrAlerter,
        command_rx,
    );
    if let Some(url) = &config.history_url {
        runtime = runtime.with_history(Arc::new(HttpHistoryClient::new(url.clone())));
        handle.seed_history().await?;
    }
    let runtime_task = tokio::spawn(runtime.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if !dispatch_line(&line, &handle, &renderer).await? {
            break;
        }
    }

    drop(handle);
    runtime_task.await?;
    Ok(())
}

//! Session runtime executor

use super::traits::{Alerter, Renderer};
use super::Command;
use crate::history::HistoryClient;
use crate::protocol;
use crate::session::{AlertLevel, Effect, Event, SessionController};
use crate::transport::{Connector, ReconnectPolicy, TransportConnection};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Event loop owning the transport and the session controller.
///
/// Every handler runs to completion before the next input is taken, so the
/// controller never sees interleaved mutations.
pub struct SessionRuntime<C, R, A>
where
    C: Connector + 'static,
    R: Renderer + 'static,
    A: Alerter + 'static,
{
    url: String,
    controller: SessionController,
    transport: TransportConnection<C>,
    policy: Box<dyn ReconnectPolicy>,
    renderer: R,
    alerter: A,
    history: Option<Arc<dyn HistoryClient>>,
    command_rx: mpsc::Receiver<Command>,
    /// When the next reconnect attempt is due
    reconnect_at: Option<Instant>,
    /// Consecutive failed connection attempts since the last open
    reconnect_attempt: u32,
    /// The policy gave up; the session stays offline
    gave_up: bool,
}

impl<C, R, A> SessionRuntime<C, R, A>
where
    C: Connector + 'static,
    R: Renderer + 'static,
    A: Alerter + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        url: impl Into<String>,
        controller: SessionController,
        connector: C,
        policy: Box<dyn ReconnectPolicy>,
        renderer: R,
        alerter: A,
        command_rx: mpsc::Receiver<Command>,
    ) -> Self {
        Self {
            url: url.into(),
            controller,
            transport: TransportConnection::new(connector),
            policy,
            renderer,
            alerter,
            history: None,
            command_rx,
            reconnect_at: None,
            reconnect_attempt: 0,
            gave_up: false,
        }
    }

    /// Attach the history seed/clear collaborator
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn HistoryClient>) -> Self {
        self.history = Some(history);
        self
    }

    pub async fn run(mut self) {
        tracing::info!(url = %self.url, context = %self.controller.active_context(), "Starting session runtime");

        let url = self.url.clone();
        if let Err(e) = self.transport.open(&url).await {
            tracing::warn!(error = %e, "Initial connect failed");
            self.schedule_reconnect();
        }

        loop {
            let reconnect_deadline = self.reconnect_at.unwrap_or_else(Instant::now);
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command).await;
                }
                frame = self.transport.recv(), if self.transport.is_open() => {
                    match frame {
                        Some(text) => self.handle_frame(&text).await,
                        None => {
                            tracing::warn!("Connection closed");
                            self.schedule_reconnect();
                        }
                    }
                }
                () = sleep_until(reconnect_deadline), if self.reconnect_at.is_some() => {
                    self.reconnect_at = None;
                    self.try_reconnect().await;
                }
            }
        }

        tracing::info!("Session runtime stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Ask(text) => self.apply(Event::UserQuestion { text }).await,
            Command::SwitchContext(context) => {
                let notice = self.renderer.context_notice(&context);
                self.apply(Event::SwitchContext { context, notice }).await;
            }
            Command::SelectModel(model) => self.apply(Event::SelectModel { model }).await,
            Command::SeedHistory => {
                let Some(history) = self.history.clone() else {
                    tracing::debug!("No history client configured");
                    return;
                };
                match history.load().await {
                    Ok(entries) => self.apply(Event::HistoryLoaded { entries }).await,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to load history");
                        self.alerter
                            .alert(AlertLevel::Error, &format!("Could not load history: {e}"));
                    }
                }
            }
            Command::ClearHistory => {
                if let Some(history) = self.history.clone() {
                    if let Err(e) = history.clear().await {
                        tracing::warn!(error = %e, "Failed to clear server history");
                    }
                }
                self.apply(Event::HistoryCleared).await;
            }
        }
    }

    async fn handle_frame(&mut self, text: &str) {
        match protocol::decode(text) {
            Ok(response) => self.apply(Event::Inbound(response)).await,
            Err(e) => tracing::warn!(error = %e, frame = %text, "Dropping malformed frame"),
        }
    }

    /// Run an event through the controller and execute the resulting effects.
    /// A send that fails is fed back as a failure for that request.
    async fn apply(&mut self, event: Event) {
        let mut queue: VecDeque<Effect> = match self.controller.handle(event) {
            Ok(result) => result.effects.into(),
            Err(e) => {
                tracing::warn!(error = %e, "Event rejected");
                return;
            }
        };

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Send(request) => {
                    if let Err(e) = self.transport.send(&request).await {
                        tracing::warn!(id = %request.id, error = %e, "Send failed");
                        let follow_up = self.controller.handle(Event::SendFailed {
                            id: request.id,
                            reason: e.to_string(),
                        });
                        match follow_up {
                            Ok(result) => queue.extend(result.effects),
                            Err(e) => tracing::warn!(error = %e, "Send failure not applied"),
                        }
                        if !self.transport.is_open() && self.reconnect_at.is_none() {
                            self.schedule_reconnect();
                        }
                    }
                }
                Effect::Render { context, messages } => {
                    self.renderer.render(&context, &messages);
                }
                Effect::Alert { level, message } => {
                    self.alerter.alert(level, &message);
                }
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.gave_up {
            tracing::debug!("Reconnect policy exhausted, staying offline");
            return;
        }
        self.reconnect_attempt += 1;
        match self.policy.next_delay(self.reconnect_attempt) {
            Some(delay) => {
                tracing::info!(
                    attempt = self.reconnect_attempt,
                    delay_ms = %delay.as_millis(),
                    "Scheduling reconnect"
                );
                self.reconnect_at = Some(Instant::now() + delay);
            }
            None => {
                tracing::error!(attempts = self.reconnect_attempt - 1, "Giving up reconnecting");
                self.reconnect_at = None;
                self.gave_up = true;
                self.alerter.alert(
                    AlertLevel::Error,
                    "Lost connection to the chatbot and could not reconnect",
                );
            }
        }
    }

    async fn try_reconnect(&mut self) {
        match self.transport.reconnect().await {
            Ok(()) => {
                tracing::info!(attempt = self.reconnect_attempt, "Reconnected");
                self.reconnect_attempt = 0;
            }
            Err(e) => {
                tracing::warn!(attempt = self.reconnect_attempt, error = %e, "Reconnect failed");
                self.schedule_reconnect();
            }
        }
    }
}

//! Per-room chat session controller.
//!
//! Owns the current [`ChatSetup`], mirrors its observables into local state
//! and announces the viewer a fixed delay after each new send handle
//! becomes available.

use std::sync::Arc;
use std::time::Duration;

use ntlive_shared::constants::JOIN_ANNOUNCEMENT;
use ntlive_shared::ReceivedChatMessage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chat::{setup_chat, ChatOptions, ChatSender, ChatSetup};
use crate::error::Result;
use crate::events::{EventSink, LiveEvent};
use crate::observable::{Observable, ObservableState};
use crate::transport::{same_session, TransportSession};

pub struct ChatController {
    session: Arc<dyn TransportSession>,
    options: ChatOptions,
    setup: Option<ChatSetup>,
    messages: ObservableState<Vec<ReceivedChatMessage>>,
    is_sending: ObservableState<bool>,
    join_delay: Duration,
    join_task: Option<JoinHandle<()>>,
    change_task: JoinHandle<()>,
}

impl ChatController {
    /// Set up chat on `session`. Must be called inside a tokio runtime.
    pub fn new(
        session: Arc<dyn TransportSession>,
        options: ChatOptions,
        join_delay: Duration,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let messages = ObservableState::new(None, Vec::new());
        let is_sending = ObservableState::new(None, false);
        let change_task = tokio::spawn(forward_changes(messages.watch(), events));

        let mut controller = Self {
            session: session.clone(),
            options: options.clone(),
            setup: None,
            messages,
            is_sending,
            join_delay,
            join_task: None,
            change_task,
        };
        controller.attach(session, options);
        controller
    }

    /// Rebind to a session and codec options. When either differs in
    /// identity from the current ones the old chat is destroyed and a new
    /// one is set up, which schedules a fresh join announcement.
    pub fn attach(&mut self, session: Arc<dyn TransportSession>, options: ChatOptions) {
        if self.setup.is_some()
            && same_session(&self.session, &session)
            && self.options.same_as(&options)
        {
            return;
        }

        self.teardown();

        let setup = setup_chat(session.clone(), &options);
        self.messages
            .bind(Some(setup.messages.clone() as Arc<dyn Observable<Vec<ReceivedChatMessage>>>));
        self.is_sending
            .bind(Some(setup.is_sending.clone() as Arc<dyn Observable<bool>>));
        self.join_task = Some(schedule_join(setup.sender(), self.join_delay));

        info!(
            identity = %session.local_participant().identity,
            "Chat controller attached"
        );

        self.setup = Some(setup);
        self.session = session;
        self.options = options;
    }

    /// The send handle, or `None` while no chat is set up.
    pub fn sender(&self) -> Option<ChatSender> {
        self.setup.as_ref().map(ChatSetup::sender)
    }

    /// Handle a submitted input line. Blank input and a missing send handle
    /// are ignored; returns whether a message was sent.
    pub async fn submit(&self, input: &str) -> Result<bool> {
        if input.trim().is_empty() {
            return Ok(false);
        }
        let Some(sender) = self.sender() else {
            debug!("Chat not ready, ignoring submit");
            return Ok(false);
        };
        sender.send(input).await?;
        Ok(true)
    }

    pub fn messages(&self) -> Vec<ReceivedChatMessage> {
        self.messages.get()
    }

    pub fn is_sending(&self) -> bool {
        self.is_sending.get()
    }

    pub fn watch_messages(&self) -> watch::Receiver<Vec<ReceivedChatMessage>> {
        self.messages.watch()
    }

    pub fn session(&self) -> &Arc<dyn TransportSession> {
        &self.session
    }

    fn teardown(&mut self) {
        if let Some(task) = self.join_task.take() {
            task.abort();
        }
        if let Some(setup) = self.setup.take() {
            setup.destroy();
        }
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.teardown();
        self.change_task.abort();
    }
}

fn schedule_join(sender: ChatSender, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = sender.send(JOIN_ANNOUNCEMENT).await {
            warn!(error = %e, "Join announcement failed");
        }
    })
}

async fn forward_changes(
    mut rx: watch::Receiver<Vec<ReceivedChatMessage>>,
    events: Arc<dyn EventSink>,
) {
    while rx.changed().await.is_ok() {
        let count = rx.borrow_and_update().len();
        events.emit(LiveEvent::MessagesChanged { count });
    }
}

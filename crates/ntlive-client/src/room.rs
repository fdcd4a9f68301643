//! One viewer's presence in a live room.

use std::sync::Arc;

use ntlive_shared::constants::DEFAULT_GIFT_ID;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::LiveApi;
use crate::chat::ChatOptions;
use crate::config::ClientConfig;
use crate::controller::ChatController;
use crate::directory::{Revalidator, UserDirectory};
use crate::dispatcher::GiftDispatcher;
use crate::entry::{render_entry, ChatEntryView, MessageFormatter};
use crate::error::{GiftError, Result};
use crate::events::EventSink;
use crate::gift::{can_send_gift, GiftFlow, GiftTicket};
use crate::transport::TransportSession;

/// Shared collaborators every room needs.
#[derive(Clone)]
pub struct RoomServices {
    pub directory: UserDirectory,
    pub api: Arc<dyn LiveApi>,
    pub revalidator: Arc<dyn Revalidator>,
}

pub struct LiveRoom {
    room: String,
    authenticated: bool,
    locale: String,
    directory: UserDirectory,
    chat: ChatController,
    gifts: Arc<GiftFlow>,
    latch_task: JoinHandle<()>,
    _dispatcher: GiftDispatcher,
}

impl LiveRoom {
    /// Wire chat, gift notifications and the gift flow onto `session`.
    /// Must be called inside a tokio runtime.
    pub fn join(
        room: impl Into<String>,
        session: Arc<dyn TransportSession>,
        authenticated: bool,
        services: RoomServices,
        events: Arc<dyn EventSink>,
        config: &ClientConfig,
    ) -> Self {
        let room = room.into();
        let dispatcher = GiftDispatcher::spawn(&session, events.clone(), config.locale.clone());
        let chat = ChatController::new(
            session.clone(),
            ChatOptions::default(),
            config.join_delay,
            events.clone(),
        );
        let gifts = Arc::new(GiftFlow::new(
            session.clone(),
            services.directory.clone(),
            services.api,
            services.revalidator,
            events,
        ));
        let updates = services.directory.clone();
        gifts.sync_from_directory();
        let latch_task = tokio::spawn(latch_balance(gifts.clone(), updates));

        info!(
            room = %room,
            identity = %session.local_participant().identity,
            "Joined live room"
        );

        Self {
            room,
            authenticated,
            locale: config.locale.clone(),
            directory: services.directory,
            chat,
            gifts,
            latch_task,
            _dispatcher: dispatcher,
        }
    }

    pub fn name(&self) -> &str {
        &self.room
    }

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn gifts(&self) -> &GiftFlow {
        &self.gifts
    }

    pub fn gift_available(&self) -> bool {
        let identity = self.chat.session().local_participant().identity;
        can_send_gift(&identity, &self.room, self.authenticated)
    }

    pub fn entries(&self, formatter: Option<&MessageFormatter>) -> Vec<ChatEntryView> {
        self.chat
            .messages()
            .iter()
            .map(|m| render_entry(m, formatter, &self.room, &self.directory, &self.locale))
            .collect()
    }

    pub async fn submit(&self, input: &str) -> Result<bool> {
        self.chat.submit(input).await
    }

    /// Send the default gift from the current local balance.
    pub async fn send_gift(&self) -> Result<GiftTicket> {
        if !self.gift_available() {
            return Err(GiftError::NotAvailable.into());
        }
        self.gifts.sync_from_directory();
        let ticket = self
            .gifts
            .send_gift(self.gifts.balance(), DEFAULT_GIFT_ID)
            .await?;
        Ok(ticket)
    }
}

impl Drop for LiveRoom {
    fn drop(&mut self) {
        self.latch_task.abort();
    }
}

/// Retry the balance latch on every directory snapshot until it holds.
async fn latch_balance(gifts: Arc<GiftFlow>, mut directory: UserDirectory) {
    while !gifts.state().is_latched() {
        if !directory.changed().await {
            return;
        }
        gifts.sync_from_directory();
    }
    debug!(balance = gifts.balance(), "Balance latch settled");
}

//! View model for one chat entry, and the owner link toggle it exposes.

use std::sync::Arc;

use ntlive_shared::{ReceivedChatMessage, User};
use tracing::info;

use crate::api::LiveApi;
use crate::directory::{Revalidator, UserDirectory};
use crate::error::Result;
use crate::format::full_time;

pub type MessageFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    Local,
    Remote,
}

/// Popover action on a chat entry. Links the room owner to the sender, or
/// clears the link when the sender is the one already linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    Connect { owner_id: String, link: String },
    Disconnect { owner_id: String },
}

impl LinkAction {
    pub fn label(&self) -> &'static str {
        match self {
            LinkAction::Connect { .. } => "Connect",
            LinkAction::Disconnect { .. } => "Disconnect",
        }
    }

    pub fn owner_id(&self) -> &str {
        match self {
            LinkAction::Connect { owner_id, .. } | LinkAction::Disconnect { owner_id } => owner_id,
        }
    }

    /// Value written to the owner's `link` field.
    pub fn link_value(&self) -> &str {
        match self {
            LinkAction::Connect { link, .. } => link,
            LinkAction::Disconnect { .. } => "",
        }
    }

    /// Persist the new link and refresh the directory.
    pub async fn invoke(&self, api: &dyn LiveApi, revalidator: &dyn Revalidator) -> Result<()> {
        api.update_link(self.owner_id(), self.link_value()).await?;
        info!(
            owner = self.owner_id(),
            link = self.link_value(),
            action = self.label(),
            "Owner link updated"
        );
        revalidator.revalidate().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntryView {
    pub name: String,
    pub identity: String,
    /// Full local time of the message.
    pub tooltip: String,
    pub text: String,
    pub origin: MessageOrigin,
    pub action: Option<LinkAction>,
}

pub fn render_entry(
    entry: &ReceivedChatMessage,
    formatter: Option<&MessageFormatter>,
    room: &str,
    directory: &UserDirectory,
    locale: &str,
) -> ChatEntryView {
    let text = match formatter {
        Some(format) => format(&entry.message),
        None => entry.message.clone(),
    };
    let owner = directory.find_by_id(room);

    ChatEntryView {
        name: entry.from.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
        identity: entry.from.as_ref().map(|p| p.identity.clone()).unwrap_or_default(),
        tooltip: full_time(&entry.timestamp, locale),
        text,
        origin: if entry.is_local() {
            MessageOrigin::Local
        } else {
            MessageOrigin::Remote
        },
        action: link_action(entry, owner.as_ref(), directory),
    }
}

fn link_action(
    entry: &ReceivedChatMessage,
    owner: Option<&User>,
    directory: &UserDirectory,
) -> Option<LinkAction> {
    let owner = owner?;
    let from = entry.from.as_ref()?;

    if owner.is_linked_to(&from.identity) {
        return Some(LinkAction::Disconnect {
            owner_id: owner.id.clone(),
        });
    }

    // Senders are resolved by display name first, then by identity.
    let target = directory
        .find_by_name(&from.name)
        .or_else(|| directory.find_by_id(&from.identity))?;
    Some(LinkAction::Connect {
        owner_id: owner.id.clone(),
        link: target.id,
    })
}

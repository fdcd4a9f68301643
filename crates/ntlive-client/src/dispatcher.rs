//! Gift notifications from the shared data channel.
//!
//! The dispatcher holds its own subscription to the session's inbound
//! frames for as long as it lives. Frames tagged with the gift discriminant
//! trigger the celebration and a toast; everything else is left to the chat
//! consumer, which reads the same frames independently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ntlive_shared::{Frame, GiftEvent, Participant};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{EventSink, LiveEvent};
use crate::format::local_time;
use crate::transport::{DataReceived, TransportSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftNotice {
    pub from: Participant,
    pub gift: GiftEvent,
    pub received_at: DateTime<Utc>,
}

impl GiftNotice {
    pub fn toast(&self, locale: &str) -> LiveEvent {
        LiveEvent::Toast {
            title: format!("收到來自 {} 的禮物！", self.from.name),
            description: local_time(&self.received_at, locale),
        }
    }
}

/// Classify one inbound frame. Returns a notice only for attributed frames
/// whose envelope carries the gift discriminant.
pub fn gift_notice(packet: &DataReceived) -> Option<GiftNotice> {
    let Some(participant) = packet.participant.as_ref() else {
        debug!(len = packet.payload.len(), "Data frame without participant, discarding");
        return None;
    };

    match Frame::decode(&packet.payload) {
        Ok(Frame::Gift(gift)) => Some(GiftNotice {
            from: participant.clone(),
            gift,
            received_at: Utc::now(),
        }),
        Ok(_) => None,
        Err(e) => {
            debug!(
                from = %participant.identity,
                error = %e,
                "Undecodable data frame, discarding"
            );
            None
        }
    }
}

pub struct GiftDispatcher {
    task: JoinHandle<()>,
}

impl GiftDispatcher {
    /// Start listening on `session`. Must be called inside a tokio runtime.
    pub fn spawn(
        session: &Arc<dyn TransportSession>,
        events: Arc<dyn EventSink>,
        locale: impl Into<String>,
    ) -> Self {
        let rx = session.subscribe_data();
        let locale = locale.into();
        let task = tokio::spawn(async move {
            dispatch_loop(rx, events, locale).await;
        });
        Self { task }
    }
}

impl Drop for GiftDispatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn dispatch_loop(
    mut rx: tokio::sync::broadcast::Receiver<DataReceived>,
    events: Arc<dyn EventSink>,
    locale: String,
) {
    loop {
        let packet = match rx.recv().await {
            Ok(p) => p,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Gift dispatcher lagged, frames dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        if let Some(notice) = gift_notice(&packet) {
            info!(
                from = %notice.from.identity,
                gift = %notice.gift.payload,
                "Gift received"
            );
            events.emit(LiveEvent::Celebrate);
            events.emit(notice.toast(&locale));
        }
    }

    debug!("Gift dispatch loop ended");
}

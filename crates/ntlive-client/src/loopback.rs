//! In-process transport: every participant of a [`LoopbackRoom`] gets a
//! [`LoopbackSession`], and a frame published by one session is delivered
//! to every other session in the room, attributed to its sender.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use ntlive_shared::{DataPacketKind, Participant};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{DataReceived, TransportSession};

const INBOX_CAPACITY: usize = 256;

struct Member {
    participant: Participant,
    inbox: broadcast::Sender<DataReceived>,
}

pub struct LoopbackRoom {
    name: String,
    members: Mutex<Vec<Member>>,
}

impl LoopbackRoom {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            members: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a participant and return its session.
    pub fn join(self: &Arc<Self>, participant: Participant) -> Arc<LoopbackSession> {
        let (inbox, _) = broadcast::channel(INBOX_CAPACITY);
        let participant = Participant {
            is_local: false,
            ..participant
        };

        self.lock_members().push(Member {
            participant: participant.clone(),
            inbox: inbox.clone(),
        });
        debug!(room = %self.name, identity = %participant.identity, "Participant joined loopback room");

        Arc::new(LoopbackSession {
            room: self.clone(),
            participant,
            inbox,
            closed: AtomicBool::new(false),
        })
    }

    pub fn num_participants(&self) -> usize {
        self.lock_members().len()
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.lock_members()
            .iter()
            .map(|m| m.participant.clone())
            .collect()
    }

    fn deliver(&self, sender: &Participant, packet: DataReceived) -> usize {
        let members = self.lock_members();
        let mut delivered = 0;
        for member in members
            .iter()
            .filter(|m| m.participant.identity != sender.identity)
        {
            // A member with no live receivers simply misses the frame.
            if member.inbox.send(packet.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    fn leave(&self, identity: &str) {
        self.lock_members()
            .retain(|m| m.participant.identity != identity);
        debug!(room = %self.name, identity, "Participant left loopback room");
    }

    fn lock_members(&self) -> std::sync::MutexGuard<'_, Vec<Member>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct LoopbackSession {
    room: Arc<LoopbackRoom>,
    participant: Participant,
    inbox: broadcast::Sender<DataReceived>,
    closed: AtomicBool,
}

impl LoopbackSession {
    pub fn room(&self) -> &Arc<LoopbackRoom> {
        &self.room
    }

    /// Leave the room. Further publishes fail with [`TransportError::Closed`].
    pub fn disconnect(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.room.leave(&self.participant.identity);
        }
    }
}

impl Drop for LoopbackSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[async_trait]
impl TransportSession for LoopbackSession {
    fn local_participant(&self) -> Participant {
        self.participant.clone().as_local()
    }

    async fn publish_data(
        &self,
        payload: Vec<u8>,
        kind: DataPacketKind,
        topic: Option<&str>,
    ) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let len = payload.len();
        let packet = DataReceived {
            payload: Bytes::from(payload),
            participant: Some(self.participant.clone()),
            kind,
            topic: topic.map(str::to_owned),
        };
        let delivered = self.room.deliver(&self.participant, packet);
        debug!(
            room = %self.room.name,
            from = %self.participant.identity,
            len,
            delivered,
            "Published data frame"
        );
        Ok(())
    }

    fn subscribe_data(&self) -> broadcast::Receiver<DataReceived> {
        self.inbox.subscribe()
    }
}

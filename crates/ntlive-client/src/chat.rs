//! Chat on top of the shared data channel.
//!
//! [`setup_chat`] binds one transport session and returns a [`ChatSetup`]: a
//! send handle plus observables for the message list and the sending flag.
//! Dropping the setup stops the receive loop and completes both observables.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ntlive_shared::constants::CHAT_TOPIC;
use ntlive_shared::{ChatFrame, ChatMessage, DataPacketKind, Frame, ProtocolError, ReceivedChatMessage};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::observable::Subject;
use crate::transport::{DataReceived, TransportSession};

pub type MessageEncoder = Arc<dyn Fn(&ChatMessage) -> std::result::Result<Vec<u8>, ProtocolError> + Send + Sync>;
pub type MessageDecoder = Arc<dyn Fn(&[u8]) -> std::result::Result<ChatMessage, ProtocolError> + Send + Sync>;

/// Optional codec overrides. Two options compare equal when they hold the
/// same encoder and decoder objects.
#[derive(Clone, Default)]
pub struct ChatOptions {
    pub message_encoder: Option<MessageEncoder>,
    pub message_decoder: Option<MessageDecoder>,
}

impl ChatOptions {
    pub fn same_as(&self, other: &ChatOptions) -> bool {
        fn same<F: ?Sized>(a: &Option<Arc<F>>, b: &Option<Arc<F>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ()),
                (None, None) => true,
                _ => false,
            }
        }
        same(&self.message_encoder, &other.message_encoder)
            && same(&self.message_decoder, &other.message_decoder)
    }

    fn encoder(&self) -> MessageEncoder {
        self.message_encoder
            .clone()
            .unwrap_or_else(|| Arc::new(default_encode) as MessageEncoder)
    }

    fn decoder(&self) -> MessageDecoder {
        self.message_decoder
            .clone()
            .unwrap_or_else(|| Arc::new(default_decode) as MessageDecoder)
    }
}

pub fn default_encode(message: &ChatMessage) -> std::result::Result<Vec<u8>, ProtocolError> {
    ChatFrame::from(message.clone()).to_bytes()
}

pub fn default_decode(data: &[u8]) -> std::result::Result<ChatMessage, ProtocolError> {
    ChatFrame::from_bytes(data).map(ChatMessage::from)
}

/// Append-only message list that republishes a snapshot on every push.
struct MessageLog {
    entries: Mutex<Vec<ReceivedChatMessage>>,
    subject: Arc<Subject<Vec<ReceivedChatMessage>>>,
}

impl MessageLog {
    fn push(&self, message: ReceivedChatMessage) {
        let snapshot = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.push(message);
            entries.clone()
        };
        self.subject.next(snapshot);
    }
}

struct SenderInner {
    session: Arc<dyn TransportSession>,
    encoder: MessageEncoder,
    log: Arc<MessageLog>,
    is_sending: Arc<Subject<bool>>,
    in_flight: AtomicUsize,
    destroyed: Arc<AtomicBool>,
}

/// Holds `is_sending` up while at least one send is in flight. Released on
/// drop, so a cancelled send clears the flag too.
struct SendingGuard<'a> {
    inner: &'a SenderInner,
}

impl<'a> SendingGuard<'a> {
    fn begin(inner: &'a SenderInner) -> Self {
        if inner.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            inner.is_sending.next(true);
        }
        Self { inner }
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.is_sending.next(false);
        }
    }
}

/// Send handle of one chat setup. Clones share identity; a new setup yields
/// a handle that is not [`ChatSender::same_as`] the previous one.
#[derive(Clone)]
pub struct ChatSender {
    inner: Arc<SenderInner>,
}

impl ChatSender {
    /// Publish `text` and append it to the local message list.
    pub async fn send(&self, text: &str) -> Result<ReceivedChatMessage> {
        let inner = &self.inner;
        if inner.destroyed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed.into());
        }

        let message = ChatMessage::new(text);
        let payload = (inner.encoder)(&message)?;

        let published = {
            let _sending = SendingGuard::begin(inner);
            inner
                .session
                .publish_data(payload, DataPacketKind::Reliable, Some(CHAT_TOPIC))
                .await
        };
        published?;

        let received = ReceivedChatMessage::from_message(
            message,
            Some(inner.session.local_participant().as_local()),
        );
        inner.log.push(received.clone());
        Ok(received)
    }

    pub fn same_as(&self, other: &ChatSender) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

pub struct ChatSetup {
    sender: ChatSender,
    pub messages: Arc<Subject<Vec<ReceivedChatMessage>>>,
    pub is_sending: Arc<Subject<bool>>,
    destroyed: Arc<AtomicBool>,
    receiver: JoinHandle<()>,
}

impl ChatSetup {
    pub fn sender(&self) -> ChatSender {
        self.sender.clone()
    }

    /// Stop receiving and release the observables.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for ChatSetup {
    fn drop(&mut self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.receiver.abort();
        self.messages.complete();
        self.is_sending.complete();
        debug!("Chat setup destroyed");
    }
}

/// Bind a chat to `session`. Must be called inside a tokio runtime.
pub fn setup_chat(session: Arc<dyn TransportSession>, options: &ChatOptions) -> ChatSetup {
    let messages = Arc::new(Subject::with_value(Vec::new()));
    let is_sending = Arc::new(Subject::with_value(false));
    let destroyed = Arc::new(AtomicBool::new(false));
    let log = Arc::new(MessageLog {
        entries: Mutex::new(Vec::new()),
        subject: messages.clone(),
    });

    let rx = session.subscribe_data();
    let receiver = tokio::spawn(receive_loop(rx, options.decoder(), log.clone()));

    info!(
        identity = %session.local_participant().identity,
        "Chat session set up"
    );

    let sender = ChatSender {
        inner: Arc::new(SenderInner {
            session,
            encoder: options.encoder(),
            log,
            is_sending: is_sending.clone(),
            in_flight: AtomicUsize::new(0),
            destroyed: destroyed.clone(),
        }),
    };

    ChatSetup {
        sender,
        messages,
        is_sending,
        destroyed,
        receiver,
    }
}

async fn receive_loop(
    mut rx: tokio::sync::broadcast::Receiver<DataReceived>,
    decoder: MessageDecoder,
    log: Arc<MessageLog>,
) {
    loop {
        let packet = match rx.recv().await {
            Ok(p) => p,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Chat receiver lagged, frames dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        if let Some(ref topic) = packet.topic {
            if topic != CHAT_TOPIC {
                continue;
            }
        }

        // Tagged event envelopes belong to other consumers, whatever the codec.
        if matches!(Frame::decode(&packet.payload), Ok(Frame::Gift(_)) | Ok(Frame::Tagged { .. })) {
            continue;
        }

        match decoder(&packet.payload) {
            Ok(message) => {
                log.push(ReceivedChatMessage::from_message(message, packet.participant));
            }
            Err(e) => {
                debug!(error = %e, len = packet.payload.len(), "Discarding undecodable chat frame");
            }
        }
    }

    debug!("Chat receive loop ended");
}

//! Boundary to the real-time transport session.
//!
//! The session itself (connection lifecycle, media tracks, roster) belongs
//! to the transport provider. This crate only needs the local participant,
//! a way to publish on the shared data channel, and a stream of inbound
//! frames. Every call to [`TransportSession::subscribe_data`] yields an
//! independent receiver, so the chat and gift consumers each see every frame.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ntlive_shared::{DataPacketKind, Participant};
use tokio::sync::broadcast;

use crate::error::TransportError;

/// One inbound data-channel frame.
#[derive(Debug, Clone)]
pub struct DataReceived {
    pub payload: Bytes,
    /// Sender, when the transport could attribute the frame.
    pub participant: Option<Participant>,
    pub kind: DataPacketKind,
    pub topic: Option<String>,
}

#[async_trait]
pub trait TransportSession: Send + Sync {
    /// The local participant. `identity` is empty until the session knows it.
    fn local_participant(&self) -> Participant;

    /// Publish on the shared data channel. Resolves once the transport has
    /// accepted the frame locally; delivery is not confirmed.
    async fn publish_data(
        &self,
        payload: Vec<u8>,
        kind: DataPacketKind,
        topic: Option<&str>,
    ) -> Result<(), TransportError>;

    fn subscribe_data(&self) -> broadcast::Receiver<DataReceived>;
}

/// Whether two handles refer to the same session object.
pub fn same_session(a: &Arc<dyn TransportSession>, b: &Arc<dyn TransportSession>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

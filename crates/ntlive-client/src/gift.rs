//! Gift sending and the viewer's locally cached point balance.

use std::sync::{Arc, Mutex, PoisonError};

use ntlive_shared::constants::GIFT_COST;
use ntlive_shared::{DataPacketKind, GiftEvent};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::LiveApi;
use crate::directory::{Revalidator, UserDirectory};
use crate::error::GiftError;
use crate::events::{EventSink, LiveEvent};
use crate::transport::TransportSession;

/// Local point balance. Only the first directory read, a local gift, or a
/// confirmed persistence moves it; later directory snapshots never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointBalance {
    Uninitialized,
    Loaded(i64),
    Optimistic(i64),
}

impl PointBalance {
    /// Displayed value; zero until loaded.
    pub fn value(&self) -> i64 {
        match *self {
            PointBalance::Uninitialized => 0,
            PointBalance::Loaded(v) | PointBalance::Optimistic(v) => v,
        }
    }

    pub fn is_latched(&self) -> bool {
        !matches!(self, PointBalance::Uninitialized)
    }

    pub fn observe_directory(self, value: i64) -> Self {
        match self {
            PointBalance::Uninitialized => PointBalance::Loaded(value),
            latched => latched,
        }
    }

    pub fn debit(self, value: i64) -> Self {
        PointBalance::Optimistic(value)
    }

    /// A persisted value only confirms the optimistic value it was sent for.
    pub fn confirm(self, committed: i64) -> Self {
        match self {
            PointBalance::Optimistic(v) if v == committed => PointBalance::Loaded(v),
            other => other,
        }
    }
}

/// Whether the gift action is offered: signed in, and not the room owner.
pub fn can_send_gift(viewer_identity: &str, room_owner: &str, authenticated: bool) -> bool {
    authenticated && !viewer_identity.is_empty() && viewer_identity != room_owner
}

/// Result of a gift send. `persistence` completes once the balance write
/// and the follow-up refresh have finished; awaiting it is optional.
pub struct GiftTicket {
    pub balance: i64,
    pub persistence: JoinHandle<()>,
}

pub struct GiftFlow {
    session: Arc<dyn TransportSession>,
    directory: UserDirectory,
    api: Arc<dyn LiveApi>,
    revalidator: Arc<dyn Revalidator>,
    events: Arc<dyn EventSink>,
    balance: Arc<Mutex<PointBalance>>,
}

impl GiftFlow {
    pub fn new(
        session: Arc<dyn TransportSession>,
        directory: UserDirectory,
        api: Arc<dyn LiveApi>,
        revalidator: Arc<dyn Revalidator>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            session,
            directory,
            api,
            revalidator,
            events,
            balance: Arc::new(Mutex::new(PointBalance::Uninitialized)),
        }
    }

    /// Latch the balance from the directory the first time the local
    /// identity is known and present in the directory.
    pub fn sync_from_directory(&self) -> PointBalance {
        let mut balance = self.lock_balance();
        if balance.is_latched() {
            return *balance;
        }

        let identity = self.session.local_participant().identity;
        if identity.is_empty() {
            return *balance;
        }

        if let Some(user) = self.directory.find_by_id(&identity) {
            *balance = balance.observe_directory(user.point);
            debug!(identity = %identity, point = user.point, "Point balance latched");
            self.events.emit(LiveEvent::BalanceChanged { balance: user.point });
        }
        *balance
    }

    pub fn state(&self) -> PointBalance {
        *self.lock_balance()
    }

    pub fn balance(&self) -> i64 {
        self.state().value()
    }

    /// Spend [`GIFT_COST`] points on `gift_id`.
    ///
    /// The local balance drops and the celebration fires before anything
    /// touches the network. The new balance is then written in the
    /// background and the gift envelope is broadcast without delivery
    /// confirmation. A failed write is logged and leaves the local balance
    /// ahead of the stored one until the next successful gift.
    pub async fn send_gift(&self, current_points: i64, gift_id: &str) -> Result<GiftTicket, GiftError> {
        let identity = self.session.local_participant().identity;
        if identity.is_empty() {
            return Err(GiftError::IdentityUnknown);
        }
        if current_points < GIFT_COST {
            return Err(GiftError::InsufficientPoints {
                balance: current_points,
                cost: GIFT_COST,
            });
        }

        let next = current_points - GIFT_COST;
        {
            let mut balance = self.lock_balance();
            *balance = balance.debit(next);
        }
        self.events.emit(LiveEvent::BalanceChanged { balance: next });
        self.events.emit(LiveEvent::Celebrate);

        let persistence = tokio::spawn(persist_balance(
            self.api.clone(),
            self.revalidator.clone(),
            self.balance.clone(),
            identity.clone(),
            next,
        ));

        match GiftEvent::new(gift_id).to_bytes() {
            Ok(payload) => {
                if let Err(e) = self
                    .session
                    .publish_data(payload, DataPacketKind::Lossy, None)
                    .await
                {
                    warn!(error = %e, gift = gift_id, "Gift broadcast failed");
                }
            }
            Err(e) => warn!(error = %e, gift = gift_id, "Failed to encode gift event"),
        }

        info!(identity = %identity, gift = gift_id, balance = next, "Gift sent");
        Ok(GiftTicket {
            balance: next,
            persistence,
        })
    }

    fn lock_balance(&self) -> std::sync::MutexGuard<'_, PointBalance> {
        self.balance.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn persist_balance(
    api: Arc<dyn LiveApi>,
    revalidator: Arc<dyn Revalidator>,
    balance: Arc<Mutex<PointBalance>>,
    identity: String,
    point: i64,
) {
    if let Err(e) = api.update_point(&identity, point).await {
        warn!(identity = %identity, point, error = %e, "Point update failed");
        return;
    }

    {
        let mut guard = balance.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = guard.confirm(point);
    }

    if let Err(e) = revalidator.revalidate().await {
        warn!(error = %e, "Refresh after point update failed");
    }
}

#[cfg(test)]
mod tests {
    use ntlive_shared::{Frame, Participant};
    use tokio::sync::mpsc;

    use super::*;
    use crate::api::LiveApi;
    use crate::directory::DirectoryProvider;
    use crate::events::TracingSink;
    use crate::loopback::{LoopbackRoom, LoopbackSession};
    use crate::testing::{user, ApiCall, RecordingApi};

    struct Fixture {
        api: Arc<RecordingApi>,
        provider: Arc<DirectoryProvider>,
        host: Arc<LoopbackSession>,
        flow: GiftFlow,
    }

    async fn fixture(point: i64, events: Arc<dyn EventSink>) -> Fixture {
        let api = Arc::new(RecordingApi::new().with_users(vec![
            user("uid-v", "Viewer", point),
            user("uid-h", "Host", 0),
        ]));
        let provider = Arc::new(DirectoryProvider::new(api.clone()));
        provider.refresh().await.unwrap();

        let room = LoopbackRoom::new("uid-h");
        let host = room.join(Participant::new("uid-h", "Host"));
        let viewer = room.join(Participant::new("uid-v", "Viewer"));
        let flow = GiftFlow::new(viewer.clone(), provider.directory(), api.clone(), provider.clone(), events);
        Fixture {
            api,
            provider,
            host,
            flow,
        }
    }

    #[test]
    fn test_balance_state_machine() {
        let s = PointBalance::Uninitialized;
        assert_eq!(s.value(), 0);

        let s = s.observe_directory(50);
        assert_eq!(s, PointBalance::Loaded(50));
        assert_eq!(s.observe_directory(999), PointBalance::Loaded(50));

        let s = s.debit(40);
        assert_eq!(s.observe_directory(50), PointBalance::Optimistic(40));
        assert_eq!(s.confirm(30), PointBalance::Optimistic(40));
        assert_eq!(s.confirm(40), PointBalance::Loaded(40));
    }

    #[test]
    fn test_gift_availability() {
        assert!(can_send_gift("uid-v", "uid-h", true));
        assert!(!can_send_gift("uid-h", "uid-h", true));
        assert!(!can_send_gift("uid-v", "uid-h", false));
        assert!(!can_send_gift("", "uid-h", true));
    }

    #[tokio::test]
    async fn test_latch_ignores_later_snapshots() {
        let f = fixture(50, Arc::new(TracingSink)).await;
        assert_eq!(f.flow.sync_from_directory(), PointBalance::Loaded(50));

        // A later snapshot with a different value must not clobber the cache.
        f.api.update_point("uid-v", 80).await.unwrap();
        f.provider.refresh().await.unwrap();
        assert_eq!(f.flow.sync_from_directory(), PointBalance::Loaded(50));
        assert_eq!(f.flow.balance(), 50);
    }

    #[tokio::test]
    async fn test_optimistic_debit_precedes_persistence() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let f = fixture(50, Arc::new(tx)).await;
        f.flow.sync_from_directory();
        let mut host_rx = f.host.subscribe_data();

        f.api.hold_updates();
        let ticket = f.flow.send_gift(f.flow.balance(), "gift").await.unwrap();

        assert_eq!(ticket.balance, 40);
        assert_eq!(f.flow.state(), PointBalance::Optimistic(40));
        assert!(f.api.updates().is_empty());

        let mut saw_celebrate = false;
        while let Ok(event) = rx.try_recv() {
            saw_celebrate |= event == LiveEvent::Celebrate;
        }
        assert!(saw_celebrate);

        let packet = host_rx.recv().await.unwrap();
        assert!(Frame::decode(&packet.payload).unwrap().is_gift());
        assert_eq!(packet.kind, DataPacketKind::Lossy);

        f.api.release_updates();
        ticket.persistence.await.unwrap();

        assert_eq!(
            f.api.updates(),
            vec![ApiCall::UpdatePoint { id: "uid-v".into(), point: 40 }]
        );
        assert_eq!(f.flow.state(), PointBalance::Loaded(40));
        assert_eq!(f.provider.directory().find_by_id("uid-v").unwrap().point, 40);
    }

    #[tokio::test]
    async fn test_failed_persistence_keeps_optimistic_balance() {
        let f = fixture(25, Arc::new(TracingSink)).await;
        f.flow.sync_from_directory();

        f.api.fail_next_calls(1);
        let ticket = f.flow.send_gift(25, "gift").await.unwrap();
        ticket.persistence.await.unwrap();

        assert_eq!(f.flow.state(), PointBalance::Optimistic(15));
        assert_eq!(f.api.stored_user("uid-v").unwrap().point, 25);

        // No refresh follows a failed write.
        let calls = f.api.calls();
        assert_eq!(calls.iter().filter(|c| **c == ApiCall::ListUsers).count(), 1);
        assert_eq!(calls.last(), Some(&ApiCall::UpdatePoint { id: "uid-v".into(), point: 15 }));
    }

    #[tokio::test]
    async fn test_insufficient_points_rejected_without_side_effects() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let f = fixture(5, Arc::new(tx)).await;
        f.flow.sync_from_directory();
        while rx.try_recv().is_ok() {}

        let err = f.flow.send_gift(5, "gift").await.err().unwrap();
        assert_eq!(err, GiftError::InsufficientPoints { balance: 5, cost: 10 });
        assert_eq!(f.flow.state(), PointBalance::Loaded(5));
        assert!(rx.try_recv().is_err());
        assert!(f.api.updates().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_identity_rejected() {
        let api = Arc::new(RecordingApi::new());
        let provider = Arc::new(DirectoryProvider::new(api.clone()));
        let room = LoopbackRoom::new("uid-h");
        let anonymous = room.join(Participant::new("", ""));
        let flow = GiftFlow::new(anonymous.clone(), provider.directory(), api.clone(), provider, Arc::new(TracingSink));

        assert_eq!(flow.sync_from_directory(), PointBalance::Uninitialized);
        assert_eq!(flow.send_gift(100, "gift").await.err(), Some(GiftError::IdentityUnknown));
    }
}

// Recording fake of the persistence API, shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ntlive_shared::{Room, User};
use tokio::sync::Semaphore;

use crate::api::LiveApi;
use crate::error::ApiError;

pub fn user(id: &str, name: &str, point: i64) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        point,
        link: String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListRooms { user: String },
    ListUsers,
    UpdatePoint { id: String, point: i64 },
    UpdateLink { id: String, link: String },
}

/// In-memory backing store that records every call. Updates are applied to
/// the stored users, so a later `list_users` observes them.
pub struct RecordingApi {
    users: Mutex<Vec<User>>,
    rooms: Mutex<Vec<Room>>,
    calls: Mutex<Vec<ApiCall>>,
    failures: AtomicUsize,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            rooms: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }

    pub fn with_users(self, users: Vec<User>) -> Self {
        *self.users.lock().unwrap() = users;
        self
    }

    pub fn with_rooms(self, rooms: Vec<Room>) -> Self {
        *self.rooms.lock().unwrap() = rooms;
        self
    }

    pub fn set_rooms(&self, rooms: Vec<Room>) {
        *self.rooms.lock().unwrap() = rooms;
    }

    /// Make the next `n` calls fail with a 503.
    pub fn fail_next_calls(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Block update calls until [`RecordingApi::release_updates`].
    pub fn hold_updates(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_updates(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.close();
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::UpdatePoint { .. } | ApiCall::UpdateLink { .. }))
            .collect()
    }

    pub fn stored_user(&self, id: &str) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    fn record(&self, call: ApiCall) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ApiError::Status {
                method: "TEST",
                url: "memory://".to_string(),
                status: 503,
            });
        }
        Ok(())
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
    }
}

#[async_trait]
impl LiveApi for RecordingApi {
    async fn list_rooms(&self, user: &str) -> Result<Vec<Room>, ApiError> {
        self.record(ApiCall::ListRooms { user: user.to_string() })?;
        Ok(self.rooms.lock().unwrap().clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.record(ApiCall::ListUsers)?;
        Ok(self.users.lock().unwrap().clone())
    }

    async fn update_point(&self, id: &str, point: i64) -> Result<(), ApiError> {
        self.wait_gate().await;
        self.record(ApiCall::UpdatePoint { id: id.to_string(), point })?;
        if let Some(u) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            u.point = point;
        }
        Ok(())
    }

    async fn update_link(&self, id: &str, link: &str) -> Result<(), ApiError> {
        self.wait_gate().await;
        self.record(ApiCall::UpdateLink {
            id: id.to_string(),
            link: link.to_string(),
        })?;
        if let Some(u) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            u.link = link.to_string();
        }
        Ok(())
    }
}

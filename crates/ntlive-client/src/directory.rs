//! Process-wide user directory.
//!
//! [`DirectoryProvider`] owns the snapshot and is the only writer; every
//! other component receives a read-only [`UserDirectory`] handle. Writes go
//! to the backing store through [`LiveApi`] and become visible here only
//! after a [`Revalidator::revalidate`] call refetches the snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use ntlive_shared::User;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::LiveApi;
use crate::error::Result;

/// Read-only handle to the latest user snapshot.
#[derive(Clone)]
pub struct UserDirectory {
    rx: watch::Receiver<Arc<Vec<User>>>,
}

impl UserDirectory {
    /// A directory that never changes. Handy for rendering fixed data.
    pub fn fixed(users: Vec<User>) -> Self {
        let (_tx, rx) = watch::channel(Arc::new(users));
        Self { rx }
    }

    pub fn snapshot(&self) -> Arc<Vec<User>> {
        self.rx.borrow().clone()
    }

    pub fn find_by_id(&self, id: &str) -> Option<User> {
        self.rx.borrow().iter().find(|u| u.id == id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<User> {
        self.rx.borrow().iter().find(|u| u.name == name).cloned()
    }

    /// Wait for the next snapshot. Returns `false` once the provider is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Refreshes shared data after a successful write elsewhere.
#[async_trait]
pub trait Revalidator: Send + Sync {
    async fn revalidate(&self) -> Result<()>;
}

pub struct DirectoryProvider {
    api: Arc<dyn LiveApi>,
    tx: watch::Sender<Arc<Vec<User>>>,
}

impl DirectoryProvider {
    pub fn new(api: Arc<dyn LiveApi>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self { api, tx }
    }

    pub fn directory(&self) -> UserDirectory {
        UserDirectory {
            rx: self.tx.subscribe(),
        }
    }

    /// Refetch the user list and publish it. On failure the previous
    /// snapshot stays in place.
    pub async fn refresh(&self) -> Result<usize> {
        match self.api.list_users().await {
            Ok(users) => {
                let count = users.len();
                self.tx.send_replace(Arc::new(users));
                info!(count, "User directory refreshed");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "User directory refresh failed");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl Revalidator for DirectoryProvider {
    async fn revalidate(&self) -> Result<()> {
        self.refresh().await.map(|_| ())
    }
}

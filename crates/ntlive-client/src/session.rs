//! Identity session as supplied by the sign-in provider.

use serde::{Deserialize, Serialize};

use crate::directory::UserDirectory;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: Option<SessionUser>,
    pub authenticated: bool,
}

impl AuthSession {
    pub fn signed_in(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            authenticated: true,
        }
    }

    /// The signed-in user, if the session is authenticated.
    pub fn user(&self) -> Option<&SessionUser> {
        if self.authenticated {
            self.user.as_ref()
        } else {
            None
        }
    }
}

/// What the header dropdown shows for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub point: i64,
}

impl ProfileSummary {
    /// Points come from the directory entry matching the session user name,
    /// or zero while the directory has not caught up.
    pub fn resolve(session: &AuthSession, directory: &UserDirectory) -> Option<Self> {
        let user = session.user()?;
        let point = directory
            .find_by_name(&user.name)
            .map(|u| u.point)
            .unwrap_or_default();
        Some(Self {
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            point,
        })
    }
}

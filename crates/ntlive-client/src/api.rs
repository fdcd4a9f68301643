//! HTTP client for the rooms, users and link endpoints.

use async_trait::async_trait;
use ntlive_shared::{Room, User};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Persistence and listing collaborators, as seen by the client.
#[async_trait]
pub trait LiveApi: Send + Sync {
    /// `GET /api/room?user=<name>`
    async fn list_rooms(&self, user: &str) -> Result<Vec<Room>, ApiError>;

    /// `GET /api/users`
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;

    /// `PATCH /api/users?id=<id>&point=<point>`
    async fn update_point(&self, id: &str, point: i64) -> Result<(), ApiError>;

    /// `PATCH /api/link?id=<owner id>&link=<link>`
    async fn update_link(&self, id: &str, link: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct RoomsResponse {
    #[serde(default)]
    rooms: Vec<Room>,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Serialize)]
struct PointUpdate<'a> {
    id: &'a str,
    point: String,
}

#[derive(Debug, Serialize)]
struct LinkUpdate<'a> {
    id: &'a str,
    link: &'a str,
}

pub struct HttpApi {
    client: reqwest::Client,
    base: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn check(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(ApiError::Status {
            method,
            url: response.url().to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl LiveApi for HttpApi {
    async fn list_rooms(&self, user: &str) -> Result<Vec<Room>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/room"))
            .query(&[("user", user)])
            .send()
            .await?;
        let body: RoomsResponse = Self::check("GET", response)?.json().await?;
        debug!(user, count = body.rooms.len(), "Fetched rooms");
        Ok(body.rooms)
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let response = self.client.get(self.url("/api/users")).send().await?;
        let body: UsersResponse = Self::check("GET", response)?.json().await?;
        debug!(count = body.users.len(), "Fetched users");
        Ok(body.users)
    }

    async fn update_point(&self, id: &str, point: i64) -> Result<(), ApiError> {
        let point = point.to_string();
        let response = self
            .client
            .patch(self.url("/api/users"))
            .query(&[("id", id), ("point", point.as_str())])
            .json(&PointUpdate { id, point: point.clone() })
            .send()
            .await?;
        Self::check("PATCH", response)?;
        debug!(id, point = %point, "Point balance persisted");
        Ok(())
    }

    async fn update_link(&self, id: &str, link: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .patch(self.url("/api/link"))
            .query(&[("id", id), ("link", link)])
            .json(&LinkUpdate { id, link })
            .send()
            .await?;
        Self::check("PATCH", response)?;
        debug!(id, link, "Owner link persisted");
        Ok(())
    }
}

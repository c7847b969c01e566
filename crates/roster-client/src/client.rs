//! HTTP client for the roster REST API

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::{ExperienceStore, RemoteStore, Resource};
use crate::types::{Experience, MemberRole, StoreConfig};

/// REST-backed store for one collection
///
/// # Example
///
/// ```rust,no_run
/// use roster_client::{HttpStore, RemoteStore, StoreConfig, User};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let users = HttpStore::<User>::new(StoreConfig {
///     base_url: "http://localhost:3000/api".into(),
///     ..Default::default()
/// })?;
///
/// for user in users.list().await? {
///     println!("{}", user.name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct HttpStore<T> {
    config: StoreConfig,
    client: Client,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> HttpStore<T> {
    /// Create a new store client
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self::with_client(config, client))
    }

    /// Create a store sharing an existing HTTP client
    pub fn with_client(config: StoreConfig, client: Client) -> Self {
        Self {
            config,
            client,
            _marker: PhantomData,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            T::collection()
        )
    }

    fn entity_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), urlencoding::encode(id))
    }

    // ==================== Helper Methods ====================

    /// Map error statuses. A 404 is `NotFound` only for an entity route
    /// (`entity` is its id); on a collection route it is a server error.
    async fn check_status(&self, response: reqwest::Response, entity: Option<&str>) -> Result<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = entity {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }

        if status == StatusCode::BAD_REQUEST
            || status == StatusCode::CONFLICT
            || status == StatusCode::UNPROCESSABLE_ENTITY
        {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::ValidationRejected {
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn handle_response<R: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        entity: Option<&str>,
    ) -> Result<R> {
        let response = self.check_status(response, entity).await?;
        let body = response.json().await?;
        Ok(body)
    }

    /// Overlay the server's echo onto what was sent.
    ///
    /// An empty or non-object body leaves `sent` as is.
    async fn merge_echo(&self, response: reqwest::Response, sent: Value, entity: Option<&str>) -> Result<T> {
        let response = self.check_status(response, entity).await?;
        let text = response.text().await?;

        let mut merged = sent;
        if !text.trim().is_empty() {
            if let (Value::Object(base), Value::Object(echo)) =
                (&mut merged, serde_json::from_str::<Value>(&text)?)
            {
                base.extend(echo);
            }
        }

        Ok(serde_json::from_value(merged)?)
    }
}

#[async_trait]
impl<T: Resource> RemoteStore<T> for HttpStore<T> {
    async fn list(&self) -> Result<Vec<T>> {
        let url = self.collection_url();
        debug!(%url, "listing collection");

        let response = self.client.get(&url).send().await?;
        self.handle_response(response, None).await
    }

    async fn get(&self, id: &str) -> Result<T> {
        let url = self.entity_url(id);
        debug!(%url, "fetching entity");

        let response = self.client.get(&url).send().await?;
        self.handle_response(response, Some(id)).await
    }

    async fn create(&self, draft: &T) -> Result<T> {
        let url = self.collection_url();
        debug!(%url, "creating entity");

        let body = serde_json::to_value(draft)?;
        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let created = self.merge_echo(response, body, None).await?;
        if created.id().is_none() {
            return Err(StoreError::InvalidResponse(format!(
                "create on {} returned no identifier",
                T::collection()
            )));
        }
        Ok(created)
    }

    async fn update(&self, entity: &T) -> Result<T> {
        let id = entity.id().ok_or(StoreError::MissingId)?;
        let url = self.entity_url(id);
        debug!(%url, "updating entity");

        let body = serde_json::to_value(entity)?;
        let response = self
            .client
            .put(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let mut updated = self.merge_echo(response, body, Some(id)).await?;
        if updated.id().is_none() {
            updated.set_id(id.to_string());
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.entity_url(id);
        debug!(%url, "deleting entity");

        let response = self.client.delete(&url).send().await?;
        self.check_status(response, Some(id)).await?;
        Ok(())
    }
}

#[async_trait]
impl ExperienceStore for HttpStore<Experience> {
    async fn list_for_member(&self, member_id: &str, role: MemberRole) -> Result<Vec<Experience>> {
        let member = urlencoding::encode(member_id);
        let query = match role {
            MemberRole::Owner => format!("owner={}", member),
            MemberRole::Participant => format!("participant={}", member),
            MemberRole::Any => format!("participant={}&owner={}", member, member),
        };
        let url = format!("{}?{}", self.collection_url(), query);
        debug!(%url, "listing experiences for member");

        let response = self.client.get(&url).send().await?;
        self.handle_response(response, None).await
    }
}

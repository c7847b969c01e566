//! In-memory store for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, StoreError};
use crate::store::{ExperienceStore, RemoteStore, Resource};
use crate::types::{Experience, MemberRole};

/// Store operations counted by [`MockStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    List,
    Get,
    Create,
    Update,
    Delete,
    Query,
}

impl MockOp {
    fn slot(self) -> usize {
        self as usize
    }
}

/// Mock store for testing.
///
/// Keeps entities in insertion order, assigns uuid identifiers on create,
/// counts calls per operation and can be switched to failing.
pub struct MockStore<T> {
    items: Mutex<Vec<T>>,
    available: AtomicBool,
    latency: Option<Duration>,
    calls: [AtomicU32; 6],
}

impl<T: Resource> MockStore<T> {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Create a mock store holding `items`.
    pub fn with_items(items: Vec<T>) -> Self {
        Self {
            items: Mutex::new(items),
            available: AtomicBool::new(true),
            latency: None,
            calls: Default::default(),
        }
    }

    /// Delay every operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Set availability; an unavailable store fails every call with a 503.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of calls made for `op`.
    pub fn calls(&self, op: MockOp) -> u32 {
        self.calls[op.slot()].load(Ordering::SeqCst)
    }

    /// Total number of calls across all operations.
    pub fn total_calls(&self) -> u32 {
        self.calls.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    /// Reset all call counters.
    pub fn reset_calls(&self) {
        for counter in &self.calls {
            counter.store(0, Ordering::SeqCst);
        }
    }

    /// Snapshot of the stored entities.
    pub async fn items(&self) -> Vec<T> {
        self.items.lock().await.clone()
    }

    /// Insert an entity directly, bypassing the counters.
    pub async fn insert(&self, item: T) {
        self.items.lock().await.push(item);
    }

    async fn enter(&self, op: MockOp) -> Result<()> {
        self.calls[op.slot()].fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Server {
                status: 503,
                message: "Mock store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl<T: Resource> Default for MockStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Resource> RemoteStore<T> for MockStore<T> {
    async fn list(&self) -> Result<Vec<T>> {
        self.enter(MockOp::List).await?;
        Ok(self.items.lock().await.clone())
    }

    async fn get(&self, id: &str) -> Result<T> {
        self.enter(MockOp::Get).await?;
        self.items
            .lock()
            .await
            .iter()
            .find(|item| item.id() == Some(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, draft: &T) -> Result<T> {
        self.enter(MockOp::Create).await?;
        let mut created = draft.clone();
        if created.id().is_none() {
            created.set_id(uuid::Uuid::new_v4().simple().to_string());
        }
        self.items.lock().await.push(created.clone());
        Ok(created)
    }

    async fn update(&self, entity: &T) -> Result<T> {
        self.enter(MockOp::Update).await?;
        let id = entity.id().ok_or(StoreError::MissingId)?;
        let mut items = self.items.lock().await;
        let slot = items
            .iter_mut()
            .find(|item| item.id() == Some(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = entity.clone();
        Ok(entity.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.enter(MockOp::Delete).await?;
        let mut items = self.items.lock().await;
        let before = items.len();
        items.retain(|item| item.id() != Some(id));
        if items.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExperienceStore for MockStore<Experience> {
    async fn list_for_member(&self, member_id: &str, role: MemberRole) -> Result<Vec<Experience>> {
        self.enter(MockOp::Query).await?;
        Ok(self
            .items
            .lock()
            .await
            .iter()
            .filter(|exp| exp.involves(member_id, role))
            .cloned()
            .collect())
    }
}

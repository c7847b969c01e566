//! Core traits for remote collections.
//!
//! `RemoteStore` is the seam between the roster logic and whatever backs a
//! collection: the REST API in production, an in-memory map in tests.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::types::{Experience, MemberRole, User};

/// An entity living in a remote collection, keyed by an opaque id.
pub trait Resource: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Collection path segment (e.g. "users")
    fn collection() -> &'static str;

    /// Identifier, `None` while transient
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);
}

impl Resource for User {
    fn collection() -> &'static str {
        "users"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

impl Resource for Experience {
    fn collection() -> &'static str {
        "experiences"
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// CRUD access to one remote collection.
///
/// Implementations make exactly one remote call per method and cache nothing.
#[async_trait]
pub trait RemoteStore<T: Resource>: Send + Sync {
    /// Fetch every entity in the collection.
    async fn list(&self) -> Result<Vec<T>>;

    /// Fetch one entity; `NotFound` if the remote has no such id.
    async fn get(&self, id: &str) -> Result<T>;

    /// Persist a new entity.
    ///
    /// The returned entity carries the server-assigned id; fields echoed by
    /// the server win over the draft's.
    async fn create(&self, draft: &T) -> Result<T>;

    /// Persist changes to an existing entity.
    async fn update(&self, entity: &T) -> Result<T>;

    /// Remove an entity.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Experience collection with member-scoped queries.
#[async_trait]
pub trait ExperienceStore: RemoteStore<Experience> {
    /// Experiences where `member_id` holds `role`, in a single query.
    async fn list_for_member(&self, member_id: &str, role: MemberRole) -> Result<Vec<Experience>>;
}

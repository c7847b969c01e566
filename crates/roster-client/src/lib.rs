//! Rust client for the roster users/experiences REST API
//!
//! # Example
//!
//! ```rust,no_run
//! use roster_client::{ExperienceStore, HttpStore, MemberRole, RemoteStore, StoreConfig, User, Experience};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig {
//!     base_url: "http://localhost:3000/api".into(),
//!     ..Default::default()
//! };
//! let users = HttpStore::<User>::new(config.clone())?;
//! let experiences = HttpStore::<Experience>::new(config)?;
//!
//! let created = users.create(&User::new("Ada", "ada@example.com", "secret")).await?;
//! let id = created.id.as_deref().unwrap_or_default();
//!
//! // Everything Ada owns or takes part in, in one query
//! let hers = experiences.list_for_member(id, MemberRole::Any).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod mock;
pub mod store;
pub mod types;

// Re-export main types
pub use client::HttpStore;
pub use error::{Result, StoreError};
pub use mock::{MockOp, MockStore};
pub use store::{ExperienceStore, RemoteStore, Resource};
pub use types::*;

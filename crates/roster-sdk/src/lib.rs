//! Roster SDK - users and experiences kept in sync with a REST store
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            RosterController              │
//! │  (roster, view flags, edit state, form)  │
//! └───────────┬──────────────────┬───────────┘
//!             │                  │
//!             ▼                  ▼
//!   ┌──────────────────┐  ┌───────────────────┐
//!   │ RemoteStore<User>│  │ ReferenceResolver │
//!   └──────────────────┘  │ (eager / per user)│
//!                         └─────────┬─────────┘
//!                                   ▼
//!                         ┌───────────────────┐
//!                         │  ExperienceStore  │
//!                         └───────────────────┘
//! ```
//!
//! References to experiences are resolved either eagerly after load (one
//! `get` per distinct id) or lazily when a row is expanded (one member
//! query). `RosterConfig::resolve_mode` selects which.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use roster_client::{MockStore, User, Experience};
//! use roster_sdk::{AutoPrompter, RosterConfig, RosterController};
//!
//! let controller = RosterController::new(
//!     Arc::new(MockStore::<User>::new()),
//!     Arc::new(MockStore::<Experience>::new()),
//!     Arc::new(AutoPrompter::accepting()),
//!     RosterConfig::eager(),
//! )?;
//!
//! controller.load().await?;
//! controller.submit(User::new("Ada", "ada@example.com", "pw"), "pw").await?;
//! ```

pub mod config;
pub mod error;
pub mod prompt;
pub mod resolver;
pub mod roster;

pub use config::{ResolveMode, RosterConfig};
pub use error::{Result, RosterError};
pub use prompt::{AutoPrompter, Prompter};
pub use resolver::{ReferenceResolver, ResolveReport, SlotFailure};
pub use roster::{
    EditState, FormStagingArea, RowFlag, RowKey, RowState, Roster, RosterController, RosterRow,
    Submitted,
};

// Re-export from the store client
pub use roster_client::{
    Experience, ExperienceStore, MemberRole, Reference, RemoteStore, StoreConfig, StoreError, User,
};

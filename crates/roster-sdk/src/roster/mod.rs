//! The roster: users, their view state, the edit form and the controller
//! that keeps all of it consistent with the remote store.

mod container;
mod controller;
mod staging;

pub use container::{RowFlag, RowKey, RowState, Roster, RosterRow};
pub use controller::{EditState, RosterController, Submitted};
pub use staging::FormStagingArea;

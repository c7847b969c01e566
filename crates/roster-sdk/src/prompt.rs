//! Confirmation and notification capability
//!
//! The controller never talks to a user directly. Whoever presents the
//! roster injects a [`Prompter`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

pub trait Prompter: Send + Sync {
    /// Ask before a destructive action. `false` aborts it.
    fn confirm(&self, message: &str) -> bool;

    /// Tell the user something failed.
    fn notify(&self, message: &str);
}

/// Prompter that answers every confirmation the same way and keeps the
/// notifications it received.
pub struct AutoPrompter {
    answer: bool,
    confirmations: AtomicU32,
    notifications: Mutex<Vec<String>>,
}

impl AutoPrompter {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            confirmations: AtomicU32::new(0),
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(true)
    }

    pub fn declining() -> Self {
        Self::new(false)
    }

    /// Number of confirmations asked
    pub fn confirmations(&self) -> u32 {
        self.confirmations.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

impl Default for AutoPrompter {
    fn default() -> Self {
        Self::accepting()
    }
}

impl Prompter for AutoPrompter {
    fn confirm(&self, message: &str) -> bool {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        debug!(message, answer = self.answer, "auto-confirm");
        self.answer
    }

    fn notify(&self, message: &str) {
        warn!("{}", message);
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(message.to_string());
        }
    }
}

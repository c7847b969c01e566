//! Form staging area

use roster_client::User;

/// Draft user being entered or edited, plus its confirmation field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormStagingArea {
    pub draft: User,
    pub confirm_secret: String,
    /// Set on every submit attempt, cleared on reset
    pub submitted: bool,
}

impl FormStagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a copy of `user` as the draft
    pub fn stage(&mut self, user: User) {
        self.draft = user;
    }

    pub fn secrets_match(&self) -> bool {
        self.draft.password == self.confirm_secret
    }

    pub fn mark_submitted(&mut self) {
        self.submitted = true;
    }

    /// Back to empty defaults
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }
}

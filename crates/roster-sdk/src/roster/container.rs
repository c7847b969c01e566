//! Keyed roster container
//!
//! Users and their view state live in one ordered map, so a row's flags
//! travel with it on insert and removal.

use std::fmt;

use indexmap::IndexMap;
use roster_client::{Experience, User};
use tracing::warn;
use uuid::Uuid;

/// Stable key of a roster row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    /// Persisted user id
    Id(String),
    /// Surrogate for rows without an id
    Local(Uuid),
}

impl RowKey {
    pub fn for_user(user: &User) -> Self {
        match &user.id {
            Some(id) => RowKey::Id(id.clone()),
            None => RowKey::Local(Uuid::new_v4()),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Id(id) => write!(f, "{}", id),
            RowKey::Local(uuid) => write!(f, "local:{}", uuid),
        }
    }
}

/// Per-row view state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowState {
    pub expanded: bool,
    pub biography_expanded: bool,
    pub password_visible: bool,
    /// Last per-user experience query, replaced on every reload
    pub experiences: Option<Vec<Experience>>,
}

/// Toggleable view flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFlag {
    Expanded,
    Biography,
    Password,
}

impl RowState {
    pub fn flag(&self, flag: RowFlag) -> bool {
        match flag {
            RowFlag::Expanded => self.expanded,
            RowFlag::Biography => self.biography_expanded,
            RowFlag::Password => self.password_visible,
        }
    }

    fn flag_mut(&mut self, flag: RowFlag) -> &mut bool {
        match flag {
            RowFlag::Expanded => &mut self.expanded,
            RowFlag::Biography => &mut self.biography_expanded,
            RowFlag::Password => &mut self.password_visible,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub key: RowKey,
    pub user: User,
    pub state: RowState,
}

/// Ordered users with their view state
#[derive(Debug, Clone, Default)]
pub struct Roster {
    rows: IndexMap<RowKey, RosterRow>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster with default view state for every user
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let mut roster = Self::new();
        for user in users {
            roster.push(user);
        }
        roster
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RosterRow> {
        self.rows.get_index(index).map(|(_, row)| row)
    }

    pub fn get_by_key(&self, key: &RowKey) -> Option<&RosterRow> {
        self.rows.get(key)
    }

    pub fn index_of(&self, key: &RowKey) -> Option<usize> {
        self.rows.get_index_of(key)
    }

    pub fn key_at(&self, index: usize) -> Option<&RowKey> {
        self.rows.get_index(index).map(|(key, _)| key)
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterRow> {
        self.rows.values()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.rows.values().map(|row| &row.user)
    }

    /// Append a user with default view state.
    ///
    /// A duplicate id gets a surrogate key so both rows stay addressable.
    pub fn push(&mut self, user: User) -> RowKey {
        let mut key = RowKey::for_user(&user);
        if self.rows.contains_key(&key) {
            warn!(%key, "duplicate user id in roster");
            key = RowKey::Local(Uuid::new_v4());
        }

        self.rows.insert(
            key.clone(),
            RosterRow {
                key: key.clone(),
                user,
                state: RowState::default(),
            },
        );
        key
    }

    /// Swap the user of an existing row, keeping key, position and state
    pub fn replace_user(&mut self, key: &RowKey, user: User) -> bool {
        match self.rows.get_mut(key) {
            Some(row) => {
                row.user = user;
                true
            }
            None => false,
        }
    }

    /// Remove a row, preserving the order of the others
    pub fn remove(&mut self, key: &RowKey) -> Option<RosterRow> {
        self.rows.shift_remove(key)
    }

    pub fn user_mut(&mut self, key: &RowKey) -> Option<&mut User> {
        self.rows.get_mut(key).map(|row| &mut row.user)
    }

    pub fn state_mut(&mut self, key: &RowKey) -> Option<&mut RowState> {
        self.rows.get_mut(key).map(|row| &mut row.state)
    }

    /// Flip a flag on the row at `index`, returning the new value
    pub fn toggle(&mut self, index: usize, flag: RowFlag) -> Option<bool> {
        let (_, row) = self.rows.get_index_mut(index)?;
        let value = row.state.flag_mut(flag);
        *value = !*value;
        Some(*value)
    }

    pub fn set_flag(&mut self, key: &RowKey, flag: RowFlag, value: bool) -> bool {
        match self.state_mut(key) {
            Some(state) => {
                *state.flag_mut(flag) = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(id: &str) -> User {
        let mut user = User::new(id, format!("{id}@example.com"), "pw");
        user.id = Some(id.into());
        user
    }

    #[test]
    fn test_every_row_has_state() {
        let roster = Roster::from_users(vec![persisted("a"), persisted("b"), User::default()]);
        assert_eq!(roster.len(), 3);
        assert!(roster.iter().all(|row| row.state == RowState::default()));
        assert!(matches!(roster.key_at(2), Some(RowKey::Local(_))));
    }

    #[test]
    fn test_remove_keeps_order_and_state() {
        let mut roster = Roster::from_users(vec![persisted("a"), persisted("b"), persisted("c")]);
        roster.toggle(2, RowFlag::Password);

        roster.remove(&RowKey::Id("b".into()));

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(0).unwrap().user.name, "a");
        assert_eq!(roster.get(1).unwrap().user.name, "c");
        assert!(roster.get(1).unwrap().state.password_visible);
    }

    #[test]
    fn test_flags_are_independent() {
        let mut roster = Roster::from_users(vec![persisted("a")]);
        assert_eq!(roster.toggle(0, RowFlag::Biography), Some(true));

        let state = &roster.get(0).unwrap().state;
        assert!(state.biography_expanded);
        assert!(!state.expanded);
        assert!(!state.password_visible);

        assert_eq!(roster.toggle(0, RowFlag::Biography), Some(false));
        assert_eq!(roster.toggle(5, RowFlag::Biography), None);
    }

    #[test]
    fn test_duplicate_ids_get_surrogates() {
        let roster = Roster::from_users(vec![persisted("a"), persisted("a")]);
        assert_eq!(roster.len(), 2);
        assert!(matches!(roster.key_at(1), Some(RowKey::Local(_))));
    }

    #[test]
    fn test_replace_user_keeps_state() {
        let mut roster = Roster::from_users(vec![persisted("a")]);
        let key = RowKey::Id("a".into());
        roster.set_flag(&key, RowFlag::Expanded, true);

        let mut renamed = persisted("a");
        renamed.name = "Ada".into();
        assert!(roster.replace_user(&key, renamed));

        let row = roster.get(0).unwrap();
        assert_eq!(row.user.name, "Ada");
        assert!(row.state.expanded);
    }
}

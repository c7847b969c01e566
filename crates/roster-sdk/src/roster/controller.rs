//! Roster controller
//!
//! Owns the roster, the staging area and the edit state, and is the only
//! writer of any of them. Remote calls run without holding the state lock;
//! their results are applied in a single write-lock section afterwards, so a
//! reader never sees a half-applied change.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use roster_client::{Experience, ExperienceStore, RemoteStore, StoreError, User};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::container::{RowFlag, RowKey, Roster, RosterRow};
use super::staging::FormStagingArea;
use crate::config::{ResolveMode, RosterConfig};
use crate::error::{Result, RosterError};
use crate::prompt::Prompter;
use crate::resolver::{carry_resolved, substitute, Generations, ReferenceResolver, ResolveReport, SlotFailure, Ticket};

/// Global edit state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Idle,
    /// The staging area holds a copy of this row
    Editing(RowKey),
}

/// What a successful submit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Created(RowKey),
    Updated(RowKey),
}

/// Resolution slot guarded by generation tickets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SlotKey {
    /// One reference slot of one row
    Reference { row: RowKey, slot: usize },
    /// The per-user experience list of one row
    Owner(RowKey),
}

impl SlotKey {
    fn row(&self) -> &RowKey {
        match self {
            SlotKey::Reference { row, .. } | SlotKey::Owner(row) => row,
        }
    }
}

#[derive(Default)]
struct RosterState {
    roster: Roster,
    staging: FormStagingArea,
    edit: EditState,
    generations: Generations<SlotKey>,
}

impl RosterState {
    fn row_at(&self, index: usize) -> Result<&RosterRow> {
        self.roster.get(index).ok_or(RosterError::IndexOutOfRange {
            index,
            len: self.roster.len(),
        })
    }

    fn cancel_edit(&mut self) {
        self.staging.reset();
        self.edit = EditState::Idle;
    }

    fn forget_row(&mut self, key: &RowKey) {
        self.generations.retain(|slot| slot.row() != key);
        if self.edit == EditState::Editing(key.clone()) {
            info!(%key, "row being edited left the roster, cancelling edit");
            self.cancel_edit();
        }
    }
}

/// Keeps a roster of users in sync with a remote store.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use roster_client::{HttpStore, StoreConfig, User, Experience};
/// use roster_sdk::{AutoPrompter, RosterConfig, RosterController};
///
/// let config = StoreConfig::default();
/// let controller = RosterController::new(
///     Arc::new(HttpStore::<User>::new(config.clone())?),
///     Arc::new(HttpStore::<Experience>::new(config)?),
///     Arc::new(AutoPrompter::accepting()),
///     RosterConfig::lazy(),
/// )?;
///
/// controller.load().await?;
/// controller.toggle_expanded(0).await?;
/// ```
pub struct RosterController {
    users: Arc<dyn RemoteStore<User>>,
    resolver: ReferenceResolver,
    prompter: Arc<dyn Prompter>,
    config: RosterConfig,
    state: RwLock<RosterState>,
}

impl RosterController {
    pub fn new(
        users: Arc<dyn RemoteStore<User>>,
        experiences: Arc<dyn ExperienceStore>,
        prompter: Arc<dyn Prompter>,
        config: RosterConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            users,
            resolver: ReferenceResolver::new(experiences, config.max_in_flight),
            prompter,
            config,
            state: RwLock::new(RosterState::default()),
        })
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    // === Loading ===

    /// Replace the roster with the remote user list.
    ///
    /// All view flags start false. In eager mode the references are resolved
    /// right after, and the report is returned.
    pub async fn load(&self) -> Result<Option<ResolveReport>> {
        let users = self
            .users
            .list()
            .await
            .map_err(|e| self.fail("Could not load users", e))?;

        {
            let mut state = self.state.write().await;
            state.roster = Roster::from_users(users);
            state.generations.clear();
            if let EditState::Editing(key) = &state.edit {
                if !state.roster.contains(key) {
                    state.cancel_edit();
                }
            }
            info!(count = state.roster.len(), "roster loaded");
        }

        match self.config.resolve_mode {
            ResolveMode::Eager => Ok(Some(self.resolve_references().await)),
            ResolveMode::Lazy => Ok(None),
        }
    }

    /// Substitute every unresolved reference in the roster.
    pub async fn resolve_references(&self) -> ResolveReport {
        self.resolve_slots(false).await
    }

    /// Re-fetch every reference, resolved or not, overwriting in place.
    pub async fn refresh_references(&self) -> ResolveReport {
        self.resolve_slots(true).await
    }

    async fn resolve_slots(&self, include_resolved: bool) -> ResolveReport {
        let mut pending: HashMap<String, Vec<(SlotKey, Ticket)>> = HashMap::new();
        {
            let mut state = self.state.write().await;
            let RosterState { roster, generations, .. } = &mut *state;
            for row in roster.iter() {
                for (slot, reference) in row.user.experiences.iter().enumerate() {
                    if reference.is_resolved() && !include_resolved {
                        continue;
                    }
                    let Some(id) = reference.id() else { continue };
                    let key = SlotKey::Reference { row: row.key.clone(), slot };
                    let ticket = generations.begin(key.clone());
                    pending.entry(id.to_string()).or_default().push((key, ticket));
                }
            }
        }

        let mut report = ResolveReport {
            requested: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            return report;
        }

        let ids: Vec<String> = pending.keys().cloned().collect();
        let mut completions = self.resolver.fetch_each(ids);

        while let Some((id, result)) = completions.next().await {
            let slots = pending.remove(&id).unwrap_or_default();
            let mut state = self.state.write().await;
            let RosterState { roster, generations, .. } = &mut *state;

            for (key, ticket) in slots {
                if !generations.finish(&key, ticket) {
                    debug!(experience_id = %id, "discarding stale resolution");
                    report.discarded += 1;
                    continue;
                }
                let SlotKey::Reference { row, slot } = &key else { continue };

                match &result {
                    Ok(exp) => {
                        let applied = roster
                            .user_mut(row)
                            .map(|user| substitute(user, *slot, &id, exp))
                            .unwrap_or(false);
                        if applied {
                            report.resolved += 1;
                        } else {
                            report.discarded += 1;
                        }
                    }
                    Err(err) => {
                        warn!(experience_id = %id, row = %row, error = %err, "reference left unresolved");
                        let user_id = roster.get_by_key(row).and_then(|r| r.user.id.clone());
                        report.failures.push(SlotFailure::new(user_id, *slot, &id, err));
                    }
                }
            }
        }

        info!(
            requested = report.requested,
            resolved = report.resolved,
            failed = report.failures.len(),
            "reference resolution finished"
        );
        report
    }

    /// Query the experiences of the user at `index` and store them on the row.
    ///
    /// A newer call for the same row supersedes this one; the older answer is
    /// returned to its caller but never stored.
    pub async fn load_experiences(&self, index: usize) -> Result<Vec<Experience>> {
        let (key, owner_id) = {
            let state = self.state.read().await;
            let row = state.row_at(index)?;
            let Some(owner_id) = row.user.id.clone() else {
                return Err(RosterError::NotPersisted { index });
            };
            (row.key.clone(), owner_id)
        };

        self.query_owner(key, owner_id).await
    }

    /// Per-user query for the row `key`. The answer lands on that row only,
    /// wherever it sits by then.
    async fn query_owner(&self, key: RowKey, owner_id: String) -> Result<Vec<Experience>> {
        let slot = SlotKey::Owner(key.clone());
        let ticket = self.state.write().await.generations.begin(slot.clone());

        let items = match self
            .resolver
            .resolve_for_owner(&owner_id, self.config.member_role)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                self.state.write().await.generations.finish(&slot, ticket);
                return Err(self.fail("Could not load experiences", e));
            }
        };

        let mut state = self.state.write().await;
        if state.generations.finish(&slot, ticket) {
            if let Some(row_state) = state.roster.state_mut(&key) {
                row_state.experiences = Some(items.clone());
                debug!(%key, count = items.len(), "experiences stored on row");
            }
        } else {
            debug!(%key, "discarding stale experience query");
        }
        Ok(items)
    }

    // === Writes ===

    /// Submit a draft: update the row being edited, or create a new user.
    ///
    /// The draft and confirmation are staged first. A confirmation mismatch
    /// fails before any remote call. A remote failure leaves roster and edit
    /// state untouched and the draft staged.
    pub async fn submit(&self, draft: User, confirm_secret: impl Into<String>) -> Result<Submitted> {
        let target = {
            let mut state = self.state.write().await;
            state.staging.stage(draft.clone());
            state.staging.confirm_secret = confirm_secret.into();
            state.staging.mark_submitted();

            if !state.staging.secrets_match() {
                drop(state);
                self.prompter.notify("Passwords do not match. Please try again.");
                return Err(RosterError::SecretMismatch);
            }

            match &state.edit {
                EditState::Idle => None,
                EditState::Editing(key) => {
                    let index = state.roster.index_of(key).ok_or(RosterError::EditTargetGone)?;
                    let original_id = state.roster.get_by_key(key).and_then(|row| row.user.id.clone());
                    Some((key.clone(), index, original_id))
                }
            }
        };

        match target {
            Some((key, index, original_id)) => {
                let Some(id) = original_id else {
                    self.prompter.notify("This user is not registered and cannot be updated.");
                    return Err(RosterError::NotPersisted { index });
                };
                self.commit_update(key, id, draft).await
            }
            None => self.commit_create(draft).await,
        }
    }

    /// Submit whatever is currently staged.
    pub async fn submit_staged(&self) -> Result<Submitted> {
        let (draft, confirm) = {
            let state = self.state.read().await;
            (state.staging.draft.clone(), state.staging.confirm_secret.clone())
        };
        self.submit(draft, confirm).await
    }

    async fn commit_update(&self, key: RowKey, id: String, draft: User) -> Result<Submitted> {
        let mut entity = draft;
        entity.id = Some(id);

        let mut saved = self
            .users
            .update(&entity)
            .await
            .map_err(|e| self.fail("Could not update user", e))?;
        carry_resolved(&entity, &mut saved);

        let mut state = self.state.write().await;
        if !state.roster.replace_user(&key, saved) {
            warn!(%key, "updated user is no longer in the roster");
        }
        if state.edit == EditState::Editing(key.clone()) {
            state.cancel_edit();
        }
        info!(%key, "user updated");
        Ok(Submitted::Updated(key))
    }

    async fn commit_create(&self, draft: User) -> Result<Submitted> {
        let mut draft = draft;
        draft.id = None;

        let mut created = self
            .users
            .create(&draft)
            .await
            .map_err(|e| self.fail("Could not add user", e))?;
        carry_resolved(&draft, &mut created);

        let mut state = self.state.write().await;
        let key = state.roster.push(created);
        if state.edit == EditState::Idle {
            state.staging.reset();
        }
        info!(%key, "user created");
        Ok(Submitted::Created(key))
    }

    /// Delete the user at `index` after confirmation.
    ///
    /// Returns `Ok(false)` when the prompter declines.
    pub async fn remove(&self, index: usize) -> Result<bool> {
        let (key, user) = {
            let state = self.state.read().await;
            let row = state.row_at(index)?;
            (row.key.clone(), row.user.clone())
        };

        let Some(id) = user.id.clone() else {
            warn!(index, "refusing to delete a user without id");
            self.prompter
                .notify("This user cannot be deleted because it is not registered in the store.");
            return Err(RosterError::NotPersisted { index });
        };

        if !self
            .prompter
            .confirm(&format!("Are you sure you want to delete {}?", user.name))
        {
            debug!(%key, "delete declined");
            return Ok(false);
        }

        self.users
            .delete(&id)
            .await
            .map_err(|e| self.fail("Could not delete user", e))?;

        let mut state = self.state.write().await;
        state.roster.remove(&key);
        state.forget_row(&key);
        info!(%key, "user deleted");
        Ok(true)
    }

    // === Edit state ===

    /// Stage a copy of the row at `index` for editing and expand it.
    pub async fn begin_edit(&self, index: usize) -> Result<()> {
        let mut state = self.state.write().await;
        let row = state.row_at(index)?;
        let (key, user) = (row.key.clone(), row.user.clone());

        state.staging.stage(user);
        state.roster.set_flag(&key, RowFlag::Expanded, true);
        debug!(%key, "editing");
        state.edit = EditState::Editing(key);
        Ok(())
    }

    /// Clear the staging area and leave edit mode.
    pub async fn cancel_or_reset(&self) {
        self.state.write().await.cancel_edit();
    }

    /// Apply `f` to the staging area (form binding).
    pub async fn edit_staging<R>(&self, f: impl FnOnce(&mut FormStagingArea) -> R) -> R {
        f(&mut self.state.write().await.staging)
    }

    // === View flags ===

    /// Flip the expanded flag. In lazy mode, expanding loads the user's
    /// experiences; if that query fails the row is collapsed again.
    pub async fn toggle_expanded(&self, index: usize) -> Result<bool> {
        let (key, expanded, owner_id) = {
            let mut state = self.state.write().await;
            let len = state.roster.len();
            let expanded = state
                .roster
                .toggle(index, RowFlag::Expanded)
                .ok_or(RosterError::IndexOutOfRange { index, len })?;
            let row = state.row_at(index)?;
            (row.key.clone(), expanded, row.user.id.clone())
        };

        if expanded && self.config.resolve_mode == ResolveMode::Lazy {
            if let Some(owner_id) = owner_id {
                if let Err(e) = self.query_owner(key.clone(), owner_id).await {
                    self.state
                        .write()
                        .await
                        .roster
                        .set_flag(&key, RowFlag::Expanded, false);
                    return Err(e);
                }
            }
        }
        Ok(expanded)
    }

    pub async fn toggle_biography(&self, index: usize) -> Result<bool> {
        self.toggle(index, RowFlag::Biography).await
    }

    pub async fn toggle_password(&self, index: usize) -> Result<bool> {
        self.toggle(index, RowFlag::Password).await
    }

    async fn toggle(&self, index: usize, flag: RowFlag) -> Result<bool> {
        let mut state = self.state.write().await;
        let len = state.roster.len();
        state
            .roster
            .toggle(index, flag)
            .ok_or(RosterError::IndexOutOfRange { index, len })
    }

    // === Reads ===

    pub async fn rows(&self) -> Vec<RosterRow> {
        self.state.read().await.roster.iter().cloned().collect()
    }

    pub async fn row(&self, index: usize) -> Option<RosterRow> {
        self.state.read().await.roster.get(index).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.roster.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.roster.is_empty()
    }

    pub async fn edit_state(&self) -> EditState {
        self.state.read().await.edit.clone()
    }

    pub async fn editing_index(&self) -> Option<usize> {
        let state = self.state.read().await;
        match &state.edit {
            EditState::Editing(key) => state.roster.index_of(key),
            EditState::Idle => None,
        }
    }

    pub async fn staging(&self) -> FormStagingArea {
        self.state.read().await.staging.clone()
    }

    /// Resolutions started but not yet applied or discarded
    pub async fn resolutions_in_flight(&self) -> usize {
        self.state.read().await.generations.in_flight()
    }

    // === Private Implementation ===

    fn fail(&self, context: &str, err: StoreError) -> RosterError {
        warn!(error = %err, "{}", context);
        self.prompter.notify(&format!("{}: {}", context, err));
        RosterError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::AutoPrompter;
    use roster_client::{MockOp, MockStore, Reference};

    fn persisted(id: &str, refs: &[&str]) -> User {
        let mut user = User::new(format!("user {id}"), format!("{id}@example.com"), "pw")
            .with_comment(format!("bio of {id}"));
        user.id = Some(id.into());
        user.experiences = refs.iter().map(|r| Reference::from(*r)).collect();
        user
    }

    fn experience(id: &str, owner: &str) -> Experience {
        Experience {
            id: Some(id.into()),
            ..Experience::new(format!("experience {id}"), owner)
        }
    }

    struct Fixture {
        users: Arc<MockStore<User>>,
        experiences: Arc<MockStore<Experience>>,
        prompter: Arc<AutoPrompter>,
        controller: RosterController,
    }

    fn fixture(users: Vec<User>, experiences: Vec<Experience>, config: RosterConfig) -> Fixture {
        let users = Arc::new(MockStore::with_items(users));
        let experiences = Arc::new(MockStore::with_items(experiences));
        let prompter = Arc::new(AutoPrompter::accepting());
        let controller = RosterController::new(
            users.clone(),
            experiences.clone(),
            prompter.clone(),
            config,
        )
        .unwrap();
        Fixture { users, experiences, prompter, controller }
    }

    #[tokio::test]
    async fn test_load_resets_flags() {
        let f = fixture(
            vec![persisted("u1", &[]), persisted("u2", &[])],
            vec![],
            RosterConfig::eager(),
        );
        f.controller.load().await.unwrap();
        f.controller.toggle_password(1).await.unwrap();

        f.controller.load().await.unwrap();

        assert_eq!(f.controller.len().await, 2);
        assert!(f.controller.rows().await.iter().all(|r| !r.state.password_visible));
    }

    #[tokio::test]
    async fn test_eager_load_resolves_references() {
        let f = fixture(
            vec![persisted("u1", &["exp1"]), persisted("u2", &[])],
            vec![experience("exp1", "u1")],
            RosterConfig::eager(),
        );

        let report = f.controller.load().await.unwrap().unwrap();

        assert_eq!(report.resolved, 1);
        let row = f.controller.row(0).await.unwrap();
        assert_eq!(
            row.user.experiences[0],
            Reference::Resolved(experience("exp1", "u1"))
        );
        assert_eq!(f.controller.resolutions_in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_roster_and_notifies() {
        let f = fixture(vec![persisted("u1", &[])], vec![], RosterConfig::lazy());
        f.controller.load().await.unwrap();
        f.users.set_available(false);

        let err = f.controller.load().await.unwrap_err();

        assert!(matches!(err, RosterError::Store(_)));
        assert_eq!(f.controller.len().await, 1);
        assert_eq!(f.prompter.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_lazy_toggle_queries_once_per_expand() {
        let f = fixture(
            vec![persisted("u1", &["exp1"])],
            vec![experience("exp1", "u1"), experience("exp2", "u9").with_participant("u1")],
            RosterConfig::lazy(),
        );
        assert!(f.controller.load().await.unwrap().is_none());

        assert!(f.controller.toggle_expanded(0).await.unwrap());
        assert!(!f.controller.toggle_expanded(0).await.unwrap());
        assert!(f.controller.toggle_expanded(0).await.unwrap());

        let row = f.controller.row(0).await.unwrap();
        assert_eq!(row.state.experiences.as_ref().map(Vec::len), Some(2));
        assert_eq!(f.experiences.calls(MockOp::Query), 2);
        assert_eq!(f.experiences.calls(MockOp::Get), 0);
        // Lazy mode leaves the reference slots alone
        assert!(!row.user.experiences[0].is_resolved());
    }

    #[tokio::test]
    async fn test_toggle_out_of_range() {
        let f = fixture(vec![], vec![], RosterConfig::eager());
        let err = f.controller.toggle_biography(0).await.unwrap_err();
        assert!(matches!(err, RosterError::IndexOutOfRange { index: 0, len: 0 }));
    }

    #[tokio::test]
    async fn test_submit_create_appends_server_entity() {
        let f = fixture(vec![persisted("u1", &[])], vec![], RosterConfig::eager());
        f.controller.load().await.unwrap();

        let outcome = f
            .controller
            .submit(User::new("Ada", "ada@example.com", "s3cret"), "s3cret")
            .await
            .unwrap();

        assert!(matches!(outcome, Submitted::Created(RowKey::Id(_))));
        assert_eq!(f.controller.len().await, 2);
        let row = f.controller.row(1).await.unwrap();
        assert!(row.user.is_persisted());
        assert!(!row.state.expanded);
        assert!(f.controller.staging().await.is_pristine());
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_draft_staged() {
        let f = fixture(vec![], vec![], RosterConfig::eager());
        f.users.set_available(false);

        let draft = User::new("Ada", "ada@example.com", "pw");
        let err = f.controller.submit(draft.clone(), "pw").await.unwrap_err();

        assert!(!err.is_local());
        assert_eq!(f.controller.len().await, 0);
        let staging = f.controller.staging().await;
        assert_eq!(staging.draft, draft);
        assert!(staging.submitted);
    }

    #[tokio::test]
    async fn test_remove_declined() {
        let users = Arc::new(MockStore::with_items(vec![persisted("u1", &[])]));
        let controller = RosterController::new(
            users.clone(),
            Arc::new(MockStore::<Experience>::new()),
            Arc::new(AutoPrompter::declining()),
            RosterConfig::eager(),
        )
        .unwrap();
        controller.load().await.unwrap();

        assert!(!controller.remove(0).await.unwrap());
        assert_eq!(controller.len().await, 1);
        assert_eq!(users.calls(MockOp::Delete), 0);
    }

    #[tokio::test]
    async fn test_remove_edited_row_cancels_edit() {
        let f = fixture(
            vec![persisted("u1", &[]), persisted("u2", &[])],
            vec![],
            RosterConfig::eager(),
        );
        f.controller.load().await.unwrap();
        f.controller.begin_edit(1).await.unwrap();

        assert!(f.controller.remove(1).await.unwrap());

        assert_eq!(f.controller.edit_state().await, EditState::Idle);
        assert!(f.controller.staging().await.is_pristine());
    }

    #[tokio::test]
    async fn test_update_keeps_resolved_references() {
        let f = fixture(
            vec![persisted("u1", &["exp1"])],
            vec![experience("exp1", "u1")],
            RosterConfig::eager(),
        );
        f.controller.load().await.unwrap();
        f.controller.begin_edit(0).await.unwrap();

        let mut draft = f.controller.staging().await.draft;
        draft.comment = "new bio".into();
        f.controller.submit(draft, "pw").await.unwrap();

        let row = f.controller.row(0).await.unwrap();
        assert_eq!(row.user.comment, "new bio");
        assert!(row.user.experiences[0].is_resolved());
        assert!(row.state.expanded);
    }
}

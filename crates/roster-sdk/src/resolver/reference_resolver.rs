//! Reference resolution
//!
//! Turns `Reference::Id` slots into full experiences. Two strategies:
//! - eager: one `get` per distinct id, run concurrently, substituted in place
//! - per owner: one aggregate member query returning a flat list

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use roster_client::{Experience, ExperienceStore, MemberRole, Reference, StoreError, User};
use tracing::{debug, warn};

/// A slot that could not be resolved; it keeps its bare id.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotFailure {
    /// Id of the user owning the slot, if persisted
    pub user_id: Option<String>,
    pub slot: usize,
    /// The unresolved experience id
    pub reference: String,
    /// The remote reported the experience missing
    pub not_found: bool,
    pub message: String,
}

impl SlotFailure {
    pub(crate) fn new(user_id: Option<String>, slot: usize, reference: &str, err: &StoreError) -> Self {
        Self {
            user_id,
            slot,
            reference: reference.to_string(),
            not_found: err.is_not_found(),
            message: err.to_string(),
        }
    }
}

/// Outcome of an eager resolution pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    /// Distinct ids fetched
    pub requested: usize,
    /// Slots substituted
    pub resolved: usize,
    /// Results dropped because the slot changed or a newer pass took over
    pub discarded: usize,
    pub failures: Vec<SlotFailure>,
}

impl ResolveReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves experience references against an [`ExperienceStore`].
pub struct ReferenceResolver {
    experiences: Arc<dyn ExperienceStore>,
    max_in_flight: usize,
}

impl ReferenceResolver {
    pub fn new(experiences: Arc<dyn ExperienceStore>, max_in_flight: usize) -> Self {
        Self {
            experiences,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn ExperienceStore> {
        &self.experiences
    }

    /// Fetch each id once, yielding results in completion order.
    pub fn fetch_each<'a>(
        &'a self,
        ids: Vec<String>,
    ) -> impl Stream<Item = (String, Result<Experience, StoreError>)> + Send + 'a {
        stream::iter(ids)
            .map(move |id| async move {
                debug!(experience_id = %id, "resolving reference");
                let result = self.experiences.get(&id).await;
                (id, result)
            })
            .buffer_unordered(self.max_in_flight)
    }

    /// Resolve every unresolved slot of every user in place.
    ///
    /// Best effort: slots whose fetch fails keep their id and are listed in
    /// the report; the rest of the batch still resolves.
    pub async fn resolve_all_eager(&self, users: &mut [User]) -> ResolveReport {
        let ids = distinct_unresolved(users);
        let mut report = ResolveReport {
            requested: ids.len(),
            ..Default::default()
        };

        let fetched: HashMap<String, Result<Experience, StoreError>> =
            self.fetch_each(ids).collect().await;

        for user in users.iter_mut() {
            let pending: Vec<(usize, String)> = user
                .unresolved_ids()
                .map(|(slot, id)| (slot, id.to_string()))
                .collect();

            for (slot, id) in pending {
                match fetched.get(&id) {
                    Some(Ok(exp)) => {
                        if substitute(user, slot, &id, exp) {
                            report.resolved += 1;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(experience_id = %id, error = %err, "reference left unresolved");
                        report
                            .failures
                            .push(SlotFailure::new(user.id.clone(), slot, &id, err));
                    }
                    None => {}
                }
            }
        }

        report
    }

    /// Experiences where `owner_id` holds `role`, from a single query.
    ///
    /// The result is filtered to items that really involve the member and
    /// de-duplicated by id.
    pub async fn resolve_for_owner(
        &self,
        owner_id: &str,
        role: MemberRole,
    ) -> Result<Vec<Experience>, StoreError> {
        debug!(owner_id, ?role, "querying experiences for member");
        let found = self.experiences.list_for_member(owner_id, role).await?;

        let mut seen = HashSet::new();
        Ok(found
            .into_iter()
            .filter(|exp| exp.involves(owner_id, role))
            .filter(|exp| match exp.id.as_deref() {
                Some(id) => seen.insert(id.to_string()),
                None => true,
            })
            .collect())
    }
}

/// Distinct ids of unresolved slots, in first-seen order
pub fn distinct_unresolved(users: &[User]) -> Vec<String> {
    let mut seen = HashSet::new();
    users
        .iter()
        .flat_map(|user| user.unresolved_ids())
        .filter(|(_, id)| seen.insert(id.to_string()))
        .map(|(_, id)| id.to_string())
        .collect()
}

/// Replace slot `slot` with `exp` if it still refers to `id`.
///
/// Overwrites an already resolved slot for the same id, so repeating a
/// resolution never grows the list.
pub fn substitute(user: &mut User, slot: usize, id: &str, exp: &Experience) -> bool {
    match user.experiences.get_mut(slot) {
        Some(reference) if reference.id() == Some(id) => {
            *reference = Reference::Resolved(exp.clone());
            true
        }
        _ => false,
    }
}

/// Copy resolved objects from `from` into matching bare slots of `into`.
///
/// Used after a write, where the server echoes references as ids.
pub fn carry_resolved(from: &User, into: &mut User) {
    let resolved: HashMap<&str, &Experience> = from
        .experiences
        .iter()
        .filter_map(|r| r.resolved().and_then(|exp| exp.id.as_deref().map(|id| (id, exp))))
        .collect();

    for reference in into.experiences.iter_mut() {
        if let Reference::Id(id) = reference {
            if let Some(exp) = resolved.get(id.as_str()) {
                *reference = Reference::Resolved((*exp).clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_client::{MockOp, MockStore, RemoteStore};

    fn exp(id: &str, owner: &str) -> Experience {
        Experience {
            id: Some(id.into()),
            ..Experience::new(format!("experience {id}"), owner)
        }
    }

    fn user(id: &str, refs: &[&str]) -> User {
        let mut user = User::new(id, format!("{id}@example.com"), "pw");
        user.id = Some(id.into());
        user.experiences = refs.iter().map(|r| Reference::from(*r)).collect();
        user
    }

    #[tokio::test]
    async fn test_eager_fetches_each_distinct_id_once() {
        let store = Arc::new(MockStore::with_items(vec![exp("e1", "u1"), exp("e2", "u2")]));
        let resolver = ReferenceResolver::new(store.clone(), 4);
        let mut users = vec![user("u1", &["e1", "e2"]), user("u2", &["e2"])];

        let report = resolver.resolve_all_eager(&mut users).await;

        assert_eq!(report.requested, 2);
        assert_eq!(report.resolved, 3);
        assert!(report.is_complete());
        assert_eq!(store.calls(MockOp::Get), 2);
        assert!(users.iter().flat_map(|u| &u.experiences).all(Reference::is_resolved));
    }

    #[tokio::test]
    async fn test_eager_is_best_effort() {
        let store = Arc::new(MockStore::with_items(vec![exp("e1", "u1")]));
        let resolver = ReferenceResolver::new(store, 4);
        let mut users = vec![user("u1", &["e1", "gone"])];

        let report = resolver.resolve_all_eager(&mut users).await;

        assert_eq!(report.resolved, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].not_found);
        assert_eq!(report.failures[0].slot, 1);
        assert_eq!(users[0].experiences[1], Reference::Id("gone".into()));
    }

    #[tokio::test]
    async fn test_second_eager_pass_changes_nothing() {
        let store = Arc::new(MockStore::with_items(vec![exp("e1", "u1")]));
        let resolver = ReferenceResolver::new(store.clone(), 4);
        let mut users = vec![user("u1", &["e1"])];

        resolver.resolve_all_eager(&mut users).await;
        let first = users[0].experiences.clone();
        let report = resolver.resolve_all_eager(&mut users).await;

        assert_eq!(report.requested, 0);
        assert_eq!(users[0].experiences, first);
        assert_eq!(store.calls(MockOp::Get), 1);
    }

    #[tokio::test]
    async fn test_resolve_for_owner_filters_and_dedupes() {
        // The query answer is trusted for nothing: an unrelated item and a
        // duplicate must not leak through.
        struct Sloppy(MockStore<Experience>);

        #[async_trait::async_trait]
        impl roster_client::RemoteStore<Experience> for Sloppy {
            async fn list(&self) -> roster_client::Result<Vec<Experience>> { self.0.list().await }
            async fn get(&self, id: &str) -> roster_client::Result<Experience> { self.0.get(id).await }
            async fn create(&self, d: &Experience) -> roster_client::Result<Experience> { self.0.create(d).await }
            async fn update(&self, e: &Experience) -> roster_client::Result<Experience> { self.0.update(e).await }
            async fn delete(&self, id: &str) -> roster_client::Result<()> { self.0.delete(id).await }
        }

        #[async_trait::async_trait]
        impl ExperienceStore for Sloppy {
            async fn list_for_member(&self, _: &str, _: MemberRole) -> roster_client::Result<Vec<Experience>> {
                self.0.list().await
            }
        }

        let joined = exp("e2", "u2").with_participant("u1");
        let store = Sloppy(MockStore::with_items(vec![
            exp("e1", "u1"),
            joined.clone(),
            exp("e3", "u3"),
            joined,
        ]));
        let resolver = ReferenceResolver::new(Arc::new(store), 4);

        let found = resolver.resolve_for_owner("u1", MemberRole::Any).await.unwrap();
        let ids: Vec<_> = found.iter().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec!["e1", "e2"]);
    }

    #[test]
    fn test_substitute_checks_slot_identity() {
        let mut u = user("u1", &["e1"]);
        assert!(!substitute(&mut u, 0, "e2", &exp("e2", "u1")));
        assert!(!substitute(&mut u, 3, "e1", &exp("e1", "u1")));
        assert!(substitute(&mut u, 0, "e1", &exp("e1", "u1")));
        assert!(substitute(&mut u, 0, "e1", &exp("e1", "u1")));
        assert_eq!(u.experiences.len(), 1);
    }

    #[test]
    fn test_carry_resolved_restores_objects() {
        let mut local = user("u1", &["e2"]);
        local.experiences.insert(0, Reference::Resolved(exp("e1", "u1")));
        let mut echoed = user("u1", &["e1", "e2"]);

        carry_resolved(&local, &mut echoed);

        assert!(echoed.experiences[0].is_resolved());
        assert_eq!(echoed.experiences[1], Reference::Id("e2".into()));
    }
}

//! Workspace member loader.
//!
//! # Responsibility
//! - Populate `Workspace::members` for one workspace, a list, or a page.
//! - Issue at most one secondary fetch per call, never one per owner.
//!
//! # Invariants
//! - Output has the same length, identities and order as the input.
//! - Page metadata is copied verbatim from the input page.
//! - Owners missing from the secondary fetch get an empty member set.
//! - Pairs for owners that were not requested fail the whole call.

use crate::loader::merge::sort_by_original_order;
use crate::model::page::Page;
use crate::model::user::{User, UserId};
use crate::model::workspace::{Workspace, WorkspaceId};
use crate::repo::{RepoError, RepoResult};
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

/// Storage seam used by [`AssociationLoader`].
pub trait AssociationStore {
    /// Primary fetch of one workspace without members.
    fn fetch_owner(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>>;

    /// Secondary fetch of distinct (workspace id, member) pairs.
    ///
    /// Only member profile columns are materialized. Row order is unspecified.
    fn fetch_member_pairs(&self, owner_ids: &[WorkspaceId]) -> RepoResult<Vec<(WorkspaceId, User)>>;
}

/// Attaches member sets to workspaces fetched without them.
pub struct AssociationLoader<'s, S: AssociationStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: AssociationStore + ?Sized> AssociationLoader<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Fetches one workspace and attaches its members.
    ///
    /// Returns `Ok(None)` when no workspace has this id.
    pub fn load_one(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>> {
        let owner = self.store.fetch_owner(id)?;
        self.load_optional(owner)
    }

    /// Attaches members to an optional, already fetched workspace.
    pub fn load_optional(&self, owner: Option<Workspace>) -> RepoResult<Option<Workspace>> {
        let Some(owner) = owner else {
            return Ok(None);
        };
        Ok(self.load_many(vec![owner])?.pop())
    }

    /// Attaches members to every workspace, keeping input order and length.
    pub fn load_many(&self, mut owners: Vec<Workspace>) -> RepoResult<Vec<Workspace>> {
        if owners.is_empty() {
            return Ok(owners);
        }

        let started_at = Instant::now();
        let requested: Vec<WorkspaceId> = owners.iter().map(|owner| owner.id).collect();
        let distinct: Vec<WorkspaceId> = requested
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let pairs = self.store.fetch_member_pairs(&distinct)?;
        let pair_rows = pairs.len();
        let groups = group_members(&distinct, pairs)?;

        // Groups follow first-occurrence order, so one forward pass over the
        // input consumes them; repeated ids reuse the earlier attachment.
        let mut pending = sort_by_original_order(&requested, groups)
            .into_iter()
            .peekable();
        let has_repeats = distinct.len() < requested.len();
        let mut attached: HashMap<WorkspaceId, Vec<User>> = HashMap::new();

        for owner in owners.iter_mut() {
            if let Some(members) = attached.get(&owner.id) {
                owner.members = members.clone();
                continue;
            }
            let members = pending
                .next_if(|(id, _)| *id == owner.id)
                .map(|(_, members)| members)
                .unwrap_or_default();
            if has_repeats {
                attached.insert(owner.id, members.clone());
            }
            owner.members = members;
        }

        if let Some((id, _)) = pending.next() {
            return Err(RepoError::InconsistentResult(format!(
                "member rows for workspace {id} were not attached"
            )));
        }

        debug!(
            "event=association_load module=loader status=ok owners={} distinct_owners={} pair_rows={} duration_ms={}",
            owners.len(),
            distinct.len(),
            pair_rows,
            started_at.elapsed().as_millis()
        );
        Ok(owners)
    }

    /// Attaches members to page content; page metadata is left untouched.
    pub fn load_page(&self, mut page: Page<Workspace>) -> RepoResult<Page<Workspace>> {
        let content = std::mem::take(&mut page.content);
        let loaded = self.load_many(content)?;
        Ok(page.with_content(loaded))
    }
}

/// Groups pairs by owner, deduplicating members by id and sorting them by id.
fn group_members(
    requested: &[WorkspaceId],
    pairs: Vec<(WorkspaceId, User)>,
) -> RepoResult<Vec<(WorkspaceId, Vec<User>)>> {
    let mut grouped: BTreeMap<WorkspaceId, BTreeMap<UserId, User>> = BTreeMap::new();
    for (owner_id, member) in pairs {
        if requested.binary_search(&owner_id).is_err() {
            return Err(RepoError::InconsistentResult(format!(
                "secondary fetch returned members for unrequested workspace {owner_id}"
            )));
        }
        grouped
            .entry(owner_id)
            .or_default()
            .entry(member.id)
            .or_insert(member);
    }

    Ok(grouped
        .into_iter()
        .map(|(owner_id, members)| (owner_id, members.into_values().collect()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{AssociationLoader, AssociationStore};
    use crate::model::page::{Page, PageRequest};
    use crate::model::user::{Language, User};
    use crate::model::workspace::{Workspace, WorkspaceId};
    use crate::repo::{RepoError, RepoResult};
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeSet;

    struct FakeStore {
        owners: Vec<Workspace>,
        pairs: Vec<(WorkspaceId, User)>,
        pair_fetches: Cell<usize>,
        last_request: RefCell<Vec<WorkspaceId>>,
    }

    impl FakeStore {
        fn new(owners: Vec<Workspace>, pairs: Vec<(WorkspaceId, User)>) -> Self {
            Self {
                owners,
                pairs,
                pair_fetches: Cell::new(0),
                last_request: RefCell::new(Vec::new()),
            }
        }
    }

    impl AssociationStore for FakeStore {
        fn fetch_owner(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>> {
            Ok(self.owners.iter().find(|owner| owner.id == id).cloned())
        }

        fn fetch_member_pairs(
            &self,
            owner_ids: &[WorkspaceId],
        ) -> RepoResult<Vec<(WorkspaceId, User)>> {
            self.pair_fetches.set(self.pair_fetches.get() + 1);
            *self.last_request.borrow_mut() = owner_ids.to_vec();
            // Reverse to prove the loader ignores store row order.
            Ok(self
                .pairs
                .iter()
                .rev()
                .filter(|(owner_id, _)| owner_ids.contains(owner_id))
                .cloned()
                .collect())
        }
    }

    fn workspace(id: WorkspaceId) -> Workspace {
        Workspace {
            id,
            name: format!("ws-{id}"),
            owner: None,
            members: Vec::new(),
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            email: format!("u{id}@x.com"),
            name: None,
            image_url: None,
            language: Language::En,
            authorities: BTreeSet::new(),
        }
    }

    fn ids(owners: &[Workspace]) -> Vec<WorkspaceId> {
        owners.iter().map(|owner| owner.id).collect()
    }

    #[test]
    fn empty_input_skips_secondary_fetch() {
        let store = FakeStore::new(Vec::new(), Vec::new());
        let loaded = AssociationLoader::new(&store).load_many(Vec::new()).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(store.pair_fetches.get(), 0);
    }

    #[test]
    fn load_many_keeps_order_and_counts_without_row_multiplication() {
        let store = FakeStore::new(
            Vec::new(),
            vec![(1, user(10)), (1, user(11)), (1, user(12))],
        );
        let loaded = AssociationLoader::new(&store)
            .load_many(vec![workspace(1), workspace(2)])
            .unwrap();

        assert_eq!(ids(&loaded), vec![1, 2]);
        assert_eq!(loaded[0].member_ids(), vec![10, 11, 12]);
        assert!(loaded[1].members.is_empty());
        assert_eq!(store.pair_fetches.get(), 1);
    }

    #[test]
    fn load_many_preserves_reverse_input_order() {
        let store = FakeStore::new(Vec::new(), vec![(1, user(1)), (1, user(2))]);
        let loaded = AssociationLoader::new(&store)
            .load_many(vec![workspace(2), workspace(1)])
            .unwrap();

        assert_eq!(ids(&loaded), vec![2, 1]);
        assert!(loaded[0].members.is_empty());
        assert_eq!(loaded[1].member_ids(), vec![1, 2]);
    }

    #[test]
    fn duplicate_pairs_from_store_are_collapsed() {
        let store = FakeStore::new(Vec::new(), vec![(1, user(5)), (1, user(5)), (1, user(6))]);
        let loaded = AssociationLoader::new(&store)
            .load_many(vec![workspace(1)])
            .unwrap();
        assert_eq!(loaded[0].member_ids(), vec![5, 6]);
    }

    #[test]
    fn duplicate_input_ids_are_preserved_positionally() {
        let store = FakeStore::new(Vec::new(), vec![(1, user(7)), (3, user(8))]);
        let loaded = AssociationLoader::new(&store)
            .load_many(vec![workspace(1), workspace(3), workspace(1), workspace(2)])
            .unwrap();

        assert_eq!(ids(&loaded), vec![1, 3, 1, 2]);
        assert_eq!(loaded[0].member_ids(), vec![7]);
        assert_eq!(loaded[1].member_ids(), vec![8]);
        assert_eq!(loaded[2].member_ids(), vec![7]);
        assert!(loaded[3].members.is_empty());
        assert_eq!(*store.last_request.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn load_page_keeps_metadata() {
        let store = FakeStore::new(
            Vec::new(),
            vec![(1, user(1)), (1, user(2)), (2, user(3)), (2, user(4))],
        );
        let page = Page::new(vec![workspace(1), workspace(2)], PageRequest::new(0, 2), 10);
        let loaded = AssociationLoader::new(&store).load_page(page).unwrap();

        assert_eq!(loaded.content.len(), 2);
        assert_eq!(loaded.total_elements, 10);
        assert_eq!(loaded.size, 2);
        assert_eq!(loaded.page, 0);
    }

    #[test]
    fn load_one_returns_none_for_missing_owner() {
        let store = FakeStore::new(vec![workspace(1)], Vec::new());
        let loader = AssociationLoader::new(&store);
        assert!(loader.load_one(99).unwrap().is_none());
        assert_eq!(store.pair_fetches.get(), 0);

        let found = loader.load_one(1).unwrap().unwrap();
        assert!(found.members.is_empty());
    }

    #[test]
    fn load_optional_attaches_members_with_one_fetch() {
        let store = FakeStore::new(Vec::new(), vec![(4, user(9)), (4, user(2))]);
        let loader = AssociationLoader::new(&store);

        assert!(loader.load_optional(None).unwrap().is_none());
        assert_eq!(store.pair_fetches.get(), 0);

        let loaded = loader.load_optional(Some(workspace(4))).unwrap().unwrap();
        assert_eq!(loaded.id, 4);
        assert_eq!(loaded.member_ids(), vec![2, 9]);
        assert_eq!(store.pair_fetches.get(), 1);
    }

    struct LeakyStore;

    impl AssociationStore for LeakyStore {
        fn fetch_owner(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>> {
            Ok(Some(workspace(id)))
        }

        fn fetch_member_pairs(&self, _: &[WorkspaceId]) -> RepoResult<Vec<(WorkspaceId, User)>> {
            Ok(vec![(1, user(1)), (2, user(2))])
        }
    }

    #[test]
    fn rows_for_unrequested_owner_are_rejected() {
        let err = AssociationLoader::new(&LeakyStore).load_one(1).unwrap_err();
        assert!(matches!(err, RepoError::InconsistentResult(_)));
    }
}

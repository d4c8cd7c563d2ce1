use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::models::*;
use crate::repo::Store;

/// In-memory [`Store`] for tests and local runs without a database.
///
/// All tables sit behind one mutex, so every method (including
/// [`claim_share_code`](Store::claim_share_code)) is atomic.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    users: BTreeMap<UserId, User>,
    group_sharing: HashMap<GroupId, bool>,
    lists: BTreeMap<ListId, List>,
    collections: BTreeMap<CollectionId, Collection>,
    memberships: BTreeSet<(CollectionId, ListId)>,
    items: BTreeMap<ItemId, Item>,
    reset_tokens: HashMap<String, ResetToken>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn user_mut(&mut self, id: UserId) -> StoreResult<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    fn insert_user(&mut self, user: NewUser) -> StoreResult<User> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        let id = self.next_id();
        let user = User {
            id,
            group_id: user.group_id,
            email: user.email,
            name: user.name,
            admin: user.admin,
            instance_admin: user.instance_admin,
            password_hash: user.password_hash,
            external: user.external,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn next_group_id(&self) -> GroupId {
        self.users
            .values()
            .map(|u| u.group_id + 1)
            .max()
            .unwrap_or(0)
    }

    fn code_in_use(&self, code: &str) -> bool {
        self.lists
            .values()
            .any(|l| l.share_code.as_deref() == Some(code))
            || self
                .collections
                .values()
                .any(|c| c.share_code.as_deref() == Some(code))
    }

    fn remove_list(&mut self, id: ListId) {
        self.lists.remove(&id);
        self.items.retain(|_, item| item.list_id != id);
        self.memberships.retain(|(_, list)| *list != id);
    }

    fn remove_collection(&mut self, id: CollectionId) {
        self.collections.remove(&id);
        self.memberships.retain(|(collection, _)| *collection != id);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

fn by_name<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| name(a).cmp(name(b)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn user_by_external(
        &self,
        provider: &str,
        subject: &str,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| {
                u.external
                    .as_ref()
                    .is_some_and(|l| l.provider == provider && l.subject == subject)
            })
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.state()?.insert_user(user)
    }

    async fn create_user_in_new_group(&self, mut user: NewUser) -> StoreResult<User> {
        let mut state = self.state()?;
        user.group_id = state.next_group_id();
        state.insert_user(user)
    }

    async fn create_first_admin(&self, user: NewUser) -> StoreResult<Option<User>> {
        let mut state = self.state()?;
        if state.users.values().any(|u| u.admin) {
            return Ok(None);
        }
        state.insert_user(user).map(Some)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut state = self.state()?;
        if state.users.remove(&id).is_none() {
            return Err(StoreError::not_found("user", id));
        }
        let lists: Vec<ListId> = state
            .lists
            .values()
            .filter(|l| l.owner_id == id)
            .map(|l| l.id)
            .collect();
        for list in lists {
            state.remove_list(list);
        }
        let collections: Vec<CollectionId> = state
            .collections
            .values()
            .filter(|c| c.owner_id == id)
            .map(|c| c.id)
            .collect();
        for collection in collections {
            state.remove_collection(collection);
        }
        Ok(())
    }

    async fn set_admin(&self, id: UserId, admin: bool) -> StoreResult<()> {
        self.state()?.user_mut(id)?.admin = admin;
        Ok(())
    }

    async fn set_instance_admin(&self, id: UserId, instance_admin: bool) -> StoreResult<()> {
        self.state()?.user_mut(id)?.instance_admin = instance_admin;
        Ok(())
    }

    async fn set_password(&self, id: UserId, password_hash: &str) -> StoreResult<()> {
        self.state()?.user_mut(id)?.password_hash = Some(password_hash.to_string());
        Ok(())
    }

    async fn link_external(&self, id: UserId, link: ExternalLink, name: &str) -> StoreResult<()> {
        let mut state = self.state()?;
        let user = state.user_mut(id)?;
        user.external = Some(link);
        user.name = name.to_string();
        Ok(())
    }

    async fn unlink_external(&self, id: UserId) -> StoreResult<()> {
        self.state()?.user_mut(id)?.external = None;
        Ok(())
    }

    async fn users_in_group(&self, group: GroupId) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .state()?
            .users
            .values()
            .filter(|u| u.group_id == group)
            .cloned()
            .collect();
        by_name(&mut users, |u| &u.name);
        Ok(users)
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.state()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.group_id.cmp(&b.group_id).then(a.name.cmp(&b.name)));
        Ok(users)
    }

    async fn group_admins(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .state()?
            .users
            .values()
            .filter(|u| u.admin)
            .cloned()
            .collect();
        by_name(&mut users, |u| &u.name);
        Ok(users)
    }

    async fn admin_exists(&self) -> StoreResult<bool> {
        Ok(self.state()?.users.values().any(|u| u.admin))
    }

    async fn sharing_enabled(&self, group: GroupId) -> StoreResult<bool> {
        Ok(self
            .state()?
            .group_sharing
            .get(&group)
            .copied()
            .unwrap_or(false))
    }

    async fn set_sharing_enabled(&self, group: GroupId, enabled: bool) -> StoreResult<()> {
        self.state()?.group_sharing.insert(group, enabled);
        Ok(())
    }

    async fn list(&self, id: ListId) -> StoreResult<Option<List>> {
        Ok(self.state()?.lists.get(&id).cloned())
    }

    async fn lists_owned_by(&self, owner: UserId) -> StoreResult<Vec<List>> {
        let mut lists: Vec<List> = self
            .state()?
            .lists
            .values()
            .filter(|l| l.owner_id == owner)
            .cloned()
            .collect();
        by_name(&mut lists, |l| &l.name);
        Ok(lists)
    }

    async fn count_lists(&self, owner: UserId) -> StoreResult<i64> {
        let count = self
            .state()?
            .lists
            .values()
            .filter(|l| l.owner_id == owner)
            .count();
        Ok(count as i64)
    }

    async fn list_name_taken(
        &self,
        owner: UserId,
        name: &str,
        except: Option<ListId>,
    ) -> StoreResult<bool> {
        Ok(self
            .state()?
            .lists
            .values()
            .any(|l| l.owner_id == owner && l.name == name && Some(l.id) != except))
    }

    async fn create_list(&self, list: NewList) -> StoreResult<List> {
        let mut state = self.state()?;
        if state
            .lists
            .values()
            .any(|l| l.owner_id == list.owner_id && l.name == list.name)
        {
            return Err(StoreError::Conflict(format!(
                "list name {} already in use",
                list.name
            )));
        }
        let id = state.next_id();
        let list = List {
            id,
            owner_id: list.owner_id,
            name: list.name,
            description: list.description,
            share_code: None,
            share_with_group: false,
            group_can_edit: false,
        };
        state.lists.insert(id, list.clone());
        Ok(list)
    }

    async fn update_list(&self, id: ListId, update: ListUpdate) -> StoreResult<List> {
        let mut state = self.state()?;
        let owner = state
            .lists
            .get(&id)
            .map(|l| l.owner_id)
            .ok_or_else(|| StoreError::not_found("list", id))?;
        if state
            .lists
            .values()
            .any(|l| l.owner_id == owner && l.name == update.name && l.id != id)
        {
            return Err(StoreError::Conflict(format!(
                "list name {} already in use",
                update.name
            )));
        }
        let list = state
            .lists
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("list", id))?;
        list.name = update.name;
        list.description = update.description;
        if let Some(sharing) = update.sharing {
            list.share_with_group = sharing.share_with_group;
            list.group_can_edit = sharing.group_can_edit;
        }
        Ok(list.clone())
    }

    async fn delete_list_confirmed(&self, id: ListId, confirm_name: &str) -> StoreResult<bool> {
        let mut state = self.state()?;
        let list = state
            .lists
            .get(&id)
            .ok_or_else(|| StoreError::not_found("list", id))?;
        if list.name != confirm_name {
            return Ok(false);
        }
        state.remove_list(id);
        Ok(true)
    }

    async fn list_by_share_code(&self, code: &str) -> StoreResult<Option<List>> {
        Ok(self
            .state()?
            .lists
            .values()
            .find(|l| l.share_code.as_deref() == Some(code))
            .cloned())
    }

    async fn clear_list_share_code(&self, id: ListId) -> StoreResult<()> {
        let mut state = self.state()?;
        let list = state
            .lists
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("list", id))?;
        list.share_code = None;
        Ok(())
    }

    async fn group_shared_lists(&self, viewer: UserId) -> StoreResult<Vec<GroupSharedList>> {
        let state = self.state()?;
        let group = state
            .users
            .get(&viewer)
            .map(|u| u.group_id)
            .ok_or_else(|| StoreError::not_found("user", viewer))?;
        let mut shared: Vec<GroupSharedList> = state
            .lists
            .values()
            .filter(|l| l.share_with_group && l.owner_id != viewer)
            .filter_map(|l| {
                let owner = state.users.get(&l.owner_id)?;
                (owner.group_id == group).then(|| GroupSharedList {
                    id: l.id,
                    name: l.name.clone(),
                    description: l.description.clone(),
                    owner_id: owner.id,
                    owner_name: owner.name.clone(),
                    group_can_edit: l.group_can_edit,
                })
            })
            .collect();
        shared.sort_by(|a, b| a.owner_name.cmp(&b.owner_name).then(a.name.cmp(&b.name)));
        Ok(shared)
    }

    async fn collection(&self, id: CollectionId) -> StoreResult<Option<Collection>> {
        Ok(self.state()?.collections.get(&id).cloned())
    }

    async fn collections_owned_by(&self, owner: UserId) -> StoreResult<Vec<Collection>> {
        let mut collections: Vec<Collection> = self
            .state()?
            .collections
            .values()
            .filter(|c| c.owner_id == owner)
            .cloned()
            .collect();
        by_name(&mut collections, |c| &c.name);
        Ok(collections)
    }

    async fn collection_name_taken(
        &self,
        owner: UserId,
        name: &str,
        except: Option<CollectionId>,
    ) -> StoreResult<bool> {
        Ok(self
            .state()?
            .collections
            .values()
            .any(|c| c.owner_id == owner && c.name == name && Some(c.id) != except))
    }

    async fn create_collection(&self, collection: NewCollection) -> StoreResult<Collection> {
        let mut state = self.state()?;
        if state
            .collections
            .values()
            .any(|c| c.owner_id == collection.owner_id && c.name == collection.name)
        {
            return Err(StoreError::Conflict(format!(
                "collection name {} already in use",
                collection.name
            )));
        }
        let id = state.next_id();
        let collection = Collection {
            id,
            owner_id: collection.owner_id,
            name: collection.name,
            description: collection.description,
            share_code: None,
        };
        state.collections.insert(id, collection.clone());
        Ok(collection)
    }

    async fn update_collection(
        &self,
        id: CollectionId,
        update: CollectionUpdate,
    ) -> StoreResult<Collection> {
        let mut state = self.state()?;
        let owner = state
            .collections
            .get(&id)
            .map(|c| c.owner_id)
            .ok_or_else(|| StoreError::not_found("collection", id))?;
        if state
            .collections
            .values()
            .any(|c| c.owner_id == owner && c.name == update.name && c.id != id)
        {
            return Err(StoreError::Conflict(format!(
                "collection name {} already in use",
                update.name
            )));
        }
        let collection = state
            .collections
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("collection", id))?;
        collection.name = update.name;
        collection.description = update.description;
        Ok(collection.clone())
    }

    async fn delete_collection_confirmed(
        &self,
        id: CollectionId,
        confirm_name: &str,
    ) -> StoreResult<bool> {
        let mut state = self.state()?;
        let collection = state
            .collections
            .get(&id)
            .ok_or_else(|| StoreError::not_found("collection", id))?;
        if collection.name != confirm_name {
            return Ok(false);
        }
        state.remove_collection(id);
        Ok(true)
    }

    async fn collection_by_share_code(&self, code: &str) -> StoreResult<Option<Collection>> {
        Ok(self
            .state()?
            .collections
            .values()
            .find(|c| c.share_code.as_deref() == Some(code))
            .cloned())
    }

    async fn clear_collection_share_code(&self, id: CollectionId) -> StoreResult<()> {
        let mut state = self.state()?;
        let collection = state
            .collections
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("collection", id))?;
        collection.share_code = None;
        Ok(())
    }

    async fn add_membership(&self, collection: CollectionId, list: ListId) -> StoreResult<bool> {
        let mut state = self.state()?;
        if !state.collections.contains_key(&collection) {
            return Err(StoreError::not_found("collection", collection));
        }
        if !state.lists.contains_key(&list) {
            return Err(StoreError::not_found("list", list));
        }
        Ok(state.memberships.insert((collection, list)))
    }

    async fn remove_membership(&self, collection: CollectionId, list: ListId) -> StoreResult<()> {
        self.state()?.memberships.remove(&(collection, list));
        Ok(())
    }

    async fn membership_exists(
        &self,
        collection: CollectionId,
        list: ListId,
    ) -> StoreResult<bool> {
        Ok(self.state()?.memberships.contains(&(collection, list)))
    }

    async fn collection_list_ids(&self, collection: CollectionId) -> StoreResult<Vec<ListId>> {
        Ok(self
            .state()?
            .memberships
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, l)| *l)
            .collect())
    }

    async fn collection_lists(&self, collection: CollectionId) -> StoreResult<Vec<List>> {
        let state = self.state()?;
        let mut lists: Vec<List> = state
            .memberships
            .iter()
            .filter(|(c, _)| *c == collection)
            .filter_map(|(_, l)| state.lists.get(l).cloned())
            .collect();
        by_name(&mut lists, |l| &l.name);
        Ok(lists)
    }

    async fn claim_share_code(
        &self,
        target: ShareTarget,
        code: &str,
    ) -> StoreResult<ClaimOutcome> {
        let mut state = self.state()?;
        let in_use = state.code_in_use(code);
        let slot = match target {
            ShareTarget::List(id) => state
                .lists
                .get_mut(&id)
                .map(|l| &mut l.share_code)
                .ok_or_else(|| StoreError::not_found("list", id))?,
            ShareTarget::Collection(id) => state
                .collections
                .get_mut(&id)
                .map(|c| &mut c.share_code)
                .ok_or_else(|| StoreError::not_found("collection", id))?,
        };
        if let Some(existing) = slot {
            return Ok(ClaimOutcome::AlreadyPublished(existing.clone()));
        }
        if in_use {
            return Ok(ClaimOutcome::Taken);
        }
        *slot = Some(code.to_string());
        Ok(ClaimOutcome::Claimed)
    }

    async fn items(&self, list: ListId) -> StoreResult<Vec<Item>> {
        Ok(self
            .state()?
            .items
            .values()
            .filter(|i| i.list_id == list)
            .cloned()
            .collect())
    }

    async fn item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.state()?.items.get(&id).cloned())
    }

    async fn create_item(&self, list: ListId, draft: ItemDraft) -> StoreResult<Item> {
        let mut state = self.state()?;
        if !state.lists.contains_key(&list) {
            return Err(StoreError::not_found("list", list));
        }
        let id = state.next_id();
        let item = Item {
            id,
            list_id: list,
            name: draft.name,
            url: draft.url,
            notes: draft.notes,
            priority: draft.priority,
        };
        state.items.insert(id, item.clone());
        Ok(item)
    }

    async fn update_item(&self, id: ItemId, draft: ItemDraft) -> StoreResult<Item> {
        let mut state = self.state()?;
        let item = state
            .items
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("item", id))?;
        item.name = draft.name;
        item.url = draft.url;
        item.notes = draft.notes;
        item.priority = draft.priority;
        Ok(item.clone())
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        self.state()?
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("item", id))
    }

    async fn replace_reset_token(&self, token: ResetToken) -> StoreResult<()> {
        let mut state = self.state()?;
        state.reset_tokens.retain(|_, t| t.email != token.email);
        state.reset_tokens.insert(token.token.clone(), token);
        Ok(())
    }

    async fn reset_token(&self, token: &str) -> StoreResult<Option<ResetToken>> {
        Ok(self.state()?.reset_tokens.get(token).cloned())
    }

    async fn delete_reset_token(&self, token: &str) -> StoreResult<()> {
        self.state()?.reset_tokens.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn new_user(group_id: GroupId, email: &str) -> NewUser {
        NewUser {
            group_id,
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            password_hash: None,
            admin: false,
            instance_admin: false,
            external: None,
        }
    }

    fn new_list(owner_id: UserId, name: &str) -> NewList {
        NewList {
            owner_id,
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user(0, "a@x.org")).await.unwrap();

        let err = store.create_user(new_user(1, "a@x.org")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_names_are_unique_per_owner() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(0, "a@x.org")).await.unwrap();
        let b = store.create_user(new_user(0, "b@x.org")).await.unwrap();

        store.create_list(new_list(a.id, "Books")).await.unwrap();
        // Another owner may reuse the name
        store.create_list(new_list(b.id, "Books")).await.unwrap();

        let err = store.create_list(new_list(a.id, "Books")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.list_name_taken(a.id, "Books", None).await.unwrap());
        assert!(!store.list_name_taken(a.id, "Games", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_onto_own_name_is_allowed() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(0, "a@x.org")).await.unwrap();
        let list = store.create_list(new_list(a.id, "Books")).await.unwrap();
        let other = store.create_list(new_list(a.id, "Games")).await.unwrap();

        let update = ListUpdate {
            name: "Books".into(),
            description: Some("to read".into()),
            sharing: None,
        };
        let updated = store.update_list(list.id, update.clone()).await.unwrap();
        assert_eq!(updated.description.as_deref(), Some("to read"));

        let err = store.update_list(other.id, update).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_list_requires_matching_name() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(0, "a@x.org")).await.unwrap();
        let list = store.create_list(new_list(a.id, "Books")).await.unwrap();
        store
            .create_item(list.id, ItemDraft { name: "Dune".into(), ..Default::default() })
            .await
            .unwrap();

        assert!(!store.delete_list_confirmed(list.id, "books").await.unwrap());
        assert!(store.list(list.id).await.unwrap().is_some());
        assert_eq!(store.items(list.id).await.unwrap().len(), 1);

        assert!(store.delete_list_confirmed(list.id, "Books").await.unwrap());
        assert!(store.list(list.id).await.unwrap().is_none());
        assert!(store.items(list.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_share_code_checks_both_tables() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(0, "a@x.org")).await.unwrap();
        let list = store.create_list(new_list(a.id, "Books")).await.unwrap();
        let collection = store
            .create_collection(NewCollection {
                owner_id: a.id,
                name: "Shelf".into(),
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(
            store
                .claim_share_code(ShareTarget::Collection(collection.id), "ABCD2345")
                .await
                .unwrap(),
            ClaimOutcome::Claimed
        );
        assert_eq!(
            store
                .claim_share_code(ShareTarget::List(list.id), "ABCD2345")
                .await
                .unwrap(),
            ClaimOutcome::Taken
        );
        assert!(store.list(list.id).await.unwrap().unwrap().share_code.is_none());

        // Clearing returns the code to the pool
        store.clear_collection_share_code(collection.id).await.unwrap();
        assert_eq!(
            store
                .claim_share_code(ShareTarget::List(list.id), "ABCD2345")
                .await
                .unwrap(),
            ClaimOutcome::Claimed
        );
        let found = store.list_by_share_code("ABCD2345").await.unwrap().unwrap();
        assert_eq!(found.id, list.id);
    }

    #[tokio::test]
    async fn test_claim_share_code_keeps_existing_code() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(0, "a@x.org")).await.unwrap();
        let list = store.create_list(new_list(a.id, "Books")).await.unwrap();

        let target = ShareTarget::List(list.id);
        assert_eq!(
            store.claim_share_code(target, "ABCD2345").await.unwrap(),
            ClaimOutcome::Claimed
        );
        assert_eq!(
            store.claim_share_code(target, "WXYZ6789").await.unwrap(),
            ClaimOutcome::AlreadyPublished("ABCD2345".into())
        );
        assert!(store.list_by_share_code("WXYZ6789").await.unwrap().is_none());
        assert_eq!(
            store.list_by_share_code("ABCD2345").await.unwrap().unwrap().id,
            list.id
        );
    }

    #[tokio::test]
    async fn test_claim_share_code_on_missing_target() {
        let store = MemoryStore::new();
        let err = store
            .claim_share_code(ShareTarget::List(42), "ABCD2345")
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::not_found("list", 42));
    }

    #[tokio::test]
    async fn test_membership_is_idempotent_and_cleaned_up() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(0, "a@x.org")).await.unwrap();
        let list = store.create_list(new_list(a.id, "Books")).await.unwrap();
        let collection = store
            .create_collection(NewCollection {
                owner_id: a.id,
                name: "Shelf".into(),
                description: None,
            })
            .await
            .unwrap();

        assert!(store.add_membership(collection.id, list.id).await.unwrap());
        assert!(!store.add_membership(collection.id, list.id).await.unwrap());
        assert_eq!(
            store.collection_list_ids(collection.id).await.unwrap(),
            vec![list.id]
        );

        // Deleting the collection keeps the list
        assert!(store
            .delete_collection_confirmed(collection.id, "Shelf")
            .await
            .unwrap());
        assert!(store.list(list.id).await.unwrap().is_some());
        assert!(!store.membership_exists(collection.id, list.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_shared_lists_excludes_own_and_other_groups() {
        let store = MemoryStore::new();
        let viewer = store.create_user(new_user(1, "viewer@x.org")).await.unwrap();
        let peer = store.create_user(new_user(1, "peer@x.org")).await.unwrap();
        let outsider = store.create_user(new_user(2, "out@x.org")).await.unwrap();

        let sharing = Some(GroupSharing {
            share_with_group: true,
            group_can_edit: false,
        });
        for owner in [viewer.id, peer.id, outsider.id] {
            let list = store.create_list(new_list(owner, "Shared")).await.unwrap();
            store
                .update_list(
                    list.id,
                    ListUpdate {
                        name: list.name,
                        description: None,
                        sharing,
                    },
                )
                .await
                .unwrap();
        }
        store.create_list(new_list(peer.id, "Private")).await.unwrap();

        let shared = store.group_shared_lists(viewer.id).await.unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].owner_id, peer.id);
        assert_eq!(shared[0].owner_name, "peer");
    }

    #[tokio::test]
    async fn test_sharing_setting_defaults_to_disabled() {
        let store = MemoryStore::new();
        assert!(!store.sharing_enabled(7).await.unwrap());
        store.set_sharing_enabled(7, true).await.unwrap();
        store.set_sharing_enabled(7, true).await.unwrap();
        assert!(store.sharing_enabled(7).await.unwrap());
    }

    #[tokio::test]
    async fn test_new_group_takes_next_free_id() {
        let store = MemoryStore::new();
        let first = store
            .create_user_in_new_group(new_user(9, "a@x.org"))
            .await
            .unwrap();
        assert_eq!(first.group_id, 0);
        store.create_user(new_user(4, "b@x.org")).await.unwrap();
        let next = store
            .create_user_in_new_group(new_user(0, "c@x.org"))
            .await
            .unwrap();
        assert_eq!(next.group_id, 5);
    }

    #[tokio::test]
    async fn test_first_admin_is_created_once() {
        let store = MemoryStore::new();
        let mut admin = new_user(0, "a@x.org");
        admin.admin = true;
        let created = store.create_first_admin(admin.clone()).await.unwrap();
        assert!(created.is_some());

        admin.email = "b@x.org".into();
        assert!(store.create_first_admin(admin).await.unwrap().is_none());
        assert_eq!(store.all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_user_removes_owned_resources() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(0, "a@x.org")).await.unwrap();
        let list = store.create_list(new_list(a.id, "Books")).await.unwrap();

        store.delete_user(a.id).await.unwrap();
        assert!(store.user(a.id).await.unwrap().is_none());
        assert!(store.list(list.id).await.unwrap().is_none());
        assert!(store.delete_user(a.id).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_token_replaces_previous() {
        let store = MemoryStore::new();
        let expires_at = Utc::now() + Duration::hours(1);
        for token in ["first", "second"] {
            store
                .replace_reset_token(ResetToken {
                    token: token.into(),
                    email: "a@x.org".into(),
                    expires_at,
                })
                .await
                .unwrap();
        }
        assert!(store.reset_token("first").await.unwrap().is_none());
        assert!(store.reset_token("second").await.unwrap().is_some());
    }
}

//! # PgStore: the PostgreSQL [`Store`]
//!
//! Row structs mirror the table columns and convert into the `store` models.
//! Unique-constraint violations surface as [`StoreError::Conflict`]; every other
//! driver failure becomes [`StoreError::Backend`].
//!
//! Share codes are claimed under a transaction-scoped advisory lock, so the
//! "is it used by any list or collection" check and the write cannot interleave
//! with a concurrent claim. The target row is locked too, and a target that already
//! carries a code keeps it. The partial unique indexes on both `sharecode`
//! columns back this up; a violation there reads as "taken".

use async_trait::async_trait;
use sqlx::postgres::PgQueryResult;
use sqlx::{FromRow, PgConnection, PgPool};
use store::{
    ClaimOutcome, Collection, CollectionId, CollectionUpdate, ExternalLink, GroupId,
    GroupSharedList, Item, ItemDraft, ItemId, List, ListId, ListUpdate, NewCollection, NewList,
    NewUser, ResetToken, ShareTarget, Store, StoreError, StoreResult, User, UserId,
};

/// Advisory lock key serialising share-code claims.
const SHARE_CODE_LOCK: i64 = 0x4c53_5348_4152_4543;

/// Advisory lock key serialising group allocation and the first-admin bootstrap.
const GROUP_LOCK: i64 = 0x4c53_4752_4f55_5053;

macro_rules! user_query {
    ($tail:literal) => {
        concat!(
            "SELECT id, groupid, email, name, passwordhash, admin, instanceadmin, ",
            "oidc_provider, oidc_subject FROM users ",
            $tail
        )
    };
}

macro_rules! list_query {
    ($tail:literal) => {
        concat!(
            "SELECT id, userid, name, description, sharecode, share_with_group, group_can_edit ",
            "FROM list ",
            $tail
        )
    };
}

macro_rules! collection_query {
    ($tail:literal) => {
        concat!(
            "SELECT id, userid, name, description, sharecode FROM collection ",
            $tail
        )
    };
}

const USER_RETURNING: &str = "RETURNING id, groupid, email, name, passwordhash, admin, \
                              instanceadmin, oidc_provider, oidc_subject";

#[derive(FromRow)]
struct UserRow {
    id: i64,
    groupid: i64,
    email: String,
    name: String,
    passwordhash: Option<String>,
    admin: bool,
    instanceadmin: bool,
    oidc_provider: Option<String>,
    oidc_subject: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let external = match (row.oidc_provider, row.oidc_subject) {
            (Some(provider), Some(subject)) => Some(ExternalLink { provider, subject }),
            _ => None,
        };
        User {
            id: row.id,
            group_id: row.groupid,
            email: row.email,
            name: row.name,
            admin: row.admin,
            instance_admin: row.instanceadmin,
            password_hash: row.passwordhash,
            external,
        }
    }
}

#[derive(FromRow)]
struct ListRow {
    id: i64,
    userid: i64,
    name: String,
    description: Option<String>,
    sharecode: Option<String>,
    share_with_group: bool,
    group_can_edit: bool,
}

impl From<ListRow> for List {
    fn from(row: ListRow) -> Self {
        List {
            id: row.id,
            owner_id: row.userid,
            name: row.name,
            description: row.description,
            share_code: row.sharecode,
            share_with_group: row.share_with_group,
            group_can_edit: row.group_can_edit,
        }
    }
}

#[derive(FromRow)]
struct CollectionRow {
    id: i64,
    userid: i64,
    name: String,
    description: Option<String>,
    sharecode: Option<String>,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Collection {
            id: row.id,
            owner_id: row.userid,
            name: row.name,
            description: row.description,
            share_code: row.sharecode,
        }
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: i64,
    listid: i64,
    name: String,
    url: Option<String>,
    notes: Option<String>,
    priority: Option<i64>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            list_id: row.listid,
            name: row.name,
            url: row.url,
            notes: row.notes,
            priority: row.priority,
        }
    }
}

#[derive(FromRow)]
struct GroupSharedRow {
    id: i64,
    name: String,
    description: Option<String>,
    owner_id: i64,
    owner_name: String,
    group_can_edit: bool,
}

#[derive(FromRow)]
struct ResetTokenRow {
    token: String,
    email: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

fn db_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Map "no row touched" to [`StoreError::NotFound`].
fn touched(result: PgQueryResult, entity: &'static str, id: i64) -> StoreResult<()> {
    if result.rows_affected() == 0 {
        return Err(StoreError::not_found(entity, id));
    }
    Ok(())
}

/// Take a transaction-scoped advisory lock, held until commit or rollback.
async fn lock(conn: &mut PgConnection, key: i64) -> StoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(key)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

async fn insert_user(conn: &mut PgConnection, user: NewUser) -> StoreResult<User> {
    let (provider, subject) = match user.external {
        Some(link) => (Some(link.provider), Some(link.subject)),
        None => (None, None),
    };
    let sql = format!(
        "INSERT INTO users (groupid, email, name, passwordhash, admin, instanceadmin, \
         oidc_provider, oidc_subject) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) {USER_RETURNING}"
    );
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(user.group_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.admin)
        .bind(user.instance_admin)
        .bind(provider)
        .bind(subject)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(row.into())
}

/// [`Store`] backed by a PostgreSQL pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn exists(&self, sql: &'static str, id: i64) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_query!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_query!("WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn user_by_external(
        &self,
        provider: &str,
        subject: &str,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(user_query!(
            "WHERE oidc_provider = $1 AND oidc_subject = $2"
        ))
        .bind(provider)
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_user(&mut conn, user).await
    }

    async fn create_user_in_new_group(&self, mut user: NewUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        lock(&mut tx, GROUP_LOCK).await?;
        user.group_id =
            sqlx::query_scalar::<_, GroupId>("SELECT COALESCE(MAX(groupid) + 1, 0) FROM users")
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
        let user = insert_user(&mut tx, user).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(user)
    }

    async fn create_first_admin(&self, user: NewUser) -> StoreResult<Option<User>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        lock(&mut tx, GROUP_LOCK).await?;
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE admin)")
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
        if exists {
            return Ok(None);
        }
        let user = insert_user(&mut tx, user).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(Some(user))
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        // lists, collections, items and memberships go with the user (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        touched(result, "user", id)
    }

    async fn set_admin(&self, id: UserId, admin: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET admin = $2 WHERE id = $1")
            .bind(id)
            .bind(admin)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        touched(result, "user", id)
    }

    async fn set_instance_admin(&self, id: UserId, instance_admin: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET instanceadmin = $2 WHERE id = $1")
            .bind(id)
            .bind(instance_admin)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        touched(result, "user", id)
    }

    async fn set_password(&self, id: UserId, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET passwordhash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        touched(result, "user", id)
    }

    async fn link_external(&self, id: UserId, link: ExternalLink, name: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET oidc_provider = $2, oidc_subject = $3, name = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(&link.provider)
        .bind(&link.subject)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        touched(result, "user", id)
    }

    async fn unlink_external(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET oidc_provider = NULL, oidc_subject = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        touched(result, "user", id)
    }

    async fn users_in_group(&self, group: GroupId) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(user_query!("WHERE groupid = $1 ORDER BY name"))
            .bind(group)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(user_query!("ORDER BY groupid, name"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn group_admins(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(user_query!("WHERE admin ORDER BY name"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn admin_exists(&self) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE admin)")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn sharing_enabled(&self, group: GroupId) -> StoreResult<bool> {
        let enabled = sqlx::query_scalar::<_, bool>(
            "SELECT group_sharing_enabled FROM group_settings WHERE groupid = $1",
        )
        .bind(group)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(enabled.unwrap_or(false))
    }

    async fn set_sharing_enabled(&self, group: GroupId, enabled: bool) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO group_settings (groupid, group_sharing_enabled) VALUES ($1, $2) \
             ON CONFLICT (groupid) DO UPDATE SET group_sharing_enabled = EXCLUDED.group_sharing_enabled",
        )
        .bind(group)
        .bind(enabled)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list(&self, id: ListId) -> StoreResult<Option<List>> {
        let row = sqlx::query_as::<_, ListRow>(list_query!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(List::from))
    }

    async fn lists_owned_by(&self, owner: UserId) -> StoreResult<Vec<List>> {
        let rows = sqlx::query_as::<_, ListRow>(list_query!("WHERE userid = $1 ORDER BY name"))
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(List::from).collect())
    }

    async fn count_lists(&self, owner: UserId) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM list WHERE userid = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn list_name_taken(
        &self,
        owner: UserId,
        name: &str,
        except: Option<ListId>,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM list WHERE userid = $1 AND name = $2 \
             AND ($3::BIGINT IS NULL OR id <> $3))",
        )
        .bind(owner)
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn create_list(&self, list: NewList) -> StoreResult<List> {
        let row = sqlx::query_as::<_, ListRow>(
            "INSERT INTO list (userid, name, description) VALUES ($1, $2, $3) \
             RETURNING id, userid, name, description, sharecode, share_with_group, group_can_edit",
        )
        .bind(list.owner_id)
        .bind(&list.name)
        .bind(&list.description)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    async fn update_list(&self, id: ListId, update: ListUpdate) -> StoreResult<List> {
        let sharing = update.sharing;
        let row = sqlx::query_as::<_, ListRow>(
            "UPDATE list SET name = $2, description = $3, \
             share_with_group = COALESCE($4, share_with_group), \
             group_can_edit = COALESCE($5, group_can_edit) WHERE id = $1 \
             RETURNING id, userid, name, description, sharecode, share_with_group, group_can_edit",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(sharing.map(|s| s.share_with_group))
        .bind(sharing.map(|s| s.group_can_edit))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(List::from)
            .ok_or_else(|| StoreError::not_found("list", id))
    }

    async fn delete_list_confirmed(&self, id: ListId, confirm_name: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM list WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::not_found("list", id))?;
        if name != confirm_name {
            return Ok(false);
        }
        sqlx::query("DELETE FROM item WHERE listid = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM list WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn list_by_share_code(&self, code: &str) -> StoreResult<Option<List>> {
        let row = sqlx::query_as::<_, ListRow>(list_query!("WHERE sharecode = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(List::from))
    }

    async fn clear_list_share_code(&self, id: ListId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE list SET sharecode = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        touched(result, "list", id)
    }

    async fn group_shared_lists(&self, viewer: UserId) -> StoreResult<Vec<GroupSharedList>> {
        let group = sqlx::query_scalar::<_, i64>("SELECT groupid FROM users WHERE id = $1")
            .bind(viewer)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::not_found("user", viewer))?;
        let rows = sqlx::query_as::<_, GroupSharedRow>(
            "SELECT l.id, l.name, l.description, u.id AS owner_id, u.name AS owner_name, \
             l.group_can_edit FROM list l JOIN users u ON u.id = l.userid \
             WHERE l.share_with_group AND u.groupid = $1 AND l.userid <> $2 \
             ORDER BY u.name, l.name",
        )
        .bind(group)
        .bind(viewer)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|row| GroupSharedList {
                id: row.id,
                name: row.name,
                description: row.description,
                owner_id: row.owner_id,
                owner_name: row.owner_name,
                group_can_edit: row.group_can_edit,
            })
            .collect())
    }

    async fn collection(&self, id: CollectionId) -> StoreResult<Option<Collection>> {
        let row = sqlx::query_as::<_, CollectionRow>(collection_query!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Collection::from))
    }

    async fn collections_owned_by(&self, owner: UserId) -> StoreResult<Vec<Collection>> {
        let rows = sqlx::query_as::<_, CollectionRow>(collection_query!(
            "WHERE userid = $1 ORDER BY name"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Collection::from).collect())
    }

    async fn collection_name_taken(
        &self,
        owner: UserId,
        name: &str,
        except: Option<CollectionId>,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM collection WHERE userid = $1 AND name = $2 \
             AND ($3::BIGINT IS NULL OR id <> $3))",
        )
        .bind(owner)
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn create_collection(&self, collection: NewCollection) -> StoreResult<Collection> {
        let row = sqlx::query_as::<_, CollectionRow>(
            "INSERT INTO collection (userid, name, description) VALUES ($1, $2, $3) \
             RETURNING id, userid, name, description, sharecode",
        )
        .bind(collection.owner_id)
        .bind(&collection.name)
        .bind(&collection.description)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    async fn update_collection(
        &self,
        id: CollectionId,
        update: CollectionUpdate,
    ) -> StoreResult<Collection> {
        let row = sqlx::query_as::<_, CollectionRow>(
            "UPDATE collection SET name = $2, description = $3 WHERE id = $1 \
             RETURNING id, userid, name, description, sharecode",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Collection::from)
            .ok_or_else(|| StoreError::not_found("collection", id))
    }

    async fn delete_collection_confirmed(
        &self,
        id: CollectionId,
        confirm_name: &str,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM collection WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| StoreError::not_found("collection", id))?;
        if name != confirm_name {
            return Ok(false);
        }
        sqlx::query("DELETE FROM collection_list WHERE collectionid = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM collection WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn collection_by_share_code(&self, code: &str) -> StoreResult<Option<Collection>> {
        let row = sqlx::query_as::<_, CollectionRow>(collection_query!("WHERE sharecode = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Collection::from))
    }

    async fn clear_collection_share_code(&self, id: CollectionId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE collection SET sharecode = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        touched(result, "collection", id)
    }

    async fn add_membership(&self, collection: CollectionId, list: ListId) -> StoreResult<bool> {
        if !self
            .exists("SELECT EXISTS (SELECT 1 FROM collection WHERE id = $1)", collection)
            .await?
        {
            return Err(StoreError::not_found("collection", collection));
        }
        if !self
            .exists("SELECT EXISTS (SELECT 1 FROM list WHERE id = $1)", list)
            .await?
        {
            return Err(StoreError::not_found("list", list));
        }
        let result = sqlx::query(
            "INSERT INTO collection_list (collectionid, listid) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(collection)
        .bind(list)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_membership(&self, collection: CollectionId, list: ListId) -> StoreResult<()> {
        sqlx::query("DELETE FROM collection_list WHERE collectionid = $1 AND listid = $2")
            .bind(collection)
            .bind(list)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn membership_exists(
        &self,
        collection: CollectionId,
        list: ListId,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM collection_list WHERE collectionid = $1 AND listid = $2)",
        )
        .bind(collection)
        .bind(list)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn collection_list_ids(&self, collection: CollectionId) -> StoreResult<Vec<ListId>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT listid FROM collection_list WHERE collectionid = $1 ORDER BY listid",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn collection_lists(&self, collection: CollectionId) -> StoreResult<Vec<List>> {
        let rows = sqlx::query_as::<_, ListRow>(
            "SELECT l.id, l.userid, l.name, l.description, l.sharecode, l.share_with_group, \
             l.group_can_edit FROM list l JOIN collection_list cl ON cl.listid = l.id \
             WHERE cl.collectionid = $1 ORDER BY l.name",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(List::from).collect())
    }

    async fn claim_share_code(
        &self,
        target: ShareTarget,
        code: &str,
    ) -> StoreResult<ClaimOutcome> {
        let (current_sql, update_sql, entity, id) = match target {
            ShareTarget::List(id) => (
                "SELECT sharecode FROM list WHERE id = $1 FOR UPDATE",
                "UPDATE list SET sharecode = $1 WHERE id = $2 AND sharecode IS NULL",
                "list",
                id,
            ),
            ShareTarget::Collection(id) => (
                "SELECT sharecode FROM collection WHERE id = $1 FOR UPDATE",
                "UPDATE collection SET sharecode = $1 WHERE id = $2 AND sharecode IS NULL",
                "collection",
                id,
            ),
        };

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        lock(&mut tx, SHARE_CODE_LOCK).await?;

        let current = sqlx::query_scalar::<_, Option<String>>(current_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::not_found(entity, id))?;
        if let Some(existing) = current {
            return Ok(ClaimOutcome::AlreadyPublished(existing));
        }

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM list WHERE sharecode = $1) \
             OR EXISTS (SELECT 1 FROM collection WHERE sharecode = $1)",
        )
        .bind(code)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        if taken {
            return Ok(ClaimOutcome::Taken);
        }

        match sqlx::query(update_sql).bind(code).bind(id).execute(&mut *tx).await {
            Ok(result) => touched(result, entity, id)?,
            Err(err) if is_unique_violation(&err) => return Ok(ClaimOutcome::Taken),
            Err(err) => return Err(db_err(err)),
        }
        tx.commit().await.map_err(db_err)?;
        Ok(ClaimOutcome::Claimed)
    }

    async fn items(&self, list: ListId) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            "SELECT id, listid, name, url, notes, priority FROM item WHERE listid = $1 ORDER BY id",
        )
        .bind(list)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT id, listid, name, url, notes, priority FROM item WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Item::from))
    }

    async fn create_item(&self, list: ListId, draft: ItemDraft) -> StoreResult<Item> {
        if !self
            .exists("SELECT EXISTS (SELECT 1 FROM list WHERE id = $1)", list)
            .await?
        {
            return Err(StoreError::not_found("list", list));
        }
        let row = sqlx::query_as::<_, ItemRow>(
            "INSERT INTO item (listid, name, url, notes, priority) VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, listid, name, url, notes, priority",
        )
        .bind(list)
        .bind(&draft.name)
        .bind(&draft.url)
        .bind(&draft.notes)
        .bind(draft.priority)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    async fn update_item(&self, id: ItemId, draft: ItemDraft) -> StoreResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(
            "UPDATE item SET name = $2, url = $3, notes = $4, priority = $5 WHERE id = $1 \
             RETURNING id, listid, name, url, notes, priority",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.url)
        .bind(&draft.notes)
        .bind(draft.priority)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Item::from)
            .ok_or_else(|| StoreError::not_found("item", id))
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM item WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        touched(result, "item", id)
    }

    async fn replace_reset_token(&self, token: ResetToken) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM reset_tokens WHERE email = $1")
            .bind(&token.email)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("INSERT INTO reset_tokens (token, email, expires_at) VALUES ($1, $2, $3)")
            .bind(&token.token)
            .bind(&token.email)
            .bind(token.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn reset_token(&self, token: &str) -> StoreResult<Option<ResetToken>> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            "SELECT token, email, expires_at FROM reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(|row| ResetToken {
            token: row.token,
            email: row.email,
            expires_at: row.expires_at,
        }))
    }

    async fn delete_reset_token(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM reset_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

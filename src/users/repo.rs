use tracing::{debug, info};

use crate::storage::{StoreError, UserStore};
use crate::users::repo_types::{NewUser, UserRecord};

/// Id for the next inserted record: one past the current maximum, or 1.
pub fn next_id(users: &[UserRecord]) -> Result<u64, StoreError> {
    match users.iter().map(|u| u.id).max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or(StoreError::IdsExhausted(max)),
    }
}

impl UserRecord {
    /// All users in file order.
    pub async fn list(store: &UserStore) -> Result<Vec<UserRecord>, StoreError> {
        store.load_all().await
    }

    pub async fn find_by_id(store: &UserStore, id: u64) -> Result<Option<UserRecord>, StoreError> {
        let users = store.load_all().await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    /// Find a user by email. Exact, case-sensitive match; first hit wins.
    pub async fn find_by_email(
        store: &UserStore,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let users = store.load_all().await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    /// Append a new user and persist the whole collection.
    ///
    /// The read-modify-write is not serialized: concurrent inserts can observe
    /// the same maximum and hand out the same id.
    pub async fn insert(store: &UserStore, new: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = store.load_all().await?;
        let user = UserRecord {
            id: next_id(&users)?,
            name: new.name,
            email: new.email,
            password: new.password,
        };
        users.push(user.clone());
        store.save_all(&users).await?;
        info!(user_id = user.id, "user inserted");
        Ok(user)
    }

    /// Remove the first user with `id` and persist the rest.
    ///
    /// Returns `None` without touching the file when no user matches.
    pub async fn delete_by_id(store: &UserStore, id: u64) -> Result<Option<UserRecord>, StoreError> {
        let mut users = store.load_all().await?;
        let Some(index) = users.iter().position(|u| u.id == id) else {
            debug!(user_id = id, "delete: no such user");
            return Ok(None);
        };
        let removed = users.remove(index);
        store.save_all(&users).await?;
        info!(user_id = id, "user deleted");
        Ok(Some(removed))
    }
}

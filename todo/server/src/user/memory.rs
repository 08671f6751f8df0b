use super::{User, UserRepository, duplicate_email, duplicate_username};
use crate::repository::{RepoResult, Repository, next_timestamp, timestamp_now};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// User store kept in process memory, with the same uniqueness rules as the database.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    store: RwLock<UserStore>,
}

#[derive(Debug, Default)]
struct UserStore {
    users: Vec<User>,
    last_id: i32,
}

impl UserStore {
    /// Whether a user other than `user` satisfies `clashes`.
    fn taken(&self, user: &User, clashes: impl Fn(&User) -> bool) -> bool {
        self.users
            .iter()
            .any(|existing| existing.id != user.id && clashes(existing))
    }

    fn ensure_unique(&self, user: &User) -> RepoResult<()> {
        if self.taken(user, |existing| existing.username == user.username) {
            return Err(duplicate_username(&user.username));
        }
        if self.taken(user, |existing| existing.email == user.email) {
            return Err(duplicate_email(&user.email));
        }
        Ok(())
    }

    fn set_active(&mut self, id: i32, is_active: bool) -> bool {
        match self.users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                user.is_active = is_active;
                user.updated_at = next_timestamp(user.updated_at);
                true
            }
            None => false,
        }
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_username(mut users: Vec<User>) -> Vec<User> {
    users.sort_by(|a, b| a.username.cmp(&b.username));
    users
}

#[async_trait]
impl Repository<User> for InMemoryUserRepository {
    async fn get_all(&self) -> RepoResult<Vec<User>> {
        Ok(by_username(self.store.read().await.users.clone()))
    }

    async fn get_by_id(&self, id: i32) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|user| user.id == id).cloned())
    }

    async fn add(&self, mut entity: User) -> RepoResult<User> {
        let mut store = self.store.write().await;
        entity.id = 0;
        store.ensure_unique(&entity)?;

        store.last_id += 1;
        let now = timestamp_now();
        entity.id = store.last_id;
        entity.created_at = now;
        entity.updated_at = now;
        store.users.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: User) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        if !store.users.iter().any(|user| user.id == entity.id) {
            return Ok(false);
        }
        store.ensure_unique(&entity)?;

        if let Some(existing) = store.users.iter_mut().find(|user| user.id == entity.id) {
            let updated_at = next_timestamp(existing.updated_at);
            *existing = User {
                created_at: existing.created_at,
                updated_at,
                ..entity
            };
        }
        Ok(true)
    }

    async fn delete(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.users.len();
        store.users.retain(|user| user.id != id);
        Ok(store.users.len() < before)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|user| user.email == email).cloned())
    }

    async fn get_active_users(&self) -> RepoResult<Vec<User>> {
        let store = self.store.read().await;
        let active = store.users.iter().filter(|user| user.is_active).cloned().collect();
        Ok(by_username(active))
    }

    async fn activate_user(&self, id: i32) -> RepoResult<bool> {
        Ok(self.store.write().await.set_active(id, true))
    }

    async fn deactivate_user(&self, id: i32) -> RepoResult<bool> {
        Ok(self.store.write().await.set_active(id, false))
    }
}

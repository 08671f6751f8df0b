use super::{Todo, TodoRepository};
use crate::repository::{RepoResult, Repository, next_timestamp, timestamp_now};
use async_trait::async_trait;
use std::cmp::Reverse;
use tokio::sync::RwLock;

/// Todo store kept in process memory. Serves as the test double for the
/// database-backed repository and as the store when no database is configured.
#[derive(Debug, Default)]
pub struct InMemoryTodoRepository {
    store: RwLock<TodoStore>,
}

#[derive(Debug, Default)]
struct TodoStore {
    todos: Vec<Todo>,
    last_id: i32,
}

impl TodoStore {
    fn find_mut(&mut self, id: i32) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|todo| todo.id == id)
    }

    fn set_completed(&mut self, id: i32, is_completed: bool) -> bool {
        match self.find_mut(id) {
            Some(todo) => {
                todo.is_completed = is_completed;
                todo.updated_at = next_timestamp(todo.updated_at);
                true
            }
            None => false,
        }
    }
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; ties broken by the higher id.
fn newest_first(todos: &mut [Todo]) {
    todos.sort_by_key(|todo| Reverse((todo.created_at, todo.id)));
}

#[async_trait]
impl Repository<Todo> for InMemoryTodoRepository {
    async fn get_all(&self) -> RepoResult<Vec<Todo>> {
        let mut todos = self.store.read().await.todos.clone();
        newest_first(&mut todos);
        Ok(todos)
    }

    async fn get_by_id(&self, id: i32) -> RepoResult<Option<Todo>> {
        let store = self.store.read().await;
        Ok(store.todos.iter().find(|todo| todo.id == id).cloned())
    }

    async fn add(&self, mut entity: Todo) -> RepoResult<Todo> {
        let mut store = self.store.write().await;
        store.last_id += 1;
        let now = timestamp_now();
        entity.id = store.last_id;
        entity.created_at = now;
        entity.updated_at = now;
        store.todos.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: Todo) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        match store.find_mut(entity.id) {
            Some(existing) => {
                existing.title = entity.title;
                existing.description = entity.description;
                existing.is_completed = entity.is_completed;
                existing.updated_at = next_timestamp(existing.updated_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.todos.len();
        store.todos.retain(|todo| todo.id != id);
        Ok(store.todos.len() < before)
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn get_completed(&self) -> RepoResult<Vec<Todo>> {
        let store = self.store.read().await;
        let mut todos: Vec<Todo> = store
            .todos
            .iter()
            .filter(|todo| todo.is_completed)
            .cloned()
            .collect();
        todos.sort_by_key(|todo| Reverse((todo.updated_at, todo.id)));
        Ok(todos)
    }

    async fn get_incomplete(&self) -> RepoResult<Vec<Todo>> {
        let store = self.store.read().await;
        let mut todos: Vec<Todo> = store
            .todos
            .iter()
            .filter(|todo| !todo.is_completed)
            .cloned()
            .collect();
        newest_first(&mut todos);
        Ok(todos)
    }

    async fn mark_as_completed(&self, id: i32) -> RepoResult<bool> {
        Ok(self.store.write().await.set_completed(id, true))
    }

    async fn mark_as_incomplete(&self, id: i32) -> RepoResult<bool> {
        Ok(self.store.write().await.set_completed(id, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn can_assign_increasing_ids() {
        let repository = InMemoryTodoRepository::new();

        let first = repository.add(Todo::new("First")).await.unwrap();
        let second = repository.add(Todo::new("Second")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn can_list_newest_first() {
        let repository = InMemoryTodoRepository::new();
        repository.add(Todo::new("First")).await.unwrap();
        repository.add(Todo::new("Second")).await.unwrap();

        let titles: Vec<String> = repository
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|todo| todo.title)
            .collect();

        assert_eq!(titles, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn can_keep_creation_time_on_update() {
        let repository = InMemoryTodoRepository::new();
        let created = repository.add(Todo::new("Draft")).await.unwrap();

        let mut changed = created.clone();
        changed.title = "Final".to_string();
        changed.description = Some("Reviewed".to_string());
        assert!(repository.update(changed).await.unwrap());

        let stored = repository.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Final");
        assert_eq!(stored.description.as_deref(), Some("Reviewed"));
        assert_eq!(stored.created_at, created.created_at);
        assert!(stored.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn can_report_missing_todo() {
        let repository = InMemoryTodoRepository::new();

        assert!(repository.get_by_id(1).await.unwrap().is_none());
        assert!(!repository.delete(1).await.unwrap());
        assert!(!repository.mark_as_completed(1).await.unwrap());
        assert!(!repository.mark_as_incomplete(1).await.unwrap());
    }

    #[tokio::test]
    async fn can_order_completed_by_latest_update() {
        let repository = InMemoryTodoRepository::new();
        let first = repository.add(Todo::new("First")).await.unwrap();
        let second = repository.add(Todo::new("Second")).await.unwrap();
        repository.mark_as_completed(second.id).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        repository.mark_as_completed(first.id).await.unwrap();

        let completed = repository.get_completed().await.unwrap();

        assert_eq!(completed[0].id, first.id);
        assert_eq!(completed[1].id, second.id);
    }
}

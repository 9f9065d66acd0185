//! Local mirrors of server state, one per screen.
//!
//! # Design
//! `ListStore` keeps an insertion-ordered list consistent with the last known
//! server state using as few round-trips as possible:
//! - `reload` replaces everything with a fresh fetch; on failure the current
//!   list stays as it was.
//! - `apply_create` prepends the entity the server returned; no reload.
//! - `delete_with` removes an entry only after the server confirmed the
//!   delete, so a failed delete never hides an item that still exists.
//! - `apply_update` patches one entry in place.
//!
//! The store never sorts and never deduplicates. Two entries with the same id
//! are both kept; id-based operations act on the first match.
//!
//! `SnapshotStore` holds a single value that is only ever replaced whole.

/// Entities addressable by a server-assigned id.
pub trait Identified {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct ListStore<T> {
    items: Vec<T>,
}

impl<T> Default for ListStore<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Identified> ListStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replaces the list with `fetch`'s result. Leaves it untouched on error.
    pub fn reload<E>(&mut self, fetch: impl FnOnce() -> Result<Vec<T>, E>) -> Result<(), E> {
        self.items = fetch()?;
        Ok(())
    }

    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn apply_create(&mut self, entity: T) -> &T {
        self.items.insert(0, entity);
        &self.items[0]
    }

    /// Runs `create` and prepends its result on success.
    pub fn create_with<E>(&mut self, create: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        let entity = create()?;
        Ok(self.apply_create(entity))
    }

    /// Removes the first entry with `id`, returning it.
    pub fn apply_delete(&mut self, id: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Runs `delete` and removes the entry only once it succeeded.
    pub fn delete_with<E>(&mut self, id: &str, delete: impl FnOnce() -> Result<(), E>) -> Result<Option<T>, E> {
        delete()?;
        Ok(self.apply_delete(id))
    }

    /// Applies `patch` to the first entry with `id`. Returns whether one matched.
    pub fn apply_update(&mut self, id: &str, patch: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                patch(item);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// A single server value replaced as a whole on every successful load.
#[derive(Debug, Clone)]
pub struct SnapshotStore<T> {
    current: Option<T>,
}

impl<T> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<T> SnapshotStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Replaces the snapshot with `fetch`'s result. A failed fetch keeps the
    /// stale snapshot.
    pub fn reload<E>(&mut self, fetch: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        let value = fetch()?;
        Ok(self.current.insert(value))
    }
}

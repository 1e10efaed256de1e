// Observable keyed container backing the configuration set.
//
// An insertion-ordered map that reports structural changes (insert, replace,
// remove, reset) over a broadcast channel, plus a coarse "aggregate changed"
// signal for every mutation that changes membership. Events are returned to
// the caller as well as broadcast, so synchronous code does not need a
// subscriber to observe what happened.
//
// Single logical owner; not internally synchronized.

use indexmap::IndexMap;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;
use tokio::sync::broadcast;

/// Insert was attempted for a key that is already present.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("an item with the same key has already been added: {0}")]
pub struct DuplicateKey<K: fmt::Display + fmt::Debug>(pub K);

/// Structural change notification carrying the affected key(s).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapChange<K> {
    Insert { key: K },
    BulkInsert { keys: Vec<K> },
    Replace { key: K },
    Remove { key: K },
    Reset,
}

/// Fired after any mutation that changes membership or count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapAggregate {
    pub count: usize,
}

/// Keyed container with change notifications and insertion-order enumeration.
pub struct ObservableMap<K, V> {
    inner: IndexMap<K, V>,
    changes_tx: broadcast::Sender<MapChange<K>>,
    aggregate_tx: broadcast::Sender<MapAggregate>,
}

impl<K, V> ObservableMap<K, V>
where
    K: Clone + Eq + Hash + fmt::Display + fmt::Debug,
    V: PartialEq,
{
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(100);
        let (aggregate_tx, _) = broadcast::channel(100);
        Self {
            inner: IndexMap::new(),
            changes_tx,
            aggregate_tx,
        }
    }

    /// Subscribe to structural change notifications.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<MapChange<K>> {
        self.changes_tx.subscribe()
    }

    /// Subscribe to the aggregate (count/keys/values) signal.
    pub fn subscribe_aggregate(&self) -> broadcast::Receiver<MapAggregate> {
        self.aggregate_tx.subscribe()
    }

    /// Add a new key/value pair. Fails if the key is already present.
    pub fn add(&mut self, key: K, value: V) -> Result<(), DuplicateKey<K>> {
        if self.inner.contains_key(&key) {
            return Err(DuplicateKey(key));
        }
        self.inner.insert(key.clone(), value);
        self.notify_aggregate();
        self.notify(MapChange::Insert { key });
        Ok(())
    }

    /// Insert or replace. Replacing with an equal value is a no-op and fires
    /// no notification; replacing with a different value fires `Replace`
    /// without the aggregate signal (membership is unchanged).
    pub fn set(&mut self, key: K, value: V) {
        match self.inner.get(&key) {
            Some(existing) if *existing == value => {}
            Some(_) => {
                self.inner.insert(key.clone(), value);
                self.notify(MapChange::Replace { key });
            }
            None => {
                self.inner.insert(key.clone(), value);
                self.notify_aggregate();
                self.notify(MapChange::Insert { key });
            }
        }
    }

    /// Remove a key, reporting whether a removal occurred. No notification
    /// fires for an absent key.
    pub fn remove(&mut self, key: &K) -> bool {
        // shift_remove keeps enumeration in insertion order
        let removed = self.inner.shift_remove(key).is_some();
        if removed {
            self.notify_aggregate();
            self.notify(MapChange::Remove { key: key.clone() });
        }
        removed
    }

    /// Bulk insert. All-or-nothing: fails if any incoming key is already
    /// present, otherwise fires a single `BulkInsert` notification.
    pub fn add_range(&mut self, items: IndexMap<K, V>) -> Result<(), DuplicateKey<K>> {
        if items.is_empty() {
            return Ok(());
        }
        if let Some(key) = items.keys().find(|k| self.inner.contains_key(*k)) {
            return Err(DuplicateKey(key.clone()));
        }
        let keys: Vec<K> = items.keys().cloned().collect();
        self.inner.extend(items);
        self.notify_aggregate();
        self.notify(MapChange::BulkInsert { keys });
        Ok(())
    }

    /// Remove everything. Fires `Reset` only when the map was non-empty.
    pub fn clear(&mut self) {
        if !self.inner.is_empty() {
            self.inner.clear();
            self.notify_aggregate();
            self.notify(MapChange::Reset);
        }
    }

    /// Move a value to a new key: insert under the new key, then remove the
    /// old one. Fires insert and remove notifications in that order.
    pub fn rename_key(&mut self, old_key: &K, new_key: K) -> Result<(), DuplicateKey<K>>
    where
        V: Clone,
    {
        let value = match self.inner.get(old_key) {
            Some(v) => v.clone(),
            None => return Ok(()),
        };
        self.add(new_key, value)?;
        self.remove(old_key);
        Ok(())
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.get_mut(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.inner.iter_mut()
    }

    fn notify(&self, change: MapChange<K>) {
        // Send errors only mean nobody is listening
        let _ = self.changes_tx.send(change);
    }

    fn notify_aggregate(&self) {
        let _ = self.aggregate_tx.send(MapAggregate {
            count: self.inner.len(),
        });
    }
}

impl<K, V> Default for ObservableMap<K, V>
where
    K: Clone + Eq + Hash + fmt::Display + fmt::Debug,
    V: PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ObservableMap<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.iter()).finish()
    }
}

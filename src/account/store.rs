//! User storage and persistence

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

use super::types::{UserRecord, Username};
use crate::error::StoreError;

/// Username → record mapping that remembers insertion order.
///
/// Serializes as a single JSON object whose keys appear in insertion order,
/// and deserializes keeping the order of the document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserTable {
    records: HashMap<Username, UserRecord>,
    order: Vec<Username>,
}

impl UserTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.records.get(username)
    }

    /// Insert or overwrite. An overwritten key keeps its original position.
    pub fn insert(&mut self, username: Username, record: UserRecord) {
        if self.records.insert(username.clone(), record).is_none() {
            self.order.push(username);
        }
    }

    pub fn remove(&mut self, username: &str) -> Option<UserRecord> {
        let removed = self.records.remove(username)?;
        self.order.retain(|name| name != username);
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UserRecord)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.records.get(name).map(|record| (name.as_str(), record)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Consume the table, yielding entries in insertion order.
    pub fn into_entries(self) -> impl Iterator<Item = (Username, UserRecord)> {
        let UserTable { mut records, order } = self;
        order
            .into_iter()
            .filter_map(move |name| records.remove(&name).map(|record| (name, record)))
    }
}

impl Serialize for UserTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, record) in self.iter() {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for UserTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = UserTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by username")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<UserTable, A::Error> {
                let mut table = UserTable::new();
                while let Some((name, record)) = access.next_entry::<Username, UserRecord>()? {
                    table.insert(name, record);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// In-memory user table, loaded from and flushed to one JSON file.
///
/// Nothing is written on intermediate changes; call [`UserStore::close`] (or
/// [`UserStore::flush_to_durable_storage`]) to persist.
#[derive(Debug, Default)]
pub struct UserStore {
    users: UserTable,
    path: Option<PathBuf>,
}

impl UserStore {
    /// Create an empty store with no durable storage behind it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`, loading whatever it already holds.
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file is
    /// logged and also yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            users: UserTable::new(),
            path: Some(path.into()),
        };
        if let Err(e) = store.load_from_durable_storage() {
            error!("Error loading database: {}", e);
        }
        store
    }

    pub fn find_by_username(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    /// Linear scan; emails are compared exactly.
    pub fn find_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users
            .iter()
            .map(|(_, record)| record)
            .find(|record| record.email == email)
    }

    /// Store a record, silently replacing any existing one under the same key.
    pub fn insert(&mut self, username: Username, record: UserRecord) {
        self.users.insert(username, record);
    }

    /// Returns `false` if the user was not present.
    pub fn remove(&mut self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    /// All users in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UserRecord)> + '_ {
        self.users.iter()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn table(&self) -> &UserTable {
        &self.users
    }

    /// Merge the persisted file into the live table, overwriting on key clashes.
    /// Keys are lowercased on the way in. Returns the number of records read.
    pub fn load_from_durable_storage(&mut self) -> Result<usize, StoreError> {
        let Some(path) = &self.path else {
            return Ok(0);
        };
        if !path.exists() {
            info!(
                "No existing database file found at {}. Starting with an empty database.",
                path.display()
            );
            return Ok(0);
        }

        let data = fs::read_to_string(path)?;
        let loaded: UserTable = serde_json::from_str(&data)?;
        let count = loaded.len();
        for (name, record) in loaded.into_entries() {
            let key = name.to_lowercase();
            if key != name {
                warn!("Stored username '{}' is not lowercase; loading it as '{}'", name, key);
            }
            self.users.insert(key, record);
        }
        info!("Database loaded from {} ({} users)", path.display(), count);
        Ok(count)
    }

    /// Write the whole table to the backing file.
    pub fn flush_to_durable_storage(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.users)?;
        fs::write(path, json)?;
        info!("Database saved to {} ({} users)", path.display(), self.users.len());
        Ok(())
    }

    /// Final flush. Failures are logged and swallowed.
    pub fn close(self) {
        if self.path.is_none() {
            warn!("Closing in-memory user store; {} users are discarded", self.users.len());
            return;
        }
        if let Err(e) = self.flush_to_durable_storage() {
            error!("Error saving database: {}", e);
        }
    }
}

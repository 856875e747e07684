//! Register, login, list and delete over the shared user table

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use super::auth::{hash_password, verify_password};
use super::store::UserStore;
use super::types::{RegisteredUser, UserRecord, UserSummary};
use super::validation::{validate_login, validate_register};
use crate::error::AccountError;

pub const USERNAME_EXISTS: &str = "Username already exists";
pub const EMAIL_EXISTS: &str = "Email already registered";

/// Request handlers over a shared [`UserStore`].
///
/// Cloning is cheap and every clone works on the same store. Each mutating
/// operation does its existence check and write inside one lock.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<Mutex<UserStore>>,
    flush_on_write: bool,
}

impl AccountService {
    pub fn new(store: UserStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            flush_on_write: false,
        }
    }

    /// Flush the whole table after every successful register or delete.
    pub fn with_flush_on_write(mut self, enabled: bool) -> Self {
        self.flush_on_write = enabled;
        self
    }

    /// Register a new user from a raw request body.
    pub fn register(&self, body: &Value) -> Result<RegisteredUser, AccountError> {
        let req = validate_register(body)?;
        let username = req.username.to_lowercase();

        // Cheap rejection before paying for the hash; re-checked under the lock below.
        {
            let store = safe_lock(&self.store)?;
            check_available(&store, &username, &req.email)?;
        }

        let (password_hash, salt) =
            hash_password(&req.password).map_err(|e| AccountError::Internal(e.to_string()))?;

        let mut store = safe_lock(&self.store)?;
        check_available(&store, &username, &req.email)?;

        let record = UserRecord {
            email: req.email,
            account_type: req.account_type,
            salt,
            password_hash,
        };
        let registered = RegisteredUser {
            username: username.clone(),
            email: record.email.clone(),
            account_type: record.account_type,
            password_hash: record.password_hash.clone(),
        };
        store.insert(username, record);
        self.after_write(&store);

        info!("Registered user '{}' ({})", registered.username, registered.account_type);
        Ok(registered)
    }

    /// Check credentials from a raw request body.
    pub fn login(&self, body: &Value) -> Result<UserSummary, AccountError> {
        let req = validate_login(body)?;
        let username = req.username.to_lowercase();

        let record = {
            let store = safe_lock(&self.store)?;
            store.find_by_username(&username).cloned()
        };
        let Some(record) = record else {
            debug!("Login for unknown user '{}'", username);
            return Err(AccountError::UnknownUser);
        };

        let valid = verify_password(&req.password, &record.password_hash)
            .map_err(|e| AccountError::Internal(e.to_string()))?;
        if !valid {
            warn!("Failed login for '{}'", username);
            return Err(AccountError::InvalidCredentials);
        }

        debug!("User '{}' logged in", username);
        Ok(UserSummary::from_record(&username, &record))
    }

    /// Every user in insertion order.
    pub fn list_users(&self) -> Result<Vec<UserSummary>, AccountError> {
        let store = safe_lock(&self.store)?;
        Ok(store
            .iter()
            .map(|(name, record)| UserSummary::from_record(name, record))
            .collect())
    }

    /// Remove a user; `NotFound` if there is no such user.
    /// Returns the normalized username that was removed.
    pub fn delete_user(&self, username: &str) -> Result<String, AccountError> {
        let username = username.to_lowercase();
        let mut store = safe_lock(&self.store)?;
        if !store.remove(&username) {
            return Err(AccountError::NotFound);
        }
        self.after_write(&store);

        info!("Deleted user '{}'", username);
        Ok(username)
    }

    /// Close the underlying store, performing the final flush.
    /// The service is left holding an empty in-memory store.
    pub fn close(&self) {
        match self.store.lock() {
            Ok(mut store) => std::mem::take(&mut *store).close(),
            Err(e) => error!("User store lock poisoned, database not saved: {}", e),
        }
    }

    /// Poison the store lock by panicking while holding it.
    #[cfg(test)]
    pub(crate) fn poison_store_lock(&self) {
        let store = Arc::clone(&self.store);
        let _ = std::thread::spawn(move || {
            let _guard = store.lock();
            panic!("panicking while holding the user store lock");
        })
        .join();
    }

    fn after_write(&self, store: &UserStore) {
        if self.flush_on_write {
            if let Err(e) = store.flush_to_durable_storage() {
                error!("Error saving database: {}", e);
            }
        }
    }
}

fn check_available(store: &UserStore, username: &str, email: &str) -> Result<(), AccountError> {
    if store.find_by_username(username).is_some() {
        return Err(AccountError::Conflict(USERNAME_EXISTS.to_string()));
    }
    if store.find_by_email(email).is_some() {
        return Err(AccountError::Conflict(EMAIL_EXISTS.to_string()));
    }
    Ok(())
}

/// Acquire the store lock, turning poison into an internal error
fn safe_lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AccountError> {
    mutex.lock().map_err(|e| {
        error!("Mutex poisoned: {}", e);
        AccountError::Internal("mutex poisoned".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::types::AccountType;
    use serde_json::json;

    fn register_body(username: &str, email: &str) -> Value {
        json!({
            "username": username,
            "email": email,
            "type": "admin",
            "password": "Secret!pass",
        })
    }

    #[test]
    fn test_register_and_list() {
        let service = AccountService::new(UserStore::new());
        let user = service.register(&register_body("Alice", "alice@example.com")).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.account_type, AccountType::Admin);
        assert_ne!(user.password_hash, "Secret!pass");

        let users = service.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].email, "alice@example.com");
    }

    #[test]
    fn test_duplicate_username_and_email() {
        let service = AccountService::new(UserStore::new());
        service.register(&register_body("alice", "alice@example.com")).unwrap();

        let err = service.register(&register_body("ALICE", "other@example.com")).unwrap_err();
        assert_eq!(err, AccountError::Conflict(USERNAME_EXISTS.to_string()));

        let err = service.register(&register_body("bob", "alice@example.com")).unwrap_err();
        assert_eq!(err, AccountError::Conflict(EMAIL_EXISTS.to_string()));

        // Username is checked before email.
        let err = service.register(&register_body("alice", "alice@example.com")).unwrap_err();
        assert_eq!(err, AccountError::Conflict(USERNAME_EXISTS.to_string()));
    }

    #[test]
    fn test_login_paths() {
        let service = AccountService::new(UserStore::new());
        service.register(&register_body("alice", "alice@example.com")).unwrap();

        let user = service
            .login(&json!({"username": "Alice", "password": "Secret!pass"}))
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.account_type, AccountType::Admin);

        let err = service
            .login(&json!({"username": "alice", "password": "Wrong!pass"}))
            .unwrap_err();
        assert_eq!(err, AccountError::InvalidCredentials);

        let err = service
            .login(&json!({"username": "nobody", "password": "Secret!pass"}))
            .unwrap_err();
        assert_eq!(err, AccountError::UnknownUser);
    }

    #[test]
    fn test_delete_then_login() {
        let service = AccountService::new(UserStore::new());
        service.register(&register_body("alice", "alice@example.com")).unwrap();

        assert_eq!(service.delete_user("ALICE").unwrap(), "alice");
        assert_eq!(service.delete_user("alice").unwrap_err(), AccountError::NotFound);

        let err = service
            .login(&json!({"username": "alice", "password": "Secret!pass"}))
            .unwrap_err();
        assert_eq!(err, AccountError::UnknownUser);
        assert!(service.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_registers_of_one_username() {
        let service = AccountService::new(UserStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service.register(&register_body("alice", &format!("alice{}@example.com", i)))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == AccountError::Conflict(USERNAME_EXISTS.to_string())));
        assert_eq!(service.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_poisoned_lock_is_internal() {
        let service = AccountService::new(UserStore::new());
        service.poison_store_lock();

        let err = service.register(&register_body("alice", "alice@example.com")).unwrap_err();
        assert!(matches!(err, AccountError::Internal(_)));
        assert!(matches!(service.list_users(), Err(AccountError::Internal(_))));
    }

    #[test]
    fn test_corrupt_stored_hash_is_internal() {
        let mut store = UserStore::new();
        store.insert(
            "alice".to_string(),
            UserRecord {
                email: "alice@example.com".to_string(),
                account_type: AccountType::User,
                salt: "s".to_string(),
                password_hash: "garbage".to_string(),
            },
        );
        let service = AccountService::new(store);
        let err = service
            .login(&json!({"username": "alice", "password": "Secret!pass"}))
            .unwrap_err();
        assert!(matches!(err, AccountError::Internal(_)));
    }

    #[test]
    fn test_flush_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let service = AccountService::new(UserStore::open(&path)).with_flush_on_write(true);

        service.register(&register_body("alice", "alice@example.com")).unwrap();
        assert_eq!(UserStore::open(&path).len(), 1);

        service.delete_user("alice").unwrap();
        assert!(UserStore::open(&path).is_empty());
    }

    #[test]
    fn test_close_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let service = AccountService::new(UserStore::open(&path));

        service.register(&register_body("alice", "alice@example.com")).unwrap();
        assert!(!path.exists());

        service.close();
        let reopened = UserStore::open(&path);
        assert!(reopened.find_by_username("alice").is_some());
    }
}

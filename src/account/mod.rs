//! Account module
//!
//! - User records and account types
//! - Salted password hashing
//! - Ordered request validation
//! - The in-memory user table and its JSON database file
//! - Register, login, list and delete

pub mod types;
pub mod auth;
pub mod validation;
pub mod store;
pub mod service;

pub use types::{AccountType, RegisteredUser, UserRecord, UserSummary, Username};
pub use store::{UserStore, UserTable};
pub use service::AccountService;

//! User record definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Username, the primary key of the user table. Always lowercase once stored.
pub type Username = String;

/// Kind of account a user registered as
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    User,
    Admin,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    /// Case-sensitive: only `user` and `admin` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown account type '{}'", other)),
        }
    }
}

/// Stored credential record. The username is the key it is stored under.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub salt: String,
    #[serde(rename = "passwordhash")]
    pub password_hash: String,
}

/// Public view of a user, as returned by listing and login.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    pub username: Username,
    pub email: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

impl UserSummary {
    pub fn from_record(username: &str, record: &UserRecord) -> Self {
        Self {
            username: username.to_string(),
            email: record.email.clone(),
            account_type: record.account_type,
        }
    }
}

/// A freshly registered user. The hash is echoed back to the caller.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegisteredUser {
    pub username: Username,
    pub email: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[serde(rename = "passwordhash")]
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("user".parse::<AccountType>(), Ok(AccountType::User));
        assert_eq!("admin".parse::<AccountType>(), Ok(AccountType::Admin));
        assert!("Admin".parse::<AccountType>().is_err());
        assert!("root".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_record_field_names() {
        let record = UserRecord {
            email: "alice@example.com".to_string(),
            account_type: AccountType::Admin,
            salt: "c2FsdA".to_string(),
            password_hash: "$argon2id$...".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "admin");
        assert_eq!(value["passwordhash"], "$argon2id$...");
        assert_eq!(value["salt"], "c2FsdA");
        assert_eq!(value["email"], "alice@example.com");
    }
}

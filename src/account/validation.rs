//! Request validation for register and login.
//!
//! Each operation owns an ordered list of rules. Rules run in order and the
//! first one that fails decides the error message; later rules are not
//! evaluated.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::types::AccountType;
use crate::error::AccountError;

pub const PASSWORD_FORMAT_INCORRECT: &str = "Password format is incorrect";
pub const TYPE_INCORRECT: &str = "Selected type is incorrect";
pub const USERNAME_FORMAT_INCORRECT: &str = "Username format is incorrect";
pub const DATA_FORMAT_INCORRECT: &str = "Incorrect data format";

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 24;
pub const PASSWORD_MIN: usize = 5;
pub const PASSWORD_MAX: usize = 24;

/// Characters of which a registration password must contain at least one.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

type Check = fn(&Map<String, Value>) -> bool;

struct Rule {
    check: Check,
    message: &'static str,
}

const REGISTER_FIELDS: &[&str] = &["username", "email", "type", "password"];
const LOGIN_FIELDS: &[&str] = &["username", "password"];

const REGISTER_RULES: &[Rule] = &[
    Rule { check: register_password_ok, message: PASSWORD_FORMAT_INCORRECT },
    Rule { check: type_ok, message: TYPE_INCORRECT },
    Rule { check: username_ok, message: DATA_FORMAT_INCORRECT },
    Rule { check: email_ok, message: DATA_FORMAT_INCORRECT },
    Rule { check: only_register_fields, message: DATA_FORMAT_INCORRECT },
];

const LOGIN_RULES: &[Rule] = &[
    Rule { check: username_ok, message: USERNAME_FORMAT_INCORRECT },
    Rule { check: login_password_ok, message: DATA_FORMAT_INCORRECT },
    Rule { check: only_login_fields, message: DATA_FORMAT_INCORRECT },
];

/// A register body that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub account_type: AccountType,
    pub password: String,
}

/// A login body that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub fn validate_register(body: &Value) -> Result<RegisterRequest, AccountError> {
    let map = apply_rules(body, REGISTER_RULES)?;
    let account_type = text(map, "type")
        .and_then(|t| t.parse::<AccountType>().ok())
        .ok_or_else(|| AccountError::Validation(TYPE_INCORRECT.to_string()))?;

    Ok(RegisterRequest {
        username: owned(map, "username"),
        email: owned(map, "email"),
        account_type,
        password: owned(map, "password"),
    })
}

pub fn validate_login(body: &Value) -> Result<LoginRequest, AccountError> {
    let map = apply_rules(body, LOGIN_RULES)?;
    Ok(LoginRequest {
        username: owned(map, "username"),
        password: owned(map, "password"),
    })
}

fn apply_rules<'a>(body: &'a Value, rules: &[Rule]) -> Result<&'a Map<String, Value>, AccountError> {
    let map = body
        .as_object()
        .ok_or_else(|| AccountError::Validation(DATA_FORMAT_INCORRECT.to_string()))?;

    match rules.iter().find(|rule| !(rule.check)(map)) {
        Some(rule) => Err(AccountError::Validation(rule.message.to_string())),
        None => Ok(map),
    }
}

/// Non-empty string field, if present.
fn text<'a>(map: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    map.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn owned(map: &Map<String, Value>, field: &str) -> String {
    text(map, field).unwrap_or_default().to_string()
}

fn length_between(value: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&value.chars().count())
}

fn username_ok(map: &Map<String, Value>) -> bool {
    text(map, "username").is_some_and(|u| length_between(u, USERNAME_MIN, USERNAME_MAX))
}

fn email_ok(map: &Map<String, Value>) -> bool {
    text(map, "email").is_some_and(is_valid_email)
}

fn type_ok(map: &Map<String, Value>) -> bool {
    text(map, "type").is_some_and(|t| t.parse::<AccountType>().is_ok())
}

fn login_password_ok(map: &Map<String, Value>) -> bool {
    text(map, "password").is_some_and(|p| length_between(p, PASSWORD_MIN, PASSWORD_MAX))
}

fn register_password_ok(map: &Map<String, Value>) -> bool {
    text(map, "password").is_some_and(|p| {
        length_between(p, PASSWORD_MIN, PASSWORD_MAX) && meets_password_policy(p)
    })
}

fn only_register_fields(map: &Map<String, Value>) -> bool {
    map.keys().all(|k| REGISTER_FIELDS.contains(&k.as_str()))
}

fn only_login_fields(map: &Map<String, Value>) -> bool {
    map.keys().all(|k| LOGIN_FIELDS.contains(&k.as_str()))
}

/// Upper case, lower case and one of [`PASSWORD_SPECIALS`]. Line breaks are not allowed.
pub fn meets_password_policy(password: &str) -> bool {
    !password.contains(['\n', '\r'])
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// `local@domain.tld`: dot-separated atext atoms, hyphenated alphanumeric
/// labels, alphabetic TLD of two or more letters.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("email pattern compiles")
});

pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 {
        return false;
    }
    match email.split_once('@') {
        Some((local, _)) if local.len() <= 64 => EMAIL.is_match(email),
        _ => false,
    }
}

pub mod account; // user table, its JSON file, and the register/login/list/delete operations
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod rpc; // HTTP routes

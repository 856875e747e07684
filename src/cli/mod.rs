pub mod user;

use clap::{Parser, Subcommand};

use crate::account::AccountType;

#[derive(Parser)]
#[command(name = "user_registry")]
#[command(about = "User registration and login service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service (default when no command is given)
    Serve {
        #[arg(long, default_value = "registry.toml")]
        config: String,
        #[arg(long)]
        port: Option<u16>,
        /// User database file
        #[arg(long)]
        database: Option<String>,
    },
    /// Register a new user on a running service
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long = "type", value_parser = parse_account_type, default_value = "user")]
        account_type: AccountType,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
    /// Check credentials against a running service
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
    /// List registered users
    Users {
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
    /// Delete a user
    Delete {
        username: String,
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
}

pub const DEFAULT_URL: &str = "http://localhost:3000";

fn parse_account_type(s: &str) -> Result<AccountType, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_defaults_to_serve() {
        let cli = Cli::try_parse_from(["user_registry"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_register_arguments() {
        let cli = Cli::try_parse_from([
            "user_registry",
            "register",
            "--username",
            "alice",
            "--email",
            "alice@example.com",
            "--type",
            "admin",
            "--password",
            "Secret!pass",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Register { account_type, url, .. }) => {
                assert_eq!(account_type, AccountType::Admin);
                assert_eq!(url, DEFAULT_URL);
            }
            _ => panic!("expected register command"),
        }
    }

    #[test]
    fn test_rejects_unknown_type() {
        let result = Cli::try_parse_from([
            "user_registry",
            "register",
            "--username",
            "alice",
            "--email",
            "alice@example.com",
            "--type",
            "root",
            "--password",
            "Secret!pass",
        ]);
        assert!(result.is_err());
    }
}

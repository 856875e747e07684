use crate::client::{AccountClient, ClientError};
use crate::rpc::types::ApiResponse;

use super::Commands;

/// Run one of the client commands against a running service.
/// Returns `false` if the service refused the request.
pub async fn handle_user_command(cmd: Commands) -> Result<bool, ClientError> {
    match cmd {
        Commands::Register { username, email, account_type, password, url } => {
            let client = AccountClient::new(&url)?;
            let outcome = client.register(&username, &email, account_type, &password).await?;
            print_outcome(&outcome);
            if let Some(user) = &outcome.data {
                println!("Registered '{}' <{}> as {}", user.username, user.email, user.account_type);
            }
            Ok(outcome.success)
        }
        Commands::Login { username, password, url } => {
            let client = AccountClient::new(&url)?;
            let outcome = client.login(&username, &password).await?;
            print_outcome(&outcome);
            if let Some(user) = &outcome.data {
                println!("Logged in as '{}' <{}> ({})", user.username, user.email, user.account_type);
            }
            Ok(outcome.success)
        }
        Commands::Users { url } => {
            let client = AccountClient::new(&url)?;
            let users = client.list_users().await?;
            println!("Registered users ({}):", users.len());
            for user in users {
                println!(" - {} <{}> [{}]", user.username, user.email, user.account_type);
            }
            Ok(true)
        }
        Commands::Delete { username, url } => {
            let client = AccountClient::new(&url)?;
            match client.delete_user(&username).await {
                Ok(message) => {
                    println!("{}", message);
                    Ok(true)
                }
                Err(ClientError::UnexpectedStatus { status, body }) => {
                    println!("{} ({})", body, status);
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        }
        Commands::Serve { .. } => {
            // Handled in main.rs
            Ok(true)
        }
    }
}

fn print_outcome<T>(outcome: &ApiResponse<T>) {
    println!("[{}] {}", outcome.status_code, outcome.message);
}

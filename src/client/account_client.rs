// HTTP client for the account service
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::account::{AccountType, RegisteredUser, UserSummary};
use crate::rpc::types::ApiResponse;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server answered {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
}

pub struct AccountClient {
    base: Url,
    client: Client,
}

impl AccountClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base,
            client: Client::new(),
        })
    }

    /// POST /register. Failures the server reports come back inside the envelope.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        account_type: AccountType,
        password: &str,
    ) -> Result<ApiResponse<RegisteredUser>, ClientError> {
        let body = json!({
            "username": username,
            "email": email,
            "type": account_type,
            "password": password,
        });
        self.post_envelope(&["register"], &body).await
    }

    /// POST /login
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<ApiResponse<UserSummary>, ClientError> {
        let body = json!({
            "username": username,
            "password": password,
        });
        self.post_envelope(&["login"], &body).await
    }

    /// GET /users
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ClientError> {
        let response = self.client.get(self.endpoint(&["users"])?).send().await?;
        if response.status() != StatusCode::OK {
            return Err(unexpected(response).await);
        }
        Ok(response.json().await?)
    }

    /// DELETE /users/:username. Returns the server's confirmation text.
    pub async fn delete_user(&self, username: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .delete(self.endpoint(&["users", username])?)
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(unexpected(response).await);
        }
        Ok(response.text().await?)
    }

    async fn post_envelope<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &serde_json::Value,
    ) -> Result<ApiResponse<T>, ClientError> {
        let response = self
            .client
            .post(self.endpoint(segments)?)
            .json(body)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn unexpected(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::UnexpectedStatus { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountService, UserStore};
    use crate::rpc::router;
    use tokio::net::TcpListener;

    async fn spawn_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(AccountService::new(UserStore::new()));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_endpoint_building() {
        let client = AccountClient::new("http://localhost:3000/").unwrap();
        assert_eq!(
            client.endpoint(&["users", "a b"]).unwrap().as_str(),
            "http://localhost:3000/users/a%20b"
        );
        assert!(AccountClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let client = AccountClient::new(&spawn_server().await).unwrap();

        let registered = client
            .register("alice", "alice@example.com", AccountType::Admin, "Secret!pass")
            .await
            .unwrap();
        assert!(registered.success);
        assert_eq!(registered.status_code, 201);
        assert_eq!(registered.data.unwrap().username, "alice");

        let duplicate = client
            .register("alice", "alice@example.com", AccountType::Admin, "Secret!pass")
            .await
            .unwrap();
        assert!(!duplicate.success);
        assert_eq!(duplicate.status_code, 409);
        assert!(duplicate.data.is_none());

        let login = client.login("alice", "Secret!pass").await.unwrap();
        assert_eq!(login.status_code, 200);
        assert_eq!(login.data.unwrap().account_type, AccountType::Admin);

        let users = client.list_users().await.unwrap();
        assert_eq!(users.len(), 1);

        let confirmation = client.delete_user("alice").await.unwrap();
        assert_eq!(confirmation, "User alice deleted successfully");

        match client.delete_user("alice").await {
            Err(ClientError::UnexpectedStatus { status, body }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "User not found");
            }
            other => panic!("expected 404, got {:?}", other),
        }
    }
}

use super::types::*;
use super::ApiState;
use crate::account::validation::DATA_FORMAT_INCORRECT;
use crate::account::{AccountService, RegisteredUser, UserSummary};
use crate::error::{AccountError, GENERIC_FAILURE};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::{debug, error, info};

type Envelope<T> = (StatusCode, Json<ApiResponse<T>>);

/// GET /users
pub async fn handle_list_users(
    State(state): State<ApiState>,
) -> Result<Json<Vec<UserSummary>>, (StatusCode, String)> {
    debug!("Listing users");
    state.accounts.list_users().map(Json).map_err(|e| {
        error!("Failed to list users: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
    })
}

/// POST /register
pub async fn handle_register(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Envelope<RegisteredUser> {
    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => {
            debug!("Rejected register body: {}", e);
            return failure(AccountError::Validation(DATA_FORMAT_INCORRECT.to_string()));
        }
    };

    match run_blocking(state.accounts, move |accounts| accounts.register(&body)).await {
        Ok(user) => envelope(ApiResponse::ok(201, REGISTER_SUCCESS, user)),
        // Unexpected failures during registration are reported as 400.
        Err(AccountError::Internal(detail)) => {
            error!("Registration failed: {}", detail);
            envelope(ApiResponse::failure(400, GENERIC_FAILURE))
        }
        Err(e) => failure(e),
    }
}

/// POST /login
pub async fn handle_login(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Envelope<UserSummary> {
    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => {
            debug!("Rejected login body: {}", e);
            return failure(AccountError::Validation(DATA_FORMAT_INCORRECT.to_string()));
        }
    };

    match run_blocking(state.accounts, move |accounts| accounts.login(&body)).await {
        Ok(user) => envelope(ApiResponse::ok(200, LOGIN_SUCCESS, user)),
        Err(e) => {
            if let AccountError::Internal(detail) = &e {
                error!("Login failed: {}", detail);
            }
            failure(e)
        }
    }
}

/// DELETE /users/:username
pub async fn handle_delete_user(
    State(state): State<ApiState>,
    Path(username): Path<String>,
) -> (StatusCode, String) {
    match state.accounts.delete_user(&username) {
        Ok(name) => (StatusCode::OK, format!("User {} deleted successfully", name)),
        Err(e) => {
            if let AccountError::Internal(detail) = &e {
                error!("Delete failed: {}", detail);
            } else {
                info!("Delete of unknown user '{}'", username);
            }
            (status(e.status_code()), e.public_message())
        }
    }
}

//
// === Helper Functions ===
//

/// Password hashing is CPU bound; keep it off the async workers.
async fn run_blocking<T, F>(accounts: AccountService, f: F) -> Result<T, AccountError>
where
    F: FnOnce(&AccountService) -> Result<T, AccountError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&accounts))
        .await
        .map_err(|e| AccountError::Internal(format!("worker task failed: {}", e)))?
}

fn failure<T>(err: AccountError) -> Envelope<T> {
    envelope(ApiResponse::failure(err.status_code(), err.public_message()))
}

fn envelope<T>(response: ApiResponse<T>) -> Envelope<T> {
    (status(response.status_code), Json(response))
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

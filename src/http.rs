// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! HTTP adapter for the ledger.
//!
//! ## Endpoints
//!
//! - `POST /clientes/{id}/transacoes` - apply a movement
//! - `GET /clientes/{id}/extrato` - account statement
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:8080/clientes/1/transacoes \
//!   -H "Content-Type: application/json" \
//!   -d '{"valor": 1000, "tipo": "c", "descricao": "deposito"}'
//!
//! curl http://localhost:8080/clientes/1/extrato
//! ```
//!
//! Ledger calls block on account locks, so they run on tokio's blocking
//! pool. The ledger's own gate bounds how many of them are in flight. The
//! deadline is fixed when the request arrives, so time spent waiting for a
//! blocking thread counts against it.

use crate::base::AccountId;
use crate::error::{LedgerError, ValidationError};
use crate::ledger::{Applied, Ledger, Statement};
use crate::movement::{Movement, MovementKind, MovementRequest};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, warn};

// === Request/Response DTOs ===

/// Movement kind as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireKind {
    #[serde(rename = "c")]
    Credit,
    #[serde(rename = "d")]
    Debit,
}

impl From<WireKind> for MovementKind {
    fn from(kind: WireKind) -> Self {
        match kind {
            WireKind::Credit => MovementKind::Credit,
            WireKind::Debit => MovementKind::Debit,
        }
    }
}

impl From<MovementKind> for WireKind {
    fn from(kind: MovementKind) -> Self {
        match kind {
            MovementKind::Credit => WireKind::Credit,
            MovementKind::Debit => WireKind::Debit,
        }
    }
}

/// Request body for applying a movement.
///
/// ```json
/// {"valor": 1000, "tipo": "c", "descricao": "deposito"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementBody {
    #[serde(rename = "valor")]
    pub amount: i64,
    #[serde(rename = "tipo")]
    pub kind: WireKind,
    #[serde(rename = "descricao")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedResponse {
    #[serde(rename = "limite")]
    pub limit: i64,
    #[serde(rename = "saldo")]
    pub balance: i64,
}

impl From<Applied> for AppliedResponse {
    fn from(applied: Applied) -> Self {
        Self {
            limit: applied.limit,
            balance: applied.balance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub total: i64,
    #[serde(rename = "data_extrato")]
    pub as_of: DateTime<Utc>,
    #[serde(rename = "limite")]
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementResponse {
    #[serde(rename = "valor")]
    pub amount: i64,
    #[serde(rename = "tipo")]
    pub kind: WireKind,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "realizada_em")]
    pub occurred_at: DateTime<Utc>,
}

impl From<Movement> for MovementResponse {
    fn from(movement: Movement) -> Self {
        Self {
            amount: movement.amount,
            kind: movement.kind.into(),
            description: movement.description.to_string(),
            occurred_at: movement.occurred_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementResponse {
    #[serde(rename = "saldo")]
    pub balance: BalanceResponse,
    #[serde(rename = "ultimas_transacoes")]
    pub recent_movements: Vec<MovementResponse>,
}

impl From<Statement> for StatementResponse {
    fn from(statement: Statement) -> Self {
        Self {
            balance: BalanceResponse {
                total: statement.balance,
                as_of: statement.as_of,
                limit: statement.limit,
            },
            recent_movements: statement
                .recent_movements
                .into_iter()
                .map(MovementResponse::from)
                .collect(),
        }
    }
}

/// Response body for errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// === Application State ===

/// Shared application state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

// === Error Handling ===

/// Errors surfaced by the HTTP handlers.
///
/// Internal details never reach the client.
#[derive(Debug)]
pub enum AppError {
    Ledger(LedgerError),
    /// Path segment that is not an account id at all.
    MalformedAccountId(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = match self {
            AppError::Ledger(error) => error,
            AppError::MalformedAccountId(raw) => {
                debug!(id = %raw, "malformed account id");
                return not_found();
            }
        };
        let (status, message) = match &error {
            LedgerError::InvalidInput(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "dados da requisicao invalidos")
            }
            LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "cliente nao encontrado"),
            LedgerError::LimitExceeded => (StatusCode::UNPROCESSABLE_ENTITY, "limite insuficiente"),
            LedgerError::Overloaded => (StatusCode::SERVICE_UNAVAILABLE, "servidor sobrecarregado"),
            LedgerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "erro interno do servidor")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "cliente nao encontrado".to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

/// Parses the path id and checks it is provisioned.
///
/// Anything that is not a known account is a 404, including ids that are
/// not numbers at all.
fn resolve_account(state: &AppState, raw: &str) -> Result<AccountId, AppError> {
    let id = raw
        .parse::<AccountId>()
        .map_err(|_| AppError::MalformedAccountId(raw.to_string()))?;
    if state.ledger.store().contains(id) {
        Ok(id)
    } else {
        Err(LedgerError::NotFound(id).into())
    }
}

/// Runs a blocking ledger call off the async workers.
///
/// `f` must honour `deadline` itself. If the call is still waiting for a
/// blocking thread when the deadline passes, the request is answered with
/// [`LedgerError::Overloaded`] right away; the call, once it runs, finds its
/// deadline expired and writes nothing. A call that already started is
/// awaited, its lock waits being bounded by the same deadline.
///
/// A panic inside the call fails this request only.
async fn run_blocking<T, F>(deadline: Instant, f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    let started = Arc::new(AtomicBool::new(false));
    let mut task = tokio::task::spawn_blocking({
        let started = Arc::clone(&started);
        move || {
            started.store(true, Ordering::SeqCst);
            f()
        }
    });

    let joined = match tokio::time::timeout_at(deadline.into(), &mut task).await {
        Ok(joined) => joined,
        Err(_) if !started.load(Ordering::SeqCst) => {
            warn!("ledger call still queued at its deadline");
            return Err(LedgerError::Overloaded.into());
        }
        Err(_) => task.await,
    };

    match joined {
        Ok(result) => result.map_err(AppError::Ledger),
        Err(join_error) => {
            error!(error = %join_error, "ledger task failed");
            Err(LedgerError::Internal(join_error.to_string()).into())
        }
    }
}

/// POST /clientes/{id}/transacoes - apply a movement.
async fn create_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<AppliedResponse>, AppError> {
    let deadline = state.ledger.deadline_from_now();
    let account_id = resolve_account(&state, &id)?;
    let body: MovementBody = serde_json::from_slice(&body)
        .map_err(|_| LedgerError::from(ValidationError::MalformedPayload))?;

    let request = MovementRequest::new(account_id, body.amount, body.kind.into(), body.description);
    let ledger = Arc::clone(&state.ledger);
    let applied = run_blocking(deadline, move || ledger.apply_until(request, deadline)).await?;
    Ok(Json(applied.into()))
}

/// GET /clientes/{id}/extrato - account statement.
async fn get_statement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatementResponse>, AppError> {
    let deadline = state.ledger.deadline_from_now();
    let account_id = resolve_account(&state, &id)?;
    let ledger = Arc::clone(&state.ledger);
    let statement =
        run_blocking(deadline, move || ledger.statement_until(account_id, deadline)).await?;
    Ok(Json(statement.into()))
}

// === Router ===

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/clientes/{id}/transacoes", post(create_movement))
        .route("/clientes/{id}/extrato", get(get_statement))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    use crate::config::LedgerConfig;
    use std::time::Duration;

    fn status_of(error: LedgerError) -> StatusCode {
        AppError::Ledger(error).into_response().status()
    }

    fn state() -> AppState {
        AppState::new(Ledger::new(LedgerConfig::default()).unwrap())
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(
            status_of(LedgerError::InvalidInput(ValidationError::EmptyDescription)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(LedgerError::NotFound(AccountId(6))), StatusCode::NOT_FOUND);
        assert_eq!(status_of(LedgerError::LimitExceeded), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of(LedgerError::Overloaded), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(LedgerError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn resolve_account_keeps_the_requested_id() {
        let state = state();
        assert_eq!(resolve_account(&state, "3").unwrap(), AccountId(3));
        assert!(matches!(
            resolve_account(&state, "6"),
            Err(AppError::Ledger(LedgerError::NotFound(AccountId(6))))
        ));
        assert!(matches!(
            resolve_account(&state, "abc"),
            Err(AppError::MalformedAccountId(raw)) if raw == "abc"
        ));
        assert_eq!(
            AppError::MalformedAccountId("-1".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn run_blocking_counts_time_spent_before_the_call() {
        let expired = Instant::now() - Duration::from_millis(1);
        let ledger = state().ledger;
        let result = run_blocking(expired, move || {
            ledger.apply_until(MovementRequest::credit(AccountId(1), 1, "late"), expired)
        })
        .await;
        assert!(matches!(result, Err(AppError::Ledger(LedgerError::Overloaded))));
    }

    #[tokio::test]
    async fn run_blocking_reports_panics_as_internal() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let result: Result<(), AppError> = run_blocking(deadline, || -> Result<(), LedgerError> { panic!("boom") }).await;
        assert!(matches!(result, Err(AppError::Ledger(LedgerError::Internal(_)))));
    }

    #[test]
    fn body_uses_wire_names() {
        let body: MovementBody =
            serde_json::from_str(r#"{"valor": 10, "tipo": "d", "descricao": "abc"}"#).unwrap();
        assert_eq!(body.amount, 10);
        assert_eq!(body.kind, WireKind::Debit);
        assert_eq!(body.description, "abc");
    }

    #[test]
    fn body_rejects_fractional_amount_and_unknown_kind() {
        assert!(serde_json::from_str::<MovementBody>(r#"{"valor": 1.5, "tipo": "c", "descricao": "a"}"#).is_err());
        assert!(serde_json::from_str::<MovementBody>(r#"{"valor": 1, "tipo": "x", "descricao": "a"}"#).is_err());
        assert!(serde_json::from_str::<MovementBody>(r#"{"valor": 1, "tipo": "c", "descricao": null}"#).is_err());
    }

    #[test]
    fn applied_response_field_names() {
        let json = serde_json::to_value(AppliedResponse::from(Applied {
            balance: -500,
            limit: 1000,
        }))
        .unwrap();
        assert_eq!(json, serde_json::json!({"limite": 1000, "saldo": -500}));
    }
}

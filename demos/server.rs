//! REST API server example for the point engine.
//!
//! Run with: `cargo run --example server -- --addr 127.0.0.1:3000`
//!
//! ## Endpoints
//!
//! - `GET /point/{id}` - Get a user's balance
//! - `GET /point/{id}/histories` - Get a user's ledger entries
//! - `PATCH /point/{id}/charge` - Charge points (body: amount as a JSON integer)
//! - `PATCH /point/{id}/use` - Use points (body: amount as a JSON integer)
//!
//! ## Example Usage
//!
//! ```bash
//! # Charge
//! curl -X PATCH http://localhost:3000/point/1/charge \
//!   -H "Content-Type: application/json" -d '5000'
//!
//! # Use
//! curl -X PATCH http://localhost:3000/point/1/use \
//!   -H "Content-Type: application/json" -d '1200'
//!
//! # Balance and history
//! curl http://localhost:3000/point/1
//! curl http://localhost:3000/point/1/histories
//! ```

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use clap::Parser;
use point_ledger_rs::{LedgerEntry, PointEngine, PointError, UserId, UserPoint};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "point-server")]
#[command(about = "Serves the point engine over HTTP", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,
}

// === Response DTOs ===

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// === Application State ===

/// Shared application state containing the point engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PointEngine>,
}

// === Error Handling ===

/// Failures a handler can report.
pub enum AppError {
    /// Domain rejection, reported with its own code.
    Point(PointError),
    /// Anything else, reported as a generic server error.
    Internal(String),
}

impl From<PointError> for AppError {
    fn from(err: PointError) -> Self {
        AppError::Point(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::Internal(err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Point(err) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    code: err.code().to_string(),
                    message: err.to_string(),
                },
            ),
            AppError::Internal(detail) => {
                error!(%detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        code: "500".to_string(),
                        message: "an error occurred".to_string(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

// === Handlers ===

/// GET /point/{id} - Get a user's balance.
async fn point(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserPoint>, AppError> {
    Ok(Json(state.engine.query(UserId(id))?))
}

/// GET /point/{id}/histories - Get a user's ledger entries.
async fn history(State(state): State<AppState>, Path(id): Path<i64>) -> Json<Vec<LedgerEntry>> {
    Json(state.engine.history(UserId(id)))
}

/// PATCH /point/{id}/charge - Charge points.
async fn charge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    amount: Result<Json<i64>, JsonRejection>,
) -> Result<Json<UserPoint>, AppError> {
    let Json(amount) = amount?;
    Ok(Json(state.engine.charge(UserId(id), amount)?))
}

/// PATCH /point/{id}/use - Use points.
async fn use_points(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    amount: Result<Json<i64>, JsonRejection>,
) -> Result<Json<UserPoint>, AppError> {
    let Json(amount) = amount?;
    Ok(Json(state.engine.use_points(UserId(id), amount)?))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/point/{id}", get(point))
        .route("/point/{id}/histories", get(history))
        .route("/point/{id}/charge", patch(charge))
        .route("/point/{id}/use", patch(use_points))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let state = AppState {
        engine: Arc::new(PointEngine::new()),
    };

    let app = create_router(state);

    let listener = match TcpListener::bind(args.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %args.addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };
    info!(addr = %args.addr, "point API server running");

    if let Err(e) = axum::serve(listener, app).await {
        error!("server stopped: {e}");
        std::process::exit(1);
    }
}

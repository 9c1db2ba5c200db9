//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API over the `AlgoManager` and the running engine.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::services::{AlgoManager, EngineHandle};
use crate::domain::shared::BrokerName;
use crate::error::EngineError;

use super::request::{AddSignalRequest, StopAlgoRequest};
use super::response::{
    AddSignalResponse, BrokerSessionResponse, ErrorResponse, HealthResponse, TradesResponse,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Engine administration.
    pub algo: Arc<AlgoManager>,
    /// Application version.
    pub version: String,
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/brokers/{broker}/login", post(login))
        .route("/api/v1/brokers/{broker}/logout", post(logout))
        .route("/api/v1/algo/{broker}/start", post(start_algo))
        .route("/api/v1/algo/{broker}/stop", post(stop_algo))
        .route("/api/v1/trades/{broker}/active", get(active_trades))
        .route("/api/v1/trades/{broker}/completed", get(completed_trades))
        .route("/api/v1/signals", post(add_signal))
        .with_state(state)
}

fn error(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn engine_error(e: &EngineError) -> Response {
    let status = match e {
        EngineError::EngineStopped => StatusCode::CONFLICT,
        EngineError::Configuration(_) | EngineError::InvariantViolation(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error(status, e)
}

async fn running_engine(state: &AppState) -> Result<EngineHandle, Response> {
    state
        .algo
        .engine()
        .await
        .ok_or_else(|| engine_error(&EngineError::EngineStopped))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

async fn login(State(state): State<AppState>, Path(broker): Path<String>) -> Response {
    let broker = BrokerName::new(broker);
    match state.algo.login(&broker).await {
        Ok(()) => Json(BrokerSessionResponse {
            broker,
            logged_in: true,
        })
        .into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(e)).into_response(),
    }
}

async fn logout(State(state): State<AppState>, Path(broker): Path<String>) -> Response {
    let broker = BrokerName::new(broker);
    match state.algo.logout(&broker).await {
        Ok(()) => Json(BrokerSessionResponse {
            broker,
            logged_in: false,
        })
        .into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(e)).into_response(),
    }
}

async fn start_algo(State(state): State<AppState>, Path(broker): Path<String>) -> Response {
    match state.algo.start(&BrokerName::new(broker)).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(e)).into_response(),
    }
}

async fn stop_algo(
    State(state): State<AppState>,
    Path(broker): Path<String>,
    Query(request): Query<StopAlgoRequest>,
) -> Response {
    match state
        .algo
        .stop(&BrokerName::new(broker), request.exit_all)
        .await
    {
        Ok(status) => Json(status).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(e)).into_response(),
    }
}

async fn active_trades(State(state): State<AppState>, Path(broker): Path<String>) -> Response {
    let engine = match running_engine(&state).await {
        Ok(engine) => engine,
        Err(response) => return response,
    };
    let broker = BrokerName::new(broker);
    match engine.active_trades(broker.clone()).await {
        Ok(trades) => Json(TradesResponse { broker, trades }).into_response(),
        Err(e) => engine_error(&e),
    }
}

async fn completed_trades(State(state): State<AppState>, Path(broker): Path<String>) -> Response {
    let engine = match running_engine(&state).await {
        Ok(engine) => engine,
        Err(response) => return response,
    };
    let broker = BrokerName::new(broker);
    match engine.completed_trades(broker.clone()).await {
        Ok(trades) => Json(TradesResponse { broker, trades }).into_response(),
        Err(e) => engine_error(&e),
    }
}

async fn add_signal(
    State(state): State<AppState>,
    Json(request): Json<AddSignalRequest>,
) -> Response {
    let engine = match running_engine(&state).await {
        Ok(engine) => engine,
        Err(response) => return response,
    };
    let signal = request.into_signal();
    let signal_id = signal.id.clone();
    match engine.add_signal(signal).await {
        Ok(outcome) => Json(AddSignalResponse::new(signal_id, outcome)).into_response(),
        Err(e) => engine_error(&e),
    }
}

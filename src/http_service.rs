//! HTTP/JSON API for the guess game
//!
//! Thin adapters: each handler validates its body, calls one service
//! operation and maps the result (or `AppError`) to a JSON response.

use crate::config::HttpConfig;
use crate::error::AppError;
use crate::models::{ActiveGuess, Direction, Player};
use crate::services::Resolution;
use crate::AppState;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

// ---------- Requests ----------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceGuessRequest {
    pub user_id: Option<String>,
    pub guess: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub user_id: Option<String>,
}

// ---------- Responses ----------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGuessView {
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_at_guess: Decimal,
    pub resolved: bool,
}

impl From<&ActiveGuess> for ActiveGuessView {
    fn from(guess: &ActiveGuess) -> Self {
        Self {
            direction: guess.direction,
            timestamp: guess.timestamp,
            price_at_guess: guess.price_at_guess,
            resolved: guess.resolved,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub user_id: String,
    pub score: i64,
    pub active_guess: Option<ActiveGuessView>,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            user_id: player.user_id.clone(),
            score: player.score,
            active_guess: player.active_guess.as_ref().map(ActiveGuessView::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionView {
    pub user_id: String,
    pub was_correct: bool,
    pub score_change: i64,
    pub new_score: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_at_guess: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,
    pub direction: Direction,
}

impl From<Resolution> for ResolutionView {
    fn from(r: Resolution) -> Self {
        Self {
            user_id: r.user_id,
            was_correct: r.was_correct,
            score_change: r.score_change,
            new_score: r.new_score,
            price_at_guess: r.price_at_guess,
            current_price: r.current_price,
            direction: r.direction,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlayerResponse {
    pub message: String,
    pub player: PlayerView,
}

#[derive(Debug, Serialize)]
pub struct ResolveGuessResponse {
    pub message: String,
    pub result: ResolutionView,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub base: &'static str,
    pub currency: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

// ---------- Error mapping ----------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceUnchangedBody {
    error: String,
    #[serde(with = "rust_decimal::serde::float")]
    price_at_guess: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    current_price: Decimal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &self {
            AppError::Conflict(Some(active)) => (
                status,
                Json(json!({
                    "error": self.to_string(),
                    "activeGuess": {
                        "direction": active.direction,
                        "timestamp": active.timestamp,
                    },
                })),
            )
                .into_response(),
            AppError::Conflict(None) => (
                status,
                Json(json!({ "error": self.to_string(), "retryable": true })),
            )
                .into_response(),
            AppError::TooEarly {
                elapsed_secs,
                required_secs,
            } => (
                status,
                Json(json!({
                    "error": self.to_string(),
                    "elapsedSeconds": elapsed_secs,
                    "requiredSeconds": required_secs,
                    "remainingSeconds": (required_secs - elapsed_secs).max(0),
                })),
            )
                .into_response(),
            AppError::PriceUnchanged {
                price_at_guess,
                current_price,
            } => (
                status,
                Json(PriceUnchangedBody {
                    error: self.to_string(),
                    price_at_guess: *price_at_guess,
                    current_price: *current_price,
                }),
            )
                .into_response(),
            AppError::UpstreamUnavailable(_) => (
                status,
                Json(json!({
                    "error": "Failed to fetch Bitcoin price",
                    "retryable": true,
                })),
            )
                .into_response(),
            AppError::Persistence(_) => (
                status,
                Json(json!({
                    "error": "Failed to access player data",
                    "retryable": true,
                })),
            )
                .into_response(),
            AppError::Config(_) | AppError::Database(_) => (
                status,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response(),
            _ => (status, Json(json!({ "error": self.to_string() }))).into_response(),
        }
    }
}

fn reject_body(rejection: JsonRejection) -> AppError {
    warn!(error = %rejection, "Rejected request body");
    AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
}

/// Treats absent and blank strings alike
fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

// ---------- Handlers ----------

async fn place_guess(
    State(state): State<AppState>,
    payload: Result<Json<PlaceGuessRequest>, JsonRejection>,
) -> Result<Json<PlayerResponse>, AppError> {
    let Json(req) = payload.map_err(reject_body)?;

    let (Some(user_id), Some(guess)) = (required(req.user_id), required(req.guess)) else {
        return Err(AppError::Validation(
            "Missing required fields: userId and guess".to_string(),
        ));
    };

    let direction = Direction::from_str(&guess)
        .map_err(|_| AppError::Validation("Guess must be either 'up' or 'down'".to_string()))?;

    let placed = state.guess_service.place_guess(&user_id, direction).await?;

    Ok(Json(PlayerResponse {
        message: "Guess placed successfully".to_string(),
        player: PlayerView {
            active_guess: Some(ActiveGuessView::from(&placed.guess)),
            ..PlayerView::from(&placed.player)
        },
    }))
}

async fn resolve_guess(
    State(state): State<AppState>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<ResolveGuessResponse>, AppError> {
    let Json(req) = payload.map_err(reject_body)?;

    let user_id = required(req.user_id)
        .ok_or_else(|| AppError::Validation("Missing required field: userId".to_string()))?;

    let resolution = state.guess_service.resolve_guess(&user_id).await?;

    Ok(Json(ResolveGuessResponse {
        message: "Guess resolved successfully".to_string(),
        result: resolution.into(),
    }))
}

async fn create_player(
    State(state): State<AppState>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlayerResponse>), AppError> {
    let Json(req) = payload.map_err(reject_body)?;

    let user_id = required(req.user_id)
        .ok_or_else(|| AppError::Validation("Missing required field: userId".to_string()))?;

    let (player, created) = state.player_service.create_player(&user_id).await?;

    let (status, message) = if created {
        (StatusCode::CREATED, "Player created")
    } else {
        (StatusCode::OK, "Player already exists")
    };

    Ok((
        status,
        Json(PlayerResponse {
            message: message.to_string(),
            player: PlayerView::from(&player),
        }),
    ))
}

async fn get_player(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let player = state.player_service.get_player(&user_id).await?;
    Ok(Json(json!({ "player": PlayerView::from(&player) })))
}

async fn current_price(State(state): State<AppState>) -> Result<Json<PriceResponse>, AppError> {
    let amount = state.oracle.current_price().await.map_err(|e| {
        warn!(provider = state.oracle.provider_name(), error = %e, "Price lookup failed");
        AppError::from(e)
    })?;

    Ok(Json(PriceResponse {
        base: "BTC",
        currency: "USD",
        amount,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the application router
pub fn router(state: AppState, config: &HttpConfig) -> Router {
    // The browser client calls these endpoints directly
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %Uuid::new_v4(),
        )
    });

    Router::new()
        .route("/placeGuess", post(place_guess))
        .route("/resolveGuess", post(resolve_guess))
        .route("/players", post(create_player))
        .route("/players/:user_id", get(get_player))
        .route("/price", get(current_price))
        .route("/health", get(health))
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(trace)
        .layer(cors)
}

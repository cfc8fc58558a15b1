use axum::http::{HeaderMap, StatusCode};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use raspadinha_core::{BatchView, CardEngine, ProvablyFairRng, SettlementRequest};
use raspadinha_shared::{
    AdminSetConfigRequest, ApiError, PurchaseRequest, PurchaseResponse, ScratchRequest,
    ScratchResponse, VerifyResponse, BATCH_TOKEN_HEADER,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::session::{batch_token, token_matches, ActiveBatch, Sessions};
use crate::store::{self, SettlementRecord};

pub struct AppState {
    pub db: SqlitePool,
    pub api_key: String,
    pub sessions: Arc<Sessions>,
}

fn status(e: ApiError) -> StatusCode {
    match e {
        ApiError::Invalid(msg) => {
            debug!("rejected: {msg}");
            StatusCode::BAD_REQUEST
        }
        ApiError::NotFound => StatusCode::NOT_FOUND,
        ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiError::Conflict(msg) => {
            debug!("conflict: {msg}");
            StatusCode::CONFLICT
        }
        ApiError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn internal(e: anyhow::Error) -> StatusCode {
    error!("{e:#}");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn route_verify(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VerifyResponse>, StatusCode> {
    let p = store::get_params(&state.db).await.map_err(internal)?;
    Ok(Json(VerifyResponse {
        server_seed_hash: p.server_seed_hash,
    }))
}

async fn route_purchase(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, StatusCode> {
    req.check().map_err(status)?;
    let p = store::next_nonce(&state.db).await.map_err(internal)?;
    let engine = CardEngine::new(p.engine_config().map_err(internal)?)
        .map_err(|e| status(e.into()))?;

    let nonce = p.nonce as u64;
    let rng = ProvablyFairRng::new(&p.server_seed, &req.client_seed, nonce);
    let batch = engine
        .generate_fair_batch(&rng, req.quantity, req.bonus)
        .map_err(|e| status(e.into()))?;

    let batch_id = Uuid::new_v4();
    let token = batch_token(&p.server_seed, &batch_id);
    let view = batch.public_view();
    state
        .sessions
        .insert(
            batch_id,
            ActiveBatch {
                batch,
                engine,
                token: token.clone(),
                client_seed: req.client_seed,
                nonce,
                server_seed_hash: p.server_seed_hash.clone(),
                settled: false,
            },
        )
        .await
        .map_err(status)?;
    info!(%batch_id, nonce, cards = view.total_count, "batch purchased");
    let active = state.sessions.len().await;
    debug!(active, "active batches");

    Ok(Json(PurchaseResponse {
        batch_id,
        token,
        server_seed_hash: p.server_seed_hash,
        nonce,
        view,
    }))
}

fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(BATCH_TOKEN_HEADER)?.to_str().ok()
}

fn authorize(active: &ActiveBatch, headers: &HeaderMap) -> Result<(), StatusCode> {
    match presented_token(headers) {
        Some(t) if token_matches(&active.token, t) => Ok(()),
        _ => Err(status(ApiError::Unauthorized)),
    }
}

async fn route_view(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<BatchView>, StatusCode> {
    let entry = state
        .sessions
        .get(&batch_id)
        .await
        .ok_or(status(ApiError::NotFound))?;
    let active = entry.lock().await;
    authorize(&active, &headers)?;
    Ok(Json(active.batch.public_view()))
}

async fn route_scratch(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<ScratchRequest>,
) -> Result<Json<ScratchResponse>, StatusCode> {
    let entry = state
        .sessions
        .get(&batch_id)
        .await
        .ok_or(status(ApiError::NotFound))?;
    let mut guard = entry.lock().await;
    authorize(&guard, &headers)?;

    let active = &mut *guard;
    let out = active
        .engine
        .scratch(&mut active.batch, req.card_index, &req.mask)
        .map_err(|e| status(e.into()))?;
    if out.status.is_finished() {
        info!(%batch_id, total_prize = active.batch.total_prize(), "batch ready to settle");
    }
    let card = active
        .batch
        .card(req.card_index)
        .map(|c| c.view(req.card_index))
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(ScratchResponse {
        event: out.event,
        status: out.status,
        card,
    }))
}

async fn route_settle(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<SettlementRequest>, StatusCode> {
    let entry = state
        .sessions
        .get(&batch_id)
        .await
        .ok_or(status(ApiError::NotFound))?;
    let mut active = entry.lock().await;
    authorize(&active, &headers)?;
    if active.settled {
        return Err(status(ApiError::Conflict("already settled".into())));
    }
    let settlement = active
        .engine
        .settle(&active.batch)
        .map_err(|e| status(e.into()))?;

    let record = SettlementRecord {
        batch_id,
        client_seed: &active.client_seed,
        nonce: active.nonce,
        server_seed_hash: &active.server_seed_hash,
        settlement: &settlement,
    };
    let id = store::insert_settlement(&state.db, &record)
        .await
        .map_err(internal)?;
    active.settled = true;
    drop(active);
    state.sessions.remove(&batch_id).await;

    info!(
        %batch_id,
        settlement_id = id,
        wagered = settlement.total_wagered,
        prize = settlement.total_prize,
        "batch settled"
    );
    Ok(Json(settlement))
}

async fn route_admin_set_config(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): TypedHeader<
        axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>,
    >,
    Json(req): Json<AdminSetConfigRequest>,
) -> Result<StatusCode, StatusCode> {
    if !token_matches(&state.api_key, bearer.token()) {
        warn!("admin request with bad api key");
        return Err(StatusCode::UNAUTHORIZED);
    }
    req.config.validate().map_err(|e| status(e.into()))?;
    store::set_engine_config(&state.db, &req.config)
        .await
        .map_err(internal)?;
    info!("engine config updated");
    Ok(StatusCode::NO_CONTENT)
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/verify", get(route_verify))
        .route("/batches", post(route_purchase))
        .route("/batches/:id", get(route_view))
        .route("/batches/:id/scratch", post(route_scratch))
        .route("/batches/:id/settle", post(route_settle))
        .route("/admin/config", post(route_admin_set_config))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

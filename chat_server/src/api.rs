use crate::{
    config::Config,
    db,
    error::StoreError,
    repo::{ChatRepository, MemoryRepository, SqliteRepository},
};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chat_model::{NewChatMessage, DEFAULT_ROOM};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use time::OffsetDateTime;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ChatRepository>,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self> {
        let repo: Arc<dyn ChatRepository> = match &config.database {
            Some(path) => {
                info!(path = %path.display(), "opening sqlite store");
                Arc::new(SqliteRepository::new(db::open_pool(Some(path))?))
            }
            None => {
                info!("using in-memory store");
                Arc::new(MemoryRepository::new())
            }
        };
        Ok(Self { repo })
    }
}

/// Build the HTTP application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id/messages", get(user_messages))
        .route("/api/messages", get(room_messages).post(create_message))
        .route("/api/messages/:id", get(get_message))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct ErrorResp {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResp>);

fn err(status: StatusCode, msg: &str) -> ApiError {
    (status, Json(ErrorResp { error: msg.into() }))
}

fn store_err(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::EmptyContent
        | StoreError::InvalidRoom
        | StoreError::InvalidTimestamp(_)
        | StoreError::InvalidUsername => StatusCode::BAD_REQUEST,
        StoreError::UnknownUser(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::DuplicateUser(_) => StatusCode::CONFLICT,
        StoreError::Db(_) | StoreError::Pool(_) => {
            error!("storage failure: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    err(status, e.code())
}

async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.repo.list_users().map_err(store_err)?;
    Ok(Json(users))
}

#[derive(Deserialize)]
struct CreateUserReq {
    username: String,
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserReq>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.repo.create_user(&req.username).map_err(store_err)?;
    info!(id = user.id, username = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn user_messages(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.repo.get_user(id).map_err(store_err)?.is_none() {
        return Err(err(StatusCode::NOT_FOUND, "not_found"));
    }
    let msgs = state.repo.list_by_user(id).map_err(store_err)?;
    Ok(Json(state.repo.views(&msgs)))
}

#[derive(Deserialize)]
struct RoomQuery {
    room_id: Option<String>,
}

async fn room_messages(
    State(state): State<AppState>,
    Query(q): Query<RoomQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let room = q.room_id.as_deref().unwrap_or(DEFAULT_ROOM);
    let msgs = state.repo.list_room(room).map_err(store_err)?;
    Ok(Json(state.repo.views(&msgs)))
}

#[derive(Deserialize)]
struct CreateMessageReq {
    content: String,
    user_id: i64,
    #[serde(default)]
    room_id: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    timestamp: Option<OffsetDateTime>,
}

impl From<CreateMessageReq> for NewChatMessage {
    fn from(req: CreateMessageReq) -> Self {
        NewChatMessage {
            content: req.content,
            user_id: req.user_id,
            room_id: req.room_id,
            timestamp: req.timestamp,
        }
    }
}

async fn create_message(
    State(state): State<AppState>,
    Json(req): Json<CreateMessageReq>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = state.repo.create(req.into()).map_err(store_err)?;
    info!("{msg:?} created");
    Ok((StatusCode::CREATED, Json(state.repo.view(&msg))))
}

async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = state
        .repo
        .get(id)
        .map_err(store_err)?
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "not_found"))?;
    Ok(Json(state.repo.view(&msg)))
}

/// Run the HTTP server with the resolved configuration.
pub async fn run_http_server(config: Config) -> Result<()> {
    let addr: SocketAddr = config.bind.parse()?;
    let state = AppState::new(&config).await?;
    info!(%addr, "chat server listening");
    axum::Server::bind(&addr)
        .serve(build_router(state).into_make_service())
        .await?;
    Ok(())
}

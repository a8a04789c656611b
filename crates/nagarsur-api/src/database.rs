use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Map, Value};
use tracing::{error, warn};

use nagarsur_types::api::{Claims, PushedKey};
use nagarsur_types::{DbPath, DirectoryStore, StoreError};

use crate::auth::AppState;
use crate::rules::{self, WriteOp};

fn parse_path(raw: &str) -> Result<DbPath, StatusCode> {
    DbPath::parse(raw).map_err(|_| StatusCode::BAD_REQUEST)
}

fn store_status(e: StoreError) -> StatusCode {
    match e {
        StoreError::InvalidPath(_) | StoreError::Rejected { .. } => {
            warn!("Rejected store write: {}", e);
            StatusCode::BAD_REQUEST
        }
        e => {
            error!("Store error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn authorize_write(
    state: &AppState,
    claims: &Claims,
    path: &DbPath,
    op: WriteOp,
    body: &Value,
) -> Result<(), StatusCode> {
    let exists = if claims.admin {
        false
    } else {
        state.store.exists(path).await.map_err(store_status)?
    };

    if !rules::can_write(claims, path, op, body, exists) {
        warn!("{} denied {:?} on {}", claims.username, op, path);
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(())
}

pub async fn get_node(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, StatusCode> {
    let path = parse_path(&raw)?;
    if !rules::can_read(&claims, &path) {
        return Err(StatusCode::FORBIDDEN);
    }

    let value = state.store.get(&path).await.map_err(store_status)?;
    Ok(Json(value.unwrap_or(Value::Null)))
}

pub async fn set_node(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, StatusCode> {
    let path = parse_path(&raw)?;
    authorize_write(&state, &claims, &path, WriteOp::Set, &body).await?;

    state.store.set(&path, body.clone()).await.map_err(store_status)?;
    Ok(Json(body))
}

pub async fn update_node(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, StatusCode> {
    let path = parse_path(&raw)?;
    let body = Value::Object(fields.clone());
    authorize_write(&state, &claims, &path, WriteOp::Merge, &body).await?;

    state.store.update(&path, fields).await.map_err(store_status)?;
    Ok(Json(body))
}

pub async fn push_node(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, StatusCode> {
    let path = parse_path(&raw)?;
    authorize_write(&state, &claims, &path, WriteOp::Push, &body).await?;

    let name = state.store.push(&path, body).await.map_err(store_status)?;
    Ok((StatusCode::CREATED, Json(PushedKey { name })))
}

pub async fn remove_node(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let path = parse_path(&raw)?;
    authorize_write(&state, &claims, &path, WriteOp::Remove, &Value::Null).await?;

    state.store.remove(&path).await.map_err(store_status)?;
    Ok(StatusCode::NO_CONTENT)
}

use std::path::PathBuf;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tracing::{error, info};

use parlor_room::coordinator::RoomHandle;
use parlor_room::events::{AdminAction, RoomEvent};
use parlor_room::moderation::{ModerationConfig, ModerationDocument};

/// Privileged HTTP control plane, gated by a shared bearer key. It has no
/// room state of its own: every action is injected into the coordinator
/// as a host-privileged event.
#[derive(Clone)]
pub struct AdminState {
    pub room: RoomHandle,
    pub moderation_path: PathBuf,
    pub admin_key: String,
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/moderation", get(get_moderation).put(put_moderation))
        .route("/mode", post(set_mode))
        .route("/pin", post(set_pin))
        .route("/reset", post(reset))
        .route("/messages/{id}", delete(delete_message))
        .route("/broadcast-count", post(broadcast_count))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_key,
        ))
        .with_state(state)
}

/// Shared-key bearer check on every admin route.
async fn require_admin_key(
    State(state): State<AdminState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if key != state.admin_key {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

async fn get_moderation(
    State(state): State<AdminState>,
) -> Result<Json<ModerationDocument>, StatusCode> {
    match std::fs::read_to_string(&state.moderation_path) {
        Ok(raw) => {
            let doc: ModerationDocument = serde_json::from_str(&raw).map_err(|err| {
                error!("moderation file on disk is malformed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Ok(Json(doc))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Ok(Json(ModerationDocument::default()))
        }
        Err(err) => {
            error!("reading moderation file failed: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Replace the moderation word/pattern lists. The document is compiled
/// first, so a malformed pattern is rejected here with 400 and the live
/// config is never touched.
async fn put_moderation(
    State(state): State<AdminState>,
    Json(doc): Json<ModerationDocument>,
) -> Result<StatusCode, (StatusCode, String)> {
    ModerationConfig::from_document(&doc)
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("{err:#}")))?;

    let pretty = serde_json::to_string_pretty(&doc)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    std::fs::write(&state.moderation_path, pretty).map_err(|err| {
        error!("writing moderation file failed: {err}");
        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    })?;

    info!(
        words = doc.banned_words.len(),
        patterns = doc.banned_patterns.len(),
        "moderation config replaced via admin API"
    );
    // The file watcher would get there eventually; reload explicitly so
    // the change takes effect before this request returns.
    state.room.send(RoomEvent::ReloadModeration);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    #[serde(default)]
    pub slow: i64,
    #[serde(rename = "emojiOnly", default)]
    pub emoji_only: bool,
}

async fn set_mode(State(state): State<AdminState>, Json(req): Json<ModeRequest>) -> StatusCode {
    state.room.send(RoomEvent::Admin(AdminAction::SetMode {
        slow: req.slow,
        emoji_only: req.emoji_only,
    }));
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    #[serde(default)]
    pub text: String,
}

async fn set_pin(State(state): State<AdminState>, Json(req): Json<PinRequest>) -> StatusCode {
    state
        .room
        .send(RoomEvent::Admin(AdminAction::SetPinned { text: req.text }));
    StatusCode::NO_CONTENT
}

async fn reset(State(state): State<AdminState>) -> StatusCode {
    state.room.send(RoomEvent::Admin(AdminAction::Reset));
    StatusCode::NO_CONTENT
}

async fn delete_message(State(state): State<AdminState>, Path(id): Path<String>) -> StatusCode {
    state.room.send(RoomEvent::Admin(AdminAction::Delete { id }));
    StatusCode::NO_CONTENT
}

/// The secondary counter feature: push the current presence count to
/// every connected session on demand.
async fn broadcast_count(State(state): State<AdminState>) -> StatusCode {
    state
        .room
        .send(RoomEvent::Admin(AdminAction::BroadcastCount));
    StatusCode::NO_CONTENT
}

mod admin;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use notify::Watcher;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use parlor_room::connection;
use parlor_room::coordinator::{RoomCoordinator, RoomHandle};
use parlor_room::events::RoomEvent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("PARLOR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLOR_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path = std::env::var("PARLOR_DB_PATH").unwrap_or_else(|_| "parlor.db".into());
    let moderation_path = PathBuf::from(
        std::env::var("PARLOR_MODERATION_PATH").unwrap_or_else(|_| "moderation.json".into()),
    );
    let public_dir = std::env::var("PARLOR_PUBLIC_DIR").unwrap_or_else(|_| "public".into());
    let admin_key = std::env::var("PARLOR_ADMIN_KEY").unwrap_or_else(|_| {
        warn!("PARLOR_ADMIN_KEY not set, admin control plane uses dev default");
        "dev-admin-key-change-me".into()
    });

    // Message store
    let store = Arc::new(parlor_db::Database::open(&PathBuf::from(&db_path))?);

    // The coordinator owns all room state; everything else only holds a
    // handle into its event channel.
    let (coordinator, room) = RoomCoordinator::new(store, Some(moderation_path.clone()));
    tokio::spawn(coordinator.run());

    // Re-load moderation rules when the file changes on disk. The watcher
    // must stay alive for the lifetime of the process.
    let _watcher = match spawn_moderation_watcher(&moderation_path, room.clone()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!(
                "moderation file watch on {} unavailable: {err}; live reload via admin API only",
                moderation_path.display()
            );
            None
        }
    };

    // Routes
    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(room.clone());

    let admin_routes = admin::router(admin::AdminState {
        room,
        moderation_path,
        admin_key,
    });

    let app = Router::new()
        .merge(ws_route)
        .nest("/admin", admin_routes)
        .fallback_service(ServeDir::new(&public_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parlor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(room): State<RoomHandle>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, room))
}

/// Watch the moderation file's parent directory and funnel change
/// notifications into the coordinator as reload events. Reload itself is
/// all-or-nothing inside the coordinator, so spurious notifications are
/// harmless.
fn spawn_moderation_watcher(
    path: &Path,
    room: RoomHandle,
) -> anyhow::Result<notify::RecommendedWatcher> {
    let file_name = path.file_name().map(|n| n.to_os_string());
    let watch_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let mut watcher =
        notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                let relevant = (event.kind.is_modify() || event.kind.is_create())
                    && event.paths.iter().any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if relevant {
                    room.send(RoomEvent::ReloadModeration);
                }
            }
            Err(err) => warn!("moderation watcher error: {err}"),
        })?;

    watcher.watch(&watch_dir, notify::RecursiveMode::NonRecursive)?;
    info!("Watching {} for moderation config changes", path.display());
    Ok(watcher)
}

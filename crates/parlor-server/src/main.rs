use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parlor_api::router::api_router;
use parlor_api::state::AppState;
use parlor_chat::connection;
use parlor_chat::filter::WordFilter;
use parlor_chat::room::ChatRoom;
use parlor_db::Database;

#[derive(Clone)]
struct ChatState {
    room: ChatRoom,
    db: Arc<Database>,
    filter: Arc<WordFilter>,
}

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
    let db_path = std::env::var("PARLOR_DB_PATH").unwrap_or_else(|_| "parlor.db".into());
    let host = std::env::var("PARLOR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLOR_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let bootstrap_admin = std::env::var("PARLOR_ADMIN_USERNAME").ok();
    // The word list is configuration, comma-separated.
    let filtered_words = std::env::var("PARLOR_FILTERED_WORDS").unwrap_or_default();

    // Init database
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let state = AppState::new(db.clone(), bootstrap_admin);
    let chat_state = ChatState {
        room: ChatRoom::new(),
        db,
        filter: Arc::new(WordFilter::new(
            filtered_words
                .split(',')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(String::from),
        )),
    };

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(chat_state);

    let app = api_router(state)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parlor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<ChatState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_socket(socket, state.room, state.db, state.filter)
    })
}

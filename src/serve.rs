use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Context;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceExt;
use tower::service_fn;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::Point;
use crate::config::EngineConfig;
use crate::engine::Sociogram;
use crate::graph::Roster;
use crate::render::render_svg;
use crate::store::{CoordinateStore, PersistenceGateway, SqliteStore, apply_stored_coordinates};
use crate::viewport::ViewTransform;

/// Arguments for running the sociogram sync API server.
#[derive(Debug, Clone, Parser)]
#[command(name = "sociogram serve", about = "Start the sociogram web sync API server.")]
pub struct ServeArgs {
    /// Path to the roster JSON that should be served.
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Sqlite database holding persisted node coordinates.
    #[arg(long = "db", default_value = "sociogram.db")]
    pub db: PathBuf,

    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5252)]
    pub port: u16,

    /// Background color for rendered SVG previews.
    #[arg(long = "background-color", default_value = "white")]
    pub background_color: String,

    /// Logical viewport width.
    #[arg(long, default_value_t = 960.0)]
    pub width: f32,

    /// Logical viewport height.
    #[arg(long, default_value_t = 600.0)]
    pub height: f32,
}

struct ServeState {
    engine: RwLock<Sociogram>,
    store: SqliteStore,
    background: String,
    last_tick: Mutex<Instant>,
}

impl ServeState {
    /// The server has no render loop; the animation clock advances whenever
    /// a client asks for state.
    async fn advance(&self) {
        let dt_ms = {
            let mut last = self.last_tick.lock().expect("tick clock poisoned");
            let now = Instant::now();
            let dt = now.duration_since(*last).as_secs_f32() * 1000.0;
            *last = now;
            dt.min(1000.0)
        };
        self.engine.write().await.tick(dt_ms);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphPayload {
    width: f32,
    height: f32,
    transform: ViewTransform,
    selection: Option<String>,
    nodes: Vec<NodePayload>,
    edges: Vec<EdgePayload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodePayload {
    id: String,
    label: String,
    position: Point,
    radius: f32,
    fill: String,
    stroke: String,
    label_color: String,
    opacity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pinned_position: Option<Point>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EdgePayload {
    from: String,
    to: String,
    relationship: String,
    mutual: bool,
    start: Point,
    control: Point,
    end: Point,
    color: String,
    opacity: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionUpdate {
    node_id: String,
    x: f32,
    y: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionUpdate {
    #[serde(default)]
    node_id: Option<String>,
}

pub async fn run_serve(args: ServeArgs, ui_root: Option<PathBuf>) -> anyhow::Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;
    let mut roster = Roster::from_json(&source)
        .with_context(|| format!("failed to parse '{}'", args.input.display()))?;

    let store = SqliteStore::open(&args.db)
        .await
        .with_context(|| format!("failed to open '{}'", args.db.display()))?;
    let stored = store.load_all().await?;
    apply_stored_coordinates(&mut roster, &stored);

    let mut engine = Sociogram::new(EngineConfig::default(), args.width, args.height);
    let (gateway, _worker) = PersistenceGateway::spawn(store.clone());
    engine.attach_gateway(gateway);
    engine.refresh(&roster.nodes, &roster.edges);

    let state = Arc::new(ServeState {
        engine: RwLock::new(engine),
        store,
        background: args.background_color.clone(),
        last_tick: Mutex::new(Instant::now()),
    });

    let mut app = Router::new()
        .route("/api/graph", get(get_graph))
        .route("/api/graph/svg", get(get_svg))
        .route("/api/graph/roster", put(put_roster))
        .route("/api/graph/positions", put(put_position))
        .route("/api/graph/selection", put(put_selection))
        .route("/api/graph/fit", post(post_fit))
        .route("/api/graph/relayout", post(post_relayout))
        .with_state(state);

    if let Some(root) = ui_root {
        let static_dir = ServeDir::new(root.clone())
            .append_index_html_on_directories(true)
            .fallback(ServeFile::new(root.join("index.html")));
        let dir_for_service = static_dir.clone();

        let static_service = service_fn(move |req| {
            let svc = dir_for_service.clone();
            async move {
                match svc.oneshot(req).await {
                    Ok(response) => Ok(response.map(axum::body::Body::new)),
                    Err(error) => {
                        let message = format!("Static file error: {error}");
                        Ok((StatusCode::INTERNAL_SERVER_ERROR, message).into_response())
                    }
                }
            }
        });

        app = app.fallback_service(static_service);
    }

    let app = app.layer(CorsLayer::permissive());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP server to {addr}"))?;

    println!("sociogram server listening on http://{addr}");
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn get_graph(
    State(state): State<Arc<ServeState>>,
) -> Result<Json<GraphPayload>, (StatusCode, String)> {
    state.advance().await;
    let engine = state.engine.read().await;
    let frame = engine.frame();

    let nodes = frame
        .nodes
        .iter()
        .map(|node| NodePayload {
            id: node.id.clone(),
            label: node.label.clone(),
            position: node.at,
            radius: node.radius,
            fill: node.style.fill.to_string(),
            stroke: node.style.stroke.to_string(),
            label_color: node.style.label_color.to_string(),
            opacity: node.style.opacity,
            pinned_position: engine.pin(&node.id),
        })
        .collect();

    let edges = frame
        .edges
        .iter()
        .map(|edge| EdgePayload {
            from: edge.path.from.clone(),
            to: edge.path.to.clone(),
            relationship: edge.path.relationship.as_str().to_string(),
            mutual: edge.path.mutual,
            start: edge.path.start,
            control: edge.path.control,
            end: edge.path.end,
            color: edge.path.stroke_color().to_string(),
            opacity: edge.opacity,
        })
        .collect();

    Ok(Json(GraphPayload {
        width: frame.width,
        height: frame.height,
        transform: frame.transform,
        selection: engine.selected().map(str::to_string),
        nodes,
        edges,
    }))
}

async fn get_svg(State(state): State<Arc<ServeState>>) -> Result<Response, (StatusCode, String)> {
    state.advance().await;
    let engine = state.engine.read().await;
    let svg = render_svg(&engine.frame(), &state.background)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    let mut response = Response::new(svg.into());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("image/svg+xml"),
    );
    Ok(response)
}

async fn put_roster(
    State(state): State<Arc<ServeState>>,
    Json(mut roster): Json<Roster>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let stored = state
        .store
        .load_all()
        .await
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    apply_stored_coordinates(&mut roster, &stored);
    state
        .engine
        .write()
        .await
        .refresh(&roster.nodes, &roster.edges);
    Ok(StatusCode::NO_CONTENT)
}

async fn put_position(
    State(state): State<Arc<ServeState>>,
    Json(update): Json<PositionUpdate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let applied = state
        .engine
        .write()
        .await
        .commit_manual_position(&update.node_id, Point::new(update.x, update.y));
    if applied {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("node '{}' not found", update.node_id),
        ))
    }
}

async fn put_selection(
    State(state): State<Arc<ServeState>>,
    Json(update): Json<SelectionUpdate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.engine.write().await.set_selection(update.node_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn post_fit(
    State(state): State<Arc<ServeState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.engine.write().await.request_fit();
    Ok(StatusCode::NO_CONTENT)
}

async fn post_relayout(
    State(state): State<Arc<ServeState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.engine.write().await.relayout();
    Ok(StatusCode::NO_CONTENT)
}

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tracing::info;

use crate::engine::{Engine, EngineSnapshot};
use crate::error::PricePulseError;
use crate::latency::{LatencyStats, LatencyTracker};
use crate::types::{Direction, PriceSuggestion, PriceTrigger, Sale, TimeWindow};

#[derive(Clone, Serialize)]
struct DashboardUpdate {
    snapshot: EngineSnapshot,
    new_sales: Vec<Sale>,
    new_suggestions: Vec<PriceSuggestion>,
    latency: LatencyUpdate,
    uptime_secs: u64,
}

#[derive(Clone, Serialize)]
struct LatencyUpdate {
    generation: LatencyStats,
    evaluation: LatencyStats,
    cycle: LatencyStats,
}

struct AppState {
    engine: Engine,
    tx: broadcast::Sender<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    hint: Option<&'static str>,
}

struct ApiError(PricePulseError);

impl From<PricePulseError> for ApiError {
    fn from(e: PricePulseError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PricePulseError::Validation(_)
            | PricePulseError::InvalidBaseline(_)
            | PricePulseError::Trigger(_)
            | PricePulseError::DataImport(_) => StatusCode::BAD_REQUEST,
            PricePulseError::BaselineNotFound { .. } => StatusCode::NOT_FOUND,
            PricePulseError::Authentication(_) => StatusCode::UNAUTHORIZED,
            PricePulseError::NoEligibleProducts => StatusCode::CONFLICT,
            PricePulseError::Simulation(_) | PricePulseError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            hint: self.0.recovery_hint(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub async fn run(port: u16, speed: u32, sample_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, _) = broadcast::channel::<String>(256);

    let engine = Engine::new();
    engine.seed_demo();
    engine.set_speed(speed);
    engine.with_state(|st| st.simulator.sample_size = sample_size);
    engine.start_simulation()?;

    let state = Arc::new(AppState {
        engine: engine.clone(),
        tx: tx.clone(),
    });

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/suggestions", get(list_suggestions))
        .route("/api/suggestions/:id/accept", post(accept_suggestion))
        .route("/api/suggestions/:id/reject", post(reject_suggestion))
        .route("/api/suggestions/reject-all", post(reject_all))
        .route("/api/triggers", get(list_triggers).post(create_trigger))
        .route("/api/triggers/:id", put(update_trigger).delete(delete_trigger))
        .route("/api/simulation/start", post(sim_start))
        .route("/api/simulation/stop", post(sim_stop))
        .route("/api/simulation/reset", post(sim_reset))
        .route("/api/simulation/speed", post(sim_speed))
        .route("/api/simulation/boost/:trigger_id", post(boost_on))
        .route("/api/simulation/boost", delete(boost_off))
        .route("/api/baselines/import", post(import_baselines))
        .route("/api/baselines/:ean/:hour", get(get_baseline))
        .route("/api/analyze/:ean", post(analyze_product))
        .fallback_service(ServeDir::new("static"))
        .with_state(state);

    tokio::spawn(run_engine(engine, tx));

    let addr = format!("0.0.0.0:{port}");
    info!("dashboard at http://localhost:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(mut socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    while let Ok(msg) = rx.recv().await {
        if socket.send(Message::Text(msg.into())).await.is_err() {
            break;
        }
    }
}

// ── Suggestions ──

async fn list_suggestions(State(state): State<Arc<AppState>>) -> Json<Vec<PriceSuggestion>> {
    Json(state.engine.fetch_pending_suggestions())
}

async fn accept_suggestion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.engine.accept_suggestion(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reject_suggestion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.engine.reject_suggestion(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct RejectAllBody {
    ids: Vec<u64>,
}

async fn reject_all(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RejectAllBody>,
) -> ApiResult<StatusCode> {
    state.engine.reject_all_suggestions(&body.ids)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Triggers ──

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum CreateTriggerBody {
    #[serde(rename_all = "camelCase")]
    SalesVolume {
        name: String,
        direction: Direction,
        percentage_threshold: f64,
        time_window_hours: u32,
        price_change_percentage: f64,
    },
    #[serde(rename_all = "camelCase")]
    TimeBased {
        name: String,
        start_hour: u8,
        end_hour: u8,
        days_of_week: Vec<u8>,
        direction: Direction,
        price_change_percentage: f64,
    },
    #[serde(rename_all = "camelCase")]
    CompetitorPrice {
        name: String,
        competitors: Vec<String>,
        percentage_threshold: f64,
        price_change_percentage: f64,
    },
}

#[derive(Serialize)]
struct CreatedBody {
    id: u64,
}

async fn list_triggers(State(state): State<Arc<AppState>>) -> Json<Vec<PriceTrigger>> {
    Json(state.engine.list_triggers(false))
}

async fn create_trigger(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTriggerBody>,
) -> ApiResult<(StatusCode, Json<CreatedBody>)> {
    let id = match body {
        CreateTriggerBody::SalesVolume {
            name,
            direction,
            percentage_threshold,
            time_window_hours,
            price_change_percentage,
        } => state.engine.create_sales_volume_trigger(
            &name,
            direction,
            percentage_threshold,
            time_window_hours,
            price_change_percentage,
        )?,
        CreateTriggerBody::TimeBased {
            name,
            start_hour,
            end_hour,
            days_of_week,
            direction,
            price_change_percentage,
        } => state.engine.create_time_based_trigger(
            &name,
            start_hour,
            end_hour,
            days_of_week,
            direction,
            price_change_percentage,
        )?,
        CreateTriggerBody::CompetitorPrice {
            name,
            competitors,
            percentage_threshold,
            price_change_percentage,
        } => state.engine.create_competitor_trigger(
            &name,
            competitors,
            percentage_threshold,
            price_change_percentage,
        )?,
    };
    Ok((StatusCode::CREATED, Json(CreatedBody { id })))
}

async fn update_trigger(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(mut trigger): Json<PriceTrigger>,
) -> ApiResult<StatusCode> {
    trigger.id = id;
    state.engine.update_trigger(trigger)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_trigger(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.engine.delete_trigger(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Simulation control ──

async fn sim_start(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.engine.start_simulation()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn sim_stop(State(state): State<Arc<AppState>>) -> StatusCode {
    state.engine.stop_simulation();
    StatusCode::NO_CONTENT
}

async fn sim_reset(State(state): State<Arc<AppState>>) -> StatusCode {
    state.engine.reset_simulation();
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct SpeedBody {
    multiplier: u32,
}

async fn sim_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SpeedBody>,
) -> StatusCode {
    state.engine.set_speed(body.multiplier);
    StatusCode::NO_CONTENT
}

#[derive(Deserialize, Default)]
struct BoostBody {
    #[serde(default)]
    targets: Vec<String>,
}

async fn boost_on(
    State(state): State<Arc<AppState>>,
    Path(trigger_id): Path<u64>,
    body: Option<Json<BoostBody>>,
) -> ApiResult<StatusCode> {
    let targets = body.map(|Json(b)| b.targets).unwrap_or_default();
    state.engine.activate_boost(trigger_id, targets)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn boost_off(State(state): State<Arc<AppState>>) -> StatusCode {
    state.engine.deactivate_boost();
    StatusCode::NO_CONTENT
}

// ── Baselines ──

#[derive(Serialize)]
struct ImportResult {
    imported: usize,
}

async fn import_baselines(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<Json<ImportResult>> {
    let imported = state.engine.import_baselines(&body)?;
    Ok(Json(ImportResult { imported }))
}

async fn get_baseline(
    State(state): State<Arc<AppState>>,
    Path((ean, hour)): Path<(String, u8)>,
) -> ApiResult<Json<crate::types::HourlyBaseline>> {
    let baseline = state
        .engine
        .get_baseline(&ean, hour)
        .ok_or(PricePulseError::BaselineNotFound { ean, hour_period: hour })?;
    Ok(Json(baseline))
}

// ── On-demand analysis ──

#[derive(Deserialize)]
struct AnalyzeQuery {
    #[serde(default = "default_window")]
    window: String,
}

fn default_window() -> String {
    "day".to_string()
}

async fn analyze_product(
    State(state): State<Arc<AppState>>,
    Path(ean): Path<String>,
    Query(query): Query<AnalyzeQuery>,
) -> ApiResult<Json<Option<PriceSuggestion>>> {
    let window = match query.window.as_str() {
        "hour" => TimeWindow::Hour,
        "day" => TimeWindow::Day,
        "week" => TimeWindow::Week,
        "month" => TimeWindow::Month,
        other => {
            return Err(PricePulseError::Validation(format!(
                "unknown window {other}; use hour|day|week|month"
            ))
            .into())
        }
    };
    let suggestion = state.engine.analyze_sales_for_product(&ean, window)?;
    Ok(Json(suggestion))
}

// ── Tick loop ──

async fn run_engine(engine: Engine, tx: broadcast::Sender<String>) {
    let mut latency = LatencyTracker::new();
    let start = Instant::now();

    loop {
        let report = engine.run_cycle();
        latency.record_cycle(report.generation_us, report.evaluation_us);

        let update = DashboardUpdate {
            snapshot: engine.snapshot(),
            new_sales: report.sales,
            new_suggestions: report.suggestions,
            latency: LatencyUpdate {
                generation: latency.generation_stats(),
                evaluation: latency.evaluation_stats(),
                cycle: latency.cycle_stats(),
            },
            uptime_secs: start.elapsed().as_secs(),
        };

        if let Ok(json) = serde_json::to_string(&update) {
            let _ = tx.send(json);
        }

        // re-read each iteration so runtime speed changes take effect
        tokio::time::sleep(engine.tick_period()).await;
    }
}

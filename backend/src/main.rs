use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use infill_core::document::{BodyState, ModelingSession};
use infill_core::features::{update, UpdateOutcome};
use infill_core::geometry::Point3;
use infill_core::infill::{
    format_progress, generate, BodyType, CancellationToken, InfillError, InfillParams, InfillStyle, ProgressSink,
};
use infill_core::kernel::{GeometryKernel, VoxelKernel};
use infill_core::topo::EntityId;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

type Session = ModelingSession<VoxelKernel>;

/// Format an error as a JSON message for the frontend
fn format_error(code: &str, message: &str, severity: &str) -> String {
    format!(
        "ERROR_UPDATE:{}",
        json!({
            "code": code,
            "message": message,
            "severity": severity
        })
    )
}

fn infill_error_code(err: &InfillError) -> &'static str {
    match err {
        InfillError::InvalidStyle(_) => "INVALID_STYLE",
        InfillError::InvalidBodyType(_) => "INVALID_BODY_TYPE",
        InfillError::InvalidParameter(_) => "INVALID_PARAMETER",
        InfillError::Kernel(_) | InfillError::LatticeFailed { .. } => "KERNEL_FAILURE",
        InfillError::MissingSource(_) => "MISSING_SOURCE",
        InfillError::Document(_) => "DOCUMENT",
        InfillError::Descriptor(_) => "DESCRIPTOR",
    }
}

/// Settings read from the environment at startup.
#[derive(Debug, Clone)]
struct AppConfig {
    bind_addr: SocketAddr,
    voxel_size: f64,
}

impl AppConfig {
    fn from_env() -> Self {
        let mut config = Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            voxel_size: 0.5,
        };
        if let Ok(raw) = std::env::var("INFILL_BIND_ADDR") {
            match raw.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(e) => warn!("ignoring INFILL_BIND_ADDR={}: {}", raw, e),
            }
        }
        if let Ok(raw) = std::env::var("INFILL_VOXEL_SIZE") {
            match raw.parse::<f64>() {
                Ok(size) if size > 0.0 => config.voxel_size = size,
                _ => warn!("ignoring INFILL_VOXEL_SIZE={}", raw),
            }
        }
        config
    }
}

// Application State
struct AppState {
    config: AppConfig,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    let addr = config.bind_addr;
    let shared_state = Arc::new(AppState { config });

    let app = Router::new()
        .route("/", get(root))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn root() -> String {
    format!("Infill backend {}", infill_core::version())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

#[derive(Debug, Deserialize)]
struct AddBoxRequest {
    min: [f64; 3],
    max: [f64; 3],
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfillRequest {
    source: EntityId,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    body_type: Option<String>,
    size: Option<f64>,
    shell_thickness: Option<f64>,
    rib_thickness: Option<f64>,
}

impl InfillRequest {
    /// Fill unset fields from the defaults and parse the tokens.
    fn params(&self) -> Result<InfillParams, InfillError> {
        let defaults = InfillParams::default();
        Ok(InfillParams {
            style: match &self.style {
                Some(token) => token.parse::<InfillStyle>()?,
                None => defaults.style,
            },
            body_type: match &self.body_type {
                Some(token) => token.parse::<BodyType>()?,
                None => defaults.body_type,
            },
            size: self.size.unwrap_or(defaults.size),
            shell_thickness: self.shell_thickness.unwrap_or(defaults.shell_thickness),
            rib_thickness: self.rib_thickness.unwrap_or(defaults.rib_thickness),
        })
    }
}

/// Forwards lattice progress to the client, throttled to roughly one
/// frame per percent.
struct ChannelProgress {
    tx: UnboundedSender<String>,
    template: String,
    max: usize,
    step: usize,
}

impl ChannelProgress {
    fn new(tx: UnboundedSender<String>) -> Self {
        Self {
            tx,
            template: String::new(),
            max: 0,
            step: 1,
        }
    }
}

impl ProgressSink for ChannelProgress {
    fn start(&mut self, title: &str, message: &str, max: usize) {
        self.template = message.to_string();
        self.max = max;
        self.step = (max / 100).max(1);
        let _ = self.tx.send(format!(
            "PROGRESS_START:{}",
            json!({ "title": title, "message": message, "min": 0, "max": max })
        ));
    }

    fn update(&mut self, value: usize) {
        if value % self.step == 0 || value == self.max {
            let _ = self.tx.send(format!(
                "PROGRESS_UPDATE:{}",
                json!({ "value": value, "message": format_progress(&self.template, value, self.max) })
            ));
        }
    }

    fn finish(&mut self) {}
}

fn bodies_json(session: &Session) -> serde_json::Value {
    let bodies: Vec<_> = session
        .document
        .bodies()
        .map(|body| {
            let state = match body.state {
                BodyState::Live => "live",
                BodyState::Consumed(_) => "consumed",
                BodyState::Suppressed(_) => "suppressed",
            };
            json!({
                "id": body.id,
                "name": body.name,
                "state": state,
                "revision": body.revision,
                "volume": session.kernel.volume(&body.solid).ok(),
            })
        })
        .collect();
    json!(bodies)
}

fn outcome_json(feature: EntityId, outcome: &UpdateOutcome) -> serde_json::Value {
    match outcome {
        UpdateOutcome::UpToDate => json!({ "feature": feature, "outcome": "up_to_date" }),
        UpdateOutcome::Rebuilt { new, .. } => json!({ "feature": feature, "outcome": "rebuilt", "new_feature": new }),
        UpdateOutcome::MissingSource(source) => {
            json!({ "feature": feature, "outcome": "missing_source", "source": source })
        }
        UpdateOutcome::Failed(message) => json!({ "feature": feature, "outcome": "failed", "message": message }),
        UpdateOutcome::Cancelled => json!({ "feature": feature, "outcome": "cancelled" }),
    }
}

type Job = Box<dyn FnOnce(&mut Session, &UnboundedSender<String>) + Send>;

/// Clears the lattice slot when the job holding it ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns one client's session on a blocking thread and runs its commands in
/// arrival order.
struct SessionWorker {
    jobs: UnboundedSender<Job>,
    out: UnboundedSender<String>,
    in_flight: Arc<AtomicBool>,
    /// Token of the accepted lattice job.
    cancel: CancellationToken,
}

impl SessionWorker {
    fn spawn(mut session: Session, out: UnboundedSender<String>) -> Self {
        let (jobs, mut queue) = unbounded_channel::<Job>();
        let replies = out.clone();
        tokio::task::spawn_blocking(move || {
            while let Some(job) = queue.blocking_recv() {
                job(&mut session, &replies);
            }
        });
        Self {
            jobs,
            out,
            in_flight: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    fn submit<F>(&self, job: F)
    where
        F: FnOnce(&mut Session, &UnboundedSender<String>) + Send + 'static,
    {
        if self.jobs.send(Box::new(job)).is_err() {
            let _ = self
                .out
                .send(format_error("SESSION_CLOSED", "The modeling session has stopped", "error"));
        }
    }

    /// Queue a cancellable infill or update. Only one may be in flight; the
    /// cancel token is replaced once the job is accepted.
    fn submit_lattice<F>(&mut self, job: F) -> bool
    where
        F: FnOnce(&mut Session, &UnboundedSender<String>, &CancellationToken) + Send + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            let _ = self
                .out
                .send(format_error("BUSY", "Another infill operation is in progress", "warning"));
            return false;
        }
        let token = CancellationToken::new();
        self.cancel = token.clone();
        let flight = InFlight(self.in_flight.clone());
        self.submit(move |session, out| {
            let _flight = flight;
            job(session, out, &token);
        });
        true
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SessionWorker {
    // The client is gone; stop the running lattice.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn add_box(session: &mut Session, out: &UnboundedSender<String>, req: AddBoxRequest) {
    let min = Point3::new(req.min[0], req.min[1], req.min[2]);
    let max = Point3::new(req.max[0], req.max[1], req.max[2]);
    match session.kernel.create_box(min, max) {
        Ok(solid) => {
            let name = req.name.unwrap_or_else(|| "Body".to_string());
            let id = session.document.add_body(name.clone(), solid);
            let _ = out.send(format!("BODY_ADDED:{}", json!({ "id": id, "name": name })));
        }
        Err(e) => {
            let _ = out.send(format_error("KERNEL_FAILURE", &e.to_string(), "error"));
        }
    }
}

fn run_infill(session: &mut Session, out: &UnboundedSender<String>, req: InfillRequest, cancel: &CancellationToken) {
    let mut progress = ChannelProgress::new(out.clone());
    let result = req
        .params()
        .and_then(|params| generate(session, req.source, &params, cancel, &mut progress));
    let frame = match result {
        Ok(report) => format!(
            "INFILL_RESULT:{}",
            json!({
                "summary": report.summary(),
                "percentage": report.percentage,
                "applied": report.applied,
                "total": report.total,
                "cancelled": report.cancelled,
                "descriptor": report.descriptor,
            })
        ),
        Err(e) => {
            warn!("infill failed: {}", e);
            format_error(infill_error_code(&e), &e.to_string(), "error")
        }
    };
    let _ = out.send(frame);
}

fn run_update(session: &mut Session, out: &UnboundedSender<String>, cancel: &CancellationToken) {
    let mut progress = ChannelProgress::new(out.clone());
    let report = update(session, cancel, &mut progress);
    let outcomes: Vec<_> = report
        .outcomes
        .iter()
        .map(|(feature, outcome)| outcome_json(*feature, outcome))
        .collect();
    let _ = out.send(format!("UPDATE_RESULT:{}", json!(outcomes)));
}

fn send_bodies(session: &mut Session, out: &UnboundedSender<String>) {
    let _ = out.send(format!("BODIES_UPDATE:{}", bodies_json(session)));
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let seed = uuid::Uuid::new_v4().to_string();
    info!(session = %seed, "Client connected");

    let (mut sender, mut receiver) = socket.split();
    let (out, mut outgoing) = unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(text) = outgoing.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let session = ModelingSession::new(VoxelKernel::new(state.config.voxel_size), &seed);
    let mut worker = SessionWorker::spawn(session, out.clone());

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        info!("Received message: {}", text);
        let (verb, payload) = text.split_once(':').unwrap_or((text.as_str(), ""));

        match verb {
            "ADD_BOX" => match serde_json::from_str::<AddBoxRequest>(payload) {
                Ok(req) => worker.submit(move |session, out| add_box(session, out, req)),
                Err(e) => {
                    let _ = out.send(format_error("BAD_REQUEST", &e.to_string(), "error"));
                }
            },
            "INFILL" => match serde_json::from_str::<InfillRequest>(payload) {
                Ok(req) => {
                    worker.submit_lattice(move |session, out, cancel| run_infill(session, out, req, cancel));
                }
                Err(e) => {
                    let _ = out.send(format_error("BAD_REQUEST", &e.to_string(), "error"));
                }
            },
            "CANCEL" => worker.cancel(),
            "UPDATE" => {
                worker.submit_lattice(run_update);
            }
            "BODIES" => worker.submit(send_bodies),
            _ => {
                let _ = out.send(format_error("UNKNOWN_COMMAND", &format!("Unknown command '{}'", verb), "warning"));
            }
        }
    }

    info!(session = %seed, "Client disconnected");
    drop(worker);
    drop(out);
    let _ = writer.await;
}

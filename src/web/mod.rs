/// HTTP surface of the flood-report board.
///
/// Routes:
/// - `GET /`: current verdict and the report form.
/// - `POST /report`: validate and store a report, then redirect.
/// - `POST /line/webhook`: LINE bot webhook.
/// - `GET /healthz`: liveness.
///
/// Store access and reply delivery are blocking, so handlers move them onto
/// `spawn_blocking` threads.

pub mod forms;
pub mod render;

use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::analysis::{ConsensusSettings, compute_status};
use crate::categories::CategoryTable;
use crate::line::signature::SIGNATURE_HEADER;
use crate::line::{LineBot, SignatureError, WebhookPayload};
use crate::logging::{self, Component};
use crate::model::Report;
use crate::store::ReportLedger;

use forms::{ReportForm, validate_submission};
use render::{IndexView, render_index};

/// Shared state for every handler.
pub struct AppContext {
    pub ledger: Arc<ReportLedger>,
    pub consensus: ConsensusSettings,
    pub categories: CategoryTable,
    /// `None` when LINE credentials are not configured.
    pub line: Option<Arc<LineBot>>,
}

pub type SharedContext = Arc<AppContext>;

pub fn build_router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/report", post(submit_report))
        .route("/line/webhook", post(line_webhook))
        .route("/healthz", get(healthz))
        .with_state(ctx)
}

/// Binds `listen_addr` and serves until Ctrl-C.
pub async fn serve(listen_addr: &str, ctx: SharedContext) -> Result<(), String> {
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|e| format!("invalid listen_addr '{}': {}", listen_addr, e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind {} failed: {}", addr, e))?;
    logging::info(Component::Web, None, &format!("Listening on http://{}", addr));

    axum::serve(listener, build_router(ctx))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| format!("serve failed: {}", e))
}

/// Loads the current reports off the async runtime. A panicked or
/// cancelled load degrades to an empty snapshot.
async fn load_reports(ledger: Arc<ReportLedger>) -> Vec<Report> {
    match tokio::task::spawn_blocking(move || ledger.load_reports()).await {
        Ok(reports) => reports,
        Err(e) => {
            logging::error(Component::Web, None, &format!("Report load task failed: {}", e));
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct IndexFlags {
    thanks: Option<String>,
    invalid: Option<String>,
}

fn flag_set(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some(v) if !v.is_empty() && v != "0")
}

async fn index(State(ctx): State<SharedContext>, Query(flags): Query<IndexFlags>) -> Html<String> {
    let reports = load_reports(ctx.ledger.clone()).await;
    let (verdict, report_count) = compute_status(&reports, &ctx.consensus, &ctx.categories);

    Html(render_index(&IndexView {
        verdict: &verdict,
        report_count,
        min_reports: ctx.consensus.min_reports,
        table: &ctx.categories,
        strategy: ctx.consensus.strategy,
        thanks: flag_set(&flags.thanks),
        invalid: flag_set(&flags.invalid),
    }))
}

async fn submit_report(
    State(ctx): State<SharedContext>,
    form: Result<Form<ReportForm>, FormRejection>,
) -> Redirect {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            logging::warn(Component::Web, None, &format!("Unreadable report form: {}", e.body_text()));
            return Redirect::to("/?invalid=1");
        }
    };

    let report = match validate_submission(&form, &ctx.categories) {
        Ok(report) => report,
        Err(e) => {
            logging::warn(Component::Web, None, &format!("Rejected report: {}", e));
            return Redirect::to("/?invalid=1");
        }
    };

    let ledger = ctx.ledger.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || ledger.save_report(&report)).await {
        logging::error(Component::Web, None, &format!("Report save task failed: {}", e));
    }
    // A dropped write is already logged by the ledger; the reporter still
    // gets the thank-you page.
    Redirect::to("/?thanks=1")
}

async fn line_webhook(
    State(ctx): State<SharedContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(bot) = ctx.line.clone() else {
        logging::warn(
            Component::Line,
            None,
            "LINE webhook invoked but credentials are not configured.",
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "LINE webhook not configured").into_response();
    };

    // A non-ASCII header value is still a signature, just not a valid one.
    let signature = headers
        .get(SIGNATURE_HEADER)
        .map(|v| v.to_str().unwrap_or_default());
    match bot.verify(&body, signature) {
        Ok(()) => {}
        Err(SignatureError::Missing) => {
            logging::warn(Component::Line, None, "LINE webhook called without a signature.");
            return (StatusCode::BAD_REQUEST, "Missing signature").into_response();
        }
        Err(e) => {
            logging::warn(Component::Line, None, &format!("Received invalid LINE signature: {}", e));
            return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
        }
    }

    let payload = match WebhookPayload::parse(&body) {
        Ok(payload) => payload,
        Err(e) => {
            logging::warn(Component::Line, None, &e.to_string());
            return (StatusCode::BAD_REQUEST, "Invalid payload").into_response();
        }
    };

    let ledger = ctx.ledger.clone();
    let dispatched =
        tokio::task::spawn_blocking(move || bot.dispatch(&payload, || ledger.load_reports())).await;
    if let Err(e) = dispatched {
        logging::error(Component::Line, None, &format!("Webhook dispatch task failed: {}", e));
    }

    (StatusCode::OK, "OK").into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

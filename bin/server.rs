// BEL Analytics - Web Server
// REST API with Axum over one immutable dataset snapshot

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use bel_analytics::config::AppConfig;
use bel_analytics::export;
use bel_analytics::pipeline::QueryParams;
use bel_analytics::{
    logging, DataStore, DashboardSummary, ExportError, GroupMetrics, LeaderboardQuery, Level, Pipeline, RecordIssue,
    Region,
};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "bel-server")]
#[command(about = "HTTP API for BEL referral performance")]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config and BEL_SERVER_ADDR)
    #[arg(long)]
    addr: Option<String>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    reference: NaiveDate,
    default_page_size: usize,
}

impl AppState {
    fn resolve(&self, params: &QueryParams) -> Result<LeaderboardQuery, String> {
        params.resolve(self.reference, self.pipeline.default_year(self.reference))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::error(message))).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    page: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct YearParams {
    year: Option<i32>,
}

/// Summary response
#[derive(Serialize)]
struct SummaryResponse {
    summary: DashboardSummary,
    by_level: Vec<GroupMetrics<Level>>,
    by_region: Vec<GroupMetrics<Region>>,
}

/// Validation report response
#[derive(Serialize)]
struct IssuesResponse {
    fingerprint: String,
    loaded: usize,
    quarantined: Vec<String>,
    counts: BTreeMap<String, usize>,
    issues: Vec<RecordIssue>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/leaderboard - Filtered, sorted, paginated rows
async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    Query(paging): Query<PageParams>,
) -> Response {
    let query = match state.resolve(&params) {
        Ok(query) => query,
        Err(e) => return bad_request(e),
    };

    let page = state.pipeline.page(
        &query,
        paging.page_size.unwrap_or(state.default_page_size),
        paging.page.unwrap_or(0),
    );
    (StatusCode::OK, Json(ApiResponse::ok(page))).into_response()
}

/// GET /api/summary - Dashboard totals and breakdowns for the filtered set
async fn get_summary(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Response {
    let query = match state.resolve(&params) {
        Ok(query) => query,
        Err(e) => return bad_request(e),
    };

    let response = SummaryResponse {
        summary: state.pipeline.summary(&query),
        by_level: state.pipeline.level_breakdown(&query),
        by_region: state.pipeline.region_breakdown(&query),
    };
    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// GET /api/accounts/:id - One BEL with its monthly breakdown
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<YearParams>,
) -> Response {
    let year = params.year.unwrap_or_else(|| state.pipeline.default_year(state.reference));
    let cutoff = bel_analytics::cutoff_month_index(year, state.reference);

    match state.pipeline.account(&id, year, cutoff) {
        Some(detail) => (StatusCode::OK, Json(ApiResponse::ok(detail))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(format!("BEL not found: {}", id))),
        )
            .into_response(),
    }
}

/// GET /api/export.csv - Full filtered, sorted result as a CSV download
async fn get_export(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Response {
    let query = match state.resolve(&params) {
        Ok(query) => query,
        Err(e) => return bad_request(e),
    };

    let rows = state.pipeline.rows(&query);
    match export::to_csv_string(&rows) {
        Ok(body) => {
            let filename = export::export_filename(&query.filter, state.reference);
            info!(rows = rows.len(), %filename, "csv export served");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
                ],
                body,
            )
                .into_response()
        }
        Err(ExportError::Empty) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::<()>::error(ExportError::Empty.to_string())),
        )
            .into_response(),
        Err(e) => {
            error!("Error exporting leaderboard: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/issues - Validation report of the loaded snapshot
async fn get_issues(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.pipeline.store();
    let report = store.report();

    let response = IssuesResponse {
        fingerprint: store.fingerprint().to_string(),
        loaded: report.loaded,
        quarantined: report.quarantined.clone(),
        counts: report
            .counts_by_kind()
            .into_iter()
            .map(|(kind, count)| (kind.as_str().to_string(), count))
            .collect(),
        issues: report.issues.clone(),
    };
    Json(ApiResponse::ok(response))
}

// ============================================================================
// Router
// ============================================================================

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/leaderboard", get(get_leaderboard))
        .route("/summary", get(get_summary))
        .route("/accounts/:id", get(get_account))
        .route("/export.csv", get(get_export))
        .route("/issues", get(get_issues))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

/// Read and validate the dataset before anything can query it
async fn load_store(path: &std::path::Path) -> Result<DataStore> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let store = DataStore::from_json_str(&content).context("Failed to parse dataset")?;
    Ok(store)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(addr) = args.addr {
        config.server_addr = addr;
    }
    logging::init(config.log_level.as_deref());

    info!("🌐 BEL Analytics - Web Server");

    let store = load_store(&config.data_path).await?;
    if !store.report().is_clean() {
        warn!("{}", store.report().summary());
    }
    info!(bels = store.len(), fingerprint = %store.fingerprint(), "✓ Dataset loaded");

    let state = AppState {
        pipeline: Arc::new(Pipeline::new(Arc::new(store))),
        reference: config.reference_date(),
        default_page_size: config.default_page_size,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    info!("🚀 Server running on http://{}", config.server_addr);
    info!("   API: http://{}/api/leaderboard", config.server_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const DATASET: &str = r#"{
        "leaderboard": [
            {"id": "KTWADVANT", "name": "Maxwell Walker", "level": "Exploder",
             "monthlyData": {"2025": {"January": {"clicks": 100, "orders": 4, "revenue": 400.0},
                                      "October": {"clicks": 900, "orders": 90, "revenue": 9000.0}}}},
            {"id": "KDEIMULER", "name": "Liam Muller", "level": "Builder",
             "monthlyData": {"2025": {"February": {"clicks": 50, "orders": 1, "revenue": 80.0}}}},
            {"id": "KXXNOWHER", "name": "Nobody", "level": "Leader",
             "monthlyData": {"2025": {"March": {"clicks": 10, "revenue": 5.0}}}}
        ]
    }"#;

    fn app() -> Router {
        let store = DataStore::from_json_str(DATASET).expect("valid dataset");
        router(AppState {
            pipeline: Arc::new(Pipeline::new(Arc::new(store))),
            reference: NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date"),
            default_page_size: 10,
        })
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_leaderboard_applies_cutoff_and_sort() {
        let (status, body) = get_json("/api/leaderboard?sort=revenue&direction=desc").await;
        assert_eq!(status, StatusCode::OK);
        let items = body["data"]["items"].as_array().expect("items");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], "KTWADVANT");
        // October is past the cutoff
        assert_eq!(items[0]["metrics"]["clicks"], 100);
        assert_eq!(body["data"]["total_pages"], 1);
    }

    #[tokio::test]
    async fn test_leaderboard_filter_and_page_clamp() {
        let (_, body) = get_json("/api/leaderboard?region=Others&page=7&page_size=1").await;
        let data = &body["data"];
        assert_eq!(data["page_index"], 0);
        assert_eq!(data["items"][0]["id"], "KXXNOWHER");
    }

    #[tokio::test]
    async fn test_dataset_region_labels_are_accepted() {
        let (status, body) = get_json("/api/leaderboard?region=Taiwan").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_items"], 1);
        assert_eq!(body["data"]["items"][0]["region"], "Taiwan");

        let (status, body) = get_json("/api/leaderboard?region=AAU%20%2F%20NZ").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_items"], 0);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_bad_request() {
        let (status, body) = get_json("/api/leaderboard?level=Champion").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_summary_uses_summed_totals() {
        let (_, body) = get_json("/api/summary").await;
        let metrics = &body["data"]["summary"]["metrics"];
        assert_eq!(metrics["clicks"], 160);
        assert_eq!(metrics["orders"], 5);
        assert_eq!(body["data"]["by_level"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn test_account_detail_and_missing_account() {
        let (status, body) = get_json("/api/accounts/KDEIMULER").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["monthly"].as_array().map(Vec::len), Some(8));

        let (status, _) = get_json("/api/accounts/KNOBODY00").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_issues_report() {
        let (_, body) = get_json("/api/issues").await;
        let counts = &body["data"]["counts"];
        assert_eq!(counts["UnknownRegionCode"], 1);
        assert_eq!(counts["MalformedRecord"], 1);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let response = app()
            .oneshot(Request::builder().uri("/api/export.csv?level=Builder").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap_or_default().to_string();
        assert!(disposition.contains("BEL_Performance_Leaderboard_2025-09-08_level_Builder.csv"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap_or_default().starts_with("KDEIMULER,Liam Muller,Builder,50,1,80.00"));
    }

    #[tokio::test]
    async fn test_empty_export_is_rejected() {
        let response = app()
            .oneshot(Request::builder().uri("/api/export.csv?region=Europe&level=Leader").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

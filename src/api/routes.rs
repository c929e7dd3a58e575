use crate::analyzer::aggregator::{AggregateStats, compute_stats};
use crate::analyzer::chart::{ChartDataset, Granularity, build_chart_dataset};
use crate::analyzer::clock::day_window;
use crate::analyzer::insights::generate_insights;
use crate::analyzer::profile::{HOURS_PER_DAY, hourly_buckets, hourly_intensity, hourly_minutes};
use crate::analyzer::session::{LogAnomalies, SessionRecord, parse_session_log};
use crate::analyzer::{Dashboard, build_dashboard};
use crate::config::Config;
use crate::db::{Database, SessionStore};
use crate::export::csv::export_csv;
use crate::export::png::render_timeline_png;
use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path as FsPath;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/stats", get(stats))
        .route("/api/v1/heatmap", get(heatmap))
        .route("/api/v1/insights", get(insights))
        .route("/api/v1/chart/:granularity", get(chart))
        .route("/api/v1/sessions", get(sessions_list).post(sessions_append))
        .route("/api/v1/export/csv", get(export_csv_download))
        .route("/api/v1/export/timeline.png", get(export_timeline_png))
        .route("/api/v1/reports", get(report_list))
        .route("/api/v1/report/:date", get(report_by_date))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct NowQuery {
    now: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct HeatmapQuery {
    now: Option<i64>,
    hour: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TimelineQuery {
    now: Option<i64>,
    granularity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReportsQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    sessions: i64,
    last_session_end: Option<i64>,
    latest_report_date: Option<String>,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct HeatmapPayload {
    now: i64,
    intensity: [u8; HOURS_PER_DAY],
    minutes: [f64; HOURS_PER_DAY],
    #[serde(skip_serializing_if = "Option::is_none")]
    hour_minutes: Option<f64>,
}

#[derive(Debug, Serialize)]
struct InsightsPayload {
    now: i64,
    insights: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SessionsPayload {
    from: Option<String>,
    to: Option<String>,
    count: usize,
    sessions: Vec<SessionRecord>,
}

#[derive(Debug, Serialize)]
struct AppendPayload {
    accepted: usize,
    rejected: usize,
    anomalies: LogAnomalies,
}

#[derive(Debug, Serialize)]
struct ReportView {
    date: String,
    generated_at: i64,
    json_url: String,
}

#[derive(Debug, Serialize)]
struct ReportsPayload {
    reports: Vec<ReportView>,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = Database::open(&state.config.db_path)?;

    let payload = StatusPayload {
        sessions: database.session_count()?,
        last_session_end: database.latest_session_end()?,
        latest_report_date: database.latest_report_meta()?.map(|meta| meta.date),
        api_port: state.config.api_port,
    };

    Ok(Json(payload))
}

async fn dashboard(
    State(state): State<ApiState>,
    Query(query): Query<NowQuery>,
) -> ApiResult<Json<Dashboard>> {
    let now = resolve_now(query.now)?;
    let sessions = load_sessions(&state)?;

    Ok(Json(build_dashboard(&sessions, &now)))
}

async fn stats(
    State(state): State<ApiState>,
    Query(query): Query<NowQuery>,
) -> ApiResult<Json<AggregateStats>> {
    let now = resolve_now(query.now)?;
    let sessions = load_sessions(&state)?;

    Ok(Json(compute_stats(&sessions, &now)))
}

async fn heatmap(
    State(state): State<ApiState>,
    Query(query): Query<HeatmapQuery>,
) -> ApiResult<Json<HeatmapPayload>> {
    let now = resolve_now(query.now)?;
    let sessions = load_sessions(&state)?;

    let hour_minutes = match query.hour {
        Some(hour) if hour as usize >= HOURS_PER_DAY => {
            return Err(ApiError::BadRequest(format!("Hour out of range: {hour}")));
        }
        Some(hour) => Some(hourly_minutes(&sessions, &Local, hour)),
        None => None,
    };

    Ok(Json(HeatmapPayload {
        now: now.timestamp_millis(),
        intensity: hourly_intensity(&sessions, &Local),
        minutes: hourly_buckets(&sessions, &Local),
        hour_minutes,
    }))
}

async fn insights(
    State(state): State<ApiState>,
    Query(query): Query<NowQuery>,
) -> ApiResult<Json<InsightsPayload>> {
    let now = resolve_now(query.now)?;
    let sessions = load_sessions(&state)?;
    let stats = compute_stats(&sessions, &now);

    Ok(Json(InsightsPayload {
        now: now.timestamp_millis(),
        insights: generate_insights(&sessions, &stats, &Local),
    }))
}

async fn chart(
    State(state): State<ApiState>,
    Path(granularity): Path<String>,
    Query(query): Query<NowQuery>,
) -> ApiResult<Json<ChartDataset>> {
    let granularity = parse_granularity(&granularity)?;
    let now = resolve_now(query.now)?;
    let sessions = load_sessions(&state)?;

    Ok(Json(build_chart_dataset(&sessions, granularity, &now)))
}

async fn sessions_list(
    State(state): State<ApiState>,
    Query(query): Query<SessionsQuery>,
) -> ApiResult<Json<SessionsPayload>> {
    let from = query.from.as_deref().map(parse_date).transpose()?;
    let to = query.to.as_deref().map(parse_date).transpose()?;
    let sessions = sessions_between(load_sessions(&state)?, &Local, from, to);

    Ok(Json(SessionsPayload {
        from: from.map(|date| date.format("%Y-%m-%d").to_string()),
        to: to.map(|date| date.format("%Y-%m-%d").to_string()),
        count: sessions.len(),
        sessions,
    }))
}

async fn sessions_append(
    State(state): State<ApiState>,
    body: String,
) -> ApiResult<(StatusCode, Json<AppendPayload>)> {
    let (sessions, anomalies) = parse_session_log(&body);
    if sessions.is_empty() && anomalies.rejected() == 0 {
        return Err(ApiError::BadRequest(
            "Body must be a session array or an object with a sessions array".to_string(),
        ));
    }

    let mut database = Database::open(&state.config.db_path)?;
    database.append_sessions(&sessions)?;
    info!(
        accepted = sessions.len(),
        rejected = anomalies.rejected(),
        "sessions appended over HTTP"
    );

    Ok((
        StatusCode::CREATED,
        Json(AppendPayload {
            accepted: sessions.len(),
            rejected: anomalies.rejected(),
            anomalies,
        }),
    ))
}

async fn export_csv_download(State(state): State<ApiState>) -> ApiResult<Response> {
    let sessions = load_sessions(&state)?;
    let content = export_csv(&sessions, &Local);

    attachment(
        content.into_bytes(),
        "text/csv; charset=utf-8",
        "pomodoro-sessions.csv",
    )
}

async fn export_timeline_png(
    State(state): State<ApiState>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Response> {
    let granularity = query
        .granularity
        .as_deref()
        .map(parse_granularity)
        .transpose()?
        .unwrap_or(Granularity::Daily);
    let now = resolve_now(query.now)?;
    let sessions = load_sessions(&state)?;

    let dataset = build_chart_dataset(&sessions, granularity, &now);
    let bytes = render_timeline_png(&dataset)
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;
    let filename = format!("timeline-{}.png", now.format("%Y-%m-%d"));

    attachment(bytes, "image/png", &filename)
}

async fn report_list(
    State(state): State<ApiState>,
    Query(query): Query<ReportsQuery>,
) -> ApiResult<Json<ReportsPayload>> {
    let limit = query.limit.unwrap_or(7).clamp(1, 90);
    let database = Database::open(&state.config.db_path)?;
    let reports = database
        .list_reports(limit)?
        .into_iter()
        .map(|meta| ReportView {
            json_url: format!("/api/v1/report/{}", meta.date),
            date: meta.date,
            generated_at: meta.generated_at,
        })
        .collect::<Vec<_>>();

    Ok(Json(ReportsPayload { reports }))
}

async fn report_by_date(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Value>> {
    let target_date = parse_date(&date)?;

    let database = Database::open(&state.config.db_path)?;
    let report_meta = database.report_meta(target_date)?.ok_or_else(|| {
        ApiError::NotFound(format!("No report found for date: {target_date}"))
    })?;

    let report = load_json(FsPath::new(&report_meta.json_path))?;
    Ok(Json(report))
}

fn load_sessions(state: &ApiState) -> Result<Vec<SessionRecord>> {
    Database::open(&state.config.db_path)?.load_sessions()
}

fn resolve_now(now: Option<i64>) -> ApiResult<DateTime<Local>> {
    match now {
        None => Ok(Local::now()),
        Some(value) => Local
            .timestamp_millis_opt(value)
            .single()
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid now timestamp: {value}"))),
    }
}

fn parse_granularity(raw: &str) -> ApiResult<Granularity> {
    raw.parse::<Granularity>()
        .map_err(|error| ApiError::BadRequest(error.to_string()))
}

fn parse_date(input: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!(
            "Invalid date format: {input}. Example: 2026-02-18"
        ))
    })
}

/// Records starting inside the local days `from..=to`; open ends are unbounded.
fn sessions_between<Tz: TimeZone>(
    sessions: Vec<SessionRecord>,
    tz: &Tz,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<SessionRecord> {
    let lower = from.map(|date| day_window(tz, date).start_ms);
    let upper = to.map(|date| day_window(tz, date).end_ms);

    sessions
        .into_iter()
        .filter(|session| lower.is_none_or(|start| session.start >= start))
        .filter(|session| upper.is_none_or(|end| session.start < end))
        .collect()
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> ApiResult<Response> {
    let mut response = Response::new(bytes.into_response().into_body());
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))?,
    );

    Ok(response)
}

fn load_json(path: &FsPath) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report JSON file: {}", path.display()))?;

    let payload = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report JSON file: {}", path.display()))?;

    Ok(payload)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{error:#}") })),
            )
                .into_response(),
        }
    }
}

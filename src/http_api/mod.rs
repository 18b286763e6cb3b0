use std::{collections::BTreeMap, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::context::{EntryView, RenderContext, SourceInfo, build_context, select_entries};
use crate::course_code::parse_course_codes;
use crate::persistence::{PersistenceError, TimetableStore};
use crate::registry::{TemplateDescriptor, TemplateKind};
use crate::render::{DocumentFormat, RenderError, TimetableRenderer};
use crate::source::{SourceStatus, TimetableSource};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn TimetableStore>,
    renderer: Arc<TimetableRenderer>,
}

impl AppState {
    pub fn new(store: Arc<dyn TimetableStore>, renderer: TimetableRenderer) -> Self {
        Self {
            store,
            renderer: Arc::new(renderer),
        }
    }

    pub fn with_shared(store: Arc<dyn TimetableStore>, renderer: Arc<TimetableRenderer>) -> Self {
        Self { store, renderer }
    }

    fn store(&self) -> Arc<dyn TimetableStore> {
        self.store.clone()
    }

    fn renderer(&self) -> Arc<TimetableRenderer> {
        self.renderer.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::SourceNotFound(id) => {
                ApiError::not_found(format!("timetable source {id} not found"))
            }
            other => {
                tracing::error!(error = %other, "storage failure");
                ApiError::internal(other.to_string())
            }
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(value: RenderError) -> Self {
        tracing::error!(error = %value, "rendering failed");
        ApiError::internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

/// Query string shared by the download and preview endpoints.
#[derive(Debug, Default, Deserialize)]
struct DocumentQuery {
    source_id: Option<String>,
    codes: Option<String>,
    template: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CourseCodesInput {
    Text(String),
    List(Vec<String>),
}

impl CourseCodesInput {
    fn parse(&self) -> Vec<String> {
        match self {
            CourseCodesInput::Text(text) => parse_course_codes(text),
            CourseCodesInput::List(codes) => parse_course_codes(&codes.join(",")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratePayload {
    source_id: i64,
    course_codes: CourseCodesInput,
    #[serde(default)]
    template: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    source: SourceInfo,
    template: TemplateDescriptor,
    course_codes: Vec<String>,
    days_of_week: Vec<&'static str>,
    schedule: BTreeMap<&'static str, Vec<EntryView>>,
    colors: BTreeMap<String, &'static str>,
    event_count: usize,
    pdf_url: String,
    jpg_url: String,
    preview_url: String,
}

/// A validated document request.
struct Selection {
    source_id: i64,
    codes: Vec<String>,
    template: TemplateKind,
}

impl Selection {
    fn from_query(query: DocumentQuery) -> Result<Self, ApiError> {
        let raw_id = query
            .source_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::invalid("source_id is required"))?;
        let source_id = raw_id
            .parse::<i64>()
            .map_err(|_| ApiError::invalid(format!("source_id '{raw_id}' is not a number")))?;
        let codes = parse_course_codes(query.codes.as_deref().unwrap_or_default());
        Self::new(source_id, codes, query.template.as_deref())
    }

    fn new(source_id: i64, codes: Vec<String>, template: Option<&str>) -> Result<Self, ApiError> {
        if codes.is_empty() {
            return Err(ApiError::invalid("at least one course code is required"));
        }
        Ok(Self {
            source_id,
            codes,
            template: TemplateKind::resolve(template),
        })
    }

    fn query_string(&self) -> Result<String, ApiError> {
        serde_urlencoded::to_string(DocumentLink {
            source_id: self.source_id,
            codes: self.codes.join(","),
            template: self.template.key(),
        })
        .map_err(|err| ApiError::internal(format!("could not build document link: {err}")))
    }
}

/// Query string written into the links returned by `/generate`.
#[derive(Serialize)]
struct DocumentLink {
    source_id: i64,
    codes: String,
    template: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/templates", get(list_templates))
        .route("/timetables", get(list_timetables))
        .route("/timetables/:id", get(get_timetable))
        .route("/generate", post(generate))
        .route("/download-timetable/", get(download_pdf))
        .route("/download-timetable-jpg/", get(download_jpg))
        .route("/preview-timetable/", get(preview))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "timeli HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_templates(State(state): State<AppState>) -> Json<Vec<TemplateDescriptor>> {
    Json(state.renderer().registry().descriptors().to_vec())
}

async fn list_timetables(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimetableSource>>, ApiError> {
    let sources = state.store().list_sources(Some(SourceStatus::Completed))?;
    Ok(Json(sources))
}

async fn get_timetable(
    State(state): State<AppState>,
    source_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<TimetableSource>, ApiError> {
    let Path(source_id) = source_id.map_err(|err| ApiError::invalid(err.body_text()))?;
    Ok(Json(find_source(&state, source_id)?))
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePayload>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(payload) = payload.map_err(|err| ApiError::invalid(err.body_text()))?;
    let selection = Selection::new(
        payload.source_id,
        payload.course_codes.parse(),
        payload.template.as_deref(),
    )?;
    let context = selected_context(&state, &selection)?;
    let query = selection.query_string()?;

    Ok(Json(GenerateResponse {
        source: context.source,
        template: state.renderer().registry().descriptor(selection.template).clone(),
        course_codes: selection.codes,
        days_of_week: context.days_of_week,
        schedule: context.schedule,
        colors: context.colors,
        event_count: context.event_count,
        pdf_url: format!("/download-timetable/?{query}"),
        jpg_url: format!("/download-timetable-jpg/?{query}"),
        preview_url: format!("/preview-timetable/?{query}"),
    }))
}

async fn download_pdf(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response, ApiError> {
    document_response(state, query, DocumentFormat::Pdf).await
}

async fn download_jpg(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response, ApiError> {
    document_response(state, query, DocumentFormat::Jpg).await
}

async fn preview(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response, ApiError> {
    document_response(state, query, DocumentFormat::Html).await
}

fn find_source(state: &AppState, source_id: i64) -> Result<TimetableSource, ApiError> {
    state
        .store()
        .find_source(source_id)?
        .ok_or_else(|| ApiError::not_found(format!("timetable source {source_id} not found")))
}

fn selected_context(state: &AppState, selection: &Selection) -> Result<RenderContext, ApiError> {
    let source = find_source(state, selection.source_id)?;
    let events = state.store().events_for_source(source.id)?;
    let selected = select_entries(&events, &selection.codes);
    tracing::debug!(
        source_id = source.id,
        codes = ?selection.codes,
        matched = selected.len(),
        template = %selection.template,
        "building render context"
    );
    Ok(build_context(
        &selected,
        SourceInfo::from(&source),
        selection.template,
    ))
}

async fn document_response(
    state: AppState,
    query: DocumentQuery,
    format: DocumentFormat,
) -> Result<Response, ApiError> {
    let selection = Selection::from_query(query)?;
    let context = selected_context(&state, &selection)?;
    let renderer = state.renderer();

    // The converter runs an external process.
    let document =
        tokio::task::spawn_blocking(move || renderer.render_document(&context, format))
            .await
            .map_err(|err| ApiError::internal(format!("render task failed: {err}")))??;

    let disposition = match format {
        DocumentFormat::Html => format!("inline; filename=\"{}\"", document.filename),
        _ => format!("attachment; filename=\"{}\"", document.filename),
    };
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|err| ApiError::internal(format!("invalid filename header: {err}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(document.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}

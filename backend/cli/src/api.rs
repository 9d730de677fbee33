use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::fs;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use altforge_core::{AltError, HeaderInfo, ImageFetcher, RowTask, Table, TableStore, TextGenerator};
use altforge_engine::{
    classify, describe_rows, edits_to_writes, label_write, locate, ClassifyMode, DescriptionEdit,
    DescriptionPolicy,
};
use altforge_sheets::{parse_csv, CsvFileStore};

/// Served by `GET /api/sample`.
const SAMPLE_CSV: &str = "id,product_name,image_url,alt_text\n\
1,Oak dining chair,https://images.example.com/chair.jpg,\n\
2,Linen table runner,https://images.example.com/runner.jpg,\n";

/// Shared application state for API handlers. Read-only after startup.
pub struct AppState {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub policy: DescriptionPolicy,
    pub fetcher: Arc<dyn ImageFetcher>,
    /// `Err` holds the reason generation is unavailable (missing key).
    pub generator: Result<Arc<dyn TextGenerator>, String>,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sample", get(sample))
        .route("/api/upload", post(upload))
        .route("/api/generate", post(generate))
        .route("/api/download", post(download))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        error!(error = %err, "{context}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {err}"))
    }
}

impl From<AltError> for ApiError {
    fn from(err: AltError) -> Self {
        let status = match &err {
            AltError::NoImageColumnFound { .. } => StatusCode::BAD_REQUEST,
            AltError::ConfigurationMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            AltError::Storage(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Reduce a client-supplied name to `[A-Za-z0-9._-]`, without leading dots.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']).to_string();
    if cleaned.is_empty() { "upload.csv".to_string() } else { cleaned }
}

/// Locate a previously uploaded file; names are never allowed to leave the upload dir.
async fn resolve_upload(upload_dir: &Path, filename: &str) -> Result<PathBuf, ApiError> {
    if filename.is_empty() || sanitize_filename(filename) != filename {
        return Err(ApiError::bad_request("Invalid filename"));
    }
    let path = upload_dir.join(filename);
    match fs::try_exists(&path).await {
        Ok(true) => Ok(path),
        _ => Err(ApiError::new(StatusCode::NOT_FOUND, "File not found")),
    }
}

async fn read_uploaded_table(path: &Path) -> Result<Table, ApiError> {
    let bytes = fs::read(path).await.map_err(|e| ApiError::internal("Failed to read upload", e))?;
    Ok(parse_csv(&bytes)?)
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "altforge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Example spreadsheet layout.
async fn sample() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"sample_format.csv\""),
        ],
        SAMPLE_CSV,
    )
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub header: HeaderInfo,
    pub rows: Vec<RowTask>,
    pub message: String,
}

/// Store a CSV upload and list the rows carrying image references.
async fn upload(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let original = query.filename.unwrap_or_default();
    if original.trim().is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }
    if !original.to_lowercase().ends_with(".csv") {
        return Err(ApiError::bad_request("Please upload a CSV file (.csv)"));
    }
    if body.is_empty() {
        return Err(ApiError::bad_request("No file provided"));
    }

    let stored = format!("{}_{}", Uuid::new_v4(), sanitize_filename(&original));
    fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::internal("Failed to create upload directory", e))?;
    let path = state.upload_dir.join(&stored);
    fs::write(&path, &body).await.map_err(|e| ApiError::internal("Failed to store upload", e))?;

    let result = inspect_upload(&body);
    let (header, rows) = match result {
        Ok(found) => found,
        Err(e) => {
            if let Err(rm) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %rm, "Failed to remove rejected upload");
            }
            return Err(e);
        }
    };

    info!(filename = %stored, rows = rows.len(), "Upload accepted");
    Ok(Json(UploadResponse {
        success: true,
        message: format!("File uploaded successfully. Found {} rows.", rows.len()),
        filename: stored,
        header,
        rows,
    }))
}

fn inspect_upload(body: &[u8]) -> Result<(HeaderInfo, Vec<RowTask>), ApiError> {
    let table = parse_csv(body)?;
    let header = locate(&table)?;
    let rows: Vec<RowTask> = classify(&table, &header, ClassifyMode::Upload).collect();
    if rows.is_empty() {
        return Err(ApiError::bad_request("No data rows with image references found"));
    }
    Ok((header, rows))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub filename: String,
    #[serde(default, alias = "row_indices")]
    pub row_indices: Vec<usize>,
}

/// Describe the requested rows of an upload, one outcome per row.
async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.filename.is_empty() || request.row_indices.is_empty() {
        return Err(ApiError::bad_request("Missing filename or row indices"));
    }
    let generator = state
        .generator
        .as_ref()
        .map_err(|reason| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, reason.clone()))?;

    let path = resolve_upload(&state.upload_dir, &request.filename).await?;
    let table = read_uploaded_table(&path).await?;
    let header = locate(&table)?;

    let results = describe_rows(
        &table,
        &header,
        &request.row_indices,
        state.fetcher.as_ref(),
        generator.as_ref(),
        &state.policy,
    )
    .await;
    let described = results.iter().filter(|r| r.success).count();
    info!(filename = %request.filename, requested = results.len(), described, "Generated descriptions");

    Ok(Json(json!({ "success": true, "results": results })))
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub data: Vec<DescriptionEdit>,
}

/// Write the supplied descriptions into a copy of the upload and return it.
async fn download(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DownloadRequest>,
) -> Result<Response, ApiError> {
    if request.filename.is_empty() || request.data.is_empty() {
        return Err(ApiError::bad_request("Missing filename or data"));
    }
    let source = resolve_upload(&state.upload_dir, &request.filename).await?;
    let output_name = format!("updated_{}", request.filename);
    let store = CsvFileStore::new(source).with_output(state.output_dir.join(&output_name));

    let table = store.read_table().await?;
    let located = locate(&table)?;
    let edits = edits_to_writes(&table, &located, &request.data, &state.policy);
    if !edits.skipped.is_empty() {
        warn!(filename = %request.filename, rows = ?edits.skipped, "Ignored edits for rows outside the table");
    }
    let batch: Vec<_> = if edits.writes.is_empty() {
        Vec::new()
    } else {
        label_write(&located).into_iter().chain(edits.writes).collect()
    };
    store.batch_write(&batch).await?;

    let bytes = fs::read(store.output())
        .await
        .map_err(|e| ApiError::internal("Failed to read generated file", e))?;
    info!(filename = %output_name, cells = batch.len(), "Prepared download");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{output_name}\"")),
        ],
        bytes,
    )
        .into_response())
}

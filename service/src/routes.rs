use std::collections::HashMap;
use std::path::Path;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Form, Multipart, Path as UrlPath, Query, State,
        rejection::{FormRejection, JsonRejection, QueryRejection},
    },
    http::{
        HeaderValue, Method, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use dataset_core::TableFormat;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::ConfigError;
use crate::error::DatasetError;
use crate::lifecycle::{ProjectLifecycle, UploadRequest};
use crate::model::ProjectSettings;
use crate::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn router(state: AppState) -> Result<Router, ConfigError> {
    let origin = HeaderValue::from_str(&state.config.cors_origin)
        .map_err(|_| ConfigError::InvalidCorsOrigin(state.config.cors_origin.clone()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes());

    let project = Router::new()
        .route("/upload_dataset", post(upload_dataset))
        .route("/update_project/{project_id}", put(update_project))
        .route("/delete_project/{project_id}", delete(delete_project))
        .route("/get_projects/{user_id}", get(get_projects))
        .route("/get_project_data/{project_id}", get(get_project_data))
        .route("/get_versions/{project_id}", get(get_versions))
        .route("/download_file/{*file_path}", get(download_file));

    let dataset = Router::new()
        .route("/get_column_names", get(get_column_names))
        .route("/update_column_names", post(update_column_names))
        .route("/partition_by_tags", post(partition_by_tags))
        .route("/get_tag_summary", get(get_tag_summary));

    Ok(Router::new()
        .route("/health", get(health))
        .nest("/api/v1/project", project)
        .nest("/api/v1/dataset", dataset)
        .with_state(state)
        .layer(body_limit)
        .layer(cors))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn upload_dataset(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut name = String::new();
    let mut user_id = String::new();
    let mut remove_duplicates = false;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                file = Some((filename, bytes.to_vec()));
            }
            "name" => name = field.text().await.map_err(malformed)?,
            "user_id" => user_id = field.text().await.map_err(malformed)?,
            "remove_duplicates" => {
                remove_duplicates = parse_flag(&field.text().await.map_err(malformed)?)
            }
            _ => {}
        }
    }

    let Some((filename, bytes)) = file else {
        return Err(validation("No file part in the request"));
    };
    if filename.trim().is_empty() {
        return Err(validation("No file selected"));
    }

    let request = UploadRequest {
        name,
        user_id,
        filename,
        bytes,
        remove_duplicates,
    };
    let outcome = run(&state, move |lifecycle| lifecycle.ingest(request)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "File uploaded and project created successfully",
            "project_id": outcome.project_id,
            "v0_id": outcome.v0_id,
            "v1_id": outcome.v1_id,
        })),
    ))
}

async fn update_project(
    State(state): State<AppState>,
    UrlPath(project_id): UrlPath<String>,
    payload: Result<Json<ProjectSettings>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(settings) = payload.map_err(|err| validation(err.body_text()))?;
    let project = run(&state, move |lifecycle| {
        lifecycle.update_project(&project_id, &settings)
    })
    .await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Project updated successfully",
        "project": project,
    })))
}

async fn delete_project(
    State(state): State<AppState>,
    UrlPath(project_id): UrlPath<String>,
) -> Result<Json<Value>, AppError> {
    run(&state, move |lifecycle| lifecycle.delete_project(&project_id)).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Project deleted successfully",
    })))
}

async fn get_projects(
    State(state): State<AppState>,
    UrlPath(user_id): UrlPath<String>,
) -> Result<Json<Value>, AppError> {
    let projects = run(&state, move |lifecycle| lifecycle.list_projects(&user_id)).await?;
    Ok(Json(json!({ "projects": projects })))
}

async fn get_project_data(
    State(state): State<AppState>,
    UrlPath(project_id): UrlPath<String>,
) -> Result<Json<Value>, AppError> {
    let preview = run(&state, move |lifecycle| lifecycle.project_data(&project_id)).await?;
    Ok(Json(json!(preview)))
}

async fn get_versions(
    State(state): State<AppState>,
    UrlPath(project_id): UrlPath<String>,
) -> Result<Json<Value>, AppError> {
    let versions = run(&state, move |lifecycle| lifecycle.versions(&project_id)).await?;
    Ok(Json(json!({ "versions": versions })))
}

async fn download_file(
    State(state): State<AppState>,
    UrlPath(file_path): UrlPath<String>,
) -> Result<Response, AppError> {
    let file = run(&state, move |lifecycle| lifecycle.download(&file_path)).await?;
    let content_type = match TableFormat::from_path(Path::new(&file.file_name)) {
        Ok(TableFormat::Csv) => "text/csv",
        Ok(TableFormat::Xlsx) => XLSX_CONTENT_TYPE,
        Err(_) => "application/octet-stream",
    };
    let disposition = format!("attachment; filename=\"{}\"", file.file_name.replace('"', ""));
    Ok((
        [(CONTENT_TYPE, content_type.to_string()), (CONTENT_DISPOSITION, disposition)],
        file.bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct ProjectQuery {
    project_id: Option<String>,
}

impl ProjectQuery {
    fn project_id(self) -> Result<String, AppError> {
        self.project_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| validation("missing required field: project_id"))
    }
}

async fn get_column_names(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query.map_err(|err| validation(err.body_text()))?;
    let project_id = query.project_id()?;
    let columns = run(&state, move |lifecycle| lifecycle.column_names(&project_id)).await?;
    Ok(Json(json!({ "column_names": columns })))
}

async fn get_tag_summary(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query.map_err(|err| validation(err.body_text()))?;
    let project_id = query.project_id()?;
    let tags = run(&state, move |lifecycle| lifecycle.tag_summary(&project_id)).await?;
    Ok(Json(json!({ "tags": tags })))
}

#[derive(Debug, Deserialize)]
struct RenameForm {
    project_id: Option<String>,
    mapped_columns: Option<String>,
}

async fn update_column_names(
    State(state): State<AppState>,
    form: Result<Form<RenameForm>, FormRejection>,
) -> Result<Json<Value>, AppError> {
    let Form(form) = form.map_err(|err| validation(err.body_text()))?;
    let project_id = ProjectQuery {
        project_id: form.project_id,
    }
    .project_id()?;
    let raw = form
        .mapped_columns
        .ok_or_else(|| validation("missing required field: mapped_columns"))?;
    let mapping = parse_mapping(&raw)?;

    let outcome = run(&state, move |lifecycle| {
        lifecycle.rename_columns(&project_id, &mapping)
    })
    .await?;
    info!(project_id = %outcome.project_id, "column names updated");
    Ok(Json(json!({
        "status": "success",
        "message": "Column names updated successfully",
        "version_id": outcome.version_id,
        "file_path": outcome.file_path,
        "column_names": outcome.columns,
        "unmatched_columns": outcome.unmatched_columns,
    })))
}

#[derive(Debug, Deserialize)]
struct PartitionBody {
    project_id: Option<String>,
}

async fn partition_by_tags(
    State(state): State<AppState>,
    payload: Result<Json<PartitionBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload.map_err(|err| validation(err.body_text()))?;
    let project_id = ProjectQuery {
        project_id: body.project_id,
    }
    .project_id()?;
    let outcome = run(&state, move |lifecycle| lifecycle.partition_by_tags(&project_id)).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Dataset partitioned by tags successfully",
        "project_id": outcome.project_id,
        "sub_versions": outcome.partitions,
    })))
}

/// Runs a lifecycle operation on the blocking pool; file and SQLite I/O
/// are synchronous.
async fn run<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&ProjectLifecycle<'_>) -> Result<T, DatasetError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || op(&state.lifecycle()))
        .await
        .map_err(|err| AppError::Internal(format!("worker task failed: {err}")))?
        .map_err(AppError::from)
}

/// `old -> new` column mapping; `null` targets mean "keep the old name".
fn parse_mapping(raw: &str) -> Result<HashMap<String, String>, AppError> {
    let parsed: HashMap<String, Option<String>> = serde_json::from_str(raw)
        .map_err(|err| validation(format!("mapped_columns is not a JSON object of strings: {err}")))?;
    Ok(parsed
        .into_iter()
        .map(|(old, new)| (old, new.unwrap_or_default()))
        .collect())
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn validation(message: impl Into<String>) -> AppError {
    AppError::Dataset(DatasetError::Validation(message.into()))
}

fn malformed(err: axum::extract::multipart::MultipartError) -> AppError {
    validation(format!("malformed multipart body: {}", err.body_text()))
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Dataset(err) => match err {
                DatasetError::Validation(_)
                | DatasetError::UnsupportedFormat(_)
                | DatasetError::MissingColumn(_)
                | DatasetError::NameCollision(_) => StatusCode::BAD_REQUEST,
                DatasetError::NotFound(_) => StatusCode::NOT_FOUND,
                DatasetError::ReadFailure(_)
                | DatasetError::StoreFailure(_)
                | DatasetError::PartialFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Dataset(err) => err.code(),
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        error!(status = status.as_u16(), code = self.code(), "request error: {}", message);
        (
            status,
            Json(json!({"error": message, "code": self.code()})),
        )
            .into_response()
    }
}

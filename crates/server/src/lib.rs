use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use server_api::{
    create_conversation, create_directory, delete_conversation, delete_directory, health,
    list_directories, list_directory_files, read_conversation, rename_files_to_sequence,
    save_conversation, workspace_path,
};
use shared::{
    domain::{Conversation, FileIdentifier},
    error::{ApiError, ErrorCode},
    protocol::{
        CreateDirectoryResponse, DeleteFileRequest, DirectoryListResponse, DirectoryRequest,
        FileListResponse, FileQuery, HealthResponse, NewFileRequest, NewFileResponse,
        RenameFilesRequest, SaveFileRequest, StatusResponse, WorkspaceResponse,
        DIRECTORIES_ROUTE, DIRECTORY_CREATE_ROUTE, DIRECTORY_DELETE_ROUTE, DIRECTORY_ROUTE,
        FILES_RENAME_ROUTE, FILE_NEW_ROUTE, FILE_ROUTE, HEALTH_ROUTE, WORKSPACE_ROUTE,
    },
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

mod app_state;
pub mod config;

pub use app_state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(HEALTH_ROUTE, get(http_health))
        .route(WORKSPACE_ROUTE, get(http_workspace))
        .route(DIRECTORY_ROUTE, post(http_set_directory))
        .route(
            FILE_ROUTE,
            get(http_get_file)
                .post(http_save_file)
                .delete(http_delete_file),
        )
        .route(FILE_NEW_ROUTE, post(http_create_file))
        .route(DIRECTORIES_ROUTE, get(http_list_directories))
        .route(DIRECTORY_CREATE_ROUTE, post(http_create_directory))
        .route(DIRECTORY_DELETE_ROUTE, post(http_delete_directory))
        .route(FILES_RENAME_ROUTE, post(http_rename_files))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn http_health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    health(&state.api).await.map_err(reject)?;
    Ok(Json(HealthResponse {
        status: "healthy".into(),
    }))
}

async fn http_workspace(State(state): State<Arc<AppState>>) -> Json<WorkspaceResponse> {
    Json(WorkspaceResponse {
        path: workspace_path(&state.api),
    })
}

async fn http_set_directory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DirectoryRequest>,
) -> ApiResult<FileListResponse> {
    let files = list_directory_files(&state.api, &req.path)
        .await
        .map_err(reject)?;
    Ok(Json(FileListResponse { files }))
}

async fn http_get_file(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FileQuery>,
) -> ApiResult<Conversation> {
    let conversation = read_conversation(&state.api, &FileIdentifier::new(q.path))
        .await
        .map_err(reject)?;
    Ok(Json(conversation))
}

async fn http_save_file(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveFileRequest>,
) -> ApiResult<StatusResponse> {
    save_conversation(&state.api, &req.path, &req.content)
        .await
        .map_err(reject)?;
    Ok(Json(StatusResponse::success()))
}

async fn http_delete_file(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteFileRequest>,
) -> ApiResult<StatusResponse> {
    delete_conversation(&state.api, &req.path)
        .await
        .map_err(reject)?;
    Ok(Json(StatusResponse::success()))
}

async fn http_create_file(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewFileRequest>,
) -> ApiResult<NewFileResponse> {
    let path = create_conversation(
        &state.api,
        &req.directory,
        &req.content,
        req.current_file.as_ref(),
    )
    .await
    .map_err(reject)?;
    Ok(Json(NewFileResponse { path }))
}

async fn http_list_directories(
    State(state): State<Arc<AppState>>,
) -> ApiResult<DirectoryListResponse> {
    let directories = list_directories(&state.api).await.map_err(reject)?;
    Ok(Json(DirectoryListResponse { directories }))
}

async fn http_create_directory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DirectoryRequest>,
) -> ApiResult<CreateDirectoryResponse> {
    let path = create_directory(&state.api, &req.path)
        .await
        .map_err(reject)?;
    Ok(Json(CreateDirectoryResponse {
        status: "success".into(),
        path,
    }))
}

async fn http_delete_directory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DirectoryRequest>,
) -> ApiResult<StatusResponse> {
    delete_directory(&state.api, &req.path)
        .await
        .map_err(reject)?;
    Ok(Json(StatusResponse::success()))
}

async fn http_rename_files(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenameFilesRequest>,
) -> ApiResult<FileListResponse> {
    let files = rename_files_to_sequence(&state.api, &req.directory, &req.files)
        .await
        .map_err(reject)?;
    Ok(Json(FileListResponse { files }))
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;

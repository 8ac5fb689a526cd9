use shared::{
    domain::{Conversation, DirectoryInfo, FileIdentifier},
    error::{ApiError, ErrorCode},
};
use storage::{StorageError, WorkspaceStore};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub store: WorkspaceStore,
}

impl ApiContext {
    pub fn new(store: WorkspaceStore) -> Self {
        Self { store }
    }
}

pub fn workspace_path(ctx: &ApiContext) -> String {
    ctx.store.root().display().to_string()
}

pub async fn health(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.store.health_check().await.map_err(internal)
}

pub async fn list_directory_files(
    ctx: &ApiContext,
    directory: &str,
) -> Result<Vec<FileIdentifier>, ApiError> {
    let files = ctx
        .store
        .list_files(directory)
        .await
        .map_err(storage_error)?;
    info!(%directory, count = files.len(), "listed conversation files");
    Ok(files)
}

pub async fn read_conversation(
    ctx: &ApiContext,
    path: &FileIdentifier,
) -> Result<Conversation, ApiError> {
    let conversation = ctx.store.read_file(path).await.map_err(storage_error)?;
    debug!(%path, messages = conversation.messages.len(), "loaded conversation");
    Ok(conversation)
}

pub async fn save_conversation(
    ctx: &ApiContext,
    path: &FileIdentifier,
    conversation: &Conversation,
) -> Result<(), ApiError> {
    ctx.store
        .write_file(path, conversation)
        .await
        .map_err(storage_error)?;
    info!(%path, messages = conversation.messages.len(), "saved conversation");
    Ok(())
}

pub async fn delete_conversation(ctx: &ApiContext, path: &FileIdentifier) -> Result<(), ApiError> {
    ctx.store.delete_file(path).await.map_err(storage_error)?;
    info!(%path, "deleted conversation");
    Ok(())
}

pub async fn create_conversation(
    ctx: &ApiContext,
    directory: &str,
    content: &Conversation,
    current_file: Option<&FileIdentifier>,
) -> Result<FileIdentifier, ApiError> {
    if directory.trim().is_empty() {
        return Err(ApiError::validation("directory is required"));
    }
    let path = ctx
        .store
        .create_file(directory, content, current_file)
        .await
        .map_err(storage_error)?;
    info!(%directory, %path, after = ?current_file.map(FileIdentifier::as_str), "created conversation");
    Ok(path)
}

pub async fn rename_files_to_sequence(
    ctx: &ApiContext,
    directory: &str,
    files: &[FileIdentifier],
) -> Result<Vec<FileIdentifier>, ApiError> {
    let renamed = ctx
        .store
        .renumber(directory, files)
        .await
        .map_err(storage_error)?;
    info!(%directory, count = renamed.len(), "renumbered conversation files");
    Ok(renamed)
}

pub async fn list_directories(ctx: &ApiContext) -> Result<Vec<DirectoryInfo>, ApiError> {
    let directories = ctx.store.list_directories().await.map_err(storage_error)?;
    debug!(count = directories.len(), "listed directories");
    Ok(directories)
}

pub async fn create_directory(ctx: &ApiContext, path: &str) -> Result<String, ApiError> {
    ctx.store
        .create_directory(path)
        .await
        .map_err(storage_error)?;
    info!(%path, "created directory");
    Ok(path.to_string())
}

pub async fn delete_directory(ctx: &ApiContext, path: &str) -> Result<(), ApiError> {
    ctx.store
        .delete_directory(path)
        .await
        .map_err(storage_error)?;
    info!(%path, "deleted directory");
    Ok(())
}

fn storage_error(err: anyhow::Error) -> ApiError {
    let error = match StorageError::classify(&err) {
        Some(StorageError::NotFound(message)) => ApiError::new(ErrorCode::NotFound, message.clone()),
        Some(StorageError::InvalidPath(_)) => ApiError::new(ErrorCode::Validation, err.to_string()),
        Some(StorageError::AlreadyExists(message)) => {
            ApiError::new(ErrorCode::Conflict, message.clone())
        }
        None => internal(err),
    };
    warn!(code = ?error.code, message = %error.message, "workspace request failed");
    error
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

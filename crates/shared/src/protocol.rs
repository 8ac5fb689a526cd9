use serde::{Deserialize, Serialize};

use crate::domain::{Conversation, DirectoryInfo, FileIdentifier};

pub const HEALTH_ROUTE: &str = "/health";
pub const WORKSPACE_ROUTE: &str = "/api/workspace";
pub const DIRECTORY_ROUTE: &str = "/api/directory";
pub const DIRECTORIES_ROUTE: &str = "/api/directories";
pub const DIRECTORY_CREATE_ROUTE: &str = "/api/directory/create";
pub const DIRECTORY_DELETE_ROUTE: &str = "/api/directory/delete";
pub const FILE_ROUTE: &str = "/api/file";
pub const FILE_NEW_ROUTE: &str = "/api/file/new";
pub const FILES_RENAME_ROUTE: &str = "/api/files/rename";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceResponse {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<FileIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileQuery {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFileRequest {
    pub path: FileIdentifier,
    pub content: Conversation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteFileRequest {
    pub path: FileIdentifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFileRequest {
    pub directory: String,
    pub content: Conversation,
    #[serde(default)]
    pub current_file: Option<FileIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFileResponse {
    pub path: FileIdentifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryListResponse {
    pub directories: Vec<DirectoryInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectoryResponse {
    pub status: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameFilesRequest {
    pub directory: String,
    pub files: Vec<FileIdentifier>,
}

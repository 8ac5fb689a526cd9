use async_trait::async_trait;
use shared::domain::{Conversation, DirectoryInfo, FileIdentifier};

use crate::error::ClientResult;

/// Persistence operations the session consumes. Implementations report a
/// missing file as `ClientError::NotFound` and every other failure as
/// `ClientError::Backend`.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Order of the returned paths is unspecified.
    async fn list_files(&self, directory: &str) -> ClientResult<Vec<FileIdentifier>>;
    async fn create_file(
        &self,
        directory: &str,
        content: &Conversation,
        reference: Option<&FileIdentifier>,
    ) -> ClientResult<FileIdentifier>;
    async fn read_file(&self, path: &FileIdentifier) -> ClientResult<Conversation>;
    async fn write_file(&self, path: &FileIdentifier, conversation: &Conversation)
        -> ClientResult<()>;
    async fn delete_file(&self, path: &FileIdentifier) -> ClientResult<()>;
    async fn renumber(
        &self,
        directory: &str,
        files: &[FileIdentifier],
    ) -> ClientResult<Vec<FileIdentifier>>;
    /// Absolute workspace root that relative directory paths resolve under.
    async fn workspace_root(&self) -> ClientResult<String>;
    async fn list_directories(&self) -> ClientResult<Vec<DirectoryInfo>>;
    async fn create_directory(&self, path: &str) -> ClientResult<()>;
    async fn delete_directory(&self, path: &str) -> ClientResult<()>;
}

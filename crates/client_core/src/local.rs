use async_trait::async_trait;
use shared::domain::{Conversation, DirectoryInfo, FileIdentifier};
use storage::{StorageError, WorkspaceStore};

use crate::{
    backend::ConversationBackend,
    error::{ClientError, ClientResult},
};

/// Backend that talks to a workspace on local disk without a server.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    store: WorkspaceStore,
}

impl LocalBackend {
    pub fn new(store: WorkspaceStore) -> Self {
        Self { store }
    }

    pub async fn open(root: impl AsRef<std::path::Path>) -> ClientResult<Self> {
        let store = WorkspaceStore::new(root).await.map_err(storage_failure)?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }
}

#[async_trait]
impl ConversationBackend for LocalBackend {
    async fn list_files(&self, directory: &str) -> ClientResult<Vec<FileIdentifier>> {
        self.store
            .list_files(directory)
            .await
            .map_err(storage_failure)
    }

    async fn create_file(
        &self,
        directory: &str,
        content: &Conversation,
        reference: Option<&FileIdentifier>,
    ) -> ClientResult<FileIdentifier> {
        self.store
            .create_file(directory, content, reference)
            .await
            .map_err(storage_failure)
    }

    async fn read_file(&self, path: &FileIdentifier) -> ClientResult<Conversation> {
        self.store.read_file(path).await.map_err(storage_failure)
    }

    async fn write_file(
        &self,
        path: &FileIdentifier,
        conversation: &Conversation,
    ) -> ClientResult<()> {
        self.store
            .write_file(path, conversation)
            .await
            .map_err(storage_failure)
    }

    async fn delete_file(&self, path: &FileIdentifier) -> ClientResult<()> {
        self.store.delete_file(path).await.map_err(storage_failure)
    }

    async fn renumber(
        &self,
        directory: &str,
        files: &[FileIdentifier],
    ) -> ClientResult<Vec<FileIdentifier>> {
        self.store
            .renumber(directory, files)
            .await
            .map_err(storage_failure)
    }

    async fn workspace_root(&self) -> ClientResult<String> {
        Ok(self.store.root().display().to_string())
    }

    async fn list_directories(&self) -> ClientResult<Vec<DirectoryInfo>> {
        self.store.list_directories().await.map_err(storage_failure)
    }

    async fn create_directory(&self, path: &str) -> ClientResult<()> {
        self.store
            .create_directory(path)
            .await
            .map(|_| ())
            .map_err(storage_failure)
    }

    async fn delete_directory(&self, path: &str) -> ClientResult<()> {
        self.store
            .delete_directory(path)
            .await
            .map_err(storage_failure)
    }
}

fn storage_failure(err: anyhow::Error) -> ClientError {
    match StorageError::classify(&err) {
        Some(StorageError::NotFound(message)) => ClientError::NotFound(message.clone()),
        _ => ClientError::Backend(format!("{err:#}")),
    }
}

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Conversation, DirectoryInfo, FileIdentifier},
    error::ApiError,
    protocol::{
        CreateDirectoryResponse, DeleteFileRequest, DirectoryListResponse, DirectoryRequest,
        FileListResponse, NewFileRequest, NewFileResponse, RenameFilesRequest, SaveFileRequest,
        StatusResponse, WorkspaceResponse, DIRECTORIES_ROUTE, DIRECTORY_CREATE_ROUTE,
        DIRECTORY_DELETE_ROUTE, DIRECTORY_ROUTE, FILES_RENAME_ROUTE, FILE_NEW_ROUTE, FILE_ROUTE,
        WORKSPACE_ROUTE,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    backend::ConversationBackend,
    error::{ClientError, ClientResult},
};

/// Backend that calls the workspace server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    server_url: String,
}

impl HttpBackend {
    pub fn new(server_url: &str) -> ClientResult<Self> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> ClientResult<Self> {
        let parsed = Url::parse(server_url)
            .map_err(|err| ClientError::validation(format!("invalid server url: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::validation(format!(
                "unsupported server url scheme '{}'",
                parsed.scheme()
            )));
        }
        Ok(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.server_url)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|err| err.message)
            .unwrap_or_else(|_| format!("server returned {status}"));
        debug!(%status, %message, "backend request rejected");
        if status == StatusCode::NOT_FOUND {
            Err(ClientError::NotFound(message))
        } else {
            Err(ClientError::Backend(message))
        }
    }
}

#[async_trait]
impl ConversationBackend for HttpBackend {
    async fn list_files(&self, directory: &str) -> ClientResult<Vec<FileIdentifier>> {
        let listed: FileListResponse = self
            .call(self.http.post(self.url(DIRECTORY_ROUTE)).json(&DirectoryRequest {
                path: directory.to_string(),
            }))
            .await?;
        Ok(listed.files)
    }

    async fn create_file(
        &self,
        directory: &str,
        content: &Conversation,
        reference: Option<&FileIdentifier>,
    ) -> ClientResult<FileIdentifier> {
        let created: NewFileResponse = self
            .call(self.http.post(self.url(FILE_NEW_ROUTE)).json(&NewFileRequest {
                directory: directory.to_string(),
                content: content.clone(),
                current_file: reference.cloned(),
            }))
            .await?;
        Ok(created.path)
    }

    async fn read_file(&self, path: &FileIdentifier) -> ClientResult<Conversation> {
        self.call(
            self.http
                .get(self.url(FILE_ROUTE))
                .query(&[("path", path.as_str())]),
        )
        .await
    }

    async fn write_file(
        &self,
        path: &FileIdentifier,
        conversation: &Conversation,
    ) -> ClientResult<()> {
        let _: StatusResponse = self
            .call(self.http.post(self.url(FILE_ROUTE)).json(&SaveFileRequest {
                path: path.clone(),
                content: conversation.clone(),
            }))
            .await?;
        Ok(())
    }

    async fn delete_file(&self, path: &FileIdentifier) -> ClientResult<()> {
        let _: StatusResponse = self
            .call(
                self.http
                    .delete(self.url(FILE_ROUTE))
                    .json(&DeleteFileRequest { path: path.clone() }),
            )
            .await?;
        Ok(())
    }

    async fn renumber(
        &self,
        directory: &str,
        files: &[FileIdentifier],
    ) -> ClientResult<Vec<FileIdentifier>> {
        let renamed: FileListResponse = self
            .call(
                self.http
                    .post(self.url(FILES_RENAME_ROUTE))
                    .json(&RenameFilesRequest {
                        directory: directory.to_string(),
                        files: files.to_vec(),
                    }),
            )
            .await?;
        Ok(renamed.files)
    }

    async fn workspace_root(&self) -> ClientResult<String> {
        let workspace: WorkspaceResponse =
            self.call(self.http.get(self.url(WORKSPACE_ROUTE))).await?;
        Ok(workspace.path)
    }

    async fn list_directories(&self) -> ClientResult<Vec<DirectoryInfo>> {
        let listed: DirectoryListResponse =
            self.call(self.http.get(self.url(DIRECTORIES_ROUTE))).await?;
        Ok(listed.directories)
    }

    async fn create_directory(&self, path: &str) -> ClientResult<()> {
        let _: CreateDirectoryResponse = self
            .call(
                self.http
                    .post(self.url(DIRECTORY_CREATE_ROUTE))
                    .json(&DirectoryRequest {
                        path: path.to_string(),
                    }),
            )
            .await?;
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> ClientResult<()> {
        let _: StatusResponse = self
            .call(
                self.http
                    .post(self.url(DIRECTORY_DELETE_ROUTE))
                    .json(&DirectoryRequest {
                        path: path.to_string(),
                    }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use shared::domain::{Conversation, DirectoryInfo, FileIdentifier, Message, Role};
use tokio::sync::Notify;

use crate::{
    backend::ConversationBackend,
    error::{ClientError, ClientResult},
};

/// Root reported by [`FakeBackend`]; directories are stored relative to it.
pub const FAKE_ROOT: &str = "/fake";

/// In-memory backend with failure injection, a call log and an optional
/// gate that parks `list_files` until released.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    directories: BTreeSet<String>,
    files: BTreeMap<FileIdentifier, Conversation>,
    failing: HashSet<&'static str>,
    unreadable: HashSet<FileIdentifier>,
    calls: Vec<String>,
    created: usize,
    gate: Option<Gate>,
}

#[derive(Clone)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Directory `name` holding one single-message conversation per file name.
    pub fn with_directory(name: &str, files: &[&str]) -> Arc<Self> {
        let backend = Self::new();
        backend.add_directory(name);
        for file in files {
            backend.put(
                &format!("{name}/{file}"),
                Conversation::new(vec![Message::new(Role::User, *file)]),
            );
        }
        backend
    }

    pub fn add_directory(&self, name: &str) {
        self.lock().directories.insert(name.to_string());
    }

    pub fn put(&self, path: &str, conversation: Conversation) {
        self.lock().files.insert(FileIdentifier::from(path), conversation);
    }

    pub fn stored(&self, path: &str) -> Option<Conversation> {
        self.lock().files.get(&FileIdentifier::from(path)).cloned()
    }

    pub fn fail(&self, operation: &'static str) {
        self.lock().failing.insert(operation);
    }

    /// Makes reads of `path` fail the way a malformed file does.
    pub fn corrupt(&self, path: &str) {
        self.lock().unreadable.insert(FileIdentifier::from(path));
    }

    pub fn recover(&self, operation: &'static str) {
        self.lock().failing.remove(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn gate_listing(&self) -> Gate {
        let gate = Gate {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        self.lock().gate = Some(gate.clone());
        gate
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend state")
    }

    fn record(&self, operation: &'static str, detail: &str) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("{operation} {detail}"));
        if state.failing.contains(operation) {
            return Err(ClientError::backend(format!("injected failure: {operation}")));
        }
        Ok(())
    }

    fn files_in(state: &FakeState, directory: &str) -> Vec<FileIdentifier> {
        let prefix = format!("{directory}/");
        state
            .files
            .keys()
            .filter(|path| {
                path.as_str()
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ConversationBackend for FakeBackend {
    async fn list_files(&self, directory: &str) -> ClientResult<Vec<FileIdentifier>> {
        self.record("list_files", directory)?;
        let gate = self.lock().gate.take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let state = self.lock();
        if !state.directories.contains(directory) {
            return Err(ClientError::NotFound(format!("Directory not found: {directory}")));
        }
        // Reverse so callers cannot lean on listing order.
        let mut files = Self::files_in(&state, directory);
        files.reverse();
        Ok(files)
    }

    async fn create_file(
        &self,
        directory: &str,
        content: &Conversation,
        _reference: Option<&FileIdentifier>,
    ) -> ClientResult<FileIdentifier> {
        self.record("create_file", directory)?;
        let mut state = self.lock();
        state.created += 1;
        let path = FileIdentifier::new(format!("{directory}/new-{}.json", state.created));
        state.directories.insert(directory.to_string());
        state.files.insert(path.clone(), content.clone());
        Ok(path)
    }

    async fn read_file(&self, path: &FileIdentifier) -> ClientResult<Conversation> {
        self.record("read_file", path.as_str())?;
        let state = self.lock();
        if state.unreadable.contains(path) {
            return Err(ClientError::backend(format!("failed to parse '{path}'")));
        }
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("File not found: {path}")))
    }

    async fn write_file(
        &self,
        path: &FileIdentifier,
        conversation: &Conversation,
    ) -> ClientResult<()> {
        self.record("write_file", path.as_str())?;
        self.lock().files.insert(path.clone(), conversation.clone());
        Ok(())
    }

    async fn delete_file(&self, path: &FileIdentifier) -> ClientResult<()> {
        self.record("delete_file", path.as_str())?;
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("File not found: {path}")))
    }

    async fn renumber(
        &self,
        directory: &str,
        files: &[FileIdentifier],
    ) -> ClientResult<Vec<FileIdentifier>> {
        self.record("renumber", directory)?;
        let mut state = self.lock();
        let mut contents = Vec::with_capacity(files.len());
        for file in files {
            let content = state
                .files
                .remove(file)
                .ok_or_else(|| ClientError::NotFound(format!("File not found: {file}")))?;
            contents.push(content);
        }
        let mut renamed = Vec::with_capacity(contents.len());
        for (index, content) in contents.into_iter().enumerate() {
            let path = FileIdentifier::new(format!("{directory}/{}.json", index + 1));
            state.files.insert(path.clone(), content);
            renamed.push(path);
        }
        Ok(renamed)
    }

    async fn workspace_root(&self) -> ClientResult<String> {
        self.record("workspace_root", "")?;
        Ok(FAKE_ROOT.to_string())
    }

    async fn list_directories(&self) -> ClientResult<Vec<DirectoryInfo>> {
        self.record("list_directories", "")?;
        let state = self.lock();
        Ok(state
            .directories
            .iter()
            .map(|name| {
                let count = Self::files_in(&state, name).len();
                DirectoryInfo {
                    name: name.clone(),
                    path: format!("{FAKE_ROOT}/{name}"),
                    has_files: count > 0,
                    file_count: count,
                }
            })
            .collect())
    }

    async fn create_directory(&self, path: &str) -> ClientResult<()> {
        self.record("create_directory", path)?;
        if !self.lock().directories.insert(path.to_string()) {
            return Err(ClientError::backend("Directory already exists"));
        }
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> ClientResult<()> {
        self.record("delete_directory", path)?;
        let path = relative_to_root(path);
        let mut state = self.lock();
        if !state.directories.remove(path) {
            return Err(ClientError::NotFound(format!("Directory not found: {path}")));
        }
        let prefix = format!("{path}/");
        state
            .files
            .retain(|file, _| !file.as_str().starts_with(&prefix));
        Ok(())
    }
}

/// Strips the fake root so absolute and relative spellings hit one entry.
fn relative_to_root(path: &str) -> &str {
    path.strip_prefix(FAKE_ROOT)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
        .trim_end_matches('/')
}

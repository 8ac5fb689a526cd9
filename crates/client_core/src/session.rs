use std::{
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::{Duration, Instant},
};

use shared::domain::{Conversation, DirectoryInfo, FileIdentifier, Role};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    backend::ConversationBackend,
    dirty::{DirtyStateCoordinator, GuardOutcome, NavigationAction, UnsavedChangesPrompt},
    error::{ClientError, ClientResult},
    navigator::{ConversationSetNavigator, CurrentConversation},
    notice::{NoticeBoard, DEFAULT_NOTICE_TTL},
    ordering::{MessageEntry, MessageHandle, MessageOrderingController},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConversationLoaded {
        path: Option<FileIdentifier>,
        cursor: Option<usize>,
        total: usize,
    },
    DirtyChanged(bool),
    NoticePosted(String),
}

/// Point-in-time copy of everything a view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub directory: Option<String>,
    pub files: Vec<FileIdentifier>,
    pub cursor: Option<usize>,
    pub total: usize,
    pub current_path: Option<FileIdentifier>,
    pub messages: Vec<MessageEntry>,
    pub selection: Option<MessageHandle>,
    pub dirty: bool,
    /// The current file could not be read; it shows as empty and only
    /// navigation or deletion apply to it.
    pub load_failed: bool,
    pub busy: Option<&'static str>,
    pub notice: Option<String>,
}

struct SessionState {
    navigator: ConversationSetNavigator,
    controller: MessageOrderingController,
    coordinator: DirtyStateCoordinator,
    loaded_path: Option<FileIdentifier>,
    load_failed: bool,
}

/// One user's browsing and editing state over a workspace. Mutating calls
/// are rejected with [`ClientError::Busy`] while another one is running.
pub struct ConversationSession {
    backend: Arc<dyn ConversationBackend>,
    inner: Mutex<SessionState>,
    busy: StdMutex<Option<&'static str>>,
    notices: StdMutex<NoticeBoard>,
    events: broadcast::Sender<SessionEvent>,
}

struct BusyGuard<'a> {
    slot: &'a StdMutex<Option<&'static str>>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl ConversationSession {
    pub fn new(
        backend: Arc<dyn ConversationBackend>,
        prompt: Arc<dyn UnsavedChangesPrompt>,
    ) -> Arc<Self> {
        Self::new_with_notice_ttl(backend, prompt, DEFAULT_NOTICE_TTL)
    }

    pub fn new_with_notice_ttl(
        backend: Arc<dyn ConversationBackend>,
        prompt: Arc<dyn UnsavedChangesPrompt>,
        notice_ttl: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            inner: Mutex::new(SessionState {
                navigator: ConversationSetNavigator::new(Arc::clone(&backend)),
                controller: MessageOrderingController::new(),
                coordinator: DirtyStateCoordinator::new(prompt),
                loaded_path: None,
                load_failed: false,
            }),
            backend,
            busy: StdMutex::new(None),
            notices: StdMutex::new(NoticeBoard::new(notice_ttl)),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Name of the operation holding the busy guard, if any.
    pub fn busy_operation(&self) -> Option<&'static str> {
        *self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active_notice(&self) -> Option<String> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active(Instant::now())
            .map(str::to_string)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.lock().await;
        SessionSnapshot {
            directory: state.navigator.directory().map(str::to_string),
            files: state.navigator.files().to_vec(),
            cursor: state.navigator.cursor(),
            total: state.navigator.len(),
            current_path: state.loaded_path.clone(),
            messages: state.controller.entries().to_vec(),
            selection: state.controller.selection(),
            dirty: state.coordinator.is_dirty(),
            load_failed: state.load_failed,
            busy: self.busy_operation(),
            notice: self.active_notice(),
        }
    }

    pub async fn select_directory(&self, path: &str) -> ClientResult<GuardOutcome> {
        self.guarded_navigate(NavigationAction::SelectDirectory(path.to_string()))
            .await
    }

    pub async fn next(&self) -> ClientResult<GuardOutcome> {
        self.guarded_navigate(NavigationAction::Next).await
    }

    pub async fn previous(&self) -> ClientResult<GuardOutcome> {
        self.guarded_navigate(NavigationAction::Previous).await
    }

    pub async fn new_conversation(&self) -> ClientResult<GuardOutcome> {
        self.guarded_navigate(NavigationAction::NewConversation).await
    }

    pub async fn delete_current(&self) -> ClientResult<GuardOutcome> {
        self.guarded_navigate(NavigationAction::DeleteCurrent).await
    }

    pub async fn renumber(&self) -> ClientResult<GuardOutcome> {
        self.guarded_navigate(NavigationAction::Renumber).await
    }

    pub async fn refresh(&self) -> ClientResult<GuardOutcome> {
        self.guarded_navigate(NavigationAction::Refresh).await
    }

    /// Moves the loaded conversation, as shown, into `target` and removes it
    /// from the current set.
    pub async fn export_current(&self, target: &str) -> ClientResult<GuardOutcome> {
        self.guarded_navigate(NavigationAction::Export(target.to_string()))
            .await
    }

    /// Settles unsaved edits through the prompt, then runs `action`.
    pub async fn guarded_navigate(&self, action: NavigationAction) -> ClientResult<GuardOutcome> {
        let context = action.to_string();
        let result: ClientResult<GuardOutcome> = async {
            let _busy = self.begin(action.name())?;
            let mut state = self.inner.lock().await;
            self.run_guarded(&mut state, &action).await
        }
        .await;
        self.report(&context, result)
    }

    pub async fn save(&self) -> ClientResult<()> {
        let result: ClientResult<()> = async {
            let _busy = self.begin("save")?;
            let mut state = self.inner.lock().await;
            if state.load_failed {
                return Err(unreadable());
            }
            let was_dirty = state.coordinator.is_dirty();
            let conversation = state.controller.to_conversation();
            let path = state.loaded_path.clone();
            state
                .coordinator
                .save(self.backend.as_ref(), path.as_ref(), &conversation)
                .await?;
            if was_dirty {
                self.emit(SessionEvent::DirtyChanged(false));
            }
            Ok(())
        }
        .await;
        self.report("save", result)
    }

    pub async fn select_message(&self, handle: MessageHandle) -> ClientResult<()> {
        let result = self
            .edit(|controller| controller.select(handle).map(|()| ((), false)))
            .await;
        self.report("select message", result)
    }

    /// Appends an empty message and selects it. The legacy role is refused.
    pub async fn append_message(&self, role: Role) -> ClientResult<MessageHandle> {
        let result = if role.is_legacy() {
            Err(ClientError::validation(format!(
                "role '{role}' cannot be used for new messages"
            )))
        } else {
            self.edit(|controller| Ok((controller.append_message(role), true)))
                .await
        };
        self.report("add message", result)
    }

    pub async fn delete_message(&self, handle: MessageHandle) -> ClientResult<()> {
        let result = self
            .edit(|controller| controller.delete_message(handle).map(|_| ((), true)))
            .await;
        self.report("delete message", result)
    }

    pub async fn update_content(&self, handle: MessageHandle, content: &str) -> ClientResult<()> {
        let result = self
            .edit(|controller| {
                controller
                    .update_content(handle, content)
                    .map(|()| ((), true))
            })
            .await;
        self.report("edit message", result)
    }

    pub async fn update_selected_content(&self, content: &str) -> ClientResult<()> {
        let result = self
            .edit(|controller| {
                let handle = controller
                    .selection()
                    .ok_or_else(|| ClientError::validation("no message selected"))?;
                controller
                    .update_content(handle, content)
                    .map(|()| ((), true))
            })
            .await;
        self.report("edit message", result)
    }

    pub async fn apply_reorder(&self, from: usize, to: usize) -> ClientResult<bool> {
        let result = self
            .edit(|controller| {
                controller
                    .apply_reorder(from, to)
                    .map(|moved| (moved, moved))
            })
            .await;
        self.report("reorder", result)
    }

    /// Completes a drag gesture onto insertion slot `target`.
    pub async fn drop_reorder(&self, from: usize, target: usize) -> ClientResult<bool> {
        let result = self
            .edit(|controller| {
                controller
                    .drop_message(from, target)
                    .map(|moved| (moved, moved))
            })
            .await;
        self.report("reorder", result)
    }

    /// Content of the message after the selection, empty when there is none.
    pub async fn next_message_content(&self) -> String {
        let state = self.inner.lock().await;
        state
            .controller
            .next_after_selection()
            .map(|entry| entry.message.content.clone())
            .unwrap_or_default()
    }

    pub async fn update_next_content(&self, content: &str) -> ClientResult<()> {
        let result = self
            .edit(|controller| {
                controller
                    .update_next_content(content)
                    .map(|()| ((), true))
            })
            .await;
        self.report("edit next message", result)
    }

    pub async fn list_directories(&self) -> ClientResult<Vec<DirectoryInfo>> {
        let result = self.backend.list_directories().await;
        self.report("list directories", result)
    }

    pub async fn create_directory(&self, path: &str) -> ClientResult<()> {
        let result: ClientResult<()> = async {
            let _busy = self.begin("create directory")?;
            self.backend.create_directory(path).await?;
            info!(directory = path, "directory created");
            Ok(())
        }
        .await;
        self.report("create directory", result)
    }

    /// Deleting the selected directory (or one containing it) goes through
    /// the unsaved-changes guard and resets the session.
    pub async fn delete_directory(&self, path: &str) -> ClientResult<GuardOutcome> {
        if let Err(err) = self.ensure_idle() {
            return self.report("delete directory", Err(err));
        }
        let affects_active: ClientResult<bool> = async {
            let active = self.inner.lock().await.navigator.directory().map(str::to_string);
            let Some(active) = active else {
                return Ok(false);
            };
            let root = self.backend.workspace_root().await?;
            Ok(contains_directory(Path::new(&root), path, &active))
        }
        .await;
        let affects_active = match affects_active {
            Ok(affects_active) => affects_active,
            Err(err) => return self.report("delete directory", Err(err)),
        };
        if affects_active {
            return self
                .guarded_navigate(NavigationAction::DeleteDirectory(path.to_string()))
                .await;
        }

        let result: ClientResult<GuardOutcome> = async {
            let _busy = self.begin("delete directory")?;
            self.backend.delete_directory(path).await?;
            info!(directory = path, "directory deleted");
            Ok(GuardOutcome::Proceed)
        }
        .await;
        self.report("delete directory", result)
    }

    async fn run_guarded(
        &self,
        state: &mut SessionState,
        action: &NavigationAction,
    ) -> ClientResult<GuardOutcome> {
        match action {
            NavigationAction::Next if state.navigator.next_index().is_none() => {
                return Ok(GuardOutcome::Proceed);
            }
            NavigationAction::Previous if state.navigator.previous_index().is_none() => {
                return Ok(GuardOutcome::Proceed);
            }
            NavigationAction::NewConversation | NavigationAction::Refresh
                if state.navigator.directory().is_none() =>
            {
                return Err(ClientError::validation("no directory selected"));
            }
            NavigationAction::Renumber if state.navigator.directory().is_none() => {
                return Err(ClientError::validation("no directory selected"));
            }
            NavigationAction::Renumber if state.navigator.is_empty() => {
                return Err(ClientError::validation("no files to renumber"));
            }
            NavigationAction::DeleteCurrent if state.navigator.current_path().is_none() => {
                return Err(ClientError::validation("no conversation to delete"));
            }
            NavigationAction::Export(_) if state.loaded_path.is_none() => {
                return Err(ClientError::validation("no conversation to export"));
            }
            NavigationAction::Export(_) if state.load_failed => {
                return Err(unreadable());
            }
            _ => {}
        }
        if let NavigationAction::Export(target) = action {
            let root = self.backend.workspace_root().await?;
            let active = state.navigator.directory().unwrap_or_default();
            if directory_key(Path::new(&root), target) == directory_key(Path::new(&root), active) {
                return Err(ClientError::validation(format!(
                    "conversation is already in '{target}'"
                )));
            }
        }
        // What the user sees: the prompt saves it and export moves it.
        let shown = state.controller.to_conversation();

        let was_dirty = state.coordinator.is_dirty();
        let path = state.loaded_path.clone();
        let outcome = state
            .coordinator
            .resolve_pending(action, self.backend.as_ref(), path.as_ref(), &shown)
            .await?;
        if was_dirty && !state.coordinator.is_dirty() {
            self.emit(SessionEvent::DirtyChanged(false));
        }
        if outcome == GuardOutcome::Cancelled {
            return Ok(outcome);
        }

        match action {
            NavigationAction::Next => {
                let loaded = state.navigator.next().await;
                self.install_loaded(state, loaded)?;
            }
            NavigationAction::Previous => {
                let loaded = state.navigator.previous().await;
                self.install_loaded(state, loaded)?;
            }
            NavigationAction::SelectDirectory(directory) => {
                let mut staged = ConversationSetNavigator::new(Arc::clone(&self.backend));
                staged.set_directory(directory).await?;
                state.navigator = staged;
                self.reload_committed(state).await?;
            }
            NavigationAction::Refresh => {
                let mut staged = state.navigator.clone();
                staged.refresh().await?;
                state.navigator = staged;
                self.reload_committed(state).await?;
            }
            NavigationAction::NewConversation => {
                let starter = Conversation::starter();
                let created = state.navigator.add_conversation(&starter).await?;
                self.install(
                    state,
                    CurrentConversation {
                        path: Some(created),
                        conversation: starter,
                    },
                );
            }
            NavigationAction::DeleteCurrent => {
                let target = state
                    .navigator
                    .current_path()
                    .cloned()
                    .ok_or_else(|| ClientError::validation("no conversation to delete"))?;
                state.navigator.delete_conversation(&target).await?;
                self.reload_committed(state).await?;
            }
            NavigationAction::Export(target) => {
                let source = state
                    .loaded_path
                    .clone()
                    .ok_or_else(|| ClientError::validation("no conversation to export"))?;
                let exported = self.backend.create_file(target, &shown, None).await?;
                info!(from = %source, to = %exported, "conversation exported");
                state.navigator.delete_conversation(&source).await?;
                self.reload_committed(state).await?;
            }
            NavigationAction::Renumber => {
                state.navigator.rename_to_sequence().await?;
                self.reload_committed(state).await?;
            }
            NavigationAction::DeleteDirectory(directory) => {
                self.backend.delete_directory(directory).await?;
                info!(directory = %directory, "active directory deleted");
                state.navigator.clear();
                self.install(state, CurrentConversation::default());
            }
        }
        Ok(GuardOutcome::Proceed)
    }

    /// Loads the cursor's file after the set itself has been committed.
    async fn reload_committed(&self, state: &mut SessionState) -> ClientResult<()> {
        let loaded = state.navigator.current().await;
        self.install_loaded(state, loaded)
    }

    /// A failed load still makes the cursor's file current, as an empty
    /// placeholder that can be stepped past or deleted.
    fn install_loaded(
        &self,
        state: &mut SessionState,
        loaded: ClientResult<CurrentConversation>,
    ) -> ClientResult<()> {
        match loaded {
            Ok(loaded) => {
                self.install(state, loaded);
                Ok(())
            }
            Err(err) => {
                let path = state.navigator.current_path().cloned();
                warn!(path = ?path, error = %err, "conversation could not be loaded");
                self.install(
                    state,
                    CurrentConversation {
                        path,
                        conversation: Conversation::default(),
                    },
                );
                state.load_failed = true;
                Err(err)
            }
        }
    }

    fn install(&self, state: &mut SessionState, loaded: CurrentConversation) {
        let was_dirty = state.coordinator.is_dirty();
        state.controller.load(&loaded.conversation);
        state.coordinator.mark_clean();
        state.loaded_path = loaded.path.clone();
        state.load_failed = false;
        info!(
            path = ?loaded.path,
            cursor = ?state.navigator.cursor(),
            messages = loaded.conversation.messages.len(),
            "conversation loaded"
        );
        self.emit(SessionEvent::ConversationLoaded {
            path: loaded.path,
            cursor: state.navigator.cursor(),
            total: state.navigator.len(),
        });
        if was_dirty {
            self.emit(SessionEvent::DirtyChanged(false));
        }
    }

    /// Runs an in-memory edit. `apply` also reports whether anything changed.
    async fn edit<T, F>(&self, apply: F) -> ClientResult<T>
    where
        F: FnOnce(&mut MessageOrderingController) -> ClientResult<(T, bool)>,
    {
        self.ensure_idle()?;
        let mut state = self.inner.lock().await;
        if state.loaded_path.is_none() {
            return Err(ClientError::validation("no conversation loaded"));
        }
        if state.load_failed {
            return Err(unreadable());
        }
        let (value, changed) = apply(&mut state.controller)?;
        if changed && !state.coordinator.is_dirty() {
            state.coordinator.mark_dirty();
            self.emit(SessionEvent::DirtyChanged(true));
        }
        Ok(value)
    }

    fn begin(&self, operation: &'static str) -> ClientResult<BusyGuard<'_>> {
        let mut slot = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = *slot {
            return Err(ClientError::Busy { operation: running });
        }
        *slot = Some(operation);
        Ok(BusyGuard { slot: &self.busy })
    }

    fn ensure_idle(&self) -> ClientResult<()> {
        match self.busy_operation() {
            Some(running) => Err(ClientError::Busy { operation: running }),
            None => Ok(()),
        }
    }

    fn report<T>(&self, context: &str, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(err) = &result {
            let message = format!("{context}: {err}");
            warn!(%message, "session operation failed");
            self.notices
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .post(message.clone(), Instant::now());
            self.emit(SessionEvent::NoticePosted(message));
        }
        result
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

fn unreadable() -> ClientError {
    ClientError::validation("conversation could not be loaded")
}

/// Absolute, lexically normalized form of a directory path as the
/// workspace under `root` resolves it.
fn directory_key(root: &Path, raw: &str) -> PathBuf {
    let raw = Path::new(raw.trim());
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        root.join(raw)
    };
    let mut key = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                key.pop();
            }
            other => key.push(other.as_os_str()),
        }
    }
    key
}

fn contains_directory(root: &Path, deleted: &str, active: &str) -> bool {
    directory_key(root, active).starts_with(directory_key(root, deleted))
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use shared::domain::{Conversation, FileIdentifier};
use tracing::{info, warn};

use crate::{
    backend::ConversationBackend,
    error::{ClientError, ClientResult},
};

/// Actions that replace or discard the loaded conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    Next,
    Previous,
    NewConversation,
    DeleteCurrent,
    SelectDirectory(String),
    DeleteDirectory(String),
    /// Moves the loaded conversation into another directory.
    Export(String),
    Renumber,
    Refresh,
}

impl NavigationAction {
    pub fn name(&self) -> &'static str {
        match self {
            NavigationAction::Next => "next",
            NavigationAction::Previous => "previous",
            NavigationAction::NewConversation => "new conversation",
            NavigationAction::DeleteCurrent => "delete conversation",
            NavigationAction::SelectDirectory(_) => "select directory",
            NavigationAction::DeleteDirectory(_) => "delete directory",
            NavigationAction::Export(_) => "export",
            NavigationAction::Renumber => "renumber",
            NavigationAction::Refresh => "refresh",
        }
    }
}

impl fmt::Display for NavigationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationAction::SelectDirectory(path) | NavigationAction::DeleteDirectory(path) => {
                write!(f, "{} '{path}'", self.name())
            }
            NavigationAction::Export(target) => write!(f, "export to '{target}'"),
            _ => f.write_str(self.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDecision {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Proceed,
    Cancelled,
}

/// Asked once per guarded action while there are unsaved edits.
#[async_trait]
pub trait UnsavedChangesPrompt: Send + Sync {
    async fn decide(&self, action: &NavigationAction) -> PromptDecision;
}

pub struct AlwaysSave;

#[async_trait]
impl UnsavedChangesPrompt for AlwaysSave {
    async fn decide(&self, _action: &NavigationAction) -> PromptDecision {
        PromptDecision::Save
    }
}

pub struct AlwaysDiscard;

#[async_trait]
impl UnsavedChangesPrompt for AlwaysDiscard {
    async fn decide(&self, _action: &NavigationAction) -> PromptDecision {
        PromptDecision::Discard
    }
}

/// Tracks whether the loaded conversation differs from its last save.
pub struct DirtyStateCoordinator {
    dirty: bool,
    prompt: Arc<dyn UnsavedChangesPrompt>,
}

impl DirtyStateCoordinator {
    pub fn new(prompt: Arc<dyn UnsavedChangesPrompt>) -> Self {
        Self {
            dirty: false,
            prompt,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Writes `conversation` to `path`. Dirty clears only if the write lands.
    pub async fn save(
        &mut self,
        backend: &dyn ConversationBackend,
        path: Option<&FileIdentifier>,
        conversation: &Conversation,
    ) -> ClientResult<()> {
        let path = path.ok_or_else(|| ClientError::validation("no conversation loaded"))?;
        match backend.write_file(path, conversation).await {
            Ok(()) => {
                self.dirty = false;
                info!(path = %path, messages = conversation.messages.len(), "conversation saved");
                Ok(())
            }
            Err(err) => {
                warn!(path = %path, error = %err, "save failed; edits kept");
                Err(err)
            }
        }
    }

    /// Settles unsaved edits before `action` runs. `Discard` leaves the flag
    /// set; the load that follows a successful action clears it.
    pub async fn resolve_pending(
        &mut self,
        action: &NavigationAction,
        backend: &dyn ConversationBackend,
        path: Option<&FileIdentifier>,
        conversation: &Conversation,
    ) -> ClientResult<GuardOutcome> {
        if !self.dirty {
            return Ok(GuardOutcome::Proceed);
        }

        match self.prompt.decide(action).await {
            PromptDecision::Save => {
                self.save(backend, path, conversation).await?;
                Ok(GuardOutcome::Proceed)
            }
            PromptDecision::Discard => {
                info!(action = %action, "unsaved edits discarded");
                Ok(GuardOutcome::Proceed)
            }
            PromptDecision::Cancel => {
                info!(action = %action, "navigation cancelled");
                Ok(GuardOutcome::Cancelled)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/dirty_tests.rs"]
mod tests;

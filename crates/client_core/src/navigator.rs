use std::sync::Arc;

use shared::domain::{sort_by_key, Conversation, FileIdentifier};
use tracing::{debug, info};

use crate::{
    backend::ConversationBackend,
    error::{ClientError, ClientResult},
};

/// A loaded conversation and the file it came from. `path` is `None` when
/// the set is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentConversation {
    pub path: Option<FileIdentifier>,
    pub conversation: Conversation,
}

/// Ordered files of the selected directory plus a cursor into them.
///
/// `cursor` is `None` exactly when `files` is empty. Every call that changes
/// the backend asks it first and only touches local state once it succeeds.
/// Stepping is local and never waits on the load of its target.
#[derive(Clone)]
pub struct ConversationSetNavigator {
    backend: Arc<dyn ConversationBackend>,
    directory: Option<String>,
    files: Vec<FileIdentifier>,
    cursor: Option<usize>,
}

impl ConversationSetNavigator {
    pub fn new(backend: Arc<dyn ConversationBackend>) -> Self {
        Self {
            backend,
            directory: None,
            files: Vec::new(),
            cursor: None,
        }
    }

    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    pub fn files(&self) -> &[FileIdentifier] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current_path(&self) -> Option<&FileIdentifier> {
        self.cursor.and_then(|index| self.files.get(index))
    }

    pub async fn set_directory(&mut self, path: &str) -> ClientResult<()> {
        let listed = self.backend.list_files(path).await?;
        let files = sort_by_key(listed);
        self.cursor = if files.is_empty() { None } else { Some(0) };
        self.files = files;
        self.directory = Some(path.to_string());
        info!(directory = path, count = self.files.len(), "directory selected");
        Ok(())
    }

    /// Re-reads the listing of the selected directory. The cursor stays on
    /// the same file when it survives, otherwise it keeps its slot.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        let directory = self.require_directory()?.to_string();
        let files = sort_by_key(self.backend.list_files(&directory).await?);
        let previous = self.current_path().cloned();
        let cursor = previous
            .and_then(|path| files.iter().position(|file| *file == path))
            .or_else(|| clamp_cursor(self.cursor.unwrap_or(0), files.len()));
        self.files = files;
        self.cursor = cursor;
        debug!(directory = %directory, count = self.files.len(), cursor = ?self.cursor, "directory refreshed");
        Ok(())
    }

    pub async fn current(&self) -> ClientResult<CurrentConversation> {
        self.load_at(self.cursor).await
    }

    /// Index `next()` would land on, or `None` at the last file.
    pub fn next_index(&self) -> Option<usize> {
        self.cursor
            .map(|index| index + 1)
            .filter(|index| *index < self.files.len())
    }

    /// Index `previous()` would land on, or `None` at the first file.
    pub fn previous_index(&self) -> Option<usize> {
        self.cursor.and_then(|index| index.checked_sub(1))
    }

    pub async fn next(&mut self) -> ClientResult<CurrentConversation> {
        self.step_to(self.next_index()).await
    }

    pub async fn previous(&mut self) -> ClientResult<CurrentConversation> {
        self.step_to(self.previous_index()).await
    }

    /// Creates a file seeded with `content` right after the current one.
    /// The new identifier is inserted positionally, not by sort key, so the
    /// set can be out of order until the next listing.
    pub async fn add_conversation(&mut self, content: &Conversation) -> ClientResult<FileIdentifier> {
        let directory = self.require_directory()?.to_string();
        let reference = self.current_path().cloned();
        let created = self
            .backend
            .create_file(&directory, content, reference.as_ref())
            .await?;

        let index = self.cursor.map_or(0, |cursor| cursor + 1);
        self.files.insert(index, created.clone());
        self.cursor = Some(index);
        info!(directory = %directory, path = %created, cursor = index, "conversation created");
        Ok(created)
    }

    pub async fn delete_conversation(&mut self, path: &FileIdentifier) -> ClientResult<()> {
        self.backend.delete_file(path).await?;

        let Some(removed) = self.files.iter().position(|file| file == path) else {
            debug!(path = %path, "deleted file was not in the local set");
            return Ok(());
        };
        self.files.remove(removed);
        self.cursor = match self.cursor {
            _ if self.files.is_empty() => None,
            Some(cursor) if removed < cursor => Some(cursor - 1),
            Some(cursor) if removed == cursor => Some(removed.min(self.files.len() - 1)),
            other => other,
        };
        info!(path = %path, cursor = ?self.cursor, count = self.files.len(), "conversation deleted");
        Ok(())
    }

    /// Renames every file to `1.json`, `2.json`, ... in current order. The
    /// cursor keeps its position, not its file.
    pub async fn rename_to_sequence(&mut self) -> ClientResult<()> {
        let directory = self.require_directory()?.to_string();
        if self.files.is_empty() {
            return Err(ClientError::validation("no files to renumber"));
        }

        let renamed = sort_by_key(self.backend.renumber(&directory, &self.files).await?);
        self.cursor = self
            .cursor
            .and_then(|cursor| clamp_cursor(cursor, renamed.len()));
        self.files = renamed;
        info!(directory = %directory, count = self.files.len(), "files renumbered");
        Ok(())
    }

    /// Drops the selected directory and its files.
    pub fn clear(&mut self) {
        self.directory = None;
        self.files.clear();
        self.cursor = None;
    }

    /// Moves first, then loads. A file that fails to load stays current so
    /// the caller can step past it or delete it.
    async fn step_to(&mut self, target: Option<usize>) -> ClientResult<CurrentConversation> {
        if let Some(index) = target {
            self.cursor = Some(index);
        }
        self.current().await
    }

    async fn load_at(&self, index: Option<usize>) -> ClientResult<CurrentConversation> {
        let Some(path) = index.and_then(|index| self.files.get(index)) else {
            return Ok(CurrentConversation::default());
        };
        let conversation = self.backend.read_file(path).await?;
        Ok(CurrentConversation {
            path: Some(path.clone()),
            conversation,
        })
    }

    fn require_directory(&self) -> ClientResult<&str> {
        self.directory
            .as_deref()
            .ok_or_else(|| ClientError::validation("no directory selected"))
    }
}

fn clamp_cursor(cursor: usize, len: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(cursor.min(len - 1))
    }
}

#[cfg(test)]
#[path = "tests/navigator_tests.rs"]
mod tests;

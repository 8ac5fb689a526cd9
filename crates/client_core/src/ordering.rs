use shared::domain::{Conversation, Message, Role};

use crate::error::{ClientError, ClientResult};

/// Stable identity of a message within the loaded conversation. Survives
/// reorders and content edits; never reused after a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageHandle(u64);

impl MessageHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub handle: MessageHandle,
    pub message: Message,
}

/// Where the pointer is while a message is being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropHover {
    Row {
        index: usize,
        pointer_y: f32,
        row_top: f32,
        row_height: f32,
    },
    PastEnd,
}

/// Insertion index for a drag hovering `hover`, in coordinates of the
/// sequence before the dragged message is removed. Above a row's midpoint
/// targets that row, below it targets the slot after.
pub fn resolve_drop_target(hover: DropHover, len: usize) -> usize {
    match hover {
        DropHover::Row {
            index,
            pointer_y,
            row_top,
            row_height,
        } => {
            let midpoint = row_top + row_height / 2.0;
            let target = if pointer_y < midpoint { index } else { index + 1 };
            target.min(len)
        }
        DropHover::PastEnd => len,
    }
}

/// Converts a pre-removal insertion slot into the index `apply_reorder`
/// expects.
pub fn reorder_index_for_drop(from: usize, target: usize) -> usize {
    if target > from {
        target - 1
    } else {
        target
    }
}

/// Messages of the loaded conversation plus the selected one.
#[derive(Debug, Default)]
pub struct MessageOrderingController {
    entries: Vec<MessageEntry>,
    selection: Option<MessageHandle>,
    next_handle: u64,
}

impl MessageOrderingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every message. Selection moves to the first message, or
    /// none for an empty conversation.
    pub fn load(&mut self, conversation: &Conversation) {
        self.entries.clear();
        for message in &conversation.messages {
            let handle = self.allocate();
            self.entries.push(MessageEntry {
                handle,
                message: message.clone(),
            });
        }
        self.selection = self.entries.first().map(|entry| entry.handle);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.selection = None;
    }

    pub fn to_conversation(&self) -> Conversation {
        Conversation::new(
            self.entries
                .iter()
                .map(|entry| entry.message.clone())
                .collect(),
        )
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, handle: MessageHandle) -> Option<usize> {
        self.entries.iter().position(|entry| entry.handle == handle)
    }

    pub fn get(&self, handle: MessageHandle) -> Option<&Message> {
        self.position(handle).map(|index| &self.entries[index].message)
    }

    pub fn selection(&self) -> Option<MessageHandle> {
        self.selection
    }

    pub fn selected(&self) -> Option<&MessageEntry> {
        let handle = self.selection?;
        self.entries.iter().find(|entry| entry.handle == handle)
    }

    pub fn select(&mut self, handle: MessageHandle) -> ClientResult<()> {
        self.require(handle)?;
        self.selection = Some(handle);
        Ok(())
    }

    /// Pops the message at `from` and inserts it at `to`, where `to` is an
    /// index into the sequence after removal. Returns `false` for a no-op.
    pub fn apply_reorder(&mut self, from: usize, to: usize) -> ClientResult<bool> {
        let len = self.entries.len();
        if from >= len || to >= len {
            return Err(ClientError::validation(format!(
                "reorder {from} -> {to} is out of range for {len} messages"
            )));
        }
        if from == to {
            return Ok(false);
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(true)
    }

    /// Finishes a drag of the message at `from` onto insertion slot `target`.
    pub fn drop_message(&mut self, from: usize, target: usize) -> ClientResult<bool> {
        if target > self.entries.len() {
            return Err(ClientError::validation(format!(
                "drop target {target} is out of range"
            )));
        }
        self.apply_reorder(from, reorder_index_for_drop(from, target))
    }

    pub fn append_message(&mut self, role: Role) -> MessageHandle {
        let handle = self.allocate();
        self.entries.push(MessageEntry {
            handle,
            message: Message::empty(role),
        });
        self.selection = Some(handle);
        handle
    }

    pub fn delete_message(&mut self, handle: MessageHandle) -> ClientResult<Message> {
        let index = self.require(handle)?;
        let removed = self.entries.remove(index);
        if self.selection == Some(handle) {
            self.selection = None;
        }
        Ok(removed.message)
    }

    /// Swaps in a new message value with `content`; the handle and position
    /// stay, so the selection keeps pointing at it.
    pub fn update_content(&mut self, handle: MessageHandle, content: impl Into<String>) -> ClientResult<()> {
        let index = self.require(handle)?;
        let role = self.entries[index].message.role;
        self.entries[index].message = Message::new(role, content);
        Ok(())
    }

    /// The message right after the selection.
    pub fn next_after_selection(&self) -> Option<&MessageEntry> {
        let index = self.position(self.selection?)?;
        self.entries.get(index + 1)
    }

    pub fn update_next_content(&mut self, content: impl Into<String>) -> ClientResult<()> {
        let handle = self
            .next_after_selection()
            .map(|entry| entry.handle)
            .ok_or_else(|| ClientError::validation("no message follows the selection"))?;
        self.update_content(handle, content)
    }

    fn require(&self, handle: MessageHandle) -> ClientResult<usize> {
        self.position(handle).ok_or_else(|| {
            ClientError::validation(format!(
                "message {} is not in the loaded conversation",
                handle.get()
            ))
        })
    }

    fn allocate(&mut self) -> MessageHandle {
        self.next_handle += 1;
        MessageHandle(self.next_handle)
    }
}

#[cfg(test)]
#[path = "tests/ordering_tests.rs"]
mod tests;

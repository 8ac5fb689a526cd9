use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

const DISPLAY_NAME_MAX_CHARS: usize = 8;
const DISPLAY_NAME_EDGE_CHARS: usize = 4;

/// Opaque path naming a persisted conversation file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIdentifier(pub String);

impl FileIdentifier {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base name up to its first `.`, used to order a directory listing.
    pub fn sort_key(&self) -> &str {
        let base = self
            .0
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        base.split('.').next().unwrap_or_default()
    }

    pub fn display_name(&self) -> String {
        display_file_name(&self.0)
    }
}

impl fmt::Display for FileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileIdentifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FileIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Collation used for sort keys: letters compare case-insensitively first,
/// lowercase sorts before uppercase on a tie, and digits compare as text
/// (so `10` sorts before `2`).
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    if folded != Ordering::Equal {
        return folded;
    }

    for (left, right) in a.chars().zip(b.chars()) {
        if left == right {
            continue;
        }
        match (left.is_lowercase(), right.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => return left.cmp(&right),
        }
    }
    a.len().cmp(&b.len())
}

/// Sorts identifiers ascending by [`FileIdentifier::sort_key`].
pub fn sort_by_key(mut files: Vec<FileIdentifier>) -> Vec<FileIdentifier> {
    files.sort_by(|a, b| locale_compare(a.sort_key(), b.sort_key()));
    files
}

/// Short label for a conversation file: `abcd***wxyz` once the stem
/// exceeds eight characters.
pub fn display_file_name(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = file_name.replacen(".json", "", 1);
    let chars: Vec<char> = stem.chars().collect();
    if chars.len() <= DISPLAY_NAME_MAX_CHARS {
        return stem;
    }

    let head: String = chars[..DISPLAY_NAME_EDGE_CHARS].iter().collect();
    let tail: String = chars[chars.len() - DISPLAY_NAME_EDGE_CHARS..].iter().collect();
    format!("{head}***{tail}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Legacy role kept so older files still load. Never offered for new messages.
    Negative,
}

impl Role {
    pub const SELECTABLE: [Role; 3] = [Role::System, Role::User, Role::Assistant];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Negative => "negative",
        }
    }

    pub fn is_legacy(self) -> bool {
        matches!(self, Role::Negative)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "negative" => Ok(Role::Negative),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn empty(role: Role) -> Self {
        Self::new(role, String::new())
    }
}

/// Persisted file body. Message order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// An empty user turn followed by an empty assistant turn.
    pub fn starter() -> Self {
        Self::new(vec![Message::empty(Role::User), Message::empty(Role::Assistant)])
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryInfo {
    pub name: String,
    pub path: String,
    pub has_files: bool,
    pub file_count: usize,
}

impl DirectoryInfo {
    pub fn label(&self) -> String {
        format!("[{}]  {}", self.file_count, self.name)
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;

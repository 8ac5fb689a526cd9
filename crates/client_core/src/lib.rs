//! Client-side state for browsing and curating a workspace of conversation
//! files: the file-set cursor, message ordering, and unsaved-change tracking,
//! behind a backend that is either the HTTP server or a local workspace.

pub mod backend;
pub mod config;
pub mod dirty;
pub mod error;
pub mod local;
pub mod navigator;
pub mod notice;
pub mod ordering;
pub mod session;
pub mod transport;

pub use backend::ConversationBackend;
pub use config::ClientSettings;
pub use dirty::{
    AlwaysDiscard, AlwaysSave, DirtyStateCoordinator, GuardOutcome, NavigationAction,
    PromptDecision, UnsavedChangesPrompt,
};
pub use error::{ClientError, ClientResult};
pub use local::LocalBackend;
pub use navigator::{ConversationSetNavigator, CurrentConversation};
pub use notice::NoticeBoard;
pub use ordering::{
    resolve_drop_target, DropHover, MessageEntry, MessageHandle, MessageOrderingController,
};
pub use session::{ConversationSession, SessionEvent, SessionSnapshot};
pub use transport::HttpBackend;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

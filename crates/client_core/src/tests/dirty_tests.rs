use super::*;
use crate::test_support::FakeBackend;
use shared::domain::{Message, Role};
use std::sync::Mutex;

struct Scripted {
    decision: PromptDecision,
    asked: Mutex<Vec<NavigationAction>>,
}

impl Scripted {
    fn new(decision: PromptDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            asked: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl UnsavedChangesPrompt for Scripted {
    async fn decide(&self, action: &NavigationAction) -> PromptDecision {
        self.asked.lock().expect("asked").push(action.clone());
        self.decision
    }
}

fn edited() -> Conversation {
    Conversation::new(vec![Message::new(Role::User, "edited")])
}

#[tokio::test]
async fn save_clears_dirty_only_on_success() {
    let backend = FakeBackend::with_directory("set", &["1.json"]);
    let path = FileIdentifier::from("set/1.json");
    let mut coordinator = DirtyStateCoordinator::new(Arc::new(AlwaysSave));
    coordinator.mark_dirty();

    backend.fail("write_file");
    let err = coordinator
        .save(backend.as_ref(), Some(&path), &edited())
        .await
        .expect_err("write fails");
    assert!(matches!(err, ClientError::Backend(_)));
    assert!(coordinator.is_dirty());

    backend.recover("write_file");
    coordinator
        .save(backend.as_ref(), Some(&path), &edited())
        .await
        .expect("save");
    assert!(!coordinator.is_dirty());
    assert_eq!(backend.stored("set/1.json"), Some(edited()));
}

#[tokio::test]
async fn save_without_loaded_file_is_a_validation_error() {
    let backend = FakeBackend::new();
    let mut coordinator = DirtyStateCoordinator::new(Arc::new(AlwaysSave));
    coordinator.mark_dirty();
    let err = coordinator
        .save(backend.as_ref(), None, &edited())
        .await
        .expect_err("no path");
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(coordinator.is_dirty());
}

#[tokio::test]
async fn clean_state_proceeds_without_prompting() {
    let backend = FakeBackend::new();
    let prompt = Scripted::new(PromptDecision::Cancel);
    let mut coordinator = DirtyStateCoordinator::new(prompt.clone());
    let outcome = coordinator
        .resolve_pending(&NavigationAction::Next, backend.as_ref(), None, &edited())
        .await
        .expect("resolve");
    assert_eq!(outcome, GuardOutcome::Proceed);
    assert!(prompt.asked.lock().expect("asked").is_empty());
}

#[tokio::test]
async fn save_decision_writes_before_proceeding() {
    let backend = FakeBackend::with_directory("set", &["1.json"]);
    let path = FileIdentifier::from("set/1.json");
    let mut coordinator = DirtyStateCoordinator::new(Scripted::new(PromptDecision::Save));
    coordinator.mark_dirty();
    let outcome = coordinator
        .resolve_pending(&NavigationAction::Next, backend.as_ref(), Some(&path), &edited())
        .await
        .expect("resolve");
    assert_eq!(outcome, GuardOutcome::Proceed);
    assert!(!coordinator.is_dirty());
    assert_eq!(backend.stored("set/1.json"), Some(edited()));
}

#[tokio::test]
async fn failed_save_during_prompt_aborts() {
    let backend = FakeBackend::with_directory("set", &["1.json"]);
    backend.fail("write_file");
    let path = FileIdentifier::from("set/1.json");
    let mut coordinator = DirtyStateCoordinator::new(Scripted::new(PromptDecision::Save));
    coordinator.mark_dirty();
    coordinator
        .resolve_pending(&NavigationAction::Previous, backend.as_ref(), Some(&path), &edited())
        .await
        .expect_err("save fails");
    assert!(coordinator.is_dirty());
}

#[tokio::test]
async fn discard_proceeds_without_writing() {
    let backend = FakeBackend::with_directory("set", &["1.json"]);
    let path = FileIdentifier::from("set/1.json");
    let mut coordinator = DirtyStateCoordinator::new(Scripted::new(PromptDecision::Discard));
    coordinator.mark_dirty();
    let outcome = coordinator
        .resolve_pending(&NavigationAction::Next, backend.as_ref(), Some(&path), &edited())
        .await
        .expect("resolve");
    assert_eq!(outcome, GuardOutcome::Proceed);
    assert!(!backend.calls().iter().any(|call| call.starts_with("write_file")));
}

#[tokio::test]
async fn cancel_stops_the_action_and_keeps_edits_pending() {
    let backend = FakeBackend::with_directory("set", &["1.json"]);
    let path = FileIdentifier::from("set/1.json");
    let prompt = Scripted::new(PromptDecision::Cancel);
    let mut coordinator = DirtyStateCoordinator::new(prompt.clone());
    coordinator.mark_dirty();
    let action = NavigationAction::SelectDirectory("other".into());
    let outcome = coordinator
        .resolve_pending(&action, backend.as_ref(), Some(&path), &edited())
        .await
        .expect("resolve");
    assert_eq!(outcome, GuardOutcome::Cancelled);
    assert!(coordinator.is_dirty());
    assert_eq!(*prompt.asked.lock().expect("asked"), vec![action]);
}

#[test]
fn actions_describe_themselves() {
    assert_eq!(NavigationAction::Next.to_string(), "next");
    assert_eq!(
        NavigationAction::SelectDirectory("batch".into()).to_string(),
        "select directory 'batch'"
    );
    let export = NavigationAction::Export("done".into());
    assert_eq!(export.name(), "export");
    assert_eq!(export.to_string(), "export to 'done'");
}

use super::*;
use server::{build_router, AppState};
use server_api::ApiContext;
use shared::domain::{Message, Role};
use std::sync::Arc;
use storage::WorkspaceStore;
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn_server() -> (TempDir, HttpBackend) {
    let temp = TempDir::new().expect("tempdir");
    let store = WorkspaceStore::new(temp.path()).await.expect("store");
    let state = AppState {
        api: ApiContext::new(store),
    };
    let app = build_router(Arc::new(state), 1024 * 1024);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let backend = HttpBackend::new(&format!("http://{addr}/")).expect("backend");
    (temp, backend)
}

#[test]
fn rejects_invalid_server_urls() {
    assert!(matches!(
        HttpBackend::new("not a url"),
        Err(ClientError::Validation(_))
    ));
    assert!(matches!(
        HttpBackend::new("ftp://127.0.0.1"),
        Err(ClientError::Validation(_))
    ));
    let backend = HttpBackend::new("http://127.0.0.1:8000/").expect("backend");
    assert_eq!(backend.server_url(), "http://127.0.0.1:8000");
}

#[tokio::test]
async fn file_lifecycle_over_http() {
    let (_temp, backend) = spawn_server().await;
    backend.create_directory("set").await.expect("mkdir");

    let first = backend
        .create_file("set", &Conversation::default(), None)
        .await
        .expect("create");
    let second = backend
        .create_file("set", &Conversation::default(), Some(&first))
        .await
        .expect("create");
    let mut listed = backend.list_files("set").await.expect("list");
    listed.sort();
    let mut expected = vec![first.clone(), second.clone()];
    expected.sort();
    assert_eq!(listed, expected);

    let edited = Conversation::new(vec![
        Message::new(Role::User, "héllo"),
        Message::new(Role::Assistant, "hi"),
    ]);
    backend.write_file(&first, &edited).await.expect("write");
    assert_eq!(backend.read_file(&first).await.expect("read"), edited);

    let renamed = backend
        .renumber("set", &[second.clone(), first.clone()])
        .await
        .expect("renumber");
    assert_eq!(
        renamed,
        vec![
            FileIdentifier::from("set/1.json"),
            FileIdentifier::from("set/2.json")
        ]
    );
    assert_eq!(backend.read_file(&renamed[1]).await.expect("read"), edited);

    backend.delete_file(&renamed[0]).await.expect("delete");
    assert_eq!(backend.list_files("set").await.expect("list").len(), 1);

    let directories = backend.list_directories().await.expect("dirs");
    let set = directories
        .iter()
        .find(|dir| dir.name == "set")
        .expect("set listed");
    assert_eq!(set.file_count, 1);

    backend.delete_directory("set").await.expect("rmdir");
    assert!(backend
        .list_files("set")
        .await
        .expect_err("gone")
        .is_not_found());
}

#[tokio::test]
async fn server_errors_map_to_client_kinds() {
    let (_temp, backend) = spawn_server().await;

    let missing = backend
        .read_file(&FileIdentifier::from("nope.json"))
        .await
        .expect_err("missing");
    assert!(matches!(missing, ClientError::NotFound(ref message) if message.contains("nope.json")));

    let missing_delete = backend
        .delete_file(&FileIdentifier::from("nope.json"))
        .await
        .expect_err("missing");
    assert!(missing_delete.is_not_found());

    backend.create_directory("dup").await.expect("mkdir");
    let duplicate = backend.create_directory("dup").await.expect_err("duplicate");
    assert!(matches!(duplicate, ClientError::Backend(_)));

    let escape = backend
        .create_directory("../outside")
        .await
        .expect_err("escape");
    assert!(matches!(escape, ClientError::Backend(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_backend_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let backend = HttpBackend::new(&format!("http://{addr}")).expect("backend");
    let err = backend.list_directories().await.expect_err("refused");
    assert!(matches!(err, ClientError::Backend(_)));
}

#[tokio::test]
async fn workspace_root_matches_directory_listing() {
    let (temp, backend) = spawn_server().await;
    let root = backend.workspace_root().await.expect("root");
    let directories = backend.list_directories().await.expect("dirs");
    assert_eq!(directories[0].path, root);
    assert!(root.ends_with(
        temp.path()
            .file_name()
            .and_then(|name| name.to_str())
            .expect("temp name")
    ));
}

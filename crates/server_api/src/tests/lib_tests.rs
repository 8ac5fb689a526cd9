use super::*;
use shared::domain::{Message, Role};
use tempfile::TempDir;

async fn test_ctx() -> (TempDir, ApiContext) {
    let temp = TempDir::new().expect("tempdir");
    let store = WorkspaceStore::new(temp.path()).await.expect("store");
    (temp, ApiContext::new(store))
}

#[tokio::test]
async fn missing_directory_maps_to_not_found() {
    let (_temp, ctx) = test_ctx().await;
    let err = list_directory_files(&ctx, "nowhere")
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn escaping_path_maps_to_validation() {
    let (_temp, ctx) = test_ctx().await;
    let err = create_directory(&ctx, "../escape").await.expect_err("escape");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn duplicate_directory_maps_to_conflict() {
    let (_temp, ctx) = test_ctx().await;
    create_directory(&ctx, "set").await.expect("create");
    let err = create_directory(&ctx, "set").await.expect_err("duplicate");
    assert_eq!(err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn malformed_file_maps_to_internal() {
    let (temp, ctx) = test_ctx().await;
    std::fs::write(temp.path().join("broken.json"), "{not json").expect("write");
    let err = read_conversation(&ctx, &FileIdentifier::from("broken.json"))
        .await
        .expect_err("malformed");
    assert_eq!(err.code, ErrorCode::Internal);
}

#[tokio::test]
async fn blank_directory_is_rejected_before_touching_storage() {
    let (_temp, ctx) = test_ctx().await;
    let err = create_conversation(&ctx, "  ", &Conversation::default(), None)
        .await
        .expect_err("blank");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn create_save_and_read_round_through_the_store() {
    let (_temp, ctx) = test_ctx().await;
    let path = create_conversation(&ctx, "set", &Conversation::default(), None)
        .await
        .expect("create");
    let edited = Conversation::new(vec![Message::new(Role::User, "edited")]);
    save_conversation(&ctx, &path, &edited).await.expect("save");
    assert_eq!(read_conversation(&ctx, &path).await.expect("read"), edited);

    delete_conversation(&ctx, &path).await.expect("delete");
    let err = read_conversation(&ctx, &path).await.expect_err("deleted");
    assert_eq!(err.code, ErrorCode::NotFound);
}

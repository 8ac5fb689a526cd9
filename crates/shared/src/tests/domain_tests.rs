use super::*;

#[test]
fn sort_key_strips_directory_and_every_extension() {
    assert_eq!(FileIdentifier::from("workspace/set/12.json").sort_key(), "12");
    assert_eq!(FileIdentifier::from("a.b.json").sort_key(), "a");
    assert_eq!(FileIdentifier::from("C:\\data\\x.json").sort_key(), "x");
}

#[test]
fn sorting_compares_stems_as_text() {
    let files = sort_by_key(vec![
        "d/2.json".into(),
        "d/10.json".into(),
        "d/1.json".into(),
    ]);
    let names: Vec<&str> = files.iter().map(FileIdentifier::as_str).collect();
    assert_eq!(names, vec!["d/1.json", "d/10.json", "d/2.json"]);
}

#[test]
fn locale_compare_folds_case_before_breaking_ties() {
    assert_eq!(locale_compare("apple", "Banana"), Ordering::Less);
    assert_eq!(locale_compare("Banana", "apple"), Ordering::Greater);
    assert_eq!(locale_compare("a", "A"), Ordering::Less);
    assert_eq!(locale_compare("same", "same"), Ordering::Equal);
}

#[test]
fn display_name_truncates_long_stems() {
    assert_eq!(display_file_name("dir/3.json"), "3");
    assert_eq!(display_file_name("dir/abcdefgh.json"), "abcdefgh");
    assert_eq!(
        display_file_name("dir/0123456789abcdef.json"),
        "0123***cdef"
    );
}

#[test]
fn legacy_role_reads_but_is_not_selectable() {
    let conversation: Conversation = serde_json::from_str(
        r#"{"messages":[{"role":"negative","content":"no"},{"role":"user","content":"hi"}]}"#,
    )
    .expect("json");
    assert_eq!(conversation.messages[0].role, Role::Negative);
    assert!(conversation.messages[0].role.is_legacy());
    assert!(!Role::SELECTABLE.contains(&Role::Negative));
}

#[test]
fn unknown_role_is_rejected() {
    let parsed = serde_json::from_str::<Message>(r#"{"role":"tool","content":""}"#);
    assert!(parsed.is_err());
}

#[test]
fn missing_messages_field_defaults_to_empty() {
    let conversation: Conversation = serde_json::from_str("{}").expect("json");
    assert!(conversation.is_empty());
}

#[test]
fn directory_label_shows_file_count() {
    let info = DirectoryInfo {
        name: "batch-1".into(),
        path: "/w/batch-1".into(),
        has_files: true,
        file_count: 7,
    };
    assert_eq!(info.label(), "[7]  batch-1");
    let json = serde_json::to_value(&info).expect("json");
    assert_eq!(json["fileCount"], 7);
    assert_eq!(json["hasFiles"], true);
}

#[test]
fn starter_conversation_is_one_empty_exchange() {
    let starter = Conversation::starter();
    let roles: Vec<Role> = starter.messages.iter().map(|message| message.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert!(starter.messages.iter().all(|message| message.content.is_empty()));
}

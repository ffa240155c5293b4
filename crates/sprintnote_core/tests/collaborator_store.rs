use sprintnote_core::{
    resolve_notification_scope_json, CollaboratorRepository, CollaboratorSet, DatabaseScope,
    FileCollaboratorRepository, NotificationScope,
};

#[test]
fn saved_sets_load_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileCollaboratorRepository::in_dir(dir.path());
    let cases: Vec<Vec<&str>> = vec![
        vec![],
        vec!["alice"],
        vec!["_c3f1a9e0b2", "bob", "Bob"],
        vec!["名前", "quote\"inside", "back\\slash"],
    ];

    for case in cases {
        let set: CollaboratorSet = case.iter().copied().collect();
        repo.save(&set).expect("save set");
        assert_eq!(repo.load().expect("load set"), set, "case {case:?}");
    }
}

#[test]
fn duplicate_entries_on_disk_collapse() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileCollaboratorRepository::in_dir(dir.path());
    std::fs::write(repo.path(), br#"["alice", "alice", " ", "bob"]"#).unwrap();

    let set = repo.load().expect("load set");
    assert_eq!(set.to_vec(), vec!["alice".to_string(), "bob".to_string()]);
}

#[test]
fn corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileCollaboratorRepository::in_dir(dir.path());
    std::fs::write(repo.path(), b"not json").unwrap();

    assert!(repo.load().is_err());
}

#[test]
fn push_payload_database_codes_resolve() {
    let private = NotificationScope::Database(DatabaseScope::Private);
    let shared = NotificationScope::Database(DatabaseScope::Shared);
    let public = NotificationScope::Database(DatabaseScope::Public);
    let cases = [
        (r#"{"ck":{"met":{"dbs":1,"sid":"publicDBSubscription"}}}"#, public),
        (r#"{"ck":{"met":{"dbs":2,"sid":"privateDBSubscription"}}}"#, private),
        (r#"{"ck":{"met":{"dbs":3,"sid":"sharedDBSubscription"}}}"#, shared),
        (r#"{"ck":{"met":{"dbs":9}}}"#, NotificationScope::Unrecognized),
        (r#"{"aps":{"content-available":1}}"#, NotificationScope::Unrecognized),
        ("[]", NotificationScope::Unrecognized),
        ("not json", NotificationScope::Unrecognized),
    ];

    for (payload, expected) in cases {
        assert_eq!(resolve_notification_scope_json(payload), expected, "{payload}");
    }
}

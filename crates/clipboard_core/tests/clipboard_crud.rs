use clipboard_core::db::open_db_in_memory;
use clipboard_core::repo::EntityRef;
use clipboard_core::{
    ClipboardCore, ClipboardService, CoreConfig, RepoError, SqliteClipboardRepository,
    SqliteWorkspaceRepository, UserDraft, ValidationError, WorkspaceDraft, WorkspaceRepository,
};

#[test]
fn create_update_and_list_within_workspace() {
    let conn = open_db_in_memory().unwrap();
    let workspace = SqliteWorkspaceRepository::try_new(&conn)
        .unwrap()
        .create_workspace(&WorkspaceDraft::new("notes", None))
        .unwrap();
    let service = ClipboardService::new(SqliteClipboardRepository::try_new(&conn).unwrap());

    let first = service
        .create_clipboard("first snippet", Some(workspace.id))
        .unwrap();
    let second = service
        .create_clipboard("second snippet", Some(workspace.id))
        .unwrap();
    let loose = service.create_clipboard("no workspace", None).unwrap();
    assert_eq!(loose.workspace_id, None);

    let updated = service.update_clipboard(first.id, "edited").unwrap();
    assert_eq!(updated.content, "edited");

    let listed = service.list_clipboards(workspace.id).unwrap();
    assert_eq!(
        listed.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );
    assert_eq!(service.get_clipboard(loose.id).unwrap(), Some(loose));
}

#[test]
fn create_in_missing_workspace_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ClipboardService::new(SqliteClipboardRepository::try_new(&conn).unwrap());

    let err = service.create_clipboard("orphan", Some(12)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound(EntityRef::Workspace(12))
    ));
}

#[test]
fn oversized_content_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = ClipboardService::new(SqliteClipboardRepository::try_new(&conn).unwrap());

    let err = service
        .create_clipboard("x".repeat(65_537), None)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::TooLong {
            field: "content",
            ..
        })
    ));
}

#[test]
fn delete_reports_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = ClipboardService::new(SqliteClipboardRepository::try_new(&conn).unwrap());
    let clipboard = service.create_clipboard("short-lived", None).unwrap();

    service.delete_clipboard(clipboard.id).unwrap();
    assert!(service.get_clipboard(clipboard.id).unwrap().is_none());
    assert!(matches!(
        service.delete_clipboard(clipboard.id).unwrap_err(),
        RepoError::NotFound(EntityRef::Clipboard(_))
    ));
    assert!(matches!(
        service.update_clipboard(clipboard.id, "late").unwrap_err(),
        RepoError::NotFound(EntityRef::Clipboard(_))
    ));
}

#[test]
fn clipboards_follow_their_workspace_on_delete() {
    let core = ClipboardCore::open(CoreConfig::default()).unwrap();
    let registration = core.register_user(&UserDraft::new("c@x.com")).unwrap();
    let clipboards = core.clipboard_service().unwrap();
    let workspaces = core.workspace_service().unwrap();

    let kept = clipboards.create_clipboard("loose", None).unwrap();
    clipboards
        .create_clipboard("in home", Some(registration.home.id))
        .unwrap();

    workspaces.delete_workspace(registration.home.id).unwrap();

    assert!(clipboards
        .list_clipboards(registration.home.id)
        .unwrap()
        .is_empty());
    assert!(clipboards.get_clipboard(kept.id).unwrap().is_some());
}

#[test]
fn missing_tables_are_reported() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = SqliteClipboardRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("clipboards")));
}

use clipboard_core::{Clipboard, Language, Page, PageRequest, User, Workspace};
use serde_json::json;
use std::collections::BTreeSet;

fn member(id: i64) -> User {
    User {
        id,
        email: format!("m{id}@example.com"),
        name: None,
        image_url: None,
        language: Language::En,
        authorities: BTreeSet::new(),
    }
}

#[test]
fn workspace_serializes_members_inline() {
    let workspace = Workspace {
        id: 3,
        name: "Home".to_string(),
        owner: Some(1),
        members: vec![member(1)],
    };

    let value = serde_json::to_value(&workspace).unwrap();
    assert_eq!(
        value,
        json!({
            "id": 3,
            "name": "Home",
            "owner": 1,
            "members": [{
                "id": 1,
                "email": "m1@example.com",
                "name": null,
                "image_url": null,
                "language": "en",
                "authorities": []
            }]
        })
    );
}

#[test]
fn lazy_workspace_json_without_members_deserializes() {
    let workspace: Workspace =
        serde_json::from_value(json!({ "id": 9, "name": "Solo", "owner": null })).unwrap();
    assert!(workspace.members.is_empty());
    assert_eq!(workspace.owner, None);
}

#[test]
fn page_envelope_keeps_metadata_fields() {
    let page = Page::new(
        vec![Clipboard {
            id: 1,
            content: "hi".to_string(),
            workspace_id: None,
        }],
        PageRequest::new(4, 1),
        10,
    );

    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["page"], 4);
    assert_eq!(value["size"], 1);
    assert_eq!(value["total_elements"], 10);
    assert_eq!(value["content"][0]["workspace_id"], serde_json::Value::Null);
    assert_eq!(page.total_pages(), 10);
}

#[test]
fn unknown_language_is_rejected() {
    let err = serde_json::from_value::<Language>(json!("fr"));
    assert!(err.is_err());
    assert_eq!(
        serde_json::from_value::<Language>(json!("en")).unwrap(),
        Language::En
    );
}

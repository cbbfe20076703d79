use caption_core::{CaptionResult, Decision, DecisionKind};
use caption_engine::{parse_viewer_message, ViewerEvent};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn encoded(event: &ViewerEvent) -> Value {
    serde_json::from_str(&event.to_json().unwrap()).unwrap()
}

#[test]
fn outbound_events_use_viewer_field_names() {
    assert_eq!(
        encoded(&ViewerEvent::image("photos/cat.PNG", b"ABC", "image/png")),
        json!({
            "type": "image",
            "path": "photos/cat.PNG",
            "filename": "cat.PNG",
            "data": "QUJD",
            "mimeType": "image/png",
        })
    );
    assert_eq!(
        encoded(&ViewerEvent::caption(CaptionResult {
            description: "a cat".to_string(),
            tags: vec!["cat".to_string()],
        })),
        json!({ "type": "caption", "description": "a cat", "tags": ["cat"] })
    );
    assert_eq!(
        encoded(&ViewerEvent::error("nope")),
        json!({ "type": "error", "message": "nope" })
    );
    assert_eq!(encoded(&ViewerEvent::Complete), json!({ "type": "complete" }));
}

#[test]
fn inbound_decisions_parse_with_string_or_array_tags() {
    let accept = parse_viewer_message(
        r#"{"type":"accept","path":"a.png","caption":"a cat","tags":"cat, orange ,"}"#,
    )
    .unwrap();
    assert_eq!(
        accept,
        Some(Decision {
            kind: DecisionKind::Accept,
            path: Some("a.png".to_string()),
            caption: Some("a cat".to_string()),
            tags: vec!["cat".to_string(), "orange".to_string()],
        })
    );

    let reject = parse_viewer_message(r#"{"type":"reject","path":"a.png","tags":["x"]}"#)
        .unwrap()
        .unwrap();
    assert_eq!(reject.kind, DecisionKind::Reject);
    assert_eq!(reject.tags, vec!["x".to_string()]);

    let regenerate = parse_viewer_message(r#"{"type":"regenerate","path":""}"#)
        .unwrap()
        .unwrap();
    assert_eq!(regenerate, Decision::new(DecisionKind::Regenerate));
}

#[test]
fn unknown_types_are_ignored() {
    assert_eq!(parse_viewer_message(r#"{"type":"ping"}"#).unwrap(), None);
}

#[test]
fn unknown_types_ignore_unexpected_fields() {
    assert_eq!(
        parse_viewer_message(r#"{"type":"ping","tags":5,"path":[1]}"#).unwrap(),
        None
    );
}

#[test]
fn malformed_frames_are_errors() {
    assert!(parse_viewer_message("not json").is_err());
    assert!(parse_viewer_message(r#"{"path":"a.png"}"#).is_err());
    assert!(parse_viewer_message(r#"{"type":"accept","tags":7}"#).is_err());
}

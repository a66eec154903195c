use coauthor_core::db::open_db_in_memory;
use coauthor_core::{
    CoauthorSession, CoreConfig, DocumentMode, FrameDecoder, MemorySnapshotStore, MessageRole,
    PersistProfile, Provenance, Section, SessionError, SqliteSnapshotStore,
};

const RESPONSE: &str = r#"{"message": "Here is a SWOT table.", "edits": [{"kind": "create-section", "title": "SWOT", "content": "| role | goal |\n| --- | --- |\n| PM | ship |"}, {"kind": "switch-mode", "mode": "tabular"}], "review_comments": [{"note": "add threats"}], "suggestions": ["Include competitors?"]}"#;

fn seeded_session() -> CoauthorSession {
    CoauthorSession::new("s-42", CoreConfig::default()).with_sections(vec![Section::with_id(
        "lead",
        "Untitled",
        "",
        Provenance::User,
        0,
    )])
}

#[test]
fn streamed_turn_previews_then_commits_one_history_entry() {
    let mut session = seeded_session();
    session.record_user_message("Make me a SWOT table");

    let mut decoder = FrameDecoder::new();
    let mut previewed_sections = 0;
    for chunk in RESPONSE.as_bytes().chunks(11) {
        let frame = decoder.push_bytes(chunk);
        let preview = session.preview(&frame, 100);
        previewed_sections = previewed_sections.max(preview.sections.len());
        assert_eq!(session.sections().len(), 1);
        assert!(!session.can_undo());
    }
    assert_eq!(previewed_sections, 2);

    let outcome = session.apply_response(decoder.finish().unwrap(), 200);
    assert!(outcome.changed);
    assert_eq!(session.mode(), DocumentMode::Tabular);
    assert_eq!(session.sections().len(), 2);
    assert_eq!(session.sections()[0].title, "SWOT");
    assert_eq!(session.sections()[1].title, "SWOT");

    let assistant = &session.messages()[1];
    assert_eq!(assistant.role, MessageRole::Assistant);
    assert!(assistant.review_comments.is_some());
    assert!(assistant.extras.contains_key("suggestions"));

    assert!(session.undo());
    assert_eq!(session.sections().len(), 1);
    assert_eq!(session.sections()[0].title, "Untitled");
    assert!(!session.undo());
}

#[test]
fn persisted_session_restores_through_sqlite() {
    let mut session = seeded_session();
    session.apply_response_json(RESPONSE, 10).unwrap();
    session.record_error("agent timed out");

    let conn = open_db_in_memory().unwrap();
    let mut store = SqliteSnapshotStore::new(&conn);
    let outcome = session.persist(&mut store);
    assert_eq!(outcome.profile, PersistProfile::Full);

    let restored = CoauthorSession::load(&store, "s-42", CoreConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(restored.sections(), session.sections());
    assert_eq!(restored.mode(), DocumentMode::Tabular);
    assert_eq!(restored.messages(), session.messages());
    assert_eq!(restored.error_state().unwrap().retry_count, 1);
    assert!(restored.can_undo());

    let json = serde_json::to_value(restored.to_persisted()).unwrap();
    assert_eq!(json["messages"][0]["suggestions"][0], "Include competitors?");
}

#[test]
fn missing_session_loads_as_none() {
    let store = MemorySnapshotStore::new();
    let loaded = CoauthorSession::load(&store, "nope", CoreConfig::default()).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn malformed_final_payload_is_a_response_error() {
    let mut session = seeded_session();
    let err = session.apply_response_json("{\"edits\": []}", 1).unwrap_err();
    assert!(matches!(err, SessionError::Response(_)));
    assert!(session.messages().is_empty());
}

#[test]
fn manual_edit_after_undo_clears_redo() {
    let mut session = seeded_session();
    session.apply_response_json(RESPONSE, 10).unwrap();
    assert!(session.undo());
    assert!(session.can_redo());

    let mut edited = session.sections().to_vec();
    edited[0].content = "Typed by hand".to_string();
    assert!(session.apply_manual_edit(edited, 20));
    assert!(!session.can_redo());
    assert_eq!(session.sections()[0].provenance, Provenance::User);
    assert_eq!(session.sections()[0].updated_at, 20);
}

#[test]
fn malformed_instruction_does_not_discard_the_rest_of_the_turn() {
    let mut session = seeded_session();
    let outcome = session
        .apply_response_json(
            r#"{"message": "ok", "edits": [{"kind": "explode"}, {"kind": "create_section", "title": "Risks", "content": "Churn"}, {"kind": "switch_mode", "mode": "slides"}]}"#,
            5,
        )
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(session.mode(), DocumentMode::FreeText);
    assert!(session
        .sections()
        .iter()
        .any(|section| section.content == "Churn"));
}

#[test]
fn mode_only_turn_leaves_no_empty_undo_step() {
    let mut session = seeded_session();
    let outcome = session
        .apply_response_json(
            r#"{"message": "Switching.", "edits": [{"kind": "switch_mode", "mode": "code"}]}"#,
            5,
        )
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(session.mode(), DocumentMode::Code);
    assert!(!session.can_undo());
    assert!(!session.undo());
}

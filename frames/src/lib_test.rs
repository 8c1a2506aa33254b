use super::*;

fn live_frame() -> &'static str {
    r#"{
        "id": 7,
        "fromUsername": "ada",
        "fromAvatar": 3,
        "content": "hello",
        "timestamp": "Nov 21, 2019, 3:45:12 PM",
        "toChannelId": 1,
        "toAvatar": 0
    }"#
}

// =============================================================================
// decode_message
// =============================================================================

#[test]
fn decode_message_reads_camel_case_fields() {
    let msg = decode_message(live_frame()).expect("decode should succeed");
    assert_eq!(msg.id, Some(7));
    assert_eq!(msg.from_username, "ada");
    assert_eq!(msg.from_avatar, Some(3));
    assert_eq!(msg.content, "hello");
    assert_eq!(msg.to_channel_id, Some(1));
    assert_eq!(msg.to_username, None);
    assert_eq!(msg.timestamp.map(Timestamp::short_time).as_deref(), Some("3:45 PM"));
}

#[test]
fn decode_message_tolerates_malformed_timestamp() {
    let msg = decode_message(r#"{"fromUsername":"ada","content":"hi","timestamp":"??"}"#)
        .expect("message must survive a bad timestamp");
    assert_eq!(msg.content, "hi");
    assert!(msg.timestamp.is_none());
}

#[test]
fn decode_message_tolerates_null_timestamp() {
    let msg = decode_message(r#"{"fromUsername":"ada","content":"hi","timestamp":null}"#).expect("decode");
    assert!(msg.timestamp.is_none());
}

#[test]
fn decode_message_server_notice_has_empty_sender() {
    let msg = decode_message(r#"{"content":"User bob could not be found"}"#).expect("decode");
    assert!(msg.from_username.is_empty());
    assert!(!msg.is_blank());
}

#[test]
fn decode_message_rejects_empty_text() {
    let err = decode_message("  \n").expect_err("blank text should fail");
    assert!(matches!(err, CodecError::Empty));
}

#[test]
fn decode_message_rejects_non_object() {
    let err = decode_message("[1,2,3]").expect_err("array should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn blank_message_detected() {
    let msg = decode_message(r#"{"fromUsername":"ada","content":""}"#).expect("decode");
    assert!(msg.is_blank());
}

// =============================================================================
// encode_outbound
// =============================================================================

#[test]
fn encode_outbound_uses_wire_field_names() {
    let json = encode_outbound(&OutboundFrame { content: "hey".to_owned(), to_username: "bob".to_owned() });
    let value: serde_json::Value = serde_json::from_str(&json).expect("json");
    assert_eq!(value, serde_json::json!({"content": "hey", "toUsername": "bob"}));
}

// =============================================================================
// REST payloads
// =============================================================================

#[test]
fn channel_snapshot_decodes_roster_lists() {
    let body = br#"{
        "id": 4,
        "name": "general",
        "mods": [{"username": "root", "firstName": "Sys", "lastName": "Op", "isMod": true, "password": "x"}],
        "participants": [{"username": "ada", "firstName": "Ada", "lastName": "L"}]
    }"#;
    let snapshot: ChannelSnapshot = decode_json(body).expect("decode");
    assert_eq!(snapshot.id, 4);
    assert!(snapshot.mods[0].is_mod);
    assert!(!snapshot.participants[0].is_mod);
    assert_eq!(snapshot.participants[0].display_name(), "Ada L");
}

#[test]
fn channel_snapshot_defaults_missing_lists() {
    let snapshot: ChannelSnapshot = decode_json(br#"{"id": 2}"#).expect("decode");
    assert!(snapshot.participants.is_empty());
    assert!(snapshot.mods.is_empty());
}

#[test]
fn display_name_falls_back_to_username() {
    let user = UserSummary { username: "ghost".to_owned(), ..UserSummary::default() };
    assert_eq!(user.display_name(), "ghost");
}

#[test]
fn decode_json_rejects_empty_body() {
    let err = decode_json::<Vec<ChannelSummary>>(b"").expect_err("empty body");
    assert!(matches!(err, CodecError::Empty));
}

//! Snapshot fixtures for representative mid-stream and completed states.

use insta::assert_yaml_snapshot;
use trickle::Parser;

#[test]
fn test_snapshot_partial_object() {
    let mut parser = Parser::new();
    parser.consume(br#"{"name": "Ada", "tags": ["mat"#).unwrap();
    assert_yaml_snapshot!(parser.get().unwrap(), @r###"
    ---
    name: Ada
    tags:
      - mat
    "###);
}

#[test]
fn test_snapshot_partial_array() {
    let mut parser = Parser::new();
    parser.consume(br#"[true, 10, "wor"#).unwrap();
    assert_yaml_snapshot!(parser.get().unwrap(), @r###"
    ---
    - true
    - 10
    - wor
    "###);
}

#[test]
fn test_snapshot_completed_document() {
    let mut parser = Parser::new();
    let chunks: [&[u8]; 3] = [
        br#"{"user": {"id": 7, "#,
        br#""admin": false}, "#,
        br#""names": ["a", "b"]}"#,
    ];
    for chunk in chunks {
        parser.consume(chunk).unwrap();
    }
    assert!(parser.is_complete());
    assert_yaml_snapshot!(parser.get().unwrap(), @r###"
    ---
    user:
      id: 7
      admin: false
    names:
      - a
      - b
    "###);
}

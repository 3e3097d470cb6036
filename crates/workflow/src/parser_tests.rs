// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::definition::StepKind;

const BASIC: &str = r#"
name: research
description: Summarize a topic
steps:
  - id: gather
    type: command
    command: "curl -s https://example.com"
  - id: summarize
    prompt: "Summarize: ${steps.gather.text}"
    on_error:
      strategy: ignore
tool_servers:
  - name: search
    command: ./search-server
    args: ["--port", "0"]
    timeout_seconds: 30
"#;

#[test]
fn parses_basic_workflow() {
    let def = parse_workflow(BASIC.as_bytes()).unwrap();
    assert_eq!(def.name, "research");
    assert_eq!(def.steps.len(), 2);
    assert_eq!(def.steps[0].kind, StepKind::Command);
    assert_eq!(def.steps[1].kind, StepKind::Prompt);
    assert!(def.steps[1].ignores_errors());
    assert_eq!(def.tool_servers.len(), 1);
    assert_eq!(def.tool_servers[0].args, vec!["--port", "0"]);
}

#[test]
fn rejects_missing_name() {
    let err = parse_workflow(b"steps:\n  - id: a\n    prompt: hi\n").unwrap_err();
    assert!(matches!(err, ParseError::Invalid(_)), "got: {err}");
}

#[test]
fn rejects_empty_steps() {
    let err = parse_workflow(b"name: empty\nsteps: []\n").unwrap_err();
    assert!(err.to_string().contains("no steps"));
}

#[test]
fn rejects_duplicate_step_ids() {
    let doc = r#"
name: dup
steps:
  - id: a
    prompt: one
  - id: a
    prompt: two
"#;
    let err = parse_workflow(doc.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("duplicate step id 'a'"));
}

#[test]
fn rejects_command_step_without_command() {
    let doc = r#"
name: bad
steps:
  - id: a
    type: command
"#;
    let err = parse_workflow(doc.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("no command"));
}

#[test]
fn rejects_duplicate_tool_servers() {
    let doc = r#"
name: dup-servers
steps:
  - id: a
    prompt: hi
tool_servers:
  - name: search
    command: ./a
  - name: search
    command: ./b
"#;
    let err = parse_workflow(doc.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("duplicate tool server"));
}

#[test]
fn rejects_invalid_yaml() {
    let err = parse_workflow(b"name: [unclosed").unwrap_err();
    assert!(matches!(err, ParseError::Yaml(_)));
}

#[test]
fn expands_listen_secret_from_env() {
    let doc = r#"
name: hooked
steps:
  - id: a
    prompt: hi
listen:
  api:
    secret: ${SKEIN_TEST_TRIGGER_SECRET}
"#;
    std::env::set_var("SKEIN_TEST_TRIGGER_SECRET", "s3cret");
    let def = parse_workflow(doc.as_bytes()).unwrap();
    assert_eq!(def.listen.unwrap().api.unwrap().secret, "s3cret");
    std::env::remove_var("SKEIN_TEST_TRIGGER_SECRET");
}

#[test]
fn literal_listen_secret_passes_through() {
    let doc = r#"
name: hooked
steps:
  - id: a
    prompt: hi
listen:
  api:
    secret: literal-value
"#;
    let def = parse_workflow(doc.as_bytes()).unwrap();
    assert_eq!(def.listen.unwrap().api.unwrap().secret, "literal-value");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashSet;

#[test]
fn run_id_gen_produces_short_hex() {
    let gen = RunIdGen;
    let id = gen.next();
    assert_eq!(id.len(), 8);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn run_id_gen_does_not_repeat_quickly() {
    let gen = RunIdGen;
    let ids: HashSet<String> = (0..1000).map(|_| gen.next()).collect();
    assert_eq!(ids.len(), 1000);
}

#[test]
fn sequential_gen_counts_up() {
    let gen = SequentialIdGen::new("run");
    assert_eq!(gen.next(), "run-1");
    assert_eq!(gen.next(), "run-2");

    // Clones share the counter
    let clone = gen.clone();
    assert_eq!(clone.next(), "run-3");
}

#[test]
fn short_id_truncates() {
    assert_eq!("abcdef".short(4), "abcd");
    assert_eq!("ab".short(4), "ab");

    let id = RunId::new("0123456789");
    assert_eq!(id.short(8), "01234567");
}

#[test]
fn run_id_compares_with_str() {
    let id = RunId::new("abc123");
    assert_eq!(id, "abc123");
    assert_eq!(id.to_string(), "abc123");
}

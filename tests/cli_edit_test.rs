//! Integration tests for `keys` and `edit`.

mod common;

use common::TestEnv;
use predicates::prelude::*;

const PAIR_1_2: &str = "B1K1V1U2: Reading 1 ➞ Reading 2";

// === keys ===

#[test]
fn test_keys_lists_categories_then_pairs() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    let json = env.json(&["keys", "minimal.xml"]);
    let keys = json["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 9);
    assert_eq!(keys[0]["key"], "category1");
    assert_eq!(keys[0]["kind"], "category");
    assert_eq!(keys[3]["key"], PAIR_1_2);
    assert_eq!(keys[3]["kind"], "pair");
}

#[test]
fn test_keys_human() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    env.rdgai()
        .args(["-H", "keys", "minimal.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("pair\t{}", PAIR_1_2)));
}

// === edit relation-type ===

#[test]
fn test_edit_add_then_remove() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    let json = env.json(&[
        "edit",
        "minimal.xml",
        "added.xml",
        "relation-type",
        PAIR_1_2,
        "category1",
        "add",
    ]);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], format!("Added category1 on {}", PAIR_1_2));
    let added = env.read("added.xml");
    assert!(added.contains(r##"<relation active="1" passive="2" ana="#category1" resp="#editor"/>"##));

    let json = env.json(&[
        "edit",
        "added.xml",
        "removed.xml",
        "relation-type",
        PAIR_1_2,
        "category1",
        "remove",
    ]);
    assert_eq!(json["success"], true);
    assert!(!env.read("removed.xml").contains("<relation "));
}

#[test]
fn test_edit_responsible_flag() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    env.rdgai()
        .args([
            "edit",
            "minimal.xml",
            "out.xml",
            "relation-type",
            PAIR_1_2,
            "category2",
            "add",
            "--responsible",
            "#reviewer",
        ])
        .assert()
        .success();
    assert!(env.read("out.xml").contains(r##"resp="#reviewer""##));
}

#[test]
fn test_edit_unknown_pair_fails_without_writing() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    env.rdgai()
        .args([
            "edit",
            "minimal.xml",
            "out.xml",
            "relation-type",
            "B1K1V1U2: nothing ➞ here",
            "category1",
            "add",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\":false"));
    assert!(!env.path("out.xml").exists());
}

#[test]
fn test_edit_swapped_keys_fail() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    env.rdgai()
        .args([
            "-H",
            "edit",
            "minimal.xml",
            "out.xml",
            "relation-type",
            "category1",
            PAIR_1_2,
            "add",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::starts_with("Failed: "));
}

// === edit description ===

#[test]
fn test_edit_description_set_and_clear() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    env.rdgai()
        .args([
            "edit",
            "minimal.xml",
            "classified.xml",
            "relation-type",
            PAIR_1_2,
            "category1",
            "add",
        ])
        .assert()
        .success();

    let json = env.json(&[
        "edit",
        "classified.xml",
        "described.xml",
        "description",
        PAIR_1_2,
        "Word order",
    ]);
    assert_eq!(json["success"], true);
    assert!(env.read("described.xml").contains("<desc>Word order</desc>"));

    let json = env.json(&[
        "edit",
        "described.xml",
        "cleared.xml",
        "description",
        PAIR_1_2,
    ]);
    assert_eq!(json["message"], format!("Cleared description of {}", PAIR_1_2));
    assert!(!env.read("cleared.xml").contains("<desc>"));
}

//! Integration tests for CSV export and import.

mod common;

use common::TestEnv;
use predicates::prelude::*;

const HEADER: &str = "App ID,Active Reading ID,Passive Reading ID,Active Reading Text,Passive Reading Text,Description,Relation Type(s)";

// === export ===

#[test]
fn test_export_non_redundant_pairs() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    let json = env.json(&["export", "minimal.xml", "pairs.csv"]);
    assert_eq!(json["rows"], 3);
    assert!(json.get("categories").is_none());

    let csv = env.read("pairs.csv");
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(HEADER));
    assert_eq!(
        lines.next(),
        Some("B1K1V1U2,1,2,Reading 1,Reading 2,,")
    );
    assert_eq!(csv.lines().count(), 4);
}

#[test]
fn test_export_all_pairs_with_categories() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    let json = env.json(&[
        "export",
        "minimal.xml",
        "pairs.csv",
        "--all-pairs",
        "--categories",
        "categories.csv",
    ]);
    assert_eq!(json["rows"], 6);
    assert_eq!(json["categories"], 3);

    let categories = env.read("categories.csv");
    assert!(categories.starts_with("Category,Description,Inverse"));
    assert!(categories.contains("category1,Description 1,"));
}

#[test]
fn test_export_human() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    env.rdgai()
        .args(["-H", "export", "minimal.xml", "pairs.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 pairs to pairs.csv"));
}

// === import ===

#[test]
fn test_import_applies_categories() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");
    std::fs::write(
        env.path("pairs.csv"),
        format!(
            "{HEADER}\nB1K1V1U2,1,2,Reading 1,Reading 2,,\nB1K1V1U2,1,3,Reading 1,Reading 3,,category3\n"
        ),
    )
    .unwrap();

    let json = env.json(&[
        "import",
        "minimal.xml",
        "pairs.csv",
        "imported.xml",
        "--responsible",
        "#import",
    ]);
    assert_eq!(json["rows"], 2);
    assert_eq!(json["added"], 1);
    assert_eq!(json["skipped"], 0);

    let xml = env.read("imported.xml");
    assert!(xml.contains(r##"<relation active="1" passive="3" ana="#category3" resp="#import"/>"##));
}

#[test]
fn test_import_default_responsible() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");
    std::fs::write(
        env.path("pairs.csv"),
        format!("{HEADER}\nB1K1V1U2,2,3,Reading 2,Reading 3,Omitted,category1\n"),
    )
    .unwrap();

    env.rdgai()
        .args(["import", "minimal.xml", "pairs.csv", "imported.xml"])
        .assert()
        .success();

    let xml = env.read("imported.xml");
    assert!(xml.contains(r##"ana="#category1" resp="#editor""##));
    assert!(xml.contains("<desc>Omitted</desc>"));
}

#[test]
fn test_import_skips_unknown_rows() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");
    std::fs::write(
        env.path("pairs.csv"),
        format!("{HEADER}\nB9,1,2,x,y,,category1\nB1K1V1U2,1,9,x,y,,category1\n"),
    )
    .unwrap();

    let json = env.json(&["import", "minimal.xml", "pairs.csv", "imported.xml"]);
    assert_eq!(json["rows"], 2);
    assert_eq!(json["skipped"], 2);
    assert_eq!(json["added"], 0);
}

#[test]
fn test_import_missing_columns() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");
    std::fs::write(env.path("pairs.csv"), "Something,Else\n1,2\n").unwrap();

    env.rdgai()
        .args(["-H", "import", "minimal.xml", "pairs.csv", "imported.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    assert!(!env.path("imported.xml").exists());
}

#[test]
fn test_import_missing_spreadsheet() {
    let env = TestEnv::new();
    env.fixture("minimal.xml");

    env.rdgai()
        .args(["import", "minimal.xml", "missing.csv", "imported.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.csv"));
}

// === round trip ===

#[test]
fn test_export_import_keeps_classifications() {
    let env = TestEnv::new();
    env.fixture("messy.xml");

    env.rdgai()
        .args(["clean", "messy.xml", "cleaned.xml"])
        .assert()
        .success();
    env.rdgai()
        .args(["export", "cleaned.xml", "pairs.csv", "--all-pairs"])
        .assert()
        .success();

    let json = env.json(&["import", "cleaned.xml", "pairs.csv", "reimported.xml"]);
    assert_eq!(json["added"], 0);
    assert_eq!(json["removed"], 0);
    assert_eq!(json["descriptions_changed"], 0);

    let before = env.json(&["show", "cleaned.xml"]);
    let after = env.json(&["show", "reimported.xml"]);
    assert_eq!(before, after);
}

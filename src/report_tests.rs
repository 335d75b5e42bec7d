use super::*;
use crate::causal::expression::{ExpressionKind, SuspiciousExpression};
use crate::element::{Element, Granularity};
use crate::spectrum::SbflFormula;
use tempfile::TempDir;

fn create_test_ranking() -> Ranking {
    Ranking::from_scores(
        vec![
            (Element::line("Account", "recalc()", 42), 1.0),
            (Element::line("Account", "recalc()", 40), 0.8),
            (Element::line("Account", "apply()", 17), 0.8),
            (Element::line("Ledger", "total()", 112), 0.5),
        ],
        Granularity::Line,
        SbflFormula::Ochiai,
    )
}

fn expression(class: &str, method: &str, line: u32, value: &str) -> SuspiciousExpression {
    SuspiciousExpression {
        test: "AccountTest#overdraft".to_string(),
        locate_method: Element::method(class, method),
        locate_line: line,
        actual_value: value.to_string(),
        statement_text: "balance = base - fee".to_string(),
        has_nested_call: false,
        direct_variable_names: vec![],
        indirect_variable_names: vec![],
        kind: ExpressionKind::Return,
    }
}

fn create_test_tree() -> CauseTree {
    let mut tree = CauseTree::new();
    let root = tree.attach(tree.root(), expression("Account", "recalc()", 42, "-50"));
    tree.attach(root, expression("Ledger", "total()", 112, "50"));
    tree
}

// ============================================================================
// LOCALIZATION REPORT TESTS
// ============================================================================

#[test]
fn test_localization_report_new() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());

    assert_eq!(report.project_name, "demo");
    assert_eq!(report.ranking.len(), 4);
    assert!(report.cause_tree.is_none());
}

#[test]
fn test_with_cause_tree() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking())
        .with_cause_tree(create_test_tree());

    assert!(report.cause_tree.is_some());
    assert_eq!(report.cause_tree.as_ref().unwrap().expression_count(), 2);
}

// ============================================================================
// TEXT REPORT TESTS
// ============================================================================

#[test]
fn test_to_text_contains_header() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());

    let text = report.to_text(10);

    assert!(text.contains("FAULT LOCALIZATION: demo"));
    assert!(text.contains("Generated:"));
    assert!(text.contains("========"));
}

#[test]
fn test_to_text_contains_ranking_section() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());

    let text = report.to_text(10);

    assert!(text.contains("ochiai formula"));
    assert!(text.contains("line granularity"));
    assert!(text.contains("4 elements"));
    assert!(text.contains("ELEMENT"));
}

#[test]
fn test_to_text_rows_in_score_order_with_tie_ranks() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());

    let text = report.to_text(10);

    assert!(text.contains("1.0000"));
    assert!(text.contains("Account#recalc():42"));
    // The 0.8 pair shares the half-integer rank.
    assert!(text.contains("2.5"));
    let best = text.find("Account#recalc():42").unwrap();
    let worst = text.find("Ledger#total():112").unwrap();
    assert!(best < worst);
}

#[test]
fn test_to_text_clamps_to_top() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());

    let text = report.to_text(2);

    assert!(text.contains("Account#recalc():42"));
    assert!(!text.contains("Ledger#total():112"));
}

#[test]
fn test_to_text_renders_cause_tree_when_present() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking())
        .with_cause_tree(create_test_tree());

    let text = report.to_text(10);

    assert!(text.contains("CAUSE TREE"));
    assert!(text.contains("Ledger#total():112"));
}

#[test]
fn test_to_text_without_cause_tree() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());
    assert!(!report.to_text(10).contains("CAUSE TREE"));
}

// ============================================================================
// MARKDOWN REPORT TESTS
// ============================================================================

#[test]
fn test_to_markdown_contains_header() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());

    let md = report.to_markdown(10);

    assert!(md.contains("# Fault Localization: demo"));
    assert!(md.contains("**Generated:**"));
}

#[test]
fn test_to_markdown_contains_ranking_table() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());

    let md = report.to_markdown(10);

    assert!(md.contains("| # | Rank | Score | Element |"));
    assert!(md.contains("| 1 | 1.0 | 1.0000 | `Account#recalc():42` |"));
    assert!(md.contains("**Formula:** ochiai"));
}

#[test]
fn test_to_markdown_contains_cause_tree_block() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking())
        .with_cause_tree(create_test_tree());

    let md = report.to_markdown(10);

    assert!(md.contains("## Cause Tree"));
    assert!(md.contains("```"));
}

// ============================================================================
// JSON REPORT TESTS
// ============================================================================

#[test]
fn test_to_json_valid() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());

    let json = report.to_json().unwrap();

    assert!(json.contains("\"project_name\""));
    assert!(json.contains("\"demo\""));
    assert!(json.contains("\"ranking\""));
}

#[test]
fn test_to_json_deserialize() {
    let report = LocalizationReport::new("demo".to_string(), create_test_ranking())
        .with_cause_tree(create_test_tree());

    let json = report.to_json().unwrap();
    let deserialized: LocalizationReport = serde_json::from_str(&json).unwrap();

    assert_eq!(report.project_name, deserialized.project_name);
    assert_eq!(report.ranking.len(), deserialized.ranking.len());
    assert_eq!(
        deserialized.cause_tree.as_ref().unwrap().expression_count(),
        2
    );
}

// ============================================================================
// FILE SAVE TESTS
// ============================================================================

#[test]
fn test_save_text() {
    let temp_dir = TempDir::new().unwrap();
    let report_path = temp_dir.path().join("report.txt");

    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());
    report.save(&report_path, ReportFormat::Text, 10).unwrap();

    let content = std::fs::read_to_string(&report_path).unwrap();
    assert!(content.contains("FAULT LOCALIZATION"));
}

#[test]
fn test_save_markdown() {
    let temp_dir = TempDir::new().unwrap();
    let report_path = temp_dir.path().join("report.md");

    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());
    report
        .save(&report_path, ReportFormat::Markdown, 10)
        .unwrap();

    let content = std::fs::read_to_string(&report_path).unwrap();
    assert!(content.contains("# Fault Localization"));
}

#[test]
fn test_save_json() {
    let temp_dir = TempDir::new().unwrap();
    let report_path = temp_dir.path().join("report.json");

    let report = LocalizationReport::new("demo".to_string(), create_test_ranking());
    report.save(&report_path, ReportFormat::Json, 10).unwrap();

    let content = std::fs::read_to_string(&report_path).unwrap();
    assert!(content.contains("\"project_name\""));
}

// ============================================================================
// EDGE CASE TESTS
// ============================================================================

#[test]
fn test_report_with_empty_ranking() {
    let ranking = Ranking::from_scores(vec![], Granularity::Line, SbflFormula::Ochiai);
    let report = LocalizationReport::new("empty".to_string(), ranking);

    let text = report.to_text(10);
    assert!(text.contains("0 elements"));

    let md = report.to_markdown(10);
    assert!(md.contains("**Elements:** 0"));
}

#[test]
fn test_report_format_copy() {
    let format1 = ReportFormat::Text;
    let format2 = format1;
    assert_eq!(format1, format2);
}

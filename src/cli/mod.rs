//! CLI command logic - extracted for testability
//!
//! This module contains pure functions and testable logic extracted from
//! main.rs. Display functions remain in main.rs while argument handling
//! and lookups live here.

use crate::causal::expression::SuspiciousVariable;
use crate::config::CulpaConfig;
use crate::element::{Element, Granularity};
use crate::ranking::{Ranking, RankingError};
use crate::spectrum::SbflFormula;

// ============================================================================
// Element Spec Parsing
// ============================================================================

/// Parse an element spec: `Class`, `Class#method()`, or
/// `Class#method():line`.
pub fn parse_element(spec: &str) -> Option<Element> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }
    match spec.split_once('#') {
        None => Some(Element::class(spec)),
        Some((class, rest)) => {
            if class.is_empty() || rest.is_empty() {
                return None;
            }
            match rest.rsplit_once(':') {
                Some((method, line)) => {
                    if method.is_empty() {
                        return None;
                    }
                    let line = line.parse::<u32>().ok()?;
                    Some(Element::line(class, method, line))
                }
                None => Some(Element::method(class, rest)),
            }
        }
    }
}

// ============================================================================
// Settings Resolution
// ============================================================================

/// Effective ranking settings after merging flags over the config file.
#[derive(Debug, Clone, Copy)]
pub struct RankSettings {
    pub formula: SbflFormula,
    pub granularity: Granularity,
    pub top: usize,
}

/// Explicit flags win; anything left unset comes from the config.
pub fn resolve_rank_settings(
    config: &CulpaConfig,
    formula: Option<SbflFormula>,
    granularity: Option<Granularity>,
    top: Option<usize>,
) -> RankSettings {
    RankSettings {
        formula: formula.unwrap_or(config.ranking.formula),
        granularity: granularity.unwrap_or(config.ranking.granularity),
        top: top.unwrap_or(config.ranking.top),
    }
}

// ============================================================================
// Seed Construction
// ============================================================================

/// Build the probe seed from command-line parts. Field seeds scope to the
/// class; local seeds need the enclosing method.
pub fn seed_from_args(
    test: &str,
    class: &str,
    method: Option<&str>,
    name: &str,
    value: &str,
    field: bool,
    array_index: Option<u32>,
) -> Result<SuspiciousVariable, String> {
    let seed = if field {
        SuspiciousVariable::field(test, class, name, value)
    } else {
        let method = method
            .ok_or_else(|| "--method is required for local variable seeds".to_string())?;
        SuspiciousVariable::local(test, Element::method(class, method), name, value)
    };
    Ok(match array_index {
        Some(index) => seed.with_array_index(index),
        None => seed,
    })
}

// ============================================================================
// Ranking Queries
// ============================================================================

/// Rank and score of a named element, for `--show` queries.
pub fn rank_query(ranking: &Ranking, spec: &str) -> Result<(f64, f64), RankingError> {
    let element =
        parse_element(spec).ok_or_else(|| RankingError::ElementNotFound(spec.to_string()))?;
    match (ranking.rank_of(&element), ranking.score_of(&element)) {
        (Some(rank), Some(score)) => Ok((rank, score)),
        _ => Err(RankingError::ElementNotFound(spec.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    // ========================================================================
    // CLI-001: Element spec parsing tests
    // ========================================================================

    #[test]
    fn test_CLI_001_parse_class_spec() {
        assert_eq!(parse_element("Account"), Some(Element::class("Account")));
        assert_eq!(
            parse_element("  Account  "),
            Some(Element::class("Account"))
        );
    }

    #[test]
    fn test_CLI_001_parse_method_spec() {
        assert_eq!(
            parse_element("Account#withdraw(int)"),
            Some(Element::method("Account", "withdraw(int)"))
        );
    }

    #[test]
    fn test_CLI_001_parse_line_spec() {
        assert_eq!(
            parse_element("Account#withdraw(int):42"),
            Some(Element::line("Account", "withdraw(int)", 42))
        );
    }

    #[test]
    fn test_CLI_001_parse_invalid_specs() {
        assert_eq!(parse_element(""), None);
        assert_eq!(parse_element("#withdraw(int)"), None);
        assert_eq!(parse_element("Account#"), None);
        assert_eq!(parse_element("Account#withdraw(int):not-a-line"), None);
        assert_eq!(parse_element("Account#:42"), None);
    }

    // ========================================================================
    // CLI-002: Settings resolution tests
    // ========================================================================

    #[test]
    fn test_CLI_002_flags_override_config() {
        let config = CulpaConfig::default();
        let settings = resolve_rank_settings(
            &config,
            Some(SbflFormula::Jaccard),
            Some(Granularity::Method),
            Some(3),
        );

        assert_eq!(settings.formula, SbflFormula::Jaccard);
        assert_eq!(settings.granularity, Granularity::Method);
        assert_eq!(settings.top, 3);
    }

    #[test]
    fn test_CLI_002_config_fills_unset_flags() {
        let mut config = CulpaConfig::default();
        config.ranking.formula = SbflFormula::Tarantula;
        config.ranking.top = 25;

        let settings = resolve_rank_settings(&config, None, None, None);

        assert_eq!(settings.formula, SbflFormula::Tarantula);
        assert_eq!(settings.granularity, Granularity::Line);
        assert_eq!(settings.top, 25);
    }

    // ========================================================================
    // CLI-003: Seed construction tests
    // ========================================================================

    #[test]
    fn test_CLI_003_field_seed_scopes_to_class() {
        let seed = seed_from_args(
            "AccountTest#overdraft",
            "Account",
            None,
            "balance",
            "-50",
            true,
            None,
        )
        .unwrap();

        assert!(seed.is_field);
        assert_eq!(seed.locate_scope, Element::class("Account"));
        assert_eq!(seed.actual_value, "-50");
    }

    #[test]
    fn test_CLI_003_local_seed_needs_method() {
        let seed = seed_from_args(
            "AccountTest#overdraft",
            "Account",
            Some("recalc()"),
            "base",
            "50",
            false,
            None,
        )
        .unwrap();

        assert!(!seed.is_field);
        assert_eq!(seed.locate_scope, Element::method("Account", "recalc()"));
    }

    #[test]
    fn test_CLI_003_local_seed_without_method_fails() {
        let err = seed_from_args(
            "AccountTest#overdraft",
            "Account",
            None,
            "base",
            "50",
            false,
            None,
        )
        .unwrap_err();

        assert!(err.contains("--method"));
    }

    #[test]
    fn test_CLI_003_array_index_marks_array() {
        let seed = seed_from_args(
            "AccountTest#overdraft",
            "Account",
            None,
            "entries",
            "0",
            true,
            Some(2),
        )
        .unwrap();

        assert!(seed.is_array);
        assert_eq!(seed.array_index, Some(2));
    }

    // ========================================================================
    // CLI-004: Ranking query tests
    // ========================================================================

    fn sample_ranking() -> Ranking {
        Ranking::from_scores(
            vec![
                (Element::line("Account", "recalc()", 42), 1.0),
                (Element::line("Account", "recalc()", 40), 0.5),
            ],
            Granularity::Line,
            SbflFormula::Ochiai,
        )
    }

    #[test]
    fn test_CLI_004_rank_query_found() {
        let ranking = sample_ranking();
        let (rank, score) = rank_query(&ranking, "Account#recalc():42").unwrap();

        assert_eq!(rank, 1.0);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_CLI_004_rank_query_absent_element() {
        let ranking = sample_ranking();
        let err = rank_query(&ranking, "Other#f():1").unwrap_err();
        assert!(matches!(err, RankingError::ElementNotFound(_)));
    }

    #[test]
    fn test_CLI_004_rank_query_malformed_spec() {
        let ranking = sample_ranking();
        let err = rank_query(&ranking, "Account#").unwrap_err();
        assert!(matches!(err, RankingError::ElementNotFound(_)));
    }
}

//! Coverage spectra and suspiciousness formulas.
//!
//! Aggregates per-test coverage into per-element `(ep, ef, np, nf)` counts
//! and scores them with the classic SBFL formulas. Formula evaluation is a
//! pure function of the counts; aggregation is the only stateful part.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::element::{Element, Granularity};
use crate::services::{CoverageSource, ServiceError};

/// Suspiciousness formula applied to per-element coverage counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SbflFormula {
    /// Tarantula (Jones et al. 2002).
    Tarantula,
    /// Ochiai similarity coefficient, the usual default for SBFL.
    #[default]
    Ochiai,
    /// Jaccard similarity coefficient.
    Jaccard,
    /// AMPLE: absolute difference of failing and passing execution ratios.
    Ample,
}

impl std::fmt::Display for SbflFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SbflFormula::Tarantula => write!(f, "tarantula"),
            SbflFormula::Ochiai => write!(f, "ochiai"),
            SbflFormula::Jaccard => write!(f, "jaccard"),
            SbflFormula::Ample => write!(f, "ample"),
        }
    }
}

impl SbflFormula {
    /// Score one element's counts.
    ///
    /// Only Ochiai maps its zero denominator to 0. The other formulas
    /// return raw IEEE results, so 0/0 yields NaN; the ranking stores
    /// such scores as 0 when entries are built.
    pub fn score(&self, counts: &SbflCounts) -> f64 {
        let ep = f64::from(counts.ep);
        let ef = f64::from(counts.ef);
        let np = f64::from(counts.np);
        let nf = f64::from(counts.nf);

        match self {
            SbflFormula::Tarantula => {
                let fail_ratio = ef / (ef + nf);
                let pass_ratio = ep / (ep + np);
                fail_ratio / (fail_ratio + pass_ratio)
            }
            SbflFormula::Ochiai => {
                let denom = ((ef + nf) * (ef + ep)).sqrt();
                if denom > 0.0 {
                    ef / denom
                } else {
                    0.0
                }
            }
            SbflFormula::Jaccard => ef / (ef + nf + ep),
            SbflFormula::Ample => (ef / (ef + nf) - ep / (ep + np)).abs(),
        }
    }
}

/// Per-element coverage counts across passing and failing executions.
///
/// `np` and `nf` are derived from suite totals, never tallied on their
/// own; `ep + ef + np + nf` is not constant across elements because
/// unreachable lines are excluded upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SbflCounts {
    /// Passing executions that touched the element.
    pub ep: u32,
    /// Failing executions that touched the element.
    pub ef: u32,
    /// Passing executions that did not touch it.
    pub np: u32,
    /// Failing executions that did not touch it.
    pub nf: u32,
}

impl SbflCounts {
    pub fn new(ep: u32, ef: u32, np: u32, nf: u32) -> Self {
        Self { ep, ef, np, nf }
    }

    /// Derive the not-executed counts from suite totals.
    pub fn from_totals(ep: u32, ef: u32, total_passed: u32, total_failed: u32) -> Self {
        Self {
            ep,
            ef,
            np: total_passed.saturating_sub(ep),
            nf: total_failed.saturating_sub(ef),
        }
    }
}

/// One test method's outcome plus the elements it executed. This is the
/// record format of coverage report files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecution {
    /// Test identifier, conventionally `TestClass#testMethod`.
    pub test: String,
    pub passed: bool,
    pub executed: Vec<Element>,
}

/// Aggregated coverage spectrum: per-element executed tallies plus suite
/// totals, at a fixed granularity.
#[derive(Debug, Clone)]
pub struct SpectrumData {
    granularity: Granularity,
    executed_passing: HashMap<Element, u32>,
    executed_failing: HashMap<Element, u32>,
    total_passed: u32,
    total_failed: u32,
}

impl SpectrumData {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            executed_passing: HashMap::new(),
            executed_failing: HashMap::new(),
            total_passed: 0,
            total_failed: 0,
        }
    }

    /// Aggregate a batch of executions.
    pub fn from_executions(executions: &[TestExecution], granularity: Granularity) -> Self {
        let mut spectrum = Self::new(granularity);
        for execution in executions {
            spectrum.add_execution(execution);
        }
        debug!(
            tests = executions.len(),
            elements = spectrum.element_count(),
            granularity = %granularity,
            "aggregated coverage spectrum"
        );
        spectrum
    }

    /// Fold one test execution into the spectrum. Each element counts at
    /// most once per execution, however many of its lines ran.
    pub fn add_execution(&mut self, execution: &TestExecution) {
        let touched: HashSet<Element> = execution
            .executed
            .iter()
            .map(|e| e.coarsen(self.granularity))
            .collect();

        let tally = if execution.passed {
            self.total_passed += 1;
            &mut self.executed_passing
        } else {
            self.total_failed += 1;
            &mut self.executed_failing
        };
        for element in touched {
            *tally.entry(element).or_insert(0) += 1;
        }
    }

    /// Counts for one element, with `np`/`nf` derived from the totals.
    pub fn counts(&self, element: &Element) -> SbflCounts {
        let ep = self.executed_passing.get(element).copied().unwrap_or(0);
        let ef = self.executed_failing.get(element).copied().unwrap_or(0);
        SbflCounts::from_totals(ep, ef, self.total_passed, self.total_failed)
    }

    /// Every element touched by at least one execution, in natural order.
    pub fn elements(&self) -> Vec<Element> {
        let mut all: HashSet<&Element> = self.executed_passing.keys().collect();
        all.extend(self.executed_failing.keys());
        let mut elements: Vec<Element> = all.into_iter().cloned().collect();
        elements.sort();
        elements
    }

    pub fn element_count(&self) -> usize {
        let mut all: HashSet<&Element> = self.executed_passing.keys().collect();
        all.extend(self.executed_failing.keys());
        all.len()
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn total_passed(&self) -> u32 {
        self.total_passed
    }

    pub fn total_failed(&self) -> u32 {
        self.total_failed
    }
}

/// Load a JSON coverage report: an array of test-execution records.
pub fn load_coverage_report(path: &Path) -> anyhow::Result<Vec<TestExecution>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading coverage report {}", path.display()))?;
    let executions: Vec<TestExecution> = serde_json::from_str(&content)
        .with_context(|| format!("parsing coverage report {}", path.display()))?;
    Ok(executions)
}

/// An in-memory coverage report, answering per-test-class collection
/// queries from its records.
#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    executions: Vec<TestExecution>,
}

impl CoverageReport {
    pub fn new(executions: Vec<TestExecution>) -> Self {
        Self { executions }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(load_coverage_report(path)?))
    }

    pub fn executions(&self) -> &[TestExecution] {
        &self.executions
    }
}

impl CoverageSource for CoverageReport {
    fn collect(&self, test_class: &str) -> Result<Vec<TestExecution>, ServiceError> {
        let prefix = format!("{test_class}#");
        let matched: Vec<TestExecution> = self
            .executions
            .iter()
            .filter(|e| e.test.starts_with(&prefix))
            .cloned()
            .collect();
        if matched.is_empty() {
            return Err(ServiceError::UnknownTest(test_class.to_string()));
        }
        Ok(matched)
    }
}

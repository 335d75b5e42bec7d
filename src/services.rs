//! Collaborator service contracts.
//!
//! The core algorithms never parse source, run tests, or instrument a
//! runtime themselves; they consume these blocking interfaces. Real
//! deployments back them with an analysis daemon and an instrumented test
//! runner; [`crate::replay`] backs them with a recorded session bundle so
//! everything works offline. Calls may be slow (tracing re-executes a
//! test), so the trace-facing operations take an explicit timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::causal::expression::SuspiciousExpression;
use crate::element::{Element, LineRange};
use crate::spectrum::TestExecution;

/// Failure of a collaborator call. Fatal when it happens while explaining
/// the probe seed; degraded to a skipped branch anywhere else.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("source not found for class {0}")]
    SourceNotFound(String),
    #[error("class not found: {0}")]
    ClassNotFound(String),
    #[error("unknown test id: {0}")]
    UnknownTest(String),
    #[error("trace timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed trace: {0}")]
    MalformedTrace(String),
}

/// Static facts about one statement, enough to build a
/// [`SuspiciousExpression`] for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementInfo {
    pub text: String,
    /// Names the statement reads directly.
    pub direct_variable_names: Vec<String>,
    /// Names reachable only through calls or aliasing.
    pub indirect_variable_names: Vec<String>,
    pub has_nested_call: bool,
}

/// One entry of a value trace: the value a variable held after the
/// statement at `line` ran, stamped with a monotonic event counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceObservation {
    pub line: u32,
    pub value: String,
    pub timestamp: u64,
}

/// Source-level static analysis of the program under test.
pub trait StaticAnalysis {
    /// Method element enclosing the given line.
    fn enclosing_method(&self, class: &str, line: u32) -> Result<Element, ServiceError>;

    /// Lines where `name` is declared within `scope` (method body for
    /// locals, whole class for fields).
    fn declaration_lines(&self, scope: &Element, name: &str) -> Result<Vec<u32>, ServiceError>;

    /// Statement ranges within `scope` that assign to or increment
    /// `name`. `is_field` selects field-access matching over plain-name
    /// matching.
    fn mutating_lines(
        &self,
        scope: &Element,
        name: &str,
        is_field: bool,
    ) -> Result<Vec<LineRange>, ServiceError>;

    /// Facts about the statement at `line` of `method`.
    fn statement_at(&self, method: &Element, line: u32) -> Result<StatementInfo, ServiceError>;

    /// Whether `name` resolves to a field of `class`.
    fn is_field(&self, class: &str, name: &str) -> Result<bool, ServiceError>;
}

/// Dynamic value tracing of the failing test execution.
pub trait ValueTrace {
    /// Chronological values `name` took at the candidate lines during the
    /// failing run.
    fn value_trace(
        &self,
        test: &str,
        scope: &Element,
        name: &str,
        candidate_lines: &[u32],
        timeout: Duration,
    ) -> Result<Vec<TraceObservation>, ServiceError>;

    /// The last value `name` held during the failing run, if any was
    /// observed.
    fn last_observed_value(
        &self,
        test: &str,
        scope: &Element,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ServiceError>;
}

/// Search for the expressions behind parameter bindings and nested calls.
pub trait CallSearch {
    /// Call-site argument expression bound to `param` of `method` in its
    /// caller, when the traced execution recorded one.
    fn argument_expression(
        &self,
        test: &str,
        method: &Element,
        param: &str,
    ) -> Result<Option<SuspiciousExpression>, ServiceError>;

    /// Return expressions of every method directly invoked from the given
    /// expression's statement during the traced execution. A loop or a
    /// polymorphic call site may yield several.
    fn invoked_returns(
        &self,
        expr: &SuspiciousExpression,
    ) -> Result<Vec<SuspiciousExpression>, ServiceError>;
}

/// Test-coverage collection: per test method, the pass/fail outcome and
/// the elements it executed.
pub trait CoverageSource {
    /// Executions belonging to one test class.
    fn collect(&self, test_class: &str) -> Result<Vec<TestExecution>, ServiceError>;
}

//! Breadth-first cause-tree construction.
//!
//! The probe explains a seed variable, then repeatedly expands each
//! explained expression: its directly referenced variables go through
//! the cause-line finder, and statements with nested calls pull in the
//! return expressions of the methods they invoked. Every variable is
//! explained at most once and every distinct expression appears in the
//! tree at most once.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::causal::expression::{ExpressionIdentity, SuspiciousExpression, SuspiciousVariable};
use crate::causal::finder::CauseLineFinder;
use crate::causal::tree::CauseTree;
use crate::services::{CallSearch, ServiceError, StaticAnalysis, ValueTrace};

/// Fatal probe failures. Only the seed can fail the run; any trouble
/// after that costs a branch, never the tree.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("no cause line found for seed {0}")]
    SeedUnexplained(String),
    #[error("explaining seed failed: {0}")]
    Seed(#[from] ServiceError),
}

/// Cooperative cancellation flag, checked between queue pops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Breadth-first explorer growing a cause tree from one seed variable.
pub struct CauseProbe<'a> {
    statics: &'a dyn StaticAnalysis,
    traces: &'a dyn ValueTrace,
    calls: &'a dyn CallSearch,
    trace_timeout: Duration,
    cancel: CancelToken,
}

impl<'a> CauseProbe<'a> {
    pub fn new(
        statics: &'a dyn StaticAnalysis,
        traces: &'a dyn ValueTrace,
        calls: &'a dyn CallSearch,
        trace_timeout: Duration,
    ) -> Self {
        Self {
            statics,
            traces,
            calls,
            trace_timeout,
            cancel: CancelToken::new(),
        }
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build the cause tree for a seed observation.
    ///
    /// Collaborator failures while explaining the seed are fatal; after
    /// that each one is logged and skipped. Cancellation stops expansion
    /// between queue pops and returns whatever was built so far, which
    /// is always a valid tree.
    pub fn run(&self, seed: &SuspiciousVariable) -> Result<CauseTree, ProbeError> {
        let finder =
            CauseLineFinder::new(self.statics, self.traces, self.calls, self.trace_timeout);

        let mut investigated: HashSet<SuspiciousVariable> = HashSet::new();
        investigated.insert(seed.clone());

        let root_expr = finder
            .find(seed)?
            .ok_or_else(|| ProbeError::SeedUnexplained(seed.to_string()))?;

        let mut tree = CauseTree::new();
        tree.attach(tree.root(), root_expr.clone());
        let mut queue: VecDeque<SuspiciousExpression> = VecDeque::new();
        queue.push_back(root_expr);

        while let Some(expr) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                warn!("cancelled, returning partial cause tree");
                break;
            }
            debug!(location = %expr.location(), "expanding");

            let mut children: Vec<SuspiciousExpression> = Vec::new();

            for name in &expr.direct_variable_names {
                match self.derive_variable(&expr, name) {
                    Ok(Some(variable)) => {
                        if !investigated.insert(variable.clone()) {
                            continue;
                        }
                        match finder.find(&variable) {
                            Ok(Some(child)) => children.push(child),
                            Ok(None) => {
                                debug!(variable = %name, "unexplained, branch stops");
                            }
                            Err(err) => {
                                warn!(
                                    variable = %name,
                                    error = %err,
                                    "cause search failed, skipping branch"
                                );
                            }
                        }
                    }
                    Ok(None) => debug!(variable = %name, "no recorded value, skipping"),
                    Err(err) => {
                        warn!(
                            variable = %name,
                            error = %err,
                            "variable lookup failed, skipping"
                        );
                    }
                }
            }

            if expr.has_nested_call {
                match self.calls.invoked_returns(&expr) {
                    Ok(returns) => {
                        let mut seen: HashSet<ExpressionIdentity> =
                            children.iter().map(SuspiciousExpression::identity).collect();
                        for ret in returns {
                            if seen.insert(ret.identity()) {
                                children.push(ret);
                            }
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "return search failed, skipping nested calls");
                    }
                }
            }

            let parent = tree.expect_node(&expr.identity());
            for child in children {
                if tree.contains(&child.identity()) {
                    continue;
                }
                tree.attach(parent, child.clone());
                queue.push_back(child);
            }
        }

        debug!(expressions = tree.expression_count(), "cause tree built");
        Ok(tree)
    }

    /// Build the observation for a name referenced by `expr`: field
    /// classification from static analysis, value from the trace.
    /// `Ok(None)` when the run never recorded a value for the name.
    fn derive_variable(
        &self,
        expr: &SuspiciousExpression,
        name: &str,
    ) -> Result<Option<SuspiciousVariable>, ServiceError> {
        let class = &expr.locate_method.class_name;
        let is_field = self.statics.is_field(class, name)?;
        let scope = if is_field {
            expr.locate_method.enclosing_class()
        } else {
            expr.locate_method.enclosing_method()
        };
        let value = match self.traces.last_observed_value(
            &expr.test,
            &scope,
            name,
            self.trace_timeout,
        )? {
            Some(value) => value,
            None => return Ok(None),
        };
        Ok(Some(SuspiciousVariable {
            test: expr.test.clone(),
            locate_scope: scope,
            name: name.to_string(),
            actual_value: value,
            is_field,
            is_array: false,
            array_index: None,
        }))
    }
}

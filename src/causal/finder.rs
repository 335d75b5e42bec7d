//! Cause-line pattern matching.
//!
//! Explains one observed variable: which statement last gave it the value
//! it was seen holding. Two patterns are tried in order. "Assigned" looks
//! for the latest traced assignment producing the value; "argument" falls
//! back to the call site that bound the value to a parameter.

use std::time::Duration;

use tracing::debug;

use crate::causal::expression::{ExpressionKind, SuspiciousExpression, SuspiciousVariable};
use crate::element::LineRange;
use crate::services::{CallSearch, ServiceError, StaticAnalysis, TraceObservation, ValueTrace};

/// Pattern matcher over static facts and one failing run's value traces.
pub struct CauseLineFinder<'a> {
    statics: &'a dyn StaticAnalysis,
    traces: &'a dyn ValueTrace,
    calls: &'a dyn CallSearch,
    trace_timeout: Duration,
}

impl<'a> CauseLineFinder<'a> {
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
        }
    }

    /// Explain one variable observation.
    ///
    /// `Ok(None)` means the variable cannot be explained further and its
    /// branch stops; `Err` is a collaborator failure left to the caller's
    /// policy (fatal for a probe seed, skipped mid-expansion).
    pub fn find(
        &self,
        variable: &SuspiciousVariable,
    ) -> Result<Option<SuspiciousExpression>, ServiceError> {
        let scope = &variable.locate_scope;
        let declarations = self.statics.declaration_lines(scope, &variable.name)?;
        let mutations = self
            .statics
            .mutating_lines(scope, &variable.name, variable.is_field)?;

        let mut candidate_lines: Vec<u32> = mutations
            .iter()
            .flat_map(|range| range.start..=range.end)
            .collect();
        candidate_lines.extend(&declarations);
        candidate_lines.sort_unstable();
        candidate_lines.dedup();

        let trace = self.traces.value_trace(
            &variable.test,
            scope,
            &variable.name,
            &candidate_lines,
            self.trace_timeout,
        )?;

        if let Some(observation) = latest_assignment(&trace, &mutations, &variable.actual_value) {
            let method = self
                .statics
                .enclosing_method(&scope.class_name, observation.line)?;
            let info = self.statics.statement_at(&method, observation.line)?;
            debug!(
                variable = %variable.name,
                line = observation.line,
                "matched assignment"
            );
            return Ok(Some(SuspiciousExpression {
                test: variable.test.clone(),
                locate_method: method,
                locate_line: observation.line,
                actual_value: variable.actual_value.clone(),
                statement_text: info.text,
                has_nested_call: info.has_nested_call,
                direct_variable_names: info.direct_variable_names,
                indirect_variable_names: info.indirect_variable_names,
                kind: ExpressionKind::Assignment {
                    target: variable.clone(),
                },
            }));
        }

        if variable.is_field {
            // A field never caught changing at a located assignment has
            // no further explanation.
            debug!(variable = %variable.name, "field with no qualifying assignment");
            return Ok(None);
        }

        // Presume a parameter already holding the value at method entry
        // and look for the call-site argument that bound it.
        let argument = self
            .calls
            .argument_expression(&variable.test, scope, &variable.name)?;
        if argument.is_none() {
            debug!(variable = %variable.name, "no cause line found");
        }
        Ok(argument)
    }
}

/// Latest trace entry that lies on a mutating line and carries the wanted
/// value. Later observations win regardless of trace order.
fn latest_assignment<'t>(
    trace: &'t [TraceObservation],
    mutations: &[LineRange],
    actual_value: &str,
) -> Option<&'t TraceObservation> {
    trace
        .iter()
        .filter(|obs| obs.value == actual_value)
        .filter(|obs| mutations.iter().any(|range| range.contains(obs.line)))
        .max_by_key(|obs| obs.timestamp)
}

//! Session replay.
//!
//! A session bundle is a recorded JSON snapshot of one failing test:
//! per-statement static facts, per-variable declaration and mutation
//! lines, the chronological value traces, and the argument/return
//! expressions observed at call sites. The bundle answers every
//! collaborator contract from recorded data, so localization runs
//! offline and deterministically.
//!
//! Queries that miss return the contract's "not found" value where the
//! contract has one; asking about a test the bundle was not recorded for
//! is a service failure, the same as a live collaborator would report.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::causal::expression::SuspiciousExpression;
use crate::element::{Element, LineRange};
use crate::services::{
    CallSearch, ServiceError, StatementInfo, StaticAnalysis, TraceObservation, ValueTrace,
};

/// Static facts about the statement at one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub class: String,
    /// Signature of the enclosing method.
    pub method: String,
    pub line: u32,
    pub info: StatementInfo,
}

/// Declaration/mutation facts about one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub class: String,
    /// `None` for fields, which are scoped to the whole class.
    pub method: Option<String>,
    pub name: String,
    pub is_field: bool,
    pub declaration_lines: Vec<u32>,
    pub mutating_lines: Vec<LineRange>,
}

/// Chronological observations of one variable during the failing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub class: String,
    pub method: Option<String>,
    pub name: String,
    pub observations: Vec<TraceObservation>,
}

/// Call-site argument expression recorded for one parameter binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentRecord {
    /// Callee class and method signature.
    pub class: String,
    pub method: String,
    pub param: String,
    pub expression: SuspiciousExpression,
}

/// Return expressions of the calls made from one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub class: String,
    pub method: String,
    pub line: u32,
    pub expressions: Vec<SuspiciousExpression>,
}

/// Recorded session for one failing test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionBundle {
    /// Test id the dynamic facts belong to.
    pub test: String,
    pub statements: Vec<StatementRecord>,
    pub variables: Vec<VariableRecord>,
    pub traces: Vec<TraceRecord>,
    pub arguments: Vec<ArgumentRecord>,
    pub returns: Vec<ReturnRecord>,
}

impl SessionBundle {
    pub fn new(test: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            ..Default::default()
        }
    }

    pub fn with_statement(
        mut self,
        class: &str,
        method: &str,
        line: u32,
        info: StatementInfo,
    ) -> Self {
        self.statements.push(StatementRecord {
            class: class.to_string(),
            method: method.to_string(),
            line,
            info,
        });
        self
    }

    pub fn with_local(
        mut self,
        class: &str,
        method: &str,
        name: &str,
        declaration_lines: Vec<u32>,
        mutating_lines: Vec<LineRange>,
    ) -> Self {
        self.variables.push(VariableRecord {
            class: class.to_string(),
            method: Some(method.to_string()),
            name: name.to_string(),
            is_field: false,
            declaration_lines,
            mutating_lines,
        });
        self
    }

    pub fn with_field(
        mut self,
        class: &str,
        name: &str,
        declaration_lines: Vec<u32>,
        mutating_lines: Vec<LineRange>,
    ) -> Self {
        self.variables.push(VariableRecord {
            class: class.to_string(),
            method: None,
            name: name.to_string(),
            is_field: true,
            declaration_lines,
            mutating_lines,
        });
        self
    }

    pub fn with_trace(
        mut self,
        class: &str,
        method: Option<&str>,
        name: &str,
        observations: Vec<TraceObservation>,
    ) -> Self {
        self.traces.push(TraceRecord {
            class: class.to_string(),
            method: method.map(str::to_string),
            name: name.to_string(),
            observations,
        });
        self
    }

    pub fn with_argument(
        mut self,
        class: &str,
        method: &str,
        param: &str,
        expression: SuspiciousExpression,
    ) -> Self {
        self.arguments.push(ArgumentRecord {
            class: class.to_string(),
            method: method.to_string(),
            param: param.to_string(),
            expression,
        });
        self
    }

    pub fn with_returns(
        mut self,
        class: &str,
        method: &str,
        line: u32,
        expressions: Vec<SuspiciousExpression>,
    ) -> Self {
        self.returns.push(ReturnRecord {
            class: class.to_string(),
            method: method.to_string(),
            line,
            expressions,
        });
        self
    }

    /// Write the bundle as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing session bundle {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading session bundle {}", path.display()))?;
        let bundle: SessionBundle = serde_json::from_str(&content)
            .with_context(|| format!("parsing session bundle {}", path.display()))?;
        Ok(bundle)
    }

    fn guard_test(&self, test: &str) -> Result<(), ServiceError> {
        if test == self.test {
            Ok(())
        } else {
            Err(ServiceError::UnknownTest(test.to_string()))
        }
    }

    fn statement_record(&self, class: &str, line: u32) -> Option<&StatementRecord> {
        self.statements
            .iter()
            .find(|rec| rec.class == class && rec.line == line)
    }

    fn variable_record(&self, scope: &Element, name: &str) -> Option<&VariableRecord> {
        self.variables.iter().find(|rec| {
            rec.class == scope.class_name
                && rec.method.as_deref() == scope.method.as_deref()
                && rec.name == name
        })
    }

    fn trace_record(&self, scope: &Element, name: &str) -> Option<&TraceRecord> {
        self.traces.iter().find(|rec| {
            rec.class == scope.class_name
                && rec.method.as_deref() == scope.method.as_deref()
                && rec.name == name
        })
    }
}

impl StaticAnalysis for SessionBundle {
    fn enclosing_method(&self, class: &str, line: u32) -> Result<Element, ServiceError> {
        match self.statement_record(class, line) {
            Some(rec) => Ok(Element::method(class, rec.method.clone())),
            None => Err(ServiceError::SourceNotFound(format!("{class}:{line}"))),
        }
    }

    fn declaration_lines(&self, scope: &Element, name: &str) -> Result<Vec<u32>, ServiceError> {
        Ok(self
            .variable_record(scope, name)
            .map(|rec| rec.declaration_lines.clone())
            .unwrap_or_default())
    }

    fn mutating_lines(
        &self,
        scope: &Element,
        name: &str,
        is_field: bool,
    ) -> Result<Vec<LineRange>, ServiceError> {
        Ok(self
            .variable_record(scope, name)
            .filter(|rec| rec.is_field == is_field)
            .map(|rec| rec.mutating_lines.clone())
            .unwrap_or_default())
    }

    fn statement_at(&self, method: &Element, line: u32) -> Result<StatementInfo, ServiceError> {
        match self.statement_record(&method.class_name, line) {
            Some(rec) => Ok(rec.info.clone()),
            None => Err(ServiceError::SourceNotFound(format!(
                "{}:{line}",
                method.class_name
            ))),
        }
    }

    fn is_field(&self, class: &str, name: &str) -> Result<bool, ServiceError> {
        Ok(self
            .variables
            .iter()
            .any(|rec| rec.class == class && rec.name == name && rec.is_field))
    }
}

impl ValueTrace for SessionBundle {
    fn value_trace(
        &self,
        test: &str,
        scope: &Element,
        name: &str,
        candidate_lines: &[u32],
        _timeout: Duration,
    ) -> Result<Vec<TraceObservation>, ServiceError> {
        self.guard_test(test)?;
        Ok(self
            .trace_record(scope, name)
            .map(|rec| {
                rec.observations
                    .iter()
                    .filter(|obs| candidate_lines.contains(&obs.line))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn last_observed_value(
        &self,
        test: &str,
        scope: &Element,
        name: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, ServiceError> {
        self.guard_test(test)?;
        Ok(self.trace_record(scope, name).and_then(|rec| {
            rec.observations
                .iter()
                .max_by_key(|obs| obs.timestamp)
                .map(|obs| obs.value.clone())
        }))
    }
}

impl CallSearch for SessionBundle {
    fn argument_expression(
        &self,
        test: &str,
        method: &Element,
        param: &str,
    ) -> Result<Option<SuspiciousExpression>, ServiceError> {
        self.guard_test(test)?;
        Ok(self
            .arguments
            .iter()
            .find(|rec| {
                rec.class == method.class_name
                    && Some(rec.method.as_str()) == method.method.as_deref()
                    && rec.param == param
            })
            .map(|rec| rec.expression.clone()))
    }

    fn invoked_returns(
        &self,
        expr: &SuspiciousExpression,
    ) -> Result<Vec<SuspiciousExpression>, ServiceError> {
        self.guard_test(&expr.test)?;
        Ok(self
            .returns
            .iter()
            .find(|rec| {
                rec.class == expr.locate_method.class_name
                    && Some(rec.method.as_str()) == expr.locate_method.method.as_deref()
                    && rec.line == expr.locate_line
            })
            .map(|rec| rec.expressions.clone())
            .unwrap_or_default())
    }
}

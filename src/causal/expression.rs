//! Suspicious variables and the expressions that explain them.

use serde::{Deserialize, Serialize};

use crate::element::Element;

/// A runtime variable observed to hold a wrong value.
///
/// Identity is structural over every field: the same scope, name, value,
/// and flags denote the same observation no matter how it was reached,
/// which is what keeps a variable from being explained twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuspiciousVariable {
    /// Failing test id, conventionally `TestClass#testMethod`.
    pub test: String,
    /// Scope the variable lives in: a method element for locals and
    /// parameters, a class element for fields.
    pub locate_scope: Element,
    pub name: String,
    /// The wrong value, rendered as text.
    pub actual_value: String,
    pub is_field: bool,
    pub is_array: bool,
    pub array_index: Option<u32>,
}

impl SuspiciousVariable {
    /// Local variable or parameter observation.
    pub fn local(
        test: impl Into<String>,
        method: Element,
        name: impl Into<String>,
        actual_value: impl Into<String>,
    ) -> Self {
        Self {
            test: test.into(),
            locate_scope: method,
            name: name.into(),
            actual_value: actual_value.into(),
            is_field: false,
            is_array: false,
            array_index: None,
        }
    }

    /// Field observation, scoped to the whole class.
    pub fn field(
        test: impl Into<String>,
        class: impl Into<String>,
        name: impl Into<String>,
        actual_value: impl Into<String>,
    ) -> Self {
        Self {
            test: test.into(),
            locate_scope: Element::class(class),
            name: name.into(),
            actual_value: actual_value.into(),
            is_field: true,
            is_array: false,
            array_index: None,
        }
    }

    /// Mark the observation as one array element.
    pub fn with_array_index(mut self, index: u32) -> Self {
        self.is_array = true;
        self.array_index = Some(index);
        self
    }
}

impl std::fmt::Display for SuspiciousVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.array_index {
            Some(index) => write!(
                f,
                "{}[{}] in {} = {}",
                self.name, index, self.locate_scope, self.actual_value
            ),
            None => write!(
                f,
                "{} in {} = {}",
                self.name, self.locate_scope, self.actual_value
            ),
        }
    }
}

/// What kind of statement produced the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// An assignment or increment whose target is the explained variable.
    Assignment { target: SuspiciousVariable },
    /// A method's return statement.
    Return,
    /// An argument bound to a parameter at a call site.
    Argument {
        /// Signature of the method whose parameter received the value.
        invoked_method: String,
        /// Zero-based position of the parameter.
        arg_index: u32,
        /// Which runtime invocation of the call site bound the value.
        invoke_call_ordinal: u32,
        /// Invocation ordinals at which the value was collected.
        collect_at_ordinals: Vec<u32>,
    },
}

/// The `(test, method, line, value)` key under which expressions are
/// deduplicated across a cause tree. Statement text, the nested-call
/// flag, and the variable lists deliberately do not participate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpressionIdentity {
    pub test: String,
    pub locate_method: Element,
    pub locate_line: u32,
    pub actual_value: String,
}

/// A statement observed to have produced a value, with the static facts
/// needed to keep tracing backward from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousExpression {
    /// Failing test id.
    pub test: String,
    /// Method containing the statement.
    pub locate_method: Element,
    pub locate_line: u32,
    /// Value the statement produced, rendered as text.
    pub actual_value: String,
    pub statement_text: String,
    pub has_nested_call: bool,
    /// Names the statement reads directly; these are expanded next.
    pub direct_variable_names: Vec<String>,
    /// Names reachable only through calls or aliasing; kept for
    /// diagnostics, never expanded.
    pub indirect_variable_names: Vec<String>,
    pub kind: ExpressionKind,
}

impl SuspiciousExpression {
    /// Line-granularity element for the statement's location.
    pub fn location(&self) -> Element {
        self.locate_method.at_line(self.locate_line)
    }

    /// Dedup key for this expression.
    pub fn identity(&self) -> ExpressionIdentity {
        ExpressionIdentity {
            test: self.test.clone(),
            locate_method: self.locate_method.clone(),
            locate_line: self.locate_line,
            actual_value: self.actual_value.clone(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ExpressionKind::Assignment { .. } => "assignment",
            ExpressionKind::Return => "return",
            ExpressionKind::Argument { .. } => "argument",
        }
    }
}

impl std::fmt::Display for SuspiciousExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} = {} ({})",
            self.kind_name(),
            self.location(),
            self.actual_value,
            self.statement_text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expression(line: u32, value: &str, text: &str) -> SuspiciousExpression {
        SuspiciousExpression {
            test: "AccTest#overdraft".to_string(),
            locate_method: Element::method("Account", "recalc()"),
            locate_line: line,
            actual_value: value.to_string(),
            statement_text: text.to_string(),
            has_nested_call: false,
            direct_variable_names: vec![],
            indirect_variable_names: vec![],
            kind: ExpressionKind::Return,
        }
    }

    #[test]
    fn test_variable_identity_is_structural() {
        let method = Element::method("Account", "recalc()");
        let a = SuspiciousVariable::local("T#t", method.clone(), "total", "5");
        let b = SuspiciousVariable::local("T#t", method.clone(), "total", "5");
        let c = SuspiciousVariable::local("T#t", method, "total", "6");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_field_constructor_scopes_to_class() {
        let field = SuspiciousVariable::field("T#t", "Account", "balance", "-50");
        assert!(field.is_field);
        assert_eq!(field.locate_scope, Element::class("Account"));
    }

    #[test]
    fn test_array_index_builder() {
        let method = Element::method("Ledger", "sum()");
        let entry = SuspiciousVariable::local("T#t", method, "rows", "0").with_array_index(3);
        assert!(entry.is_array);
        assert_eq!(entry.array_index, Some(3));
        assert_eq!(entry.to_string(), "rows[3] in Ledger#sum() = 0");
    }

    #[test]
    fn test_expression_identity_ignores_statement_text() {
        let a = expression(10, "5", "total = total + fee");
        let b = expression(10, "5", "total += fee");
        let c = expression(11, "5", "total = total + fee");
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
    }

    #[test]
    fn test_expression_location_is_line_element() {
        let expr = expression(10, "5", "total = total + fee");
        assert_eq!(expr.location(), Element::line("Account", "recalc()", 10));
    }

    #[test]
    fn test_kind_names() {
        let mut expr = expression(10, "5", "x");
        assert_eq!(expr.kind_name(), "return");
        expr.kind = ExpressionKind::Assignment {
            target: SuspiciousVariable::field("T#t", "Account", "balance", "5"),
        };
        assert_eq!(expr.kind_name(), "assignment");
        expr.kind = ExpressionKind::Argument {
            invoked_method: "apply(int)".to_string(),
            arg_index: 0,
            invoke_call_ordinal: 1,
            collect_at_ordinals: vec![1],
        };
        assert_eq!(expr.kind_name(), "argument");
    }
}

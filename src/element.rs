//! Program element identity.
//!
//! An element names a location in code at class, method, or line
//! granularity. Elements are the unit of suspicion scoring: coverage is
//! aggregated per element, and the ranking orders elements by score.

use serde::{Deserialize, Serialize};

/// Granularity at which coverage is aggregated and elements compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Whole classes.
    Class,
    /// Methods, identified by class plus signature.
    Method,
    /// Individual lines, identified by class, signature, and line number.
    #[default]
    Line,
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Granularity::Class => write!(f, "class"),
            Granularity::Method => write!(f, "method"),
            Granularity::Line => write!(f, "line"),
        }
    }
}

/// An inclusive line range, as reported by static analysis for multi-line
/// statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Single-line range.
    pub fn at(line: u32) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    pub fn contains(&self, line: u32) -> bool {
        line >= self.start && line <= self.end
    }
}

/// A program location: fully-qualified class name, optional method
/// signature, optional line number.
///
/// Equality is structural. Two method-granularity elements are equal iff
/// class and signature match; at line granularity the line must match as
/// well. Ordering is lexicographic by qualified name, then by line, which
/// is what the ranking uses to break score ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Element {
    pub class_name: String,
    pub method: Option<String>,
    pub line: Option<u32>,
}

impl Element {
    /// Class-granularity element.
    pub fn class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method: None,
            line: None,
        }
    }

    /// Method-granularity element.
    pub fn method(class_name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method: Some(signature.into()),
            line: None,
        }
    }

    /// Line-granularity element.
    pub fn line(
        class_name: impl Into<String>,
        signature: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method: Some(signature.into()),
            line: Some(line),
        }
    }

    /// Granularity implied by which fields are present.
    pub fn granularity(&self) -> Granularity {
        if self.line.is_some() {
            Granularity::Line
        } else if self.method.is_some() {
            Granularity::Method
        } else {
            Granularity::Class
        }
    }

    /// `Class#method` or bare class name for class-granularity elements.
    pub fn qualified_name(&self) -> String {
        match &self.method {
            Some(signature) => format!("{}#{}", self.class_name, signature),
            None => self.class_name.clone(),
        }
    }

    /// Refine a method element to one of its lines.
    pub fn at_line(&self, line: u32) -> Element {
        Element {
            class_name: self.class_name.clone(),
            method: self.method.clone(),
            line: Some(line),
        }
    }

    /// The enclosing method element (drops the line, if any).
    pub fn enclosing_method(&self) -> Element {
        Element {
            class_name: self.class_name.clone(),
            method: self.method.clone(),
            line: None,
        }
    }

    /// The enclosing class element.
    pub fn enclosing_class(&self) -> Element {
        Element::class(self.class_name.clone())
    }

    /// Map this element to the given granularity, dropping finer fields.
    ///
    /// A class-granularity element cannot be refined, so coarsening to
    /// method or line granularity returns it unchanged.
    pub fn coarsen(&self, granularity: Granularity) -> Element {
        match granularity {
            Granularity::Class => self.enclosing_class(),
            Granularity::Method => self.enclosing_method(),
            Granularity::Line => self.clone(),
        }
    }

    /// True when both elements resolve to the same enclosing scope: the
    /// same method for method/line-granularity elements, the same class
    /// for class-granularity elements. Mixed granularities never share a
    /// scope.
    pub fn is_neighbor(&self, other: &Element) -> bool {
        match (&self.method, &other.method) {
            (Some(a), Some(b)) => self.class_name == other.class_name && a == b,
            (None, None) => self.class_name == other.class_name,
            _ => false,
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.method, self.line) {
            (Some(signature), Some(line)) => {
                write!(f, "{}#{}:{}", self.class_name, signature, line)
            }
            (Some(signature), None) => write!(f, "{}#{}", self.class_name, signature),
            _ => write!(f, "{}", self.class_name),
        }
    }
}

//! Causal explanation of a failing value.
//!
//! Starting from one observed-wrong variable, the probe walks backwards
//! through assignments, nested-call returns and call-site arguments,
//! producing a tree of suspicious expressions rooted at the seed's own
//! cause line.

pub mod expression;
pub mod finder;
pub mod probe;
pub mod tree;

pub use expression::{ExpressionIdentity, ExpressionKind, SuspiciousExpression, SuspiciousVariable};
pub use finder::CauseLineFinder;
pub use probe::{CancelToken, CauseProbe, ProbeError};
pub use tree::{CauseNode, CauseTree, NodeId};

// Library exports for the culpa fault localizer
pub mod adjust;
pub mod causal;
pub mod cli;
pub mod config;
pub mod element;
pub mod ranking;
pub mod replay;
pub mod report;
pub mod services;
pub mod spectrum;

// Re-export key types for convenience
pub use adjust::{mark_suspicious, remove, ProbeBoost};
pub use causal::{
    CancelToken, CauseLineFinder, CauseProbe, CauseTree, ExpressionIdentity, ExpressionKind,
    NodeId, ProbeError, SuspiciousExpression, SuspiciousVariable,
};
pub use config::CulpaConfig;
pub use element::{Element, Granularity, LineRange};
pub use ranking::{Ranking, RankingEntry, RankingError};
pub use replay::SessionBundle;
pub use report::{LocalizationReport, ReportFormat};
pub use services::{CallSearch, CoverageSource, ServiceError, StaticAnalysis, ValueTrace};
pub use spectrum::{
    CoverageReport, SbflCounts, SbflFormula, SpectrumData, TestExecution,
};

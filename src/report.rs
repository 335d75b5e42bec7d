/// Report generation for localization results
use crate::causal::tree::CauseTree;
use crate::ranking::Ranking;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Localization report data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationReport {
    pub project_name: String,
    pub ranking: Ranking,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_tree: Option<CauseTree>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl LocalizationReport {
    pub fn new(project_name: String, ranking: Ranking) -> Self {
        Self {
            project_name,
            ranking,
            cause_tree: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_cause_tree(mut self, tree: CauseTree) -> Self {
        self.cause_tree = Some(tree);
        self
    }

    /// Generate plain text report showing the best `top` elements
    pub fn to_text(&self, top: usize) -> String {
        let mut text = String::new();

        text.push_str(&format!("FAULT LOCALIZATION: {}\n", self.project_name));
        text.push_str(&format!(
            "Generated: {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        text.push_str(&"=".repeat(72));
        text.push_str("\n\n");

        text.push_str(&format!(
            "RANKING ({} formula, {} granularity, {} elements)\n",
            self.ranking.formula(),
            self.ranking.granularity(),
            self.ranking.len()
        ));
        text.push_str(&"-".repeat(72));
        text.push('\n');
        text.push_str(&format!(
            "{:>4}  {:>6}  {:>8}  ELEMENT\n",
            "#", "RANK", "SCORE"
        ));
        for (index, entry) in self.ranking.top_n(top).iter().enumerate() {
            let rank = self.ranking.rank_of(&entry.element).unwrap_or_default();
            text.push_str(&format!(
                "{:>4}  {:>6.1}  {:>8.4}  {}\n",
                index + 1,
                rank,
                entry.score,
                entry.element
            ));
        }
        text.push('\n');

        if let Some(tree) = &self.cause_tree {
            text.push_str("CAUSE TREE\n");
            text.push_str(&"-".repeat(72));
            text.push('\n');
            text.push_str(&tree.render());
            text.push('\n');
        }

        text
    }

    /// Generate Markdown report
    pub fn to_markdown(&self, top: usize) -> String {
        let mut md = String::new();

        md.push_str(&format!("# Fault Localization: {}\n\n", self.project_name));
        md.push_str(&format!(
            "**Generated:** {}\n\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        md.push_str("## Ranking\n\n");
        md.push_str(&format!(
            "- **Formula:** {}\n- **Granularity:** {}\n- **Elements:** {}\n\n",
            self.ranking.formula(),
            self.ranking.granularity(),
            self.ranking.len()
        ));
        md.push_str("| # | Rank | Score | Element |\n");
        md.push_str("|---|------|-------|----------|\n");
        for (index, entry) in self.ranking.top_n(top).iter().enumerate() {
            let rank = self.ranking.rank_of(&entry.element).unwrap_or_default();
            md.push_str(&format!(
                "| {} | {:.1} | {:.4} | `{}` |\n",
                index + 1,
                rank,
                entry.score,
                entry.element
            ));
        }
        md.push('\n');

        if let Some(tree) = &self.cause_tree {
            md.push_str("## Cause Tree\n\n");
            md.push_str("```\n");
            md.push_str(&tree.render());
            md.push_str("```\n");
        }

        md
    }

    /// Generate JSON report
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save report to file
    pub fn save(&self, path: &Path, format: ReportFormat, top: usize) -> Result<()> {
        let content = match format {
            ReportFormat::Text => self.to_text(top),
            ReportFormat::Markdown => self.to_markdown(top),
            ReportFormat::Json => self.to_json()?,
        };

        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Markdown,
    Json,
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::element::Granularity;
use crate::spectrum::SbflFormula;

/// Filename looked up in the working directory when no explicit config
/// path is given.
pub const CONFIG_FILENAME: &str = "culpa.toml";

/// Culpa project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CulpaConfig {
    /// Configuration file version
    #[serde(default = "default_version")]
    pub version: String,

    /// Ranking settings
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Adjuster constants
    #[serde(default)]
    pub adjust: AdjustConfig,

    /// Cause probe settings
    #[serde(default)]
    pub probe: ProbeConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for CulpaConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            ranking: RankingConfig::default(),
            adjust: AdjustConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Suspiciousness formula
    pub formula: SbflFormula,

    /// Element granularity for coverage aggregation
    pub granularity: Granularity,

    /// How many elements reports show
    pub top: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            formula: SbflFormula::Ochiai,
            granularity: Granularity::Line,
            top: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustConfig {
    /// Neighborhood damping applied when ruling an element out, below 1
    pub remove_const: f64,

    /// Neighborhood gain applied when confirming a suspicion
    pub susp_const: f64,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            remove_const: 0.5,
            susp_const: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Depth decay of the cause-tree boost, in (0, 1]
    pub base_factor: f64,

    /// Per-query budget for value tracing
    pub trace_timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_factor: 0.8,
            trace_timeout_secs: 30,
        }
    }
}

impl ProbeConfig {
    pub fn trace_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.trace_timeout_secs)
    }
}

impl CulpaConfig {
    /// Load configuration from TOML file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `culpa.toml` from the current directory. Returns `Ok(None)`
    /// if the file does not exist, `Err` if malformed.
    pub fn load_optional() -> anyhow::Result<Option<Self>> {
        let path = std::path::Path::new(CONFIG_FILENAME);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(Some(config))
    }
}

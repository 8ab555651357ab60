//! Report configuration file (`prodreport.toml`)
//!
//! ```toml
//! output = "Production_Performance_Report.xlsx"
//! sheet = "Tracker"
//! max_column_width = 50
//! ranking_top_n = 15
//! trend_top_n = 5
//! header_color = 0x4F81BD
//!
//! [columns]
//! key = ["J", "K", "L", "M", "N"]
//! qc = ["U", "V", "W", "X"]
//! final = ["X", "Y", "Z", "AA", "AB", "AC"]
//! ```
//!
//! Every field is optional. Column overrides are checked when the run
//! extracts the owning process, so a bad label only costs that process.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use prodreport_core::Process;
use prodreport_pipeline::{ProcessSchema, ReportPipeline};
use prodreport_render::excel::{
    DEFAULT_HEADER_COLOR, DEFAULT_MAX_COLUMN_WIDTH, DEFAULT_RANKING_TOP_N, DEFAULT_TREND_TOP_N,
};
use prodreport_render::{WorkbookAssembler, DEFAULT_OUTPUT};

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "prodreport.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub output: PathBuf,
    /// Input sheet; the first sheet when absent
    pub sheet: Option<String>,
    pub max_column_width: f64,
    pub ranking_top_n: usize,
    pub trend_top_n: usize,
    pub header_color: u32,
    pub columns: ColumnOverrides,
}

/// Replacement column labels per process
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnOverrides {
    pub key: Option<Vec<String>>,
    pub qc: Option<Vec<String>>,
    #[serde(rename = "final")]
    pub final_process: Option<Vec<String>>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            sheet: None,
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
            ranking_top_n: DEFAULT_RANKING_TOP_N,
            trend_top_n: DEFAULT_TREND_TOP_N,
            header_color: DEFAULT_HEADER_COLOR,
            columns: ColumnOverrides::default(),
        }
    }
}

impl ColumnOverrides {
    pub fn for_process(&self, process: Process) -> Option<&[String]> {
        match process {
            Process::Key => self.key.as_deref(),
            Process::Qc => self.qc.as_deref(),
            Process::Final => self.final_process.as_deref(),
        }
    }
}

impl ReportConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid report configuration")
    }

    /// Load `explicit`, else `prodreport.toml` in `dir` if it exists, else defaults
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    debug!("no configuration file, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        debug!(path = %path.display(), "configuration loaded");
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn pipeline(&self) -> ReportPipeline {
        Process::ALL
            .iter()
            .filter_map(|p| {
                self.columns
                    .for_process(*p)
                    .map(|cols| ProcessSchema::with_columns(*p, cols.to_vec()))
            })
            .fold(ReportPipeline::new(), ReportPipeline::with_schema)
    }

    pub fn assembler(&self) -> WorkbookAssembler {
        WorkbookAssembler::new()
            .header_color(self.header_color)
            .max_column_width(self.max_column_width)
            .ranking_top_n(self.ranking_top_n)
            .trend_top_n(self.trend_top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = ReportConfig::from_toml("").unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.output, PathBuf::from("Production_Performance_Report.xlsx"));
        assert_eq!(config.header_color, 0x4F81BD);
    }

    #[test]
    fn fields_and_overrides_parse() {
        let config = ReportConfig::from_toml(
            r#"
            output = "out/report.xlsx"
            sheet = "Tracker"
            trend_top_n = 3
            header_color = 0x1F4E78

            [columns]
            final = ["X", "Y", "Z", "AA", "AB", "AD"]
            "#,
        )
        .unwrap();

        assert_eq!(config.output, PathBuf::from("out/report.xlsx"));
        assert_eq!(config.sheet.as_deref(), Some("Tracker"));
        assert_eq!(config.trend_top_n, 3);
        assert_eq!(config.ranking_top_n, 15);
        assert_eq!(config.header_color, 0x1F4E78);
        assert_eq!(config.columns.for_process(Process::Key), None);
        assert_eq!(
            config.columns.for_process(Process::Final).unwrap().last().map(String::as_str),
            Some("AD")
        );
    }

    #[test]
    fn overrides_replace_only_their_process() {
        let config =
            ReportConfig::from_toml("[columns]\nqc = [\"B\", \"C\", \"D\", \"E\"]").unwrap();
        let pipeline = config.pipeline();
        let columns: Vec<Vec<String>> =
            pipeline.schemas().iter().map(|s| s.columns.clone()).collect();
        assert_eq!(columns[0], vec!["J", "K", "L", "M", "N"]);
        assert_eq!(columns[1], vec!["B", "C", "D", "E"]);
        assert_eq!(columns[2], vec!["X", "Y", "Z", "AA", "AB", "AC"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ReportConfig::from_toml("colour = 1").is_err());
    }

    #[test]
    fn load_prefers_explicit_then_directory_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ReportConfig::load(None, dir.path()).unwrap(), ReportConfig::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "ranking_top_n = 10").unwrap();
        assert_eq!(ReportConfig::load(None, dir.path()).unwrap().ranking_top_n, 10);

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "ranking_top_n = 7").unwrap();
        assert_eq!(
            ReportConfig::load(Some(&explicit), dir.path()).unwrap().ranking_top_n,
            7
        );

        assert!(ReportConfig::load(Some(&dir.path().join("missing.toml")), dir.path()).is_err());
    }
}

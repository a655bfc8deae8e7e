use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_MASTER_PATH: &str = "chfs2019_master_202112.csv";
pub const DEFAULT_LINKED_PATH: &str = "chfs2019_hh_202112.csv";

/// Run settings. Every field has a default, so a config file only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub master_path: PathBuf,
    pub linked_path: PathBuf,
    pub output_dir: PathBuf,
    /// K in the top-K / bottom-K city ranking.
    pub ranking_size: usize,
    /// Most cities plotted on the city map.
    pub geo_city_cap: usize,
    /// Combined byte budget for the two input files.
    pub max_input_bytes: u64,
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            master_path: PathBuf::from(DEFAULT_MASTER_PATH),
            linked_path: PathBuf::from(DEFAULT_LINKED_PATH),
            output_dir: PathBuf::from("."),
            ranking_size: 5,
            geo_city_cap: 80,
            max_input_bytes: 512 * 1024 * 1024,
            preview_rows: 3,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> PipelineResult<Self> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.ranking_size == 0 {
            return Err(PipelineError::Config("ranking_size must be at least 1".into()));
        }
        if self.geo_city_cap == 0 {
            return Err(PipelineError::Config("geo_city_cap must be at least 1".into()));
        }
        if self.max_input_bytes == 0 {
            return Err(PipelineError::Config("max_input_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = PipelineConfig::from_json(r#"{ "ranking_size": 3, "output_dir": "out" }"#).unwrap();
        assert_eq!(config.ranking_size, 3);
        assert_eq!(config.geo_city_cap, 80);
        assert_eq!(config.master_path, PathBuf::from(DEFAULT_MASTER_PATH));
        assert_eq!(config.output_path("summary.json"), PathBuf::from("out").join("summary.json"));
    }

    #[test]
    fn zero_ranking_size_is_rejected() {
        let err = PipelineConfig::from_json(r#"{ "ranking_size": 0 }"#).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = PipelineConfig::from_json("{ ranking_size: ").unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/pipeline.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pipeline.json"));
    }
}

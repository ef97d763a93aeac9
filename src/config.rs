use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::adapters::onnx::ssd_engine::SsdOptions;
use crate::application::services::CleaningParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub detector: DetectorConfig,
    pub discount: DiscountConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8090".into(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub input_name: Option<String>,
    pub boxes_output: String,
    pub scores_output: String,
    pub labels_output: String,
    pub input_size: Option<u32>,
    pub intra_threads: usize,
    pub max_boxes: usize,
    pub score_threshold: f32,
    pub warmup_image: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let ssd = SsdOptions::default();
        let cleaning = CleaningParams::default();
        Self {
            model_path: "models/openimages_v4_ssd_mobilenet_v2.onnx".into(),
            labels_path: "models/openimages_v4_labels.txt".into(),
            input_name: ssd.input_name,
            boxes_output: ssd.boxes_output,
            scores_output: ssd.scores_output,
            labels_output: ssd.labels_output,
            input_size: ssd.input_size,
            intra_threads: ssd.intra_threads,
            max_boxes: cleaning.max_boxes,
            score_threshold: cleaning.score_threshold,
            warmup_image: None,
        }
    }
}

impl DetectorConfig {
    pub fn ssd_options(&self) -> SsdOptions {
        SsdOptions {
            input_name: self.input_name.clone(),
            boxes_output: self.boxes_output.clone(),
            scores_output: self.scores_output.clone(),
            labels_output: self.labels_output.clone(),
            input_size: self.input_size,
            intra_threads: self.intra_threads,
        }
    }

    pub fn cleaning_params(&self) -> CleaningParams {
        CleaningParams {
            max_boxes: self.max_boxes,
            score_threshold: self.score_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscountConfig {
    pub model_path: PathBuf,
}

impl Default for DiscountConfig {
    fn default() -> Self {
        Self { model_path: "discount_models/discount_model.json".into() }
    }
}

impl AppConfig {
    /// Reads the TOML file if given; every missing key falls back to its default.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detector;
        if !(0.0..=1.0).contains(&d.score_threshold) {
            return Err(ConfigError::Invalid(format!(
                "detector.score_threshold must be within [0, 1], got {}",
                d.score_threshold
            )));
        }
        if d.max_boxes == 0 {
            return Err(ConfigError::Invalid("detector.max_boxes must be at least 1".into()));
        }
        if d.input_size == Some(0) {
            return Err(ConfigError::Invalid("detector.input_size must be positive".into()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_body_bytes must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:8090");
        assert_eq!(cfg.detector.max_boxes, 10);
        assert_eq!(cfg.detector.score_threshold, 0.15);
        assert_eq!(cfg.detector.boxes_output, "detection_boxes");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [detector]
            model_path = "/srv/models/ssd.onnx"
            input_name = "images"
            input_size = 512

            [discount]
            model_path = "/srv/models/knn.json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.detector.model_path, PathBuf::from("/srv/models/ssd.onnx"));
        assert_eq!(cfg.detector.ssd_options().input_name.as_deref(), Some("images"));
        assert_eq!(cfg.detector.ssd_options().input_size, Some(512));
        assert_eq!(cfg.detector.scores_output, "detection_scores");
        assert_eq!(cfg.discount.model_path, PathBuf::from("/srv/models/knn.json"));
        assert_eq!(cfg.server.max_body_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let cfg = AppConfig::from_toml("[detector]\nscore_threshold = 1.5\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_types_fail_to_parse() {
        assert!(matches!(
            AppConfig::from_toml("[detector]\nmax_boxes = \"ten\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_and_validates_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"127.0.0.1:9000\"").unwrap();
        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");

        assert!(matches!(
            AppConfig::load(Some(Path::new("/no/such/config.toml"))),
            Err(ConfigError::Io { .. })
        ));
    }
}

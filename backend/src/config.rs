use serde::Deserialize;
use shared::CropCategory;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::inference::preprocess::DEFAULT_INPUT_SIZE;
use crate::inference::ranker::DEFAULT_TOP_K;
use crate::retry::RetryConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
    #[error("Failed to read crop catalogue {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse crop catalogue: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    #[default]
    Probabilities,
    Logits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CropModelConfig {
    pub model: PathBuf,
    pub labels: PathBuf,
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default)]
    pub output: OutputKind,
}

/// Which model and label file serve each crop.
#[derive(Debug, Clone, Deserialize)]
pub struct CropCatalogue {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    pub crops: HashMap<CropCategory, CropModelConfig>,
}

fn default_input_size() -> u32 {
    DEFAULT_INPUT_SIZE
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for CropCatalogue {
    fn default() -> Self {
        let crop = |name: &str| CropModelConfig {
            model: PathBuf::from(format!("models/{name}_model.onnx")),
            labels: PathBuf::from(format!("static/{name}_classes.txt")),
            input_size: DEFAULT_INPUT_SIZE,
            output: OutputKind::Probabilities,
        };
        Self {
            top_k: DEFAULT_TOP_K,
            crops: HashMap::from([
                (CropCategory::Rice, crop("rice")),
                (CropCategory::Pulses, crop("pulses")),
            ]),
        }
    }
}

impl CropCatalogue {
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let catalogue: Self = serde_yaml::from_str(yaml)?;
        if catalogue.top_k == 0 {
            return Err(ConfigError::InvalidVar {
                name: "top_k",
                value: catalogue.top_k.to_string(),
            });
        }
        Ok(catalogue)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(yaml) => Self::parse(&yaml),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "Crop catalogue {} not found, using built-in model locations",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

/// One year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryBackend {
    DynamoDb { table: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub crops_config: PathBuf,
    pub history_backend: HistoryBackend,
    pub cognito_client_id: String,
    pub retry: RetryConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let history_backend = match lookup("HISTORY_BACKEND").as_deref() {
            None | Some("dynamodb") => HistoryBackend::DynamoDb {
                table: required("DYNAMODB_HISTORY_TABLE")?,
            },
            Some("memory") => HistoryBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidVar {
                    name: "HISTORY_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let defaults = RetryConfig::default();
        let retry = RetryConfig {
            max_retries: parse_or(&lookup, "HISTORY_MAX_RETRIES", defaults.max_retries)?,
            initial_interval: Duration::from_millis(parse_or(
                &lookup,
                "HISTORY_RETRY_INITIAL_MS",
                defaults.initial_interval.as_millis() as u64,
            )?),
            ..defaults
        };

        let session_ttl_hours: i64 = parse_or(&lookup, "SESSION_TTL_HOURS", 24)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(ConfigError::InvalidVar {
                name: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            });
        }

        Ok(Self {
            port: parse_or(&lookup, "PORT", 8081)?,
            jwt_secret: required("JWT_SECRET")?,
            session_ttl_hours,
            crops_config: lookup("CROPS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/crops.yaml")),
            history_backend,
            cognito_client_id: required("COGNITO_CLIENT_ID")?,
            retry,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &'static str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = AppConfig::from_lookup(vars(&[
            ("JWT_SECRET", "s3cret"),
            ("COGNITO_CLIENT_ID", "client"),
            ("DYNAMODB_HISTORY_TABLE", "leafsense-history"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.crops_config, PathBuf::from("config/crops.yaml"));
        assert_eq!(
            config.history_backend,
            HistoryBackend::DynamoDb {
                table: "leafsense-history".into()
            }
        );
        assert_eq!(config.retry.max_retries, RetryConfig::default().max_retries);
    }

    #[test]
    fn memory_backend_needs_no_table() {
        let config = AppConfig::from_lookup(vars(&[
            ("JWT_SECRET", "s3cret"),
            ("COGNITO_CLIENT_ID", "client"),
            ("HISTORY_BACKEND", "memory"),
            ("HISTORY_MAX_RETRIES", "0"),
        ]))
        .unwrap();
        assert_eq!(config.history_backend, HistoryBackend::Memory);
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = AppConfig::from_lookup(vars(&[("HISTORY_BACKEND", "memory")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("JWT_SECRET")));
    }

    #[test]
    fn bad_port_is_reported() {
        let err = AppConfig::from_lookup(vars(&[
            ("JWT_SECRET", "s3cret"),
            ("COGNITO_CLIENT_ID", "client"),
            ("HISTORY_BACKEND", "memory"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: "PORT", .. }));
    }

    #[test]
    fn session_ttl_must_be_positive_and_bounded() {
        for bad in ["0", "-3", "9223372036854775807"] {
            let err = AppConfig::from_lookup(vars(&[
                ("JWT_SECRET", "s3cret"),
                ("COGNITO_CLIENT_ID", "client"),
                ("HISTORY_BACKEND", "memory"),
                ("SESSION_TTL_HOURS", bad),
            ]))
            .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidVar {
                    name: "SESSION_TTL_HOURS",
                    ..
                }
            ));
        }
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let err = CropCatalogue::parse(
            r#"
top_k: 0
crops:
  Rice:
    model: models/rice_model.onnx
    labels: static/rice_classes.txt
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: "top_k", .. }));
    }

    #[test]
    fn catalogue_yaml_fills_defaults() {
        let catalogue = CropCatalogue::parse(
            r#"
crops:
  Rice:
    model: models/rice_model.onnx
    labels: static/rice_classes.txt
  Pulses:
    model: models/pulses_model.onnx
    labels: static/pulses_classes.txt
    input_size: 256
    output: logits
"#,
        )
        .unwrap();

        assert_eq!(catalogue.top_k, 10);
        let rice = &catalogue.crops[&CropCategory::Rice];
        assert_eq!(rice.input_size, 224);
        assert_eq!(rice.output, OutputKind::Probabilities);
        let pulses = &catalogue.crops[&CropCategory::Pulses];
        assert_eq!(pulses.input_size, 256);
        assert_eq!(pulses.output, OutputKind::Logits);
    }

    #[test]
    fn missing_catalogue_falls_back_to_defaults() {
        let catalogue = CropCatalogue::load(Path::new("no/such/crops.yaml")).unwrap();
        assert_eq!(
            catalogue.crops[&CropCategory::Rice].model,
            PathBuf::from("models/rice_model.onnx")
        );
        assert_eq!(
            catalogue.crops[&CropCategory::Pulses].labels,
            PathBuf::from("static/pulses_classes.txt")
        );
    }
}

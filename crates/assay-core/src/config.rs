use crate::constants::env as env_keys;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub max_files: usize,
    pub max_age_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_age_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Root of the local file-backed store, batch ledger and workflow log.
    pub state_dir: PathBuf,
    pub job_queue: String,
    pub image_registry: String,
    pub stack_name: String,
    pub default_memory_gb: f64,
    pub workflow_name: String,
    pub job_role_arn: Option<String>,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("~/.local/share/assay"),
            job_queue: "assay-default".to_string(),
            image_registry: "localhost:5000".to_string(),
            stack_name: "assay".to_string(),
            default_memory_gb: 2.0,
            workflow_name: "assay-analysis".to_string(),
            job_role_arn: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job_queue.trim().is_empty() {
            return Err(ConfigError::General("'job-queue' must not be empty".into()));
        }
        if self.image_registry.trim().is_empty() || self.stack_name.trim().is_empty() {
            return Err(ConfigError::General(
                "'image-registry' and 'stack-name' must not be empty".into(),
            ));
        }
        if !(self.default_memory_gb.is_finite() && self.default_memory_gb > 0.0) {
            return Err(ConfigError::General(format!(
                "'default-memory-gb' must be positive, got {}",
                self.default_memory_gb
            )));
        }
        Ok(())
    }

    pub fn image_for(&self, app: &str) -> String {
        format!(
            "{}/{}/{}",
            self.image_registry.trim_end_matches('/'),
            self.stack_name,
            app
        )
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(queue) = env::var(env_keys::JOB_QUEUE) {
            if !queue.is_empty() {
                self.job_queue = queue;
            }
        }
        if let Ok(dir) = env::var(env_keys::STATE_DIR) {
            if !dir.is_empty() {
                self.state_dir = PathBuf::from(dir);
            }
        }
    }

    fn expand_paths(&mut self) {
        let raw = self.state_dir.to_string_lossy().to_string();
        self.state_dir = PathBuf::from(shellexpand::tilde(&raw).into_owned());
    }
}

pub fn config_path() -> Result<Option<PathBuf>, ConfigError> {
    if let Ok(path) = env::var(env_keys::CONFIG) {
        return Ok(Some(PathBuf::from(shellexpand::tilde(&path).into_owned())));
    }
    let xdg_dirs = xdg::BaseDirectories::with_prefix("assay");
    let config_home = xdg_dirs
        .get_config_home()
        .ok_or(ConfigError::XdgDirectoryNotFound("config"))?;
    let path = config_home.join("config.toml");
    Ok(path.exists().then_some(path))
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let content = fs_err::read_to_string(path).map_err(|e| ConfigError::PathIo {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_env_overrides();
    config.expand_paths();
    config.validate()?;
    Ok(config)
}

pub fn load_config() -> Result<Config, ConfigError> {
    match config_path()? {
        Some(path) => {
            tracing::debug!("Loading configuration from {}", path.display());
            load_config_from(&path)
        }
        None => {
            tracing::debug!("No configuration file found, using defaults");
            let mut config = Config::default();
            config.apply_env_overrides();
            config.expand_paths();
            config.validate()?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
job-queue = "genomics-high-mem"
default-memory-gb = 7.5

[logging]
max_files = 3
"#,
        )
        .unwrap();
        assert_eq!(config.job_queue, "genomics-high-mem");
        assert_eq!(config.default_memory_gb, 7.5);
        assert_eq!(config.logging.max_files, 3);
        assert_eq!(config.logging.max_age_days, 7);
        assert_eq!(config.stack_name, "assay");
    }

    #[test]
    fn test_image_for_joins_registry_and_stack() {
        let config = Config {
            image_registry: "123.dkr.ecr.eu-west-1.amazonaws.com/".to_string(),
            stack_name: "prod".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.image_for("samtools:1.17"),
            "123.dkr.ecr.eu-west-1.amazonaws.com/prod/samtools:1.17"
        );
    }

    #[test]
    fn test_validate_rejects_non_positive_memory() {
        let config = Config {
            default_memory_gb: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "state-dir = \"{}\"", dir.path().display()).unwrap();
        writeln!(file, "stack-name = \"staging\"").unwrap();
        drop(file);

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.stack_name, "staging");
        assert!(config.state_dir.is_absolute());
    }

    #[test]
    fn test_load_config_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "job-queue = [").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Toml(_))
        ));
    }
}
